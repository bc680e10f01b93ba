use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use chrono::Utc;
use frames_types::{
    capture::{EncodedSample, ScheduleContext, VideoFrame},
    Result,
};
use image::{codecs::jpeg::JpegEncoder, ColorType, ImageBuffer, Rgba};
use tracing::debug;

use crate::vision_error;

pub const JPEG_DATA_URL_PREFIX: &str = "data:image/jpeg;base64,";

/// Serializes video frames into the JPEG data URLs the recognition endpoint expects.
#[derive(Debug, Clone, Copy)]
pub struct FrameSampler {
    quality: u8,
}

impl Default for FrameSampler {
    fn default() -> Self {
        Self { quality: 80 }
    }
}

impl FrameSampler {
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// `Ok(None)` when the frame has no dimensions yet.
    pub fn sample(
        &self,
        frame: &VideoFrame,
        schedule: Option<&ScheduleContext>,
    ) -> Result<Option<EncodedSample>> {
        if !frame.has_dimensions() {
            return Ok(None);
        }
        let jpeg = self.encode_jpeg(frame)?;
        debug!(
            "Encoded {}x{} frame into {} JPEG bytes",
            frame.width,
            frame.height,
            jpeg.len()
        );
        let mut data_url =
            String::with_capacity(JPEG_DATA_URL_PREFIX.len() + jpeg.len().div_ceil(3) * 4);
        data_url.push_str(JPEG_DATA_URL_PREFIX);
        BASE64_STANDARD.encode_string(&jpeg, &mut data_url);
        Ok(Some(EncodedSample {
            data_url,
            captured_at: Utc::now(),
            schedule: schedule.cloned(),
        }))
    }

    fn encode_jpeg(&self, frame: &VideoFrame) -> Result<Vec<u8>> {
        let Some(buffer) =
            ImageBuffer::<Rgba<u8>, _>::from_raw(frame.width, frame.height, frame.data.as_slice())
        else {
            return Err(vision_error(format!(
                "frame buffer of {} bytes does not match {}x{}",
                frame.data.len(),
                frame.width,
                frame.height
            )));
        };
        // JPEG carries no alpha channel.
        let rgb: Vec<u8> = buffer
            .pixels()
            .flat_map(|px| [px[0], px[1], px[2]])
            .collect();

        let mut out = Vec::new();
        JpegEncoder::new_with_quality(&mut out, self.quality)
            .encode(&rgb, frame.width, frame.height, ColorType::Rgb8)
            .map_err(|err| vision_error(format!("JPEG encoding failed: {err}")))?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_frame(width: u32, height: u32) -> VideoFrame {
        VideoFrame::from_rgba(width, height, [90, 120, 200, 255].repeat((width * height) as usize))
    }

    #[test]
    fn zero_dimension_frames_are_skipped() {
        let sampler = FrameSampler::default();
        let sample = sampler
            .sample(&VideoFrame::empty(), None)
            .expect("sample empty");
        assert!(sample.is_none());
    }

    #[test]
    fn sample_is_a_decodable_jpeg_data_url() {
        let sampler = FrameSampler::new(80);
        let schedule = ScheduleContext::new("31");
        let sample = sampler
            .sample(&solid_frame(16, 8), Some(&schedule))
            .expect("sample")
            .expect("non-empty frame");

        assert!(sample.data_url.starts_with(JPEG_DATA_URL_PREFIX));
        assert_eq!(sample.schedule, Some(schedule));

        let encoded = &sample.data_url[JPEG_DATA_URL_PREFIX.len()..];
        let bytes = BASE64_STANDARD.decode(encoded).expect("valid base64");
        let decoded = image::load_from_memory_with_format(&bytes, image::ImageFormat::Jpeg)
            .expect("valid jpeg");
        assert_eq!((decoded.width(), decoded.height()), (16, 8));
    }

    #[test]
    fn mismatched_buffer_is_a_vision_error() {
        let frame = VideoFrame::from_rgba(4, 4, vec![0; 10]);
        let err = FrameSampler::default().sample(&frame, None).unwrap_err();
        assert!(err.to_string().contains("does not match"));
    }

    #[test]
    fn quality_is_clamped() {
        assert_eq!(FrameSampler::new(0).quality(), 1);
        assert_eq!(FrameSampler::new(250).quality(), 100);
    }
}
