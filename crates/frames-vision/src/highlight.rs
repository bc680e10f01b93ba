//! Skin-tone bounding box used only to draw a frame and zoom the preview.
//!
//! This is not face detection and has no influence on recognition; identity
//! is decided entirely by the backend.

use frames_types::capture::{HighlightBox, VideoFrame};

const STRIDE: usize = 4;
const MIN_MATCHING_PIXELS: usize = 500;
const PADDING: u32 = 50;

pub const HIGHLIGHT_ZOOM: f32 = 1.3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Highlight {
    pub region: Option<HighlightBox>,
    pub zoom: f32,
}

fn is_skin_tone(r: u8, g: u8, b: u8) -> bool {
    r > 95 && g > 40 && b > 20 && r > g && r > b && r.abs_diff(g) > 15
}

pub fn skin_tone_highlight(frame: &VideoFrame) -> Highlight {
    let none = Highlight {
        region: None,
        zoom: 1.0,
    };
    if !frame.has_dimensions() {
        return none;
    }

    let (width, height) = (frame.width, frame.height);
    let (mut min_x, mut min_y) = (width, height);
    let (mut max_x, mut max_y) = (0u32, 0u32);
    let mut matching = 0usize;

    for y in (0..height).step_by(STRIDE) {
        for x in (0..width).step_by(STRIDE) {
            let Some([r, g, b, _]) = frame.pixel(x, y) else {
                continue;
            };
            if is_skin_tone(r, g, b) {
                min_x = min_x.min(x);
                max_x = max_x.max(x);
                min_y = min_y.min(y);
                max_y = max_y.max(y);
                matching += 1;
            }
        }
    }

    if matching <= MIN_MATCHING_PIXELS {
        return none;
    }

    let x = min_x.saturating_sub(PADDING);
    let y = min_y.saturating_sub(PADDING);
    let region = HighlightBox {
        x,
        y,
        width: (max_x - min_x + PADDING * 2).min(width - x),
        height: (max_y - min_y + PADDING * 2).min(height - y),
    };
    Highlight {
        region: Some(region),
        zoom: HIGHLIGHT_ZOOM,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_with_patch(width: u32, height: u32, patch: (u32, u32, u32, u32)) -> VideoFrame {
        let (px, py, pw, ph) = patch;
        let mut data = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                let inside = x >= px && x < px + pw && y >= py && y < py + ph;
                if inside {
                    data.extend_from_slice(&[210, 150, 120, 255]);
                } else {
                    data.extend_from_slice(&[30, 60, 90, 255]);
                }
            }
        }
        VideoFrame::from_rgba(width, height, data)
    }

    #[test]
    fn large_patch_produces_padded_box() {
        // 120x120 patch sampled every 4px gives 900 matches.
        let frame = frame_with_patch(400, 300, (100, 80, 120, 120));
        let highlight = skin_tone_highlight(&frame);
        let region = highlight.region.expect("region");
        assert_eq!(highlight.zoom, HIGHLIGHT_ZOOM);
        assert_eq!(region.x, 50);
        assert_eq!(region.y, 30);
        assert_eq!(region.width, 116 + 100);
        assert_eq!(region.height, 116 + 100);
    }

    #[test]
    fn small_patch_is_ignored() {
        let frame = frame_with_patch(200, 200, (10, 10, 20, 20));
        assert_eq!(
            skin_tone_highlight(&frame),
            Highlight {
                region: None,
                zoom: 1.0
            }
        );
    }

    #[test]
    fn box_is_clamped_to_frame() {
        let frame = frame_with_patch(120, 120, (0, 0, 120, 120));
        let region = skin_tone_highlight(&frame).region.expect("region");
        assert_eq!((region.x, region.y), (0, 0));
        assert_eq!((region.width, region.height), (120, 120));
    }

    #[test]
    fn box_near_far_edges_stays_inside_frame() {
        let frame = frame_with_patch(400, 300, (300, 200, 100, 100));
        let region = skin_tone_highlight(&frame).region.expect("region");
        assert_eq!((region.x, region.y), (250, 150));
        assert_eq!(region.x + region.width, 400);
        assert_eq!(region.y + region.height, 300);
    }
}
