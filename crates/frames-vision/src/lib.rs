//! Frame sampling and cosmetic on-screen feedback.

mod highlight;
mod sampler;

use frames_types::FramesError;

pub use highlight::{skin_tone_highlight, Highlight, HIGHLIGHT_ZOOM};
pub use sampler::{FrameSampler, JPEG_DATA_URL_PREFIX};

pub fn vision_error(message: impl Into<String>) -> FramesError {
    FramesError::Vision(message.into())
}
