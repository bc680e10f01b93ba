//! Recognition backend client and in-process event publication.

mod bus;
mod client;

use frames_types::FramesError;

pub use bus::{EventPublisher, LocalBus};
pub use client::{
    interpret_response, BackendHealth, HttpRecognitionClient, RecognitionClient,
    SubmissionOutcome,
};

pub fn network_error(message: impl Into<String>) -> FramesError {
    FramesError::Network(message.into())
}
