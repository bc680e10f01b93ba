//! Shared domain types for the FRAMES attendance kiosk.

pub mod attendance;
pub mod capture;
pub mod config;
pub mod events;
pub mod telemetry;

mod errors;

pub use errors::{FramesError, Result};
