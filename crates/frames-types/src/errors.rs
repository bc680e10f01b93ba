use thiserror::Error;

pub type Result<T, E = FramesError> = std::result::Result<T, E>;

/// Unified error type covering failure scenarios across subsystems.
#[derive(Debug, Error)]
pub enum FramesError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("camera error: {0}")]
    Camera(String),
    #[error("vision error: {0}")]
    Vision(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("kiosk error: {0}")]
    Kiosk(String),
    #[error("operational error: {0}")]
    Ops(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_subsystem() {
        let err = FramesError::Camera("permission denied".into());
        assert_eq!(err.to_string(), "camera error: permission denied");
        let err = FramesError::Network("connection refused".into());
        assert_eq!(err.to_string(), "network error: connection refused");
    }

    #[test]
    fn anyhow_errors_pass_through_with_context() {
        let source = anyhow::anyhow!("disk full").context("failed to write session");
        let err: FramesError = source.into();
        assert!(matches!(err, FramesError::Other(_)));
        assert_eq!(err.to_string(), "failed to write session");
    }
}
