use thiserror::Error;

use crate::services::camera::CameraError;

/// Why the current attempt ended in `StatusKind::Failed`.
///
/// The `Display` text is exactly what the session shows to the user.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    /// Submission attempted with nothing chosen
    #[error("Choose or capture an image first.")]
    NoImage,

    /// Portion multiplier is zero, negative or not a number
    #[error("Portion must be > 0.")]
    InvalidPortion { input: String },

    /// Liveness probe failed (transport error or non-2xx)
    #[error("Error: Cannot reach /health at {base}.")]
    Unreachable { base: String },

    /// Analyze call answered with a non-2xx status
    #[error("Server error {status}")]
    ServerError { status: u16 },

    /// Analyze call failed below HTTP (connect, timeout, bad body)
    #[error("{}", transport_message(.detail))]
    Transport { detail: Option<String> },

    /// Camera could not be opened or a frame could not be encoded
    #[error("Camera error: {0}")]
    Camera(CameraError),
}

fn transport_message(detail: &Option<String>) -> &str {
    detail
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .unwrap_or("Analysis failed")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Liveness,
    Submission,
    Device,
}

impl SessionError {
    pub fn invalid_portion(input: impl Into<String>) -> Self {
        Self::InvalidPortion { input: input.into() }
    }

    pub fn transport(detail: impl Into<String>) -> Self {
        Self::Transport {
            detail: Some(detail.into()),
        }
    }

    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NoImage | Self::InvalidPortion { .. } => ErrorCategory::Validation,
            Self::Unreachable { .. } => ErrorCategory::Liveness,
            Self::ServerError { .. } | Self::Transport { .. } => ErrorCategory::Submission,
            Self::Camera(_) => ErrorCategory::Device,
        }
    }
}

impl From<CameraError> for SessionError {
    fn from(e: CameraError) -> Self {
        Self::Camera(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_messages() {
        assert_eq!(
            SessionError::NoImage.to_string(),
            "Choose or capture an image first."
        );
        assert_eq!(
            SessionError::invalid_portion("-1").to_string(),
            "Portion must be > 0."
        );
        assert_eq!(SessionError::NoImage.category(), ErrorCategory::Validation);
    }

    #[test]
    fn test_unreachable_names_endpoint() {
        let err = SessionError::Unreachable {
            base: "http://localhost:8000".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Error: Cannot reach /health at http://localhost:8000."
        );
        assert_eq!(err.category(), ErrorCategory::Liveness);
    }

    #[test]
    fn test_transport_falls_back_to_generic_message() {
        assert_eq!(
            SessionError::Transport { detail: None }.to_string(),
            "Analysis failed"
        );
        assert_eq!(
            SessionError::Transport {
                detail: Some(String::new())
            }
            .to_string(),
            "Analysis failed"
        );
        assert_eq!(
            SessionError::transport("connection reset").to_string(),
            "connection reset"
        );
    }

    #[test]
    fn test_server_error_contains_status() {
        let err = SessionError::ServerError { status: 500 };
        assert!(err.to_string().contains("500"));
        assert_eq!(err.category(), ErrorCategory::Submission);
    }

    #[test]
    fn test_camera_errors_are_distinguishable() {
        let denied = SessionError::from(CameraError::PermissionDenied);
        let missing = SessionError::from(CameraError::NotFound);
        let busy = SessionError::from(CameraError::InUse);

        assert_eq!(denied.category(), ErrorCategory::Device);
        assert!(denied.to_string().starts_with("Camera error: "));
        assert_ne!(denied.to_string(), missing.to_string());
        assert_ne!(missing.to_string(), busy.to_string());
    }
}
