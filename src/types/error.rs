use thiserror::Error;

/// salesdash error types
#[derive(Error, Debug)]
pub enum DashError {
    /// Transport-level failure talking to the gateway
    #[error("http error: {0}")]
    Http(String),

    /// Gateway answered with a non-success status
    #[error("gateway error ({status}): {message}")]
    Gateway { status: u16, message: String },

    /// Response body could not be decoded
    #[error("decode error: {0}")]
    Decode(String),

    /// File I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Sign-in / sign-out failure
    #[error("auth error: {0}")]
    Auth(String),

    /// Stored session could not be read or written
    #[error("session error: {0}")]
    Session(String),

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),

    /// User input rejected before reaching the gateway
    #[error("{0}")]
    Validation(String),

    /// CSV writer failure
    #[error("export error: {0}")]
    Export(String),
}

impl DashError {
    /// Message text as reported by the gateway (or the full display text otherwise)
    pub fn message(&self) -> String {
        match self {
            Self::Gateway { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Result type alias for salesdash
pub type Result<T> = std::result::Result<T, DashError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DashError::Decode("invalid json".into());
        assert_eq!(err.to_string(), "decode error: invalid json");
    }

    #[test]
    fn test_gateway_error_display() {
        let err = DashError::Gateway {
            status: 403,
            message: "permission denied for table Agent".into(),
        };
        assert_eq!(
            err.to_string(),
            "gateway error (403): permission denied for table Agent"
        );
        assert_eq!(err.message(), "permission denied for table Agent");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: DashError = io_err.into();
        assert!(err.to_string().contains("io error"));
    }

    #[test]
    fn test_validation_error_is_bare_message() {
        let err = DashError::Validation("Invalid email format".into());
        assert_eq!(err.to_string(), "Invalid email format");
    }
}
