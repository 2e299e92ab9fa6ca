use thiserror::Error;

pub const GENERIC_FAILURE_MESSAGE: &str = "An error occurred. Please try again.";
pub const NETWORK_FAILURE_MESSAGE: &str = "Network error. Please try again.";

#[derive(Error, Debug)]
pub enum ConsoleError {
    #[error("No credential stored; login required")]
    NoCredential,

    #[error("Login rejected: {message}")]
    InvalidCredential { message: String },

    #[error("Session expired")]
    ExpiredSession,

    #[error("Network failure: {message}")]
    NetworkFailure { message: String },

    #[error("API request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected response: {message}")]
    UnexpectedResponse { message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Session,
    Network,
    Server,
    Configuration,
    Input,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ConsoleError {
    /// Maps a transport-level failure; the reqwest error itself is only logged.
    pub fn network(err: reqwest::Error) -> Self {
        tracing::debug!("transport error: {}", err);
        if err.is_decode() {
            return ConsoleError::UnexpectedResponse {
                message: err.to_string(),
            };
        }
        ConsoleError::NetworkFailure {
            message: NETWORK_FAILURE_MESSAGE.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ConsoleError::ValidationError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            ConsoleError::NoCredential
            | ConsoleError::InvalidCredential { .. }
            | ConsoleError::ExpiredSession => ErrorCategory::Session,
            ConsoleError::NetworkFailure { .. } => ErrorCategory::Network,
            ConsoleError::Api { .. } | ConsoleError::UnexpectedResponse { .. } => {
                ErrorCategory::Server
            }
            ConsoleError::ConfigError { .. }
            | ConsoleError::ConfigValidationError { .. }
            | ConsoleError::InvalidConfigValueError { .. }
            | ConsoleError::MissingConfigError { .. } => ErrorCategory::Configuration,
            ConsoleError::ValidationError { .. } => ErrorCategory::Input,
            ConsoleError::IoError(_) | ConsoleError::SerializationError(_) => {
                ErrorCategory::System
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Input => ErrorSeverity::Low,
            ErrorCategory::Network | ErrorCategory::Server => ErrorSeverity::Medium,
            ErrorCategory::Session | ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// The message shown to the operator. Transport details never appear here.
    pub fn user_friendly_message(&self) -> String {
        match self {
            ConsoleError::NoCredential => "You are not logged in.".to_string(),
            ConsoleError::InvalidCredential { message } => message.clone(),
            ConsoleError::ExpiredSession => {
                "Your session has expired. Please login again.".to_string()
            }
            ConsoleError::NetworkFailure { message } => message.clone(),
            ConsoleError::Api { message, .. } => message.clone(),
            ConsoleError::UnexpectedResponse { .. } => GENERIC_FAILURE_MESSAGE.to_string(),
            ConsoleError::ValidationError { message } => message.clone(),
            ConsoleError::ConfigError { .. }
            | ConsoleError::ConfigValidationError { .. }
            | ConsoleError::InvalidConfigValueError { .. }
            | ConsoleError::MissingConfigError { .. } => format!("Invalid configuration: {}", self),
            ConsoleError::IoError(e) => format!("File system error: {}", e),
            ConsoleError::SerializationError(_) => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            ConsoleError::NoCredential | ConsoleError::ExpiredSession => {
                "Run `acme-console login` to start a new session"
            }
            ConsoleError::InvalidCredential { .. } => "Check the username and password",
            ConsoleError::NetworkFailure { .. } => {
                "Check the API base URL and your network connection, then retry"
            }
            ConsoleError::Api { .. } | ConsoleError::UnexpectedResponse { .. } => {
                "Retry later; contact the backend administrator if it persists"
            }
            ConsoleError::ValidationError { .. } => "Correct the highlighted input and resubmit",
            ConsoleError::ConfigError { .. }
            | ConsoleError::ConfigValidationError { .. }
            | ConsoleError::InvalidConfigValueError { .. }
            | ConsoleError::MissingConfigError { .. } => "Fix the configuration file or CLI flags",
            ConsoleError::IoError(_) | ConsoleError::SerializationError(_) => {
                "Check file permissions for the token file and output directory"
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, ConsoleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_errors_are_high_severity() {
        assert_eq!(ConsoleError::ExpiredSession.severity(), ErrorSeverity::High);
        assert_eq!(ConsoleError::NoCredential.category(), ErrorCategory::Session);
    }

    #[test]
    fn test_invalid_credential_message_is_verbatim() {
        let err = ConsoleError::InvalidCredential {
            message: "Invalid credentials".to_string(),
        };
        assert_eq!(err.user_friendly_message(), "Invalid credentials");
    }

    #[test]
    fn test_validation_is_low_severity() {
        let err = ConsoleError::validation("Price is required");
        assert_eq!(err.severity(), ErrorSeverity::Low);
        assert_eq!(err.user_friendly_message(), "Price is required");
    }
}
