use thiserror::Error;

#[derive(Error, Debug)]
pub enum RestError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Rest service '{service}' must declare a base path")]
    MissingBasePath { service: String },

    #[error("Keystore not found: {path}")]
    KeystoreNotFound { path: String },

    #[error("TLS setup failed: {message}")]
    TlsError { message: String },

    #[error("Operation '{operation}' has no route (path) attached")]
    UnroutedOperation { operation: String },

    #[error("Operation '{operation}' expects an argument for placeholder {placeholder}, got {given} argument(s)")]
    MissingArgument {
        operation: String,
        placeholder: String,
        given: usize,
    },

    #[error("Server error: {message}")]
    ServerError { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

/// 錯誤分類，對應 Configuration / CallContract / Transport / Decode 四種失敗
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    CallContract,
    Transport,
    Decode,
    Io,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl RestError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            RestError::Transport(_) | RestError::ServerError { .. } => ErrorCategory::Transport,
            RestError::IoError(_) => ErrorCategory::Io,
            RestError::SerializationError(_) => ErrorCategory::Decode,
            RestError::UnroutedOperation { .. } | RestError::MissingArgument { .. } => {
                ErrorCategory::CallContract
            }
            RestError::MissingBasePath { .. }
            | RestError::KeystoreNotFound { .. }
            | RestError::TlsError { .. }
            | RestError::ConfigError { .. }
            | RestError::MissingConfigError { .. }
            | RestError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Decode => ErrorSeverity::Low,
            ErrorCategory::Transport => ErrorSeverity::Medium,
            ErrorCategory::CallContract => ErrorSeverity::High,
            ErrorCategory::Configuration | ErrorCategory::Io => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            RestError::MissingBasePath { .. } => "Give the service definition a base path",
            RestError::KeystoreNotFound { .. } => {
                "Create the PEM keystore first or point ssl.keystore at an existing file"
            }
            RestError::TlsError { .. } => "Check that the keystore holds a certificate chain and a private key",
            RestError::UnroutedOperation { .. } => "Attach a path to the operation in its service definition",
            RestError::MissingArgument { .. } => "Pass one argument per path placeholder",
            RestError::Transport(_) | RestError::ServerError { .. } => {
                "Check that the remote address is reachable"
            }
            RestError::SerializationError(_) => "Check the response body against the declared return kind",
            RestError::IoError(_) => "Check file permissions and paths",
            RestError::ConfigError { .. }
            | RestError::MissingConfigError { .. }
            | RestError::InvalidConfigValueError { .. } => "Fix the configuration file and retry",
        }
    }

    /// 給終端使用者看的簡短訊息
    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::CallContract => format!("Invalid call: {}", self),
            ErrorCategory::Transport => format!("Remote service unavailable: {}", self),
            ErrorCategory::Decode => format!("Unreadable response: {}", self),
            ErrorCategory::Io => format!("File system problem: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, RestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_follows_taxonomy() {
        let err = RestError::MissingBasePath {
            service: "demo.Items".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert_eq!(err.severity(), ErrorSeverity::Critical);

        let err = RestError::UnroutedOperation {
            operation: "lookup".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::CallContract);
        assert!(err.to_string().contains("lookup"));
        assert!(err.user_friendly_message().starts_with("Invalid call"));
    }
}
