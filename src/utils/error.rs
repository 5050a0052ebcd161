use crate::domain::model::FailureKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClassifyError {
    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Encoding error: {message}")]
    EncodingError { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid configuration value for '{field}' ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Precondition failed: {message}")]
    PreconditionError { message: String },

    #[error("Remote service error: {message}")]
    RemoteError { status: Option<u16>, message: String },

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Failed to parse model response: {message}")]
    ParseError { message: String, raw: String },

    #[error("Classification was cancelled")]
    CancelledError,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// 錯誤嚴重程度，決定 CLI 的退出碼
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Low => 0,
            Self::High => 1,
            Self::Medium => 2,
            Self::Critical => 3,
        }
    }
}

impl FailureKind {
    pub fn severity(self) -> ErrorSeverity {
        match self {
            Self::Encoding | Self::Remote | Self::Cancelled => ErrorSeverity::Medium,
            Self::Validation | Self::Precondition | Self::Parse => ErrorSeverity::High,
            Self::Configuration => ErrorSeverity::Critical,
        }
    }
}

impl ClassifyError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }

    pub fn encoding(message: impl Into<String>) -> Self {
        Self::EncodingError {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    pub fn remote(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::RemoteError {
            status,
            message: message.into(),
        }
    }

    pub fn category(&self) -> FailureKind {
        match self {
            Self::ValidationError { .. } => FailureKind::Validation,
            Self::EncodingError { .. } => FailureKind::Encoding,
            Self::ConfigError { .. } | Self::InvalidConfigValueError { .. } => {
                FailureKind::Configuration
            }
            Self::PreconditionError { .. } => FailureKind::Precondition,
            Self::RemoteError { .. } | Self::ApiError(_) => FailureKind::Remote,
            Self::ParseError { .. } | Self::SerializationError(_) => FailureKind::Parse,
            Self::CancelledError => FailureKind::Cancelled,
            // 讀檔失敗只會發生在編碼前
            Self::IoError(_) => FailureKind::Encoding,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        self.category().severity()
    }

    /// Remote 與 Encoding 錯誤可以重試整個流程
    pub fn is_retryable(&self) -> bool {
        self.severity() == ErrorSeverity::Medium && !matches!(self, Self::CancelledError)
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::ValidationError { message } => message.clone(),
            Self::EncodingError { message } => format!("Could not read the image: {}", message),
            Self::ConfigError { message } => message.clone(),
            Self::InvalidConfigValueError { field, reason, .. } => {
                format!("Setting '{}' is invalid: {}", field, reason)
            }
            Self::PreconditionError { message } => message.clone(),
            Self::RemoteError {
                status: Some(status),
                message,
            } => format!("The classification service returned {}: {}", status, message),
            Self::RemoteError { status: None, message } => {
                format!("The classification service could not be reached: {}", message)
            }
            Self::ApiError(e) if e.is_timeout() => {
                "The classification service did not answer in time".to_string()
            }
            Self::ApiError(e) => format!("The classification service could not be reached: {}", e),
            Self::ParseError { .. } | Self::SerializationError(_) => {
                "The classification service returned an unreadable answer".to_string()
            }
            Self::CancelledError => "Classification was cancelled".to_string(),
            Self::IoError(e) => format!("Could not read the image: {}", e),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            FailureKind::Validation => {
                "Pick a JPEG, PNG, WebP, GIF or BMP image no larger than 4MB"
            }
            FailureKind::Encoding => "Check the file is readable and try again",
            FailureKind::Configuration => {
                "Set GEMINI_API_KEY (or the [classifier] section of the config file) and check the endpoint settings"
            }
            FailureKind::Precondition => "Provide both the image data and its MIME type",
            FailureKind::Remote => "Check network access and the API key, then retry",
            FailureKind::Parse => "Retry the classification; the model answer was not valid JSON",
            FailureKind::Cancelled => "Run the classification again when ready",
        }
    }
}

pub type Result<T> = std::result::Result<T, ClassifyError>;
