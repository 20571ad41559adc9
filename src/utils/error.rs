use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Store request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("{message}")]
    InvalidRequest { message: String },

    #[error("Store error: {message}")]
    StoreError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl SyncError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::StoreError {
            message: message.into(),
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 呼叫端輸入錯誤，修正後即可重跑
            Self::InvalidRequest { .. } => ErrorSeverity::Low,
            // 外部儲存暫時不可用，upsert 可安全重試
            Self::HttpError(_) | Self::StoreError { .. } => ErrorSeverity::Medium,
            Self::CsvError(_) | Self::SerializationError(_) => ErrorSeverity::High,
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::TomlError(_)
            | Self::IoError(_) => ErrorSeverity::Critical,
        }
    }

    /// RPC 回應使用的 HTTP 狀態碼
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidRequest { .. } => 400,
            _ => 500,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::InvalidRequest { .. } => {
                "Check the action name and supply xmlContent for parse-xml / sync-content"
            }
            Self::HttpError(_) | Self::StoreError { .. } => {
                "Check store connectivity and credentials, then rerun; applied upserts are idempotent"
            }
            Self::CsvError(_) | Self::SerializationError(_) => {
                "Check the snapshot or report files for malformed content"
            }
            Self::IoError(_) => "Check that the input file exists and the output path is writable",
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::TomlError(_) => "Review the configuration file and environment variables",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::InvalidRequest { message } => format!("Invalid request: {}", message),
            Self::HttpError(e) => format!("Could not reach the content store: {}", e),
            Self::StoreError { message } => format!("Content store rejected the request: {}", message),
            Self::MissingConfigError { field } => format!("Missing required setting '{}'", field),
            Self::InvalidConfigValueError { field, reason, .. } => {
                format!("Setting '{}' is invalid: {}", field, reason)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
