use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config YAML: {0}")]
    ParseYaml(#[from] serde_yaml::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Failed to resolve API token: {0}")]
    Secret(#[from] crate::secrets::SecretError),
}

/// Errors raised while building a job-creation payload, before anything is dispatched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Field '{0}' is required")]
    MissingField(&'static str),

    #[error("Invalid source URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Invalid S3 path '{0}': expected 'bucket/key'")]
    InvalidS3Path(String),

    #[error("Unknown job type '{0}'")]
    UnknownJobType(String),

    #[error("Unknown job status '{0}'")]
    UnknownStatus(String),
}

/// Errors returned by the jobs REST API.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    /// The server answered with a non-success status.
    #[error("{message} (HTTP {status}, {code})")]
    Status {
        status: u16,
        code: String,
        message: String,
        request_id: Option<String>,
    },

    /// The request never produced a response.
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    /// The response body did not match the expected shape.
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// The payload was rejected locally before dispatch.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),
}

impl ApiError {
    /// Returns the HTTP status for server-side failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the machine-readable error code.
    pub fn code(&self) -> &str {
        match self {
            ApiError::Status { code, .. } => code,
            ApiError::Network(_) => "NETWORK_ERROR",
            ApiError::Timeout => "TIMEOUT",
            ApiError::Decode(_) => "DECODE_ERROR",
            ApiError::Validation(_) => "VALIDATION_ERROR",
        }
    }

    /// Returns the correlation id reported by the server, if any.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            ApiError::Status { request_id, .. } => request_id.as_deref(),
            _ => None,
        }
    }

    /// Whether repeating the same request could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Status { status, .. } => *status >= 500 || *status == 408 || *status == 429,
            ApiError::Network(_) | ApiError::Timeout => true,
            ApiError::Decode(_) | ApiError::Validation(_) => false,
        }
    }

    /// Human-readable message suitable for a notification.
    pub fn user_message(&self) -> String {
        match self.code() {
            "UNAUTHORIZED" | "TOKEN_EXPIRED" => {
                "Your session has expired. Please sign in again.".to_string()
            }
            "FORBIDDEN" => "You do not have permission to perform this action.".to_string(),
            "NOT_FOUND" => "The requested resource was not found.".to_string(),
            "RATE_LIMIT_EXCEEDED" => {
                "Too many requests. Please wait a moment and try again.".to_string()
            }
            "SERVER_ERROR" => "A server error occurred. Please try again later.".to_string(),
            "NETWORK_ERROR" => {
                "Network connection failed. Please check your internet connection.".to_string()
            }
            "TIMEOUT" => "The request timed out. Please try again.".to_string(),
            _ => match self {
                ApiError::Status { message, .. } if !message.trim().is_empty() => message.clone(),
                ApiError::Validation(e) => e.to_string(),
                ApiError::Decode(_) => "The server returned an unexpected response.".to_string(),
                _ => "An unexpected error occurred".to_string(),
            },
        }
    }
}

/// Extracts the display message for any API failure.
pub fn error_message(error: &ApiError) -> String {
    error.user_message()
}

/// Display-ready snapshot of a failure, kept alongside query state.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ErrorInfo {
    pub message: String,
    pub code: String,
    pub status: Option<u16>,
}

impl From<&ApiError> for ErrorInfo {
    fn from(error: &ApiError) -> Self {
        Self {
            message: error_message(error),
            code: error.code().to_string(),
            status: error.status(),
        }
    }
}
