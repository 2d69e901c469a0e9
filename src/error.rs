//! Error types for the Agua IOT client

use thiserror::Error;

/// Result type alias for Agua IOT operations
pub type Result<T> = std::result::Result<T, AguaIotError>;

/// Comprehensive error types for Agua IOT client operations
#[derive(Error, Debug)]
pub enum AguaIotError {
    /// Transport-level failures (DNS, TLS, connect, timeout)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Non-2xx HTTP responses, with a truncated body snippet
    #[error("HTTP status {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// No usable registers map for a device
    #[error("No registers map available: {0}")]
    NoRegistersMap(String),

    /// Register key not present in the loaded registers map
    #[error("Unknown register: {0}")]
    UnknownRegister(String),

    /// Buffer payload the codec cannot decode
    #[error("Malformed buffer: {0}")]
    MalformedBuffer(String),

    /// Job submission responses missing the request identifier
    #[error("No job id in response: {0}")]
    NoJobId(String),

    /// Job polling exhausted its attempt budget
    #[error("Job did not complete: {0}")]
    JobTimeout(String),

    /// Operation the device's registers map does not support
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing errors
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AguaIotError {
    /// Create a transport error
    pub fn transport<S: Into<String>>(msg: S) -> Self {
        Self::Transport(msg.into())
    }

    /// Create an HTTP status error
    pub fn http_status<S: Into<String>>(status: u16, body: S) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// Create an authentication error
    pub fn authentication<S: Into<String>>(msg: S) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a missing-registers-map error
    pub fn no_registers_map<S: Into<String>>(msg: S) -> Self {
        Self::NoRegistersMap(msg.into())
    }

    /// Create an unknown-register error
    pub fn unknown_register<S: Into<String>>(msg: S) -> Self {
        Self::UnknownRegister(msg.into())
    }

    /// Create a malformed-buffer error
    pub fn malformed_buffer<S: Into<String>>(msg: S) -> Self {
        Self::MalformedBuffer(msg.into())
    }

    /// Create a missing-job-id error
    pub fn no_job_id<S: Into<String>>(msg: S) -> Self {
        Self::NoJobId(msg.into())
    }

    /// Create a job timeout error
    pub fn job_timeout<S: Into<String>>(msg: S) -> Self {
        Self::JobTimeout(msg.into())
    }

    /// Create an unsupported-operation error
    pub fn unsupported<S: Into<String>>(msg: S) -> Self {
        Self::Unsupported(msg.into())
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            AguaIotError::Transport(_) | AguaIotError::JobTimeout(_) | AguaIotError::Http(_) => {
                true
            }
            AguaIotError::HttpStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Check if error indicates authentication issue
    pub fn is_auth_error(&self) -> bool {
        match self {
            AguaIotError::Authentication(_) => true,
            AguaIotError::HttpStatus { status, .. } => *status == 401 || *status == 403,
            _ => false,
        }
    }
}
