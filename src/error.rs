use thiserror::Error;

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Reorder error: {0}")]
    Reorder(#[from] ReorderError),

    #[error("Normalization error: {0}")]
    Normalize(#[from] NormalizeError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Upload error: {details}")]
    Upload { details: String },

    #[error("System error: {message}")]
    System { message: String },
}

impl MediaError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }
}

/// Failures of a camera/microphone capture session
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("Device access denied: {details}")]
    DeviceAccessDenied { details: String },

    #[error("Device lost during capture: {details}")]
    DeviceLost { details: String },

    #[error("No frame has been delivered by the device yet")]
    NoActiveFrame,

    #[error("Operation '{operation}' is not valid while the session is {mode}")]
    InvalidState {
        operation: &'static str,
        mode: &'static str,
    },

    #[error("Encoding failed: {details}")]
    Encoding { details: String },
}

/// Precondition violations of the reorder engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReorderError {
    #[error("Index {index} out of range for list of length {len}")]
    IndexOutOfRange { index: usize, len: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("Image decode failed: {details}")]
    DecodeFailed { details: String },

    #[error("JPEG encode failed: {details}")]
    EncodeFailed { details: String },

    #[error("Image of {size} bytes exceeds the {limit} byte upload limit")]
    TooLarge { size: usize, limit: usize },
}

/// Key/value store failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Quota exceeded: write needs {needed} bytes, {available} available")]
    QuotaExceeded { needed: usize, available: usize },

    #[error("Store backend failure: {details}")]
    Backend { details: String },
}

impl StoreError {
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, StoreError::QuotaExceeded { .. })
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    #[error("Every persistence fallback failed; stored state left untouched")]
    Exhausted,

    #[error("No user is signed in")]
    NotSignedIn,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Serialization failed: {details}")]
    Serialization { details: String },
}

impl From<serde_json::Error> for PersistenceError {
    fn from(e: serde_json::Error) -> Self {
        PersistenceError::Serialization {
            details: e.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MediaError>;
