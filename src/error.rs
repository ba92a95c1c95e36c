//! Error types for the relay.

/// Runtime failures, rolled up from the per-concern enums below.
/// [`ConfigError`] stays separate; it only occurs at startup.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Messaging error: {0}")]
    Messaging(#[from] MessagingError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),
}

/// Configuration-related errors. All of these fail startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// LINE Messaging API errors.
#[derive(Debug, thiserror::Error)]
pub enum MessagingError {
    #[error("Profile lookup failed for {user_id}: {reason}")]
    ProfileLookup { user_id: String, reason: String },

    #[error("Reply send failed: {reason}")]
    ReplyFailed { reason: String },

    #[error("Media download failed for message {message_id}: {reason}")]
    DownloadFailed { message_id: String, reason: String },
}

/// Notion API errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store request {op} failed: {reason}")]
    RequestFailed { op: &'static str, reason: String },

    #[error("Store request {op} rejected ({status}): {message}")]
    Api {
        op: &'static str,
        status: u16,
        message: String,
    },

    #[error("Malformed store response for {op}: {reason}")]
    MalformedResponse { op: &'static str, reason: String },

    #[error("Database schema mismatch: {0}")]
    SchemaMismatch(String),
}

/// Image-rehost errors.
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("Image upload failed: {reason}")]
    UploadFailed { reason: String },

    #[error("Malformed upload response: {reason}")]
    MalformedResponse { reason: String },
}
