use thiserror::Error;

/// Failures reported by a document store backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("document store returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("malformed document {id}: {reason}")]
    Malformed { id: String, reason: String },

    #[error("document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    #[error("failed to encode document: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("{0}")]
    Backend(String),
}

/// Failures of the item operations
#[derive(Debug, Error)]
pub enum ItemError {
    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("item not found: {0}")]
    NotFound(String),

    #[error("user {user_id} is not authorized to modify item {item_id}")]
    NotAuthorized { item_id: String, user_id: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
