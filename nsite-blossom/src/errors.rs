use thiserror::Error;

#[derive(Error, Debug)]
pub enum BlobError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server {server} responded {status}: {message}")]
    Status {
        server: String,
        status: u16,
        message: String,
    },

    #[error("Hash mismatch: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },

    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Invalid server URL {server}: {reason}")]
    InvalidServer { server: String, reason: String },

    #[error("Authorization error: {0}")]
    Auth(#[from] nsite_crypto::CryptoError),
}

pub type Result<T> = std::result::Result<T, BlobError>;
