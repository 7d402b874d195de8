use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid event {id}: {reason}")]
    InvalidEvent { id: String, reason: String },

    #[error("Crypto error: {0}")]
    Crypto(#[from] nsite_crypto::CryptoError),

    #[error("Network error: {0}")]
    Network(String),
}

pub type Result<T> = std::result::Result<T, RelayError>;
