use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Gateway returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("JSON error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid gateway URL: {0}")]
    InvalidUrl(String),

    #[error("Unknown network: {0} (expected testnet or mainnet)")]
    UnknownNetwork(String),
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
