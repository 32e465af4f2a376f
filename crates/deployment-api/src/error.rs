use protocol_client::{format_base_units, ProtocolError};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeployError {
    #[error("{0}")]
    Validation(String),

    #[error(
        "Insufficient {token} balance in escrow: {} unlocked, at least {} required",
        tokens(.unlocked),
        tokens(.required)
    )]
    InsufficientBalance {
        token: String,
        unlocked: u128,
        required: u128,
    },

    #[error("Malformed escrow balance from protocol: {0:?}")]
    MalformedBalance(String),

    #[error("{operation} failed: {source}")]
    Protocol {
        operation: &'static str,
        #[source]
        source: ProtocolError,
    },

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DeployError>;

fn tokens(units: &u128) -> String {
    format_base_units(*units)
}
