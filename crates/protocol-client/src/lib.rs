//! Protocol Client
//!
//! Interface to the decentralized compute protocol: escrow balances,
//! deployment submission, order/lease/provider lookups, logs and teardown.
//! Escrow accounting, bidding and lease enforcement all happen on the
//! protocol side; this crate only describes the calls and carries them.
//!
//! [`ProtocolClient`] is the seam the deployment service depends on.
//! [`HttpProtocolClient`] implements it against a protocol gateway's REST API.

pub mod error;
pub mod http;
pub mod models;
pub mod network;

use async_trait::async_trait;
use serde_json::Value;

pub use error::{ProtocolError, Result};
pub use http::HttpProtocolClient;
pub use models::{
    format_base_units, parse_base_units, CreationResult, EscrowBalance, LeaseQuery, LogOptions,
    TOKEN_DECIMALS,
};
pub use network::Network;

/// Operations the deployment service needs from the compute protocol.
///
/// Detail lookups return the protocol's JSON untouched; their shapes vary
/// between protocol versions and are passed through to callers.
#[async_trait]
pub trait ProtocolClient: Send + Sync {
    /// Escrow balance for `token`, optionally for a specific wallet
    async fn get_user_balance(
        &self,
        token: &str,
        wallet_address: Option<&str>,
    ) -> Result<EscrowBalance>;

    /// Submit an ICL document; the protocol matches it to a provider and
    /// opens a lease
    async fn create_deployment(&self, icl_config: &str, provider_url: &str)
        -> Result<CreationResult>;

    async fn get_deployment(&self, lease_id: &str, provider_url: &str) -> Result<Value>;

    async fn update_deployment(
        &self,
        lease_id: &str,
        icl_config: &str,
        provider_url: &str,
    ) -> Result<Value>;

    async fn get_order_details(&self, lease_id: &str) -> Result<Value>;

    async fn get_lease_details(&self, lease_id: &str) -> Result<Value>;

    async fn get_lease_status(&self, lease_id: &str) -> Result<Value>;

    async fn get_provider_details(&self, provider_address: &str) -> Result<Value>;

    async fn get_deployment_logs(
        &self,
        lease_id: &str,
        provider_url: &str,
        options: &LogOptions,
    ) -> Result<Value>;

    /// Terminate the lease and release its escrow
    async fn close_deployment(&self, lease_id: &str) -> Result<Value>;

    async fn get_leases_by_state(&self, query: &LeaseQuery) -> Result<Value>;
}
