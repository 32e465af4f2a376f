//! Deployment creation sequence
//!
//! Creation runs in a fixed order and stops at the first fatal step:
//!
//! 1. validate the request (no external calls on failure)
//! 2. check the escrow balance (no mutating calls on failure)
//! 3. store a pending local record
//! 4. submit the ICL document to the protocol
//! 5. if a lease was opened, fetch enrichment details concurrently; each
//!    fetch may fail on its own without failing the request
//! 6. assemble and sanitize the combined view
//!
//! The record is written before submission so a failed or hung submission
//! still leaves a trace of the attempt.

use protocol_client::{LogOptions, ProtocolClient};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::balance::BalanceGate;
use crate::config::{Config, DEFAULT_PROVIDER_PROXY_URL, DEFAULT_PROTOCOL_TIMEOUT_SECS};
use crate::error::{DeployError, Result};
use crate::models::{
    resolve_provider_url, CombinedDeploymentView, DeploymentRequest, Enrichment,
    EnrichmentDetails, NewDeployment,
};
use crate::sanitize::sanitize;
use crate::storage::DeploymentStore;

/// Log lines fetched while enriching a new deployment
pub const ENRICHMENT_LOG_LINES: u64 = 100;

/// Lease detail fields that may carry the provider's address
const PROVIDER_ADDRESS_KEYS: [&str; 2] = ["providerAddress", "provider"];

/// Tunables for the orchestrator
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Provider proxy used when a request does not name one
    pub provider_proxy_url: String,

    pub balance_gate: BalanceGate,

    /// Upper bound on any single protocol call
    pub protocol_timeout: Duration,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            provider_proxy_url: DEFAULT_PROVIDER_PROXY_URL.to_string(),
            balance_gate: BalanceGate::new("USDT", None, 0),
            protocol_timeout: Duration::from_secs(DEFAULT_PROTOCOL_TIMEOUT_SECS),
        }
    }
}

impl From<&Config> for OrchestratorSettings {
    fn from(config: &Config) -> Self {
        Self {
            provider_proxy_url: config.provider_proxy_url.clone(),
            balance_gate: BalanceGate::new(
                config.balance_token.clone(),
                config.wallet_address.clone(),
                config.min_unlocked_balance,
            ),
            protocol_timeout: config.protocol_timeout,
        }
    }
}

/// Run a protocol call under `timeout`, naming it in any error
pub(crate) async fn bounded<T, F>(timeout: Duration, operation: &'static str, call: F) -> Result<T>
where
    F: Future<Output = protocol_client::Result<T>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(source)) => Err(DeployError::Protocol { operation, source }),
        Err(_) => Err(DeployError::Timeout {
            operation,
            after: timeout,
        }),
    }
}

/// Sequences deployment creation and lifecycle calls against the protocol
pub struct Orchestrator {
    pub(crate) client: Arc<dyn ProtocolClient>,
    pub(crate) store: Arc<dyn DeploymentStore>,
    pub(crate) settings: OrchestratorSettings,
}

impl Orchestrator {
    pub fn new(
        client: Arc<dyn ProtocolClient>,
        store: Arc<dyn DeploymentStore>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            client,
            store,
            settings,
        }
    }

    pub fn store(&self) -> &Arc<dyn DeploymentStore> {
        &self.store
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    pub(crate) async fn call<T, F>(&self, operation: &'static str, call: F) -> Result<T>
    where
        F: Future<Output = protocol_client::Result<T>>,
    {
        bounded(self.settings.protocol_timeout, operation, call).await
    }

    /// Create a deployment and return the sanitized combined view
    pub async fn create_deployment(&self, request: DeploymentRequest) -> Result<Value> {
        request.validate()?;

        let provider_url = resolve_provider_url(
            request.provider_url.as_deref(),
            &self.settings.provider_proxy_url,
        );

        self.settings
            .balance_gate
            .check(self.client.as_ref(), self.settings.protocol_timeout)
            .await?;

        let record = self
            .store
            .create(NewDeployment {
                name: request.name,
                icl_config: request.icl_config,
                provider_url: provider_url.clone(),
            })
            .await;
        info!("Created pending record {} for {}", record.id, record.name);

        let transaction = self
            .call(
                "deployment creation",
                self.client
                    .create_deployment(&record.icl_config, &provider_url),
            )
            .await
            .inspect_err(|e| error!("Deployment {} was not created: {}", record.id, e))?;

        let enrichment = match transaction.lease_id() {
            Some(lease_id) => {
                info!("Deployment {} opened lease {}", record.id, lease_id);
                self.enrich(&lease_id, &provider_url).await
            }
            None => {
                info!(
                    "Deployment {} returned no lease id, skipping enrichment",
                    record.id
                );
                Enrichment::None
            }
        };

        let view = CombinedDeploymentView::assemble(record, transaction, enrichment);
        Ok(sanitize(&serde_json::to_value(&view)?))
    }

    /// Fetch every enrichment detail for a lease, dropping failures
    async fn enrich(&self, lease_id: &str, provider_url: &str) -> Enrichment {
        let log_options = LogOptions::first(ENRICHMENT_LOG_LINES);

        let (deployment, order, (lease, provider), lease_status, logs) = tokio::join!(
            self.optional(
                lease_id,
                "deployment detail",
                self.client.get_deployment(lease_id, provider_url),
            ),
            self.optional(
                lease_id,
                "order detail",
                self.client.get_order_details(lease_id),
            ),
            self.lease_and_provider(lease_id),
            self.optional(
                lease_id,
                "lease status",
                self.client.get_lease_status(lease_id),
            ),
            self.optional(
                lease_id,
                "deployment logs",
                self.client
                    .get_deployment_logs(lease_id, provider_url, &log_options),
            ),
        );

        let enrichment = Enrichment::from_details(EnrichmentDetails {
            deployment,
            order,
            lease,
            lease_status,
            provider,
            logs,
        });
        info!("Lease {} enrichment: {:?}", lease_id, enrichment.kind());
        enrichment
    }

    /// Lease detail, then the provider it names
    async fn lease_and_provider(&self, lease_id: &str) -> (Option<Value>, Option<Value>) {
        let lease = self
            .optional(
                lease_id,
                "lease detail",
                self.client.get_lease_details(lease_id),
            )
            .await;

        let provider = match lease.as_ref().and_then(provider_address) {
            Some(address) => {
                self.optional(
                    lease_id,
                    "provider detail",
                    self.client.get_provider_details(&address),
                )
                .await
            }
            None => None,
        };

        (lease, provider)
    }

    async fn optional<F>(&self, lease_id: &str, operation: &'static str, call: F) -> Option<Value>
    where
        F: Future<Output = protocol_client::Result<Value>>,
    {
        match self.call(operation, call).await {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Lease {}: {}", lease_id, e);
                None
            }
        }
    }
}

/// Provider address named by a lease detail
fn provider_address(lease: &Value) -> Option<String> {
    PROVIDER_ADDRESS_KEYS
        .iter()
        .filter_map(|key| lease.get(key).and_then(Value::as_str))
        .map(str::trim)
        .find(|address| !address.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol_client::ProtocolError;
    use serde_json::json;

    #[test]
    fn test_provider_address_lookup() {
        assert_eq!(
            provider_address(&json!({"providerAddress": "0xabc"})).as_deref(),
            Some("0xabc")
        );
        assert_eq!(
            provider_address(&json!({"provider": "0xdef", "providerAddress": ""})).as_deref(),
            Some("0xdef")
        );
        assert_eq!(provider_address(&json!({"provider": {"nested": true}})), None);
        assert_eq!(provider_address(&json!("ACTIVE")), None);
    }

    #[tokio::test]
    async fn test_bounded_maps_errors_and_timeouts() {
        let ok = bounded(Duration::from_secs(1), "op", async { Ok::<_, ProtocolError>(5) }).await;
        assert_eq!(ok.unwrap(), 5);

        let failed = bounded(Duration::from_secs(1), "lease detail", async {
            Err::<(), _>(ProtocolError::InvalidResponse("bad".to_string()))
        })
        .await
        .unwrap_err();
        assert!(failed.to_string().starts_with("lease detail failed"));

        let timed_out = bounded(Duration::from_millis(10), "deployment creation", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, ProtocolError>(())
        })
        .await
        .unwrap_err();
        assert!(matches!(
            timed_out,
            DeployError::Timeout { operation: "deployment creation", .. }
        ));
    }
}
