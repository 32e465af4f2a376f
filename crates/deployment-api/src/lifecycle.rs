//! Operations on deployments that already hold a lease
//!
//! None of these touch the local record store. Closing a lease in particular
//! leaves the matching record at `pending`.

use protocol_client::EscrowBalance;
use serde_json::Value;
use tracing::{error, info};

use crate::error::{DeployError, Result};
use crate::models::{resolve_provider_url, LeasesQuery, UpdateDeploymentRequest};
use crate::orchestrator::Orchestrator;
use crate::sanitize::sanitize;

fn require_lease_id(lease_id: &str) -> Result<&str> {
    let lease_id = lease_id.trim();
    if lease_id.is_empty() {
        return Err(DeployError::Validation(
            "leaseId must not be empty".to_string(),
        ));
    }
    Ok(lease_id)
}

impl Orchestrator {
    /// Current escrow balance for the configured token
    pub async fn escrow_balance(&self) -> Result<EscrowBalance> {
        self.settings
            .balance_gate
            .fetch(self.client.as_ref(), self.settings.protocol_timeout)
            .await
    }

    /// Re-fetch the deployment detail for a lease
    pub async fn refresh(&self, lease_id: &str, provider_url: Option<&str>) -> Result<Value> {
        let lease_id = require_lease_id(lease_id)?;
        let provider_url = resolve_provider_url(provider_url, &self.settings.provider_proxy_url);

        info!("Refreshing deployment for lease {}", lease_id);
        let detail = self
            .call(
                "deployment detail",
                self.client.get_deployment(lease_id, &provider_url),
            )
            .await?;

        Ok(sanitize(&detail))
    }

    /// Submit a modified ICL document for a running lease
    pub async fn update(&self, lease_id: &str, request: UpdateDeploymentRequest) -> Result<Value> {
        let lease_id = require_lease_id(lease_id)?;
        request.validate()?;
        let provider_url = resolve_provider_url(
            request.provider_url.as_deref(),
            &self.settings.provider_proxy_url,
        );

        info!("Updating deployment for lease {}", lease_id);
        let result = self
            .call(
                "deployment update",
                self.client
                    .update_deployment(lease_id, &request.icl_config, &provider_url),
            )
            .await
            .inspect_err(|e| error!("Lease {} was not updated: {}", lease_id, e))?;

        Ok(sanitize(&result))
    }

    /// Terminate a lease
    pub async fn close(&self, lease_id: &str) -> Result<Value> {
        let lease_id = require_lease_id(lease_id)?;

        info!("Closing lease {}", lease_id);
        let result = self
            .call("lease close", self.client.close_deployment(lease_id))
            .await
            .inspect_err(|e| error!("Lease {} was not closed: {}", lease_id, e))?;

        info!("Lease {} closed", lease_id);
        Ok(sanitize(&result))
    }

    /// Page through leases in a given state
    pub async fn leases(&self, query: LeasesQuery) -> Result<Value> {
        let query = query.into_lease_query()?;

        info!(
            "Listing {} leases (page {}, size {})",
            query.state, query.page, query.page_size
        );
        let page = self
            .call("lease listing", self.client.get_leases_by_state(&query))
            .await?;

        Ok(sanitize(&page))
    }
}
