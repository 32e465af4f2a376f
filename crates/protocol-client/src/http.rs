//! REST client for the protocol gateway

use async_trait::async_trait;
use reqwest::{RequestBuilder, Url};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::{
    error::{ProtocolError, Result},
    models::{CreationResult, EscrowBalance, LeaseQuery, LogOptions},
    network::Network,
    ProtocolClient,
};

/// Header carrying the network selector on every gateway request
pub const NETWORK_HEADER: &str = "X-Network";

/// Client for a protocol gateway that signs and submits on our behalf
pub struct HttpProtocolClient {
    base_url: Url,
    network: Network,
    credential: SecretString,
    client: reqwest::Client,
}

impl HttpProtocolClient {
    /// Create a new gateway client
    ///
    /// `timeout` bounds every request end to end.
    pub fn new(
        base_url: &str,
        network: Network,
        credential: SecretString,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| ProtocolError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        if base_url.cannot_be_a_base() {
            return Err(ProtocolError::InvalidUrl(base_url.to_string()));
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            network,
            credential,
            client,
        })
    }

    pub fn network(&self) -> Network {
        self.network
    }

    /// Build an endpoint URL, percent-encoding each segment
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send(&self, request: RequestBuilder) -> Result<Value> {
        let response = request
            .bearer_auth(self.credential.expose_secret())
            .header(NETWORK_HEADER, self.network.as_str())
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            return Err(ProtocolError::Status {
                status: status.as_u16(),
                message: error_message(&body, status),
            });
        }

        if body.is_empty() {
            return Ok(Value::Null);
        }

        Ok(serde_json::from_slice(&body)?)
    }

    async fn get(&self, segments: &[&str]) -> Result<Value> {
        let url = self.endpoint(segments);
        debug!("GET {}", url);
        self.send(self.client.get(url)).await
    }
}

/// Pull a readable message out of a gateway error body
fn error_message(body: &[u8], status: reqwest::StatusCode) -> String {
    if let Ok(value) = serde_json::from_slice::<Value>(body) {
        for key in ["message", "error"] {
            if let Some(message) = value.get(key).and_then(Value::as_str) {
                return message.to_string();
            }
        }
    }

    let text = String::from_utf8_lossy(body).trim().to_string();
    if text.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("Unknown error")
            .to_string()
    } else {
        text
    }
}

#[async_trait]
impl ProtocolClient for HttpProtocolClient {
    async fn get_user_balance(
        &self,
        token: &str,
        wallet_address: Option<&str>,
    ) -> Result<EscrowBalance> {
        let url = self.endpoint(&["escrow", "balance"]);
        debug!("GET {} token={}", url, token);

        let mut request = self.client.get(url).query(&[("token", token)]);
        if let Some(wallet) = wallet_address {
            request = request.query(&[("wallet", wallet)]);
        }

        let value = self.send(request).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn create_deployment(
        &self,
        icl_config: &str,
        provider_url: &str,
    ) -> Result<CreationResult> {
        let url = self.endpoint(&["deployments"]);
        debug!("POST {}", url);

        let value = self
            .send(self.client.post(url).json(&json!({
                "iclConfig": icl_config,
                "providerProxyUrl": provider_url,
            })))
            .await?;

        match value {
            Value::Object(fields) => Ok(CreationResult::new(fields)),
            other => Err(ProtocolError::InvalidResponse(format!(
                "expected deployment creation object, got {}",
                other
            ))),
        }
    }

    async fn get_deployment(&self, lease_id: &str, provider_url: &str) -> Result<Value> {
        let url = self.endpoint(&["deployments", lease_id]);
        debug!("GET {}", url);

        self.send(
            self.client
                .get(url)
                .query(&[("providerProxyUrl", provider_url)]),
        )
        .await
    }

    async fn update_deployment(
        &self,
        lease_id: &str,
        icl_config: &str,
        provider_url: &str,
    ) -> Result<Value> {
        let url = self.endpoint(&["deployments", lease_id]);
        debug!("PUT {}", url);

        self.send(self.client.put(url).json(&json!({
            "iclConfig": icl_config,
            "providerProxyUrl": provider_url,
        })))
        .await
    }

    async fn get_order_details(&self, lease_id: &str) -> Result<Value> {
        self.get(&["orders", lease_id]).await
    }

    async fn get_lease_details(&self, lease_id: &str) -> Result<Value> {
        self.get(&["leases", lease_id]).await
    }

    async fn get_lease_status(&self, lease_id: &str) -> Result<Value> {
        self.get(&["leases", lease_id, "status"]).await
    }

    async fn get_provider_details(&self, provider_address: &str) -> Result<Value> {
        self.get(&["providers", provider_address]).await
    }

    async fn get_deployment_logs(
        &self,
        lease_id: &str,
        provider_url: &str,
        options: &LogOptions,
    ) -> Result<Value> {
        let url = self.endpoint(&["deployments", lease_id, "logs"]);
        debug!("GET {}", url);

        self.send(
            self.client
                .get(url)
                .query(&[("providerProxyUrl", provider_url)])
                .query(options),
        )
        .await
    }

    async fn close_deployment(&self, lease_id: &str) -> Result<Value> {
        let url = self.endpoint(&["deployments", lease_id, "close"]);
        debug!("POST {}", url);
        self.send(self.client.post(url)).await
    }

    async fn get_leases_by_state(&self, query: &LeaseQuery) -> Result<Value> {
        let url = self.endpoint(&["leases"]);
        debug!("GET {} state={}", url, query.state);
        self.send(self.client.get(url).query(query)).await
    }
}
