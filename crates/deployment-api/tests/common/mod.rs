//! Shared helpers for deployment-api integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use deployment_api::{
    create_router, AppState, BalanceGate, DeploymentStore, MemoryStore, OrchestratorSettings,
};
use protocol_client::{
    CreationResult, EscrowBalance, LeaseQuery, LogOptions, Network, ProtocolClient, ProtocolError,
    Result,
};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt; // for `oneshot`

pub const LEASE_ID: &str = "1042";
pub const PROVIDER_ADDRESS: &str = "0xprovider";
pub const DEFAULT_PROVIDER_URL: &str = "https://provider-proxy.test";
pub const ICL: &str = "version: \"1.0\"\nservices:\n  web:\n    image: nginx:latest\n";

/// Calls that only happen during enrichment
pub const ENRICHMENT_CALLS: [&str; 6] = [
    "get_deployment",
    "get_order_details",
    "get_lease_details",
    "get_lease_status",
    "get_provider_details",
    "get_deployment_logs",
];

/// Protocol client test double with call recording and injectable failures
pub struct StubProtocolClient {
    balance: EscrowBalance,
    creation: Value,
    failing: HashSet<&'static str>,
    hanging: HashSet<&'static str>,
    calls: Mutex<Vec<&'static str>>,
    provider_urls: Mutex<Vec<String>>,
}

impl StubProtocolClient {
    pub fn new() -> Self {
        Self {
            balance: EscrowBalance::new("1500000", "25000000"),
            creation: json!({
                "leaseId": LEASE_ID,
                "transactionHash": "0xfeed",
                "transactionStatus": "success",
            }),
            failing: HashSet::new(),
            hanging: HashSet::new(),
            calls: Mutex::new(Vec::new()),
            provider_urls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_unlocked_balance(mut self, unlocked: &str) -> Self {
        self.balance = EscrowBalance::new("0", unlocked);
        self
    }

    pub fn without_lease_id(mut self) -> Self {
        self.creation = json!({
            "transactionHash": "0xfeed",
            "transactionStatus": "pending",
        });
        self
    }

    /// Make `operation` return a protocol error
    pub fn failing(mut self, operation: &'static str) -> Self {
        self.failing.insert(operation);
        self
    }

    /// Make `operation` never complete
    pub fn hanging(mut self, operation: &'static str) -> Self {
        self.hanging.insert(operation);
        self
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, operation: &str) -> usize {
        self.calls().iter().filter(|c| **c == operation).count()
    }

    pub fn provider_urls(&self) -> Vec<String> {
        self.provider_urls.lock().unwrap().clone()
    }

    async fn enter(&self, operation: &'static str) -> Result<()> {
        self.calls.lock().unwrap().push(operation);

        if self.hanging.contains(operation) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if self.failing.contains(operation) {
            return Err(ProtocolError::Status {
                status: 502,
                message: format!("{} unavailable", operation),
            });
        }
        Ok(())
    }

    fn record_provider_url(&self, provider_url: &str) {
        self.provider_urls
            .lock()
            .unwrap()
            .push(provider_url.to_string());
    }
}

#[async_trait]
impl ProtocolClient for StubProtocolClient {
    async fn get_user_balance(
        &self,
        _token: &str,
        _wallet_address: Option<&str>,
    ) -> Result<EscrowBalance> {
        self.enter("get_user_balance").await?;
        Ok(self.balance.clone())
    }

    async fn create_deployment(
        &self,
        _icl_config: &str,
        provider_url: &str,
    ) -> Result<CreationResult> {
        self.enter("create_deployment").await?;
        self.record_provider_url(provider_url);
        Ok(serde_json::from_value(self.creation.clone())?)
    }

    async fn get_deployment(&self, lease_id: &str, provider_url: &str) -> Result<Value> {
        self.enter("get_deployment").await?;
        self.record_provider_url(provider_url);
        Ok(json!({
            "leaseId": lease_id,
            "status": "running",
            "forwarded_ports": [{"port": 80, "as": 31080}],
        }))
    }

    async fn update_deployment(
        &self,
        lease_id: &str,
        _icl_config: &str,
        _provider_url: &str,
    ) -> Result<Value> {
        self.enter("update_deployment").await?;
        Ok(json!({"leaseId": lease_id, "updated": true}))
    }

    async fn get_order_details(&self, lease_id: &str) -> Result<Value> {
        self.enter("get_order_details").await?;
        Ok(json!({"orderId": lease_id, "state": "matched"}))
    }

    async fn get_lease_details(&self, lease_id: &str) -> Result<Value> {
        self.enter("get_lease_details").await?;
        Ok(serde_json::from_str(&format!(
            r#"{{
                "leaseId": "{}",
                "providerAddress": "{}",
                "status": "ACTIVE",
                "duration": "1h",
                "totalCost": 123456789012345678901234
            }}"#,
            lease_id, PROVIDER_ADDRESS
        ))?)
    }

    async fn get_lease_status(&self, _lease_id: &str) -> Result<Value> {
        self.enter("get_lease_status").await?;
        Ok(json!("ACTIVE"))
    }

    async fn get_provider_details(&self, provider_address: &str) -> Result<Value> {
        self.enter("get_provider_details").await?;
        Ok(json!({"address": provider_address, "region": "us-east"}))
    }

    async fn get_deployment_logs(
        &self,
        _lease_id: &str,
        _provider_url: &str,
        options: &LogOptions,
    ) -> Result<Value> {
        self.enter("get_deployment_logs").await?;
        Ok(json!({"lines": ["booted"], "endLine": options.end_line}))
    }

    async fn close_deployment(&self, lease_id: &str) -> Result<Value> {
        self.enter("close_deployment").await?;
        Ok(json!({"leaseId": lease_id, "closed": true}))
    }

    async fn get_leases_by_state(&self, query: &LeaseQuery) -> Result<Value> {
        self.enter("get_leases_by_state").await?;
        Ok(json!({
            "state": query.state,
            "page": query.page,
            "pageSize": query.page_size,
            "leases": [LEASE_ID],
        }))
    }
}

/// Router wired to a stub client and a fresh in-memory store
pub struct TestApp {
    pub router: Router,
    pub client: Arc<StubProtocolClient>,
    pub store: Arc<MemoryStore>,
}

pub fn settings(min_unlocked: u128) -> OrchestratorSettings {
    OrchestratorSettings {
        provider_proxy_url: DEFAULT_PROVIDER_URL.to_string(),
        balance_gate: BalanceGate::new("USDT", None, min_unlocked),
        protocol_timeout: Duration::from_millis(200),
    }
}

pub fn test_app(client: StubProtocolClient) -> TestApp {
    test_app_with(client, settings(0))
}

pub fn test_app_with(client: StubProtocolClient, settings: OrchestratorSettings) -> TestApp {
    let client = Arc::new(client);
    let store = Arc::new(MemoryStore::new());

    let state = AppState::new(
        client.clone(),
        store.clone() as Arc<dyn DeploymentStore>,
        settings,
        Network::Testnet,
    );

    TestApp {
        router: create_router(state),
        client,
        store,
    }
}

pub async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };

    (status, json)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, body: &Value) -> Request<Body> {
    json_request("POST", uri, body)
}

pub fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method(method)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(body).unwrap()))
        .unwrap()
}

pub fn deployment_body(name: &str) -> Value {
    json!({
        "name": name,
        "iclConfig": ICL,
        "providerUrl": "https://provider.example",
    })
}
