//! Data models for the deployment service

use chrono::{DateTime, Utc};
use protocol_client::{CreationResult, LeaseQuery};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{DeployError, Result};

/// Status every local record is created with
pub const PENDING_STATUS: &str = "pending";

/// Request to create a deployment
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRequest {
    /// Display name chosen by the user
    #[serde(default)]
    pub name: String,

    /// ICL document, forwarded to the protocol as-is
    #[serde(default)]
    pub icl_config: String,

    /// Provider proxy to deploy through; the configured default when absent
    #[serde(default)]
    pub provider_url: Option<String>,
}

impl DeploymentRequest {
    /// Check required fields before anything external is contacted
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();
        if self.name.trim().is_empty() {
            problems.push("name must not be empty");
        }
        if self.icl_config.trim().is_empty() {
            problems.push("iclConfig must not be empty");
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(DeployError::Validation(problems.join("; ")))
        }
    }
}

/// Request to re-submit the ICL document of a running deployment
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDeploymentRequest {
    #[serde(default)]
    pub icl_config: String,

    #[serde(default)]
    pub provider_url: Option<String>,
}

impl UpdateDeploymentRequest {
    pub fn validate(&self) -> Result<()> {
        if self.icl_config.trim().is_empty() {
            return Err(DeployError::Validation(
                "iclConfig must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Resolve an optional provider URL against the configured default
pub fn resolve_provider_url(requested: Option<&str>, default: &str) -> String {
    requested
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .unwrap_or(default)
        .to_string()
}

/// Fields of a record before the store assigns an id
#[derive(Debug, Clone)]
pub struct NewDeployment {
    pub name: String,
    pub icl_config: String,
    pub provider_url: String,
}

/// Locally stored deployment metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
    /// Store-assigned id, starting at 1
    pub id: u64,

    pub name: String,

    pub icl_config: String,

    pub provider_url: String,

    /// Always `"pending"`; this service never transitions it
    pub status: String,

    pub created_at: DateTime<Utc>,
}

impl DeploymentRecord {
    /// Create a pending record with the given id
    pub fn pending(id: u64, deployment: NewDeployment) -> Self {
        Self {
            id,
            name: deployment.name,
            icl_config: deployment.icl_config,
            provider_url: deployment.provider_url,
            status: PENDING_STATUS.to_string(),
            created_at: Utc::now(),
        }
    }
}

/// Values gathered by the best-effort enrichment fetches
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrichmentDetails {
    pub deployment: Option<Value>,
    pub order: Option<Value>,
    pub lease: Option<Value>,
    pub lease_status: Option<Value>,
    pub provider: Option<Value>,
    pub logs: Option<Value>,
}

impl EnrichmentDetails {
    /// Number of enrichment fetches
    pub const FETCHES: usize = 6;

    /// How many fetches produced a value
    pub fn obtained(&self) -> usize {
        [
            &self.deployment,
            &self.order,
            &self.lease,
            &self.lease_status,
            &self.provider,
            &self.logs,
        ]
        .iter()
        .filter(|v| v.is_some())
        .count()
    }

    /// The deployment detail with order, lease status, provider and logs
    /// merged in. `None` when none of those were obtained.
    pub fn merged_details(&self) -> Option<Value> {
        let mut details = match &self.deployment {
            Some(Value::Object(fields)) => fields.clone(),
            Some(other) => {
                let mut fields = Map::new();
                fields.insert("deployment".to_string(), other.clone());
                fields
            }
            None => Map::new(),
        };

        let extras = [
            ("order", &self.order),
            ("leaseStatus", &self.lease_status),
            ("provider", &self.provider),
            ("logs", &self.logs),
        ];
        for (key, value) in extras {
            if let Some(value) = value {
                details.insert(key.to_string(), value.clone());
            }
        }

        if self.deployment.is_none() && details.is_empty() {
            None
        } else {
            Some(Value::Object(details))
        }
    }
}

/// Outcome of the enrichment step
#[derive(Debug, Clone, PartialEq)]
pub enum Enrichment {
    /// Every fetch succeeded
    Full(EnrichmentDetails),
    /// Some fetches failed or were skipped
    Partial(EnrichmentDetails),
    /// Nothing obtained, or no lease to enrich
    None,
}

impl Enrichment {
    pub fn from_details(details: EnrichmentDetails) -> Self {
        match details.obtained() {
            0 => Enrichment::None,
            EnrichmentDetails::FETCHES => Enrichment::Full(details),
            _ => Enrichment::Partial(details),
        }
    }

    pub fn kind(&self) -> EnrichmentKind {
        match self {
            Enrichment::Full(_) => EnrichmentKind::Full,
            Enrichment::Partial(_) => EnrichmentKind::Partial,
            Enrichment::None => EnrichmentKind::None,
        }
    }

    pub fn details(&self) -> Option<&EnrichmentDetails> {
        match self {
            Enrichment::Full(details) | Enrichment::Partial(details) => Some(details),
            Enrichment::None => None,
        }
    }
}

/// Wire tag for [`Enrichment`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrichmentKind {
    Full,
    Partial,
    None,
}

/// Response to a successful deployment creation
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinedDeploymentView {
    pub deployment: DeploymentRecord,

    pub transaction: CreationResult,

    pub enrichment: EnrichmentKind,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub lease: Option<Value>,
}

impl CombinedDeploymentView {
    pub fn assemble(
        deployment: DeploymentRecord,
        transaction: CreationResult,
        enrichment: Enrichment,
    ) -> Self {
        let kind = enrichment.kind();
        let (details, lease) = match enrichment.details() {
            Some(found) => (found.merged_details(), found.lease.clone()),
            None => (None, None),
        };

        Self {
            deployment,
            transaction,
            enrichment: kind,
            details,
            lease,
        }
    }
}

/// Query string for refreshing a deployment
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshQuery {
    pub provider_url: Option<String>,
}

/// Query string for listing leases
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeasesQuery {
    pub state: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

/// Largest page the lease listing accepts
pub const MAX_PAGE_SIZE: u32 = 100;

impl LeasesQuery {
    /// Fill in defaults and check bounds
    pub fn into_lease_query(self) -> Result<LeaseQuery> {
        let defaults = LeaseQuery::default();
        let query = LeaseQuery {
            state: self
                .state
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.state),
            page: self.page.unwrap_or(defaults.page),
            page_size: self.page_size.unwrap_or(defaults.page_size),
        };

        if query.page == 0 {
            return Err(DeployError::Validation("page starts at 1".to_string()));
        }
        if query.page_size == 0 || query.page_size > MAX_PAGE_SIZE {
            return Err(DeployError::Validation(format!(
                "pageSize must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }

        Ok(query)
    }
}

/// List of local deployment records
#[derive(Debug, Serialize)]
pub struct DeploymentsListResponse {
    pub deployments: Vec<DeploymentRecord>,
    pub total: usize,
}

/// Single local deployment record
#[derive(Debug, Serialize)]
pub struct DeploymentResponse {
    pub deployment: DeploymentRecord,
}
