//! Wire types exchanged with the protocol

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Escrow tokens use six decimal places
pub const TOKEN_DECIMALS: u32 = 6;

const BASE_UNITS_PER_TOKEN: u128 = 10u128.pow(TOKEN_DECIMALS);

/// Escrow balance for a token, in fixed-point base units
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscrowBalance {
    /// Funds committed to active leases
    #[serde(deserialize_with = "string_or_number")]
    pub locked_balance: String,

    /// Funds available to spend
    #[serde(deserialize_with = "string_or_number")]
    pub unlocked_balance: String,
}

impl EscrowBalance {
    pub fn new(locked_balance: impl Into<String>, unlocked_balance: impl Into<String>) -> Self {
        Self {
            locked_balance: locked_balance.into(),
            unlocked_balance: unlocked_balance.into(),
        }
    }

    /// Unlocked balance in base units, `None` if the protocol sent something
    /// other than a non-negative integer
    pub fn unlocked_base_units(&self) -> Option<u128> {
        parse_base_units(&self.unlocked_balance)
    }

    pub fn locked_base_units(&self) -> Option<u128> {
        parse_base_units(&self.locked_balance)
    }
}

/// Parse a base-unit amount such as `"5000000"`
pub fn parse_base_units(raw: &str) -> Option<u128> {
    raw.trim().parse().ok()
}

/// Render base units as a token amount, e.g. `5000000` -> `"5.000000"`
pub fn format_base_units(units: u128) -> String {
    format!(
        "{}.{:0width$}",
        units / BASE_UNITS_PER_TOKEN,
        units % BASE_UNITS_PER_TOKEN,
        width = TOKEN_DECIMALS as usize
    )
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a balance string or number, got {}",
            other
        ))),
    }
}

/// Result of submitting a deployment to the protocol
///
/// Kept as the raw object the protocol returned so fields this service does
/// not know about still reach the client. The accessors cover the fields the
/// orchestration depends on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CreationResult(Map<String, Value>);

impl CreationResult {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Lease identifier, if the protocol assigned one
    pub fn lease_id(&self) -> Option<String> {
        match self.0.get("leaseId")? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn transaction_hash(&self) -> Option<&str> {
        self.0.get("transactionHash").and_then(Value::as_str)
    }

    pub fn transaction_status(&self) -> Option<&str> {
        self.0.get("transactionStatus").and_then(Value::as_str)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }
}

/// Window of log lines to fetch for a deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogOptions {
    pub start_line: u64,
    pub end_line: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
}

impl LogOptions {
    /// The first `lines` lines across all services
    pub fn first(lines: u64) -> Self {
        Self {
            start_line: 0,
            end_line: lines,
            service: None,
        }
    }
}

/// Page of leases filtered by state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaseQuery {
    pub state: String,
    pub page: u32,
    pub page_size: u32,
}

impl Default for LeaseQuery {
    fn default() -> Self {
        Self {
            state: "ACTIVE".to_string(),
            page: 1,
            page_size: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_balance_accepts_numbers_and_strings() {
        let balance: EscrowBalance =
            serde_json::from_value(json!({"lockedBalance": 1500000, "unlockedBalance": "25000000"}))
                .unwrap();

        assert_eq!(balance.locked_balance, "1500000");
        assert_eq!(balance.unlocked_balance, "25000000");
        assert_eq!(balance.unlocked_base_units(), Some(25_000_000));
        assert_eq!(balance.locked_base_units(), Some(1_500_000));
    }

    #[test]
    fn test_balance_rejects_missing_field() {
        let result: Result<EscrowBalance, _> =
            serde_json::from_value(json!({"unlockedBalance": "1"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_malformed_balance_has_no_base_units() {
        let balance = EscrowBalance::new("0", "-4");
        assert_eq!(balance.unlocked_base_units(), None);

        let balance = EscrowBalance::new("0", "5.5");
        assert_eq!(balance.unlocked_base_units(), None);
    }

    #[test]
    fn test_format_base_units() {
        assert_eq!(format_base_units(5_000_000), "5.000000");
        assert_eq!(format_base_units(1), "0.000001");
        assert_eq!(format_base_units(12_345_678), "12.345678");
    }

    #[test]
    fn test_creation_result_accessors() {
        let result: CreationResult = serde_json::from_value(json!({
            "leaseId": "1042",
            "transactionHash": "0xfeed",
            "transactionStatus": "success",
            "blockNumber": 99
        }))
        .unwrap();

        assert_eq!(result.lease_id().as_deref(), Some("1042"));
        assert_eq!(result.transaction_hash(), Some("0xfeed"));
        assert_eq!(result.transaction_status(), Some("success"));
        assert_eq!(result.fields()["blockNumber"], json!(99));
    }

    #[test]
    fn test_creation_result_lease_id_variants() {
        let numeric: CreationResult = serde_json::from_value(json!({"leaseId": 7})).unwrap();
        assert_eq!(numeric.lease_id().as_deref(), Some("7"));

        let blank: CreationResult = serde_json::from_value(json!({"leaseId": "  "})).unwrap();
        assert_eq!(blank.lease_id(), None);

        let missing = CreationResult::default();
        assert_eq!(missing.lease_id(), None);
    }
}
