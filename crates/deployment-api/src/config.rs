//! Configuration management for the deployment service
//!
//! Loads configuration from environment variables with sensible defaults.
//! The protocol signing credential has no default: startup fails without it.

use anyhow::{Context, Result};
use protocol_client::Network;
use secrecy::{ExposeSecret, SecretString};
use std::env;
use std::time::Duration;

pub const DEFAULT_PROVIDER_PROXY_URL: &str = "https://provider-proxy.spheron.network";
pub const DEFAULT_GATEWAY_URL: &str = "http://127.0.0.1:3030";
pub const DEFAULT_PROTOCOL_TIMEOUT_SECS: u64 = 30;

/// Application configuration
#[derive(Debug)]
pub struct Config {
    /// API server host
    pub api_host: String,

    /// API server port
    pub api_port: u16,

    /// Signing credential for the protocol
    pub private_key: SecretString,

    /// Protocol network (testnet or mainnet)
    pub network: Network,

    /// Base URL of the protocol gateway
    pub gateway_url: String,

    /// Provider proxy used when a request does not name one
    pub provider_proxy_url: String,

    /// Escrow token checked before deploying
    pub balance_token: String,

    /// Wallet whose escrow is checked; the credential's own when unset
    pub wallet_address: Option<String>,

    /// Minimum unlocked balance in base units (10^6 per token)
    pub min_unlocked_balance: u128,

    /// Upper bound on a single protocol call
    pub protocol_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists (for local development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let private_key = var("PROTOCOL_PRIVATE_KEY")
            .context("PROTOCOL_PRIVATE_KEY environment variable is required")?;

        let config = Config {
            api_host: var("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),

            api_port: var("API_PORT")
                .unwrap_or_else(|| "5000".to_string())
                .parse()
                .context("Invalid API_PORT")?,

            private_key: SecretString::from(private_key),

            network: var("PROTOCOL_NETWORK")
                .unwrap_or_else(|| "testnet".to_string())
                .parse()
                .context("Invalid PROTOCOL_NETWORK")?,

            gateway_url: var("PROTOCOL_GATEWAY_URL")
                .unwrap_or_else(|| DEFAULT_GATEWAY_URL.to_string()),

            provider_proxy_url: var("PROVIDER_PROXY_URL")
                .unwrap_or_else(|| DEFAULT_PROVIDER_PROXY_URL.to_string()),

            balance_token: var("BALANCE_TOKEN").unwrap_or_else(|| "USDT".to_string()),

            wallet_address: var("WALLET_ADDRESS"),

            min_unlocked_balance: var("MIN_UNLOCKED_BALANCE")
                .unwrap_or_else(|| "0".to_string())
                .parse()
                .context("Invalid MIN_UNLOCKED_BALANCE (expected base units)")?,

            protocol_timeout: Duration::from_secs(
                var("PROTOCOL_TIMEOUT_SECS")
                    .unwrap_or_else(|| DEFAULT_PROTOCOL_TIMEOUT_SECS.to_string())
                    .parse()
                    .context("Invalid PROTOCOL_TIMEOUT_SECS")?,
            ),
        };

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.api_port == 0 {
            anyhow::bail!("API_PORT must be greater than 0");
        }

        if self.protocol_timeout.is_zero() {
            anyhow::bail!("PROTOCOL_TIMEOUT_SECS must be greater than 0");
        }

        if self.private_key.expose_secret().is_empty() {
            anyhow::bail!("PROTOCOL_PRIVATE_KEY must not be empty");
        }

        Ok(())
    }

    /// Get the API server address
    pub fn api_address(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_config_defaults() {
        let config = load(&[("PROTOCOL_PRIVATE_KEY", "0xkey")]).expect("Failed to load config");

        assert_eq!(config.api_host, "0.0.0.0");
        assert_eq!(config.api_port, 5000);
        assert_eq!(config.network, Network::Testnet);
        assert_eq!(config.gateway_url, DEFAULT_GATEWAY_URL);
        assert_eq!(config.provider_proxy_url, DEFAULT_PROVIDER_PROXY_URL);
        assert_eq!(config.balance_token, "USDT");
        assert_eq!(config.wallet_address, None);
        assert_eq!(config.min_unlocked_balance, 0);
        assert_eq!(config.protocol_timeout, Duration::from_secs(30));
        assert_eq!(config.private_key.expose_secret(), "0xkey");
    }

    #[test]
    fn test_missing_credential_fails() {
        let err = load(&[]).unwrap_err();
        assert!(err.to_string().contains("PROTOCOL_PRIVATE_KEY"));

        let err = load(&[("PROTOCOL_PRIVATE_KEY", "   ")]).unwrap_err();
        assert!(err.to_string().contains("PROTOCOL_PRIVATE_KEY"));
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("PROTOCOL_PRIVATE_KEY", "0xkey"),
            ("PROTOCOL_NETWORK", "mainnet"),
            ("API_PORT", "9000"),
            ("BALANCE_TOKEN", "CST"),
            ("WALLET_ADDRESS", "0xwallet"),
            ("MIN_UNLOCKED_BALANCE", "5000000"),
            ("PROTOCOL_TIMEOUT_SECS", "5"),
        ])
        .unwrap();

        assert_eq!(config.network, Network::Mainnet);
        assert_eq!(config.api_address(), "0.0.0.0:9000");
        assert_eq!(config.balance_token, "CST");
        assert_eq!(config.wallet_address.as_deref(), Some("0xwallet"));
        assert_eq!(config.min_unlocked_balance, 5_000_000);
        assert_eq!(config.protocol_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_values() {
        let key = ("PROTOCOL_PRIVATE_KEY", "0xkey");

        assert!(load(&[key, ("PROTOCOL_NETWORK", "devnet")]).is_err());
        assert!(load(&[key, ("MIN_UNLOCKED_BALANCE", "5.0")]).is_err());

        let err = load(&[key, ("API_PORT", "0")]).unwrap_err();
        assert!(err.to_string().contains("API_PORT must be greater than 0"));

        let err = load(&[key, ("PROTOCOL_TIMEOUT_SECS", "0")]).unwrap_err();
        assert!(err.to_string().contains("PROTOCOL_TIMEOUT_SECS"));
    }

    #[test]
    fn test_debug_redacts_credential() {
        let config = load(&[("PROTOCOL_PRIVATE_KEY", "super-secret")]).unwrap();
        assert!(!format!("{:?}", config).contains("super-secret"));
    }
}
