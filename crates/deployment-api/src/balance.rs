//! Escrow balance precondition for new deployments

use protocol_client::{format_base_units, EscrowBalance, ProtocolClient};
use std::time::Duration;
use tracing::{info, warn};

use crate::error::{DeployError, Result};
use crate::orchestrator::bounded;

/// Rejects deployment requests the escrow cannot pay for
#[derive(Debug, Clone)]
pub struct BalanceGate {
    token: String,
    wallet_address: Option<String>,
    /// Minimum unlocked balance in base units; 0 means "anything above zero"
    min_unlocked: u128,
}

impl BalanceGate {
    pub fn new(token: impl Into<String>, wallet_address: Option<String>, min_unlocked: u128) -> Self {
        Self {
            token: token.into(),
            wallet_address,
            min_unlocked,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Smallest unlocked balance that passes the gate
    pub fn required(&self) -> u128 {
        self.min_unlocked.max(1)
    }

    /// Fetch the current escrow balance without applying the policy
    pub async fn fetch(
        &self,
        client: &dyn ProtocolClient,
        timeout: Duration,
    ) -> Result<EscrowBalance> {
        bounded(
            timeout,
            "balance lookup",
            client.get_user_balance(&self.token, self.wallet_address.as_deref()),
        )
        .await
    }

    /// Fetch the balance and reject if the unlocked part is too small
    pub async fn check(
        &self,
        client: &dyn ProtocolClient,
        timeout: Duration,
    ) -> Result<EscrowBalance> {
        let balance = self.fetch(client, timeout).await?;
        self.evaluate(&balance)?;
        Ok(balance)
    }

    pub fn evaluate(&self, balance: &EscrowBalance) -> Result<()> {
        let unlocked = balance
            .unlocked_base_units()
            .ok_or_else(|| DeployError::MalformedBalance(balance.unlocked_balance.clone()))?;
        let required = self.required();

        if unlocked < required {
            warn!(
                "Rejecting deployment: {} {} unlocked, {} required",
                format_base_units(unlocked),
                self.token,
                format_base_units(required)
            );
            return Err(DeployError::InsufficientBalance {
                token: self.token.clone(),
                unlocked,
                required,
            });
        }

        info!(
            "Escrow balance ok: {} {} unlocked",
            format_base_units(unlocked),
            self.token
        );
        Ok(())
    }
}
