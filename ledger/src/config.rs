//! Ledger configuration.

use corebank_common::time::constants;
use rust_decimal::Decimal;
use std::time::Duration;

/// Tuning knobs for the movement engine and account store.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Ceiling for a single movement amount.
    pub max_amount: Decimal,
    /// Time budget for acquiring an account lock; exceeding it fails the
    /// operation rather than blocking indefinitely.
    pub lock_budget: Duration,
    /// Age after which a pending movement is considered stale and swept.
    pub stale_pending_after: chrono::Duration,
    /// Interval between reconciliation sweeps.
    pub sweep_interval: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_amount: Decimal::from(1_000_000),
            lock_budget: constants::lock_budget(),
            stale_pending_after: constants::stale_pending_after(),
            sweep_interval: constants::sweep_interval(),
        }
    }
}

impl LedgerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(max) = std::env::var("LEDGER_MAX_AMOUNT") {
            if let Ok(max) = max.parse() {
                config.max_amount = max;
            }
        }

        if let Ok(ms) = std::env::var("LEDGER_LOCK_BUDGET_MS") {
            if let Ok(ms) = ms.parse() {
                config.lock_budget = Duration::from_millis(ms);
            }
        }

        if let Ok(secs) = std::env::var("LEDGER_STALE_PENDING_SECS") {
            if let Ok(secs) = secs.parse() {
                config.stale_pending_after = chrono::Duration::seconds(secs);
            }
        }

        if let Ok(secs) = std::env::var("LEDGER_SWEEP_INTERVAL_SECS") {
            if let Ok(secs) = secs.parse() {
                config.sweep_interval = Duration::from_secs(secs);
            }
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_amount <= Decimal::ZERO {
            return Err("Movement amount ceiling must be positive".to_string());
        }

        if self.lock_budget.is_zero() {
            return Err("Lock budget cannot be zero".to_string());
        }

        if self.stale_pending_after <= chrono::Duration::zero() {
            return Err("Stale pending threshold must be positive".to_string());
        }

        if self.sweep_interval.is_zero() {
            return Err("Sweep interval cannot be zero".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = LedgerConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_config() {
        let mut config = LedgerConfig::default();
        config.max_amount = Decimal::ZERO;
        assert!(config.validate().is_err());

        let mut config = LedgerConfig::default();
        config.lock_budget = Duration::ZERO;
        assert!(config.validate().is_err());
    }
}
