//! Payment configuration.

use rust_decimal::Decimal;

/// Tuning knobs for the payment orchestrator.
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    /// Ceiling for a single payment amount.
    pub max_amount: Decimal,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            max_amount: Decimal::from(100_000),
        }
    }
}

impl PaymentConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(max) = std::env::var("PAYMENT_MAX_AMOUNT") {
            if let Ok(max) = max.parse() {
                config.max_amount = max;
            }
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_amount <= Decimal::ZERO {
            return Err("Payment amount ceiling must be positive".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PaymentConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_amount, Decimal::from(100_000));
    }

    #[test]
    fn test_invalid_config() {
        let config = PaymentConfig {
            max_amount: Decimal::ZERO,
        };
        assert!(config.validate().is_err());
    }
}
