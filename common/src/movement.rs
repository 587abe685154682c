//! Movement record and status state machine.
//!
//! A movement is the atomic, auditable record of a balance-affecting event.
//! It is created `Pending`, and the engine drives it to exactly one
//! terminal status in the same unit of work as the balance mutation.

use crate::{AccountId, Currency, LedgerError, MovementId, MovementReference, Timestamp};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Kind of movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementKind {
    /// Funds moved between two ledger accounts.
    Transfer,
    /// Funds entering an account from outside the ledger.
    Deposit,
    /// Funds leaving an account to outside the ledger.
    Withdrawal,
    /// Withdrawal executed on behalf of a bill payment.
    Payment,
}

impl MovementKind {
    /// Persisted name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Transfer => "TRANSFER",
            MovementKind::Deposit => "DEPOSIT",
            MovementKind::Withdrawal => "WITHDRAWAL",
            MovementKind::Payment => "PAYMENT",
        }
    }
}

/// Movement status representing the lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementStatus {
    /// Record created, balance mutation not yet confirmed.
    Pending,
    /// Balance mutation committed.
    Completed,
    /// Balance mutation failed or never committed.
    Failed,
    /// Cancelled before the balance mutation ran.
    Cancelled,
}

impl MovementStatus {
    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MovementStatus::Completed | MovementStatus::Failed | MovementStatus::Cancelled
        )
    }

    /// Get valid next states from the current state.
    pub fn valid_transitions(&self) -> &[MovementStatus] {
        match self {
            MovementStatus::Pending => &[
                MovementStatus::Completed,
                MovementStatus::Failed,
                MovementStatus::Cancelled,
            ],
            MovementStatus::Completed => &[],
            MovementStatus::Failed => &[],
            MovementStatus::Cancelled => &[],
        }
    }

    /// Check if transition to the given state is valid.
    pub fn can_transition_to(&self, next: MovementStatus) -> bool {
        self.valid_transitions().contains(&next)
    }

    /// Persisted name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementStatus::Pending => "PENDING",
            MovementStatus::Completed => "COMPLETED",
            MovementStatus::Failed => "FAILED",
            MovementStatus::Cancelled => "CANCELLED",
        }
    }
}

/// An atomic, auditable record of a balance-affecting event.
///
/// Which account fields are set depends on the kind: transfers carry both,
/// deposits only a destination, withdrawals and payment withdrawals only a
/// source. The engine enforces that shape; the record itself is a plain
/// tagged variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movement {
    /// Internal identifier.
    pub id: MovementId,
    /// Externally visible unique reference. Immutable once assigned.
    pub reference: MovementReference,
    /// Source account (debited side), if any.
    pub from_account: Option<AccountId>,
    /// Destination account (credited side), if any.
    pub to_account: Option<AccountId>,
    /// Amount moved. Strictly positive.
    pub amount: Decimal,
    /// Fee charged on top of the amount. Non-negative, zero by default.
    pub fee: Decimal,
    /// Currency the movement is denominated in.
    pub currency: Currency,
    /// Kind of movement.
    pub kind: MovementKind,
    /// Current lifecycle status.
    pub status: MovementStatus,
    /// Free-text description supplied by the caller.
    pub description: String,
    /// Failure cause; set only when the status is `Failed`.
    pub failure_reason: Option<String>,
    /// When the record was created.
    pub created_at: Timestamp,
    /// When the record left `Pending`.
    pub processed_at: Option<Timestamp>,
}

impl Movement {
    /// Create a new `Pending` movement.
    pub fn new(
        id: MovementId,
        reference: MovementReference,
        from_account: Option<AccountId>,
        to_account: Option<AccountId>,
        amount: Decimal,
        currency: Currency,
        kind: MovementKind,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id,
            reference,
            from_account,
            to_account,
            amount,
            fee: Decimal::ZERO,
            currency,
            kind,
            status: MovementStatus::Pending,
            description: description.into(),
            failure_reason: None,
            created_at: Utc::now(),
            processed_at: None,
        }
    }

    /// Transition to a new status.
    ///
    /// This is the only writer of `status`, `processed_at` and
    /// `failure_reason`: it enforces the transition table, stamps
    /// `processed_at` whenever the movement leaves `Pending`, and records
    /// the reason only on failure.
    pub fn transition_to(
        &mut self,
        new_status: MovementStatus,
        reason: Option<String>,
    ) -> Result<(), LedgerError> {
        if !self.status.can_transition_to(new_status) {
            return Err(LedgerError::InvalidStateTransition {
                from: self.status.as_str().to_string(),
                to: new_status.as_str().to_string(),
            });
        }

        self.status = new_status;
        self.processed_at = Some(Utc::now());
        if new_status == MovementStatus::Failed {
            self.failure_reason = reason;
        }

        Ok(())
    }

    /// Check if the movement is still pending.
    pub fn is_pending(&self) -> bool {
        self.status == MovementStatus::Pending
    }

    /// Check if the movement completed successfully.
    pub fn is_completed(&self) -> bool {
        self.status == MovementStatus::Completed
    }

    /// Amount plus fee.
    pub fn total_amount(&self) -> Decimal {
        self.amount + self.fee
    }

    /// Check whether the movement touches the given account on either side.
    pub fn touches(&self, account: AccountId) -> bool {
        self.from_account == Some(account) || self.to_account == Some(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_movement() -> Movement {
        Movement::new(
            MovementId::new(1),
            MovementReference::new("TXN0A1B2C3D4E5F"),
            None,
            Some(AccountId::new(1)),
            Decimal::from(100),
            Currency::usd(),
            MovementKind::Deposit,
            "test deposit",
        )
    }

    #[test]
    fn test_new_movement_is_pending() {
        let movement = test_movement();
        assert_eq!(movement.status, MovementStatus::Pending);
        assert!(movement.processed_at.is_none());
        assert!(movement.failure_reason.is_none());
        assert_eq!(movement.fee, Decimal::ZERO);
    }

    #[test]
    fn test_complete_stamps_processed_at() {
        let mut movement = test_movement();
        movement
            .transition_to(MovementStatus::Completed, None)
            .unwrap();
        assert!(movement.is_completed());
        assert!(movement.processed_at.is_some());
    }

    #[test]
    fn test_fail_records_reason() {
        let mut movement = test_movement();
        movement
            .transition_to(MovementStatus::Failed, Some("insufficient funds".into()))
            .unwrap();
        assert_eq!(movement.status, MovementStatus::Failed);
        assert_eq!(
            movement.failure_reason.as_deref(),
            Some("insufficient funds")
        );
    }

    #[test]
    fn test_terminal_states_are_immutable() {
        for terminal in [
            MovementStatus::Completed,
            MovementStatus::Failed,
            MovementStatus::Cancelled,
        ] {
            let mut movement = test_movement();
            movement.transition_to(terminal, None).unwrap();

            for next in [
                MovementStatus::Pending,
                MovementStatus::Completed,
                MovementStatus::Failed,
                MovementStatus::Cancelled,
            ] {
                let result = movement.transition_to(next, None);
                assert!(matches!(
                    result,
                    Err(LedgerError::InvalidStateTransition { .. })
                ));
            }
        }
    }

    #[test]
    fn test_status_serializes_as_persisted_name() {
        // The store persists status/kind as SCREAMING_SNAKE_CASE strings.
        assert_eq!(
            serde_json::to_string(&MovementStatus::Pending).unwrap(),
            "\"PENDING\""
        );
        assert_eq!(
            serde_json::to_string(&MovementKind::Withdrawal).unwrap(),
            "\"WITHDRAWAL\""
        );
    }

    #[test]
    fn test_touches_either_side() {
        let movement = test_movement();
        assert!(movement.touches(AccountId::new(1)));
        assert!(!movement.touches(AccountId::new(2)));
    }
}
