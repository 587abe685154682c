//! Payment record and status state machine.

use chrono::Utc;
use corebank_common::{
    AccountId, CorrelationId, LedgerError, MovementReference, PaymentId, Timestamp, UserId,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Category of bill payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentType {
    Electricity,
    Water,
    Gas,
    Internet,
    Phone,
    CreditCard,
    Loan,
    Insurance,
    Tax,
    Other,
}

impl PaymentType {
    /// Persisted name of this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::Electricity => "ELECTRICITY",
            PaymentType::Water => "WATER",
            PaymentType::Gas => "GAS",
            PaymentType::Internet => "INTERNET",
            PaymentType::Phone => "PHONE",
            PaymentType::CreditCard => "CREDIT_CARD",
            PaymentType::Loan => "LOAN",
            PaymentType::Insurance => "INSURANCE",
            PaymentType::Tax => "TAX",
            PaymentType::Other => "OTHER",
        }
    }
}

/// Payment status representing the lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    /// Created, awaiting processing.
    Pending,
    /// Delegated withdrawal in flight.
    Processing,
    /// Delegated withdrawal succeeded.
    Completed,
    /// Delegated withdrawal failed. Not retried automatically.
    Failed,
    /// Cancelled before processing started.
    Cancelled,
}

impl PaymentStatus {
    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PaymentStatus::Completed | PaymentStatus::Failed | PaymentStatus::Cancelled
        )
    }

    /// Get valid next states from the current state.
    pub fn valid_transitions(&self) -> &[PaymentStatus] {
        match self {
            PaymentStatus::Pending => &[PaymentStatus::Processing, PaymentStatus::Cancelled],
            PaymentStatus::Processing => &[PaymentStatus::Completed, PaymentStatus::Failed],
            PaymentStatus::Completed => &[],
            PaymentStatus::Failed => &[],
            PaymentStatus::Cancelled => &[],
        }
    }

    /// Check if transition to the given state is valid.
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        self.valid_transitions().contains(&next)
    }

    /// Persisted name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Processing => "PROCESSING",
            PaymentStatus::Completed => "COMPLETED",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Cancelled => "CANCELLED",
        }
    }
}

/// A bill payment.
///
/// The recipient account is free text and not necessarily a ledger
/// account; the funds movement itself is recorded as a `PAYMENT` movement
/// once processed, correlated through `movement_reference`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    /// Internal identifier.
    pub id: PaymentId,
    /// User the payment belongs to.
    pub user: UserId,
    /// Account the funds are drawn from.
    pub account: AccountId,
    /// Category of the payment.
    pub payment_type: PaymentType,
    /// Current lifecycle status.
    pub status: PaymentStatus,
    /// Amount to pay. Strictly positive, bounded by configuration.
    pub amount: Decimal,
    /// Recipient display name.
    pub recipient_name: String,
    /// Recipient account, free text.
    pub recipient_account: Option<String>,
    /// Caller-supplied external reference (invoice number and the like).
    pub external_reference: Option<String>,
    /// Free-text description.
    pub description: Option<String>,
    /// Correlation id assigned at creation.
    pub correlation: CorrelationId,
    /// Reference of the movement that executed this payment.
    pub movement_reference: Option<MovementReference>,
    /// When the payment was created.
    pub created_at: Timestamp,
    /// When the payment reached a terminal status.
    pub processed_at: Option<Timestamp>,
}

impl Payment {
    /// Create a new `Pending` payment.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: PaymentId,
        user: UserId,
        account: AccountId,
        payment_type: PaymentType,
        amount: Decimal,
        recipient_name: impl Into<String>,
        recipient_account: Option<String>,
        external_reference: Option<String>,
        description: Option<String>,
        correlation: CorrelationId,
    ) -> Self {
        Self {
            id,
            user,
            account,
            payment_type,
            status: PaymentStatus::Pending,
            amount,
            recipient_name: recipient_name.into(),
            recipient_account,
            external_reference,
            description,
            correlation,
            movement_reference: None,
            created_at: Utc::now(),
            processed_at: None,
        }
    }

    /// Transition to a new status.
    ///
    /// The only writer of `status` and `processed_at`: enforces the
    /// transition table and stamps `processed_at` on every terminal entry.
    pub fn transition_to(&mut self, new_status: PaymentStatus) -> Result<(), LedgerError> {
        if !self.status.can_transition_to(new_status) {
            return Err(LedgerError::InvalidStateTransition {
                from: self.status.as_str().to_string(),
                to: new_status.as_str().to_string(),
            });
        }

        self.status = new_status;
        if new_status.is_terminal() {
            self.processed_at = Some(Utc::now());
        }

        Ok(())
    }

    /// Check if the payment is still pending.
    pub fn is_pending(&self) -> bool {
        self.status == PaymentStatus::Pending
    }
}
