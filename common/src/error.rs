//! Error taxonomy for CoreBank ledger operations.

use crate::{AccountNumber, MovementReference, PaymentId, UserId};
use rust_decimal::Decimal;
use thiserror::Error;

/// Which side of an operation an account resolution failure refers to.
///
/// Single-account operations use the side their movement record uses:
/// deposits resolve a destination, withdrawals a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountSide {
    Source,
    Destination,
    /// The account named by a lookup or lifecycle operation.
    Subject,
}

impl AccountSide {
    /// Lowercase label used in error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountSide::Source => "source",
            AccountSide::Destination => "destination",
            AccountSide::Subject => "requested",
        }
    }
}

/// Main error type for ledger operations.
///
/// Every rejected operation maps to one stable variant so callers can
/// branch on kind; free-text detail is carried for diagnostics only.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Amount is not strictly positive, or exceeds the configured ceiling.
    #[error("Invalid amount {amount} (ceiling {ceiling})")]
    InvalidAmount { amount: Decimal, ceiling: Decimal },

    /// No account exists with the given number or id.
    #[error("{} account not found: {account}", side.as_str())]
    AccountNotFound { account: String, side: AccountSide },

    /// The account exists but is deactivated.
    #[error("{} account is not active: {number}", side.as_str())]
    AccountInactive {
        number: AccountNumber,
        side: AccountSide,
    },

    /// Transfer where source and destination are the same account.
    #[error("Cannot transfer to the same account")]
    SameAccountTransfer,

    /// Transfer between accounts denominated in different currencies.
    #[error("Currency mismatch: expected {expected}, got {actual}")]
    CurrencyMismatch { expected: String, actual: String },

    /// Balance is lower than the requested debit.
    #[error("Insufficient funds in {number}: available {available}, requested {requested}")]
    InsufficientFunds {
        number: AccountNumber,
        available: Decimal,
        requested: Decimal,
    },

    /// Reference generation exhausted its retries without finding a free
    /// candidate. Fatal; surfaces as service unavailable.
    #[error("Reference generation exhausted retries in namespace {namespace}")]
    DuplicateReference { namespace: &'static str },

    /// No movement exists with the given reference.
    #[error("Movement not found: {reference}")]
    MovementNotFound { reference: MovementReference },

    /// No payment exists with the given id.
    #[error("Payment not found: {id}")]
    PaymentNotFound { id: PaymentId },

    /// Attempted status transition violates the transition table.
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    /// Payment recipient name is missing or blank.
    #[error("Recipient name is required")]
    RecipientRequired,

    /// The account does not belong to the requesting user.
    #[error("Account {account} does not belong to user {user}")]
    NotAccountOwner {
        account: AccountNumber,
        user: UserId,
    },

    /// The payment does not belong to the requesting user.
    #[error("Payment {payment} does not belong to user {user}")]
    NotPaymentOwner { payment: PaymentId, user: UserId },

    /// Deactivation requested for an account still holding funds.
    #[error("Cannot deactivate account {number} with non-zero balance")]
    NonZeroBalance { number: AccountNumber },

    /// Store or infrastructure failure during a mutation.
    #[error("Operation failed: {detail}")]
    OperationFailed { detail: String },
}

impl LedgerError {
    /// Get the stable error code for this kind.
    pub fn error_code(&self) -> &'static str {
        match self {
            LedgerError::InvalidAmount { .. } => "INVALID_AMOUNT",
            LedgerError::AccountNotFound { .. } => "ACCOUNT_NOT_FOUND",
            LedgerError::AccountInactive { .. } => "ACCOUNT_INACTIVE",
            LedgerError::SameAccountTransfer => "SAME_ACCOUNT_TRANSFER",
            LedgerError::CurrencyMismatch { .. } => "CURRENCY_MISMATCH",
            LedgerError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            LedgerError::DuplicateReference { .. } => "DUPLICATE_REFERENCE",
            LedgerError::MovementNotFound { .. } => "MOVEMENT_NOT_FOUND",
            LedgerError::PaymentNotFound { .. } => "PAYMENT_NOT_FOUND",
            LedgerError::InvalidStateTransition { .. } => "INVALID_STATE_TRANSITION",
            LedgerError::RecipientRequired => "RECIPIENT_REQUIRED",
            LedgerError::NotAccountOwner { .. } => "NOT_ACCOUNT_OWNER",
            LedgerError::NotPaymentOwner { .. } => "NOT_PAYMENT_OWNER",
            LedgerError::NonZeroBalance { .. } => "NON_ZERO_BALANCE",
            LedgerError::OperationFailed { .. } => "OPERATION_FAILED",
        }
    }

    /// Check whether this error was raised before any mutation started.
    ///
    /// Validation errors leave no movement record behind; mutation errors
    /// are recorded on the movement before being re-raised.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            LedgerError::InvalidAmount { .. }
                | LedgerError::AccountNotFound { .. }
                | LedgerError::AccountInactive { .. }
                | LedgerError::SameAccountTransfer
                | LedgerError::CurrencyMismatch { .. }
                | LedgerError::RecipientRequired
                | LedgerError::NotAccountOwner { .. }
                | LedgerError::NotPaymentOwner { .. }
        )
    }
}

/// Result type alias for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
