//! Account definitions for the ledger.

use corebank_common::{AccountId, AccountNumber, Currency, Timestamp, UserId};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Account classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    Checking,
    Savings,
    Business,
}

/// A ledger account.
///
/// The balance is never negative and is mutated only through the account
/// store's credit/debit entry points.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Internal identifier. Stable, never reused.
    pub id: AccountId,
    /// External 12-digit account number. Unique across all accounts.
    pub number: AccountNumber,
    /// Owning user. Identity management lives outside the core.
    pub owner: UserId,
    /// Current balance. Invariant: >= 0.
    pub balance: Decimal,
    /// Currency the account is denominated in.
    pub currency: Currency,
    /// Account classification.
    pub account_type: AccountType,
    /// Whether the account accepts movements.
    pub active: bool,
    /// When the account was created.
    pub created_at: Timestamp,
    /// When the account was last updated.
    pub updated_at: Timestamp,
}

impl Account {
    /// Create a new active account with a zero balance.
    pub fn new(
        id: AccountId,
        number: AccountNumber,
        owner: UserId,
        account_type: AccountType,
        currency: Currency,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            number,
            owner,
            balance: Decimal::ZERO,
            currency,
            account_type,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if the account can transact.
    pub fn can_transact(&self) -> bool {
        self.active
    }

    /// Check if the balance covers the given amount.
    pub fn has_sufficient_balance(&self, amount: Decimal) -> bool {
        self.balance >= amount
    }
}
