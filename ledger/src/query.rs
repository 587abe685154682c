//! Read-only retrieval and aggregation over the movement log.

use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;

use corebank_common::{
    AccountNumber, AccountSide, LedgerError, Movement, MovementKind, MovementReference,
    MovementStatus, Result, Timestamp,
};

use crate::log::MovementLog;
use crate::store::AccountStore;

/// Filter for movement history queries.
#[derive(Debug, Clone, Default)]
pub struct MovementFilter {
    /// Only movements created at or after this instant.
    pub from: Option<Timestamp>,
    /// Only movements created before this instant.
    pub to: Option<Timestamp>,
    /// Only movements with this status.
    pub status: Option<MovementStatus>,
    /// Only movements of this kind.
    pub kind: Option<MovementKind>,
    /// Truncate the result to the newest N movements.
    pub limit: Option<usize>,
}

impl MovementFilter {
    fn matches(&self, movement: &Movement) -> bool {
        if let Some(from) = self.from {
            if movement.created_at < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if movement.created_at >= to {
                return false;
            }
        }
        if let Some(status) = self.status {
            if movement.status != status {
                return false;
            }
        }
        if let Some(kind) = self.kind {
            if movement.kind != kind {
                return false;
            }
        }
        true
    }
}

/// Aggregated balance view of one account.
#[derive(Debug, Clone)]
pub struct BalanceSummary {
    /// Balance as currently held by the store.
    pub current_balance: Decimal,
    /// Sum of completed movements into the account.
    pub total_incoming: Decimal,
    /// Sum of completed movements out of the account.
    pub total_outgoing: Decimal,
    /// Every movement touching the account, regardless of status.
    pub movement_count: u64,
}

impl BalanceSummary {
    /// Net completed flow through the account.
    pub fn net_flow(&self) -> Decimal {
        self.total_incoming - self.total_outgoing
    }
}

/// Read-only query surface over accounts and movements.
pub struct LedgerQuery {
    accounts: Arc<AccountStore>,
    movements: Arc<MovementLog>,
}

impl LedgerQuery {
    /// Create a new query layer.
    pub fn new(accounts: Arc<AccountStore>, movements: Arc<MovementLog>) -> Self {
        Self {
            accounts,
            movements,
        }
    }

    /// Look up a movement by its external reference.
    pub fn movement_by_reference(&self, reference: &MovementReference) -> Result<Movement> {
        self.movements
            .by_reference(reference)
            .ok_or_else(|| LedgerError::MovementNotFound {
                reference: reference.clone(),
            })
    }

    /// Movement history for an account, newest first.
    ///
    /// Includes movements from before a deactivation; history never goes
    /// away with the account's active flag.
    pub fn movements_for_account(
        &self,
        number: &AccountNumber,
        filter: &MovementFilter,
    ) -> Result<Vec<Movement>> {
        let account = self.resolve(number)?;

        let mut movements: Vec<Movement> = self
            .movements
            .snapshot()
            .into_iter()
            .filter(|movement| movement.touches(account.id) && filter.matches(movement))
            .collect();
        movements.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = filter.limit {
            movements.truncate(limit);
        }

        Ok(movements)
    }

    /// Movements touching an account within the last `days` days.
    pub fn recent_movements(&self, number: &AccountNumber, days: i64) -> Result<Vec<Movement>> {
        let filter = MovementFilter {
            from: Some(Utc::now() - Duration::days(days)),
            ..MovementFilter::default()
        };
        self.movements_for_account(number, &filter)
    }

    /// All movements with the given status, newest first.
    pub fn movements_by_status(&self, status: MovementStatus) -> Vec<Movement> {
        let mut movements: Vec<Movement> = self
            .movements
            .snapshot()
            .into_iter()
            .filter(|movement| movement.status == status)
            .collect();
        movements.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        movements
    }

    /// Balance summary for an account.
    ///
    /// Incoming/outgoing sums cover completed movements only; the count
    /// covers every recorded attempt.
    pub fn balance_summary(&self, number: &AccountNumber) -> Result<BalanceSummary> {
        let account = self.resolve(number)?;

        let mut total_incoming = Decimal::ZERO;
        let mut total_outgoing = Decimal::ZERO;
        let mut movement_count = 0u64;

        for movement in self.movements.snapshot() {
            if !movement.touches(account.id) {
                continue;
            }
            movement_count += 1;
            if movement.is_completed() {
                if movement.to_account == Some(account.id) {
                    total_incoming += movement.amount;
                }
                if movement.from_account == Some(account.id) {
                    total_outgoing += movement.amount;
                }
            }
        }

        Ok(BalanceSummary {
            current_balance: account.balance,
            total_incoming,
            total_outgoing,
            movement_count,
        })
    }

    fn resolve(&self, number: &AccountNumber) -> Result<crate::account::Account> {
        self.accounts
            .get_by_number(number)
            .ok_or_else(|| LedgerError::AccountNotFound {
                account: number.to_string(),
                side: AccountSide::Subject,
            })
    }
}
