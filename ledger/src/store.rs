//! Account store: the only writer of account balances.
//!
//! Each account lives behind its own mutex, which is the serialization
//! point for the check-then-act debit sequence. Lock acquisition is
//! bounded by the configured time budget; a timeout surfaces as
//! `OperationFailed` instead of blocking the caller indefinitely.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::{DashMap, DashSet};
use parking_lot::{Mutex, MutexGuard};
use rust_decimal::Decimal;
use tracing::{info, instrument};

use corebank_common::{
    AccountId, AccountNumber, AccountSide, Currency, CustomerNumber, LedgerError, Result, UserId,
};

use crate::account::{Account, AccountType};
use crate::config::LedgerConfig;
use crate::reference::ReferenceGenerator;

/// Store of all ledger accounts.
///
/// Accounts are never removed once created; deactivation is the only way
/// to retire one, and only at a zero balance.
pub struct AccountStore {
    /// Accounts by internal id, each behind its own lock.
    accounts: DashMap<AccountId, Arc<Mutex<Account>>>,
    /// Index from external number to internal id.
    by_number: DashMap<AccountNumber, AccountId>,
    /// Issued customer numbers (namespace for uniqueness checks).
    customer_numbers: DashSet<CustomerNumber>,
    /// Id sequence. Ids are never reused.
    next_id: AtomicI64,
    /// Reference generator for account and customer numbers.
    references: Arc<ReferenceGenerator>,
    /// Lock acquisition budget.
    lock_budget: Duration,
}

impl AccountStore {
    /// Create a new store.
    pub fn new(references: Arc<ReferenceGenerator>, config: &LedgerConfig) -> Self {
        Self {
            accounts: DashMap::new(),
            by_number: DashMap::new(),
            customer_numbers: DashSet::new(),
            next_id: AtomicI64::new(1),
            references,
            lock_budget: config.lock_budget,
        }
    }

    /// Open a new active account with a zero balance and a freshly
    /// generated unique account number.
    #[instrument(skip(self))]
    pub fn open_account(
        &self,
        owner: UserId,
        account_type: AccountType,
        currency: Currency,
    ) -> Result<Account> {
        let number = self
            .references
            .account_number(|candidate| self.by_number.contains_key(candidate))?;

        let id = AccountId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        let account = Account::new(id, number.clone(), owner, account_type, currency);

        self.by_number.insert(number.clone(), id);
        self.accounts.insert(id, Arc::new(Mutex::new(account.clone())));

        info!(account = %number, id = %id, "Account opened");

        Ok(account)
    }

    /// Issue a unique customer number from its own namespace.
    pub fn issue_customer_number(&self) -> Result<CustomerNumber> {
        let number = self
            .references
            .customer_number(|candidate| self.customer_numbers.contains(candidate))?;
        self.customer_numbers.insert(number.clone());
        Ok(number)
    }

    /// Credit an account. Requires a positive amount (validated by the
    /// engine before any record exists). Returns the new balance.
    pub fn credit(&self, id: AccountId, amount: Decimal, side: AccountSide) -> Result<Decimal> {
        debug_assert!(amount > Decimal::ZERO);

        let cell = self.cell(id)?;
        let mut account = self.lock(&cell)?;
        if !account.can_transact() {
            return Err(LedgerError::AccountInactive {
                number: account.number.clone(),
                side,
            });
        }

        account.balance += amount;
        account.updated_at = chrono::Utc::now();
        Ok(account.balance)
    }

    /// Debit an account. The sufficiency check and the subtraction happen
    /// under the same account lock, so concurrent debits serialize and can
    /// never overdraw. Returns the new balance.
    pub fn debit(&self, id: AccountId, amount: Decimal, side: AccountSide) -> Result<Decimal> {
        debug_assert!(amount > Decimal::ZERO);

        let cell = self.cell(id)?;
        let mut account = self.lock(&cell)?;
        if !account.can_transact() {
            return Err(LedgerError::AccountInactive {
                number: account.number.clone(),
                side,
            });
        }
        if account.balance < amount {
            return Err(LedgerError::InsufficientFunds {
                number: account.number.clone(),
                available: account.balance,
                requested: amount,
            });
        }

        account.balance -= amount;
        account.updated_at = chrono::Utc::now();
        Ok(account.balance)
    }

    /// Move `amount` from one account to another as a single atomic unit.
    ///
    /// Both account locks are acquired in ascending `AccountId` order
    /// regardless of which side is the source, so concurrent transfers in
    /// opposite directions cannot deadlock. The debit is applied before
    /// the credit, and the destination is never touched if the debit
    /// fails. Returns the new (source, destination) balances.
    pub fn transfer_balances(
        &self,
        from: AccountId,
        to: AccountId,
        amount: Decimal,
    ) -> Result<(Decimal, Decimal)> {
        debug_assert!(amount > Decimal::ZERO);
        debug_assert_ne!(from, to);

        let from_cell = self.cell(from)?;
        let to_cell = self.cell(to)?;

        // Fixed global lock order: lower id first.
        let (first_cell, second_cell) = if from < to {
            (&from_cell, &to_cell)
        } else {
            (&to_cell, &from_cell)
        };
        let first = self.lock(first_cell)?;
        let second = self.lock(second_cell)?;
        let (mut source, mut destination) = if from < to {
            (first, second)
        } else {
            (second, first)
        };

        if !source.can_transact() {
            return Err(LedgerError::AccountInactive {
                number: source.number.clone(),
                side: AccountSide::Source,
            });
        }
        if !destination.can_transact() {
            return Err(LedgerError::AccountInactive {
                number: destination.number.clone(),
                side: AccountSide::Destination,
            });
        }
        if source.balance < amount {
            return Err(LedgerError::InsufficientFunds {
                number: source.number.clone(),
                available: source.balance,
                requested: amount,
            });
        }

        let now = chrono::Utc::now();
        source.balance -= amount;
        source.updated_at = now;
        destination.balance += amount;
        destination.updated_at = now;

        Ok((source.balance, destination.balance))
    }

    /// Resolve an active account by number.
    pub fn find_active_by_number(
        &self,
        number: &AccountNumber,
        side: AccountSide,
    ) -> Result<Account> {
        let account = self.get_by_number(number).ok_or_else(|| {
            LedgerError::AccountNotFound {
                account: number.to_string(),
                side,
            }
        })?;

        if !account.can_transact() {
            return Err(LedgerError::AccountInactive {
                number: number.clone(),
                side,
            });
        }

        Ok(account)
    }

    /// Snapshot of an account by internal id, active or not.
    pub fn get(&self, id: AccountId) -> Option<Account> {
        let cell = self.accounts.get(&id)?.value().clone();
        let account = cell.lock();
        Some(account.clone())
    }

    /// Snapshot of an account by external number, active or not.
    pub fn get_by_number(&self, number: &AccountNumber) -> Option<Account> {
        let id = *self.by_number.get(number)?.value();
        self.get(id)
    }

    /// Deactivate an account. Only permitted at a zero balance; the
    /// account remains queryable and can be reactivated later.
    #[instrument(skip(self))]
    pub fn deactivate(&self, id: AccountId) -> Result<Account> {
        let cell = self.cell(id)?;
        let mut account = self.lock(&cell)?;

        if account.balance != Decimal::ZERO {
            return Err(LedgerError::NonZeroBalance {
                number: account.number.clone(),
            });
        }

        account.active = false;
        account.updated_at = chrono::Utc::now();
        info!(account = %account.number, "Account deactivated");
        Ok(account.clone())
    }

    /// Reactivate a previously deactivated account.
    #[instrument(skip(self))]
    pub fn reactivate(&self, id: AccountId) -> Result<Account> {
        let cell = self.cell(id)?;
        let mut account = self.lock(&cell)?;

        account.active = true;
        account.updated_at = chrono::Utc::now();
        info!(account = %account.number, "Account reactivated");
        Ok(account.clone())
    }

    /// Number of accounts ever opened.
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    fn cell(&self, id: AccountId) -> Result<Arc<Mutex<Account>>> {
        self.accounts
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| LedgerError::OperationFailed {
                detail: format!("unknown account id {id}"),
            })
    }

    fn lock<'a>(&self, cell: &'a Mutex<Account>) -> Result<MutexGuard<'a, Account>> {
        cell.try_lock_for(self.lock_budget)
            .ok_or_else(|| LedgerError::OperationFailed {
                detail: "account lock acquisition timed out".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> AccountStore {
        AccountStore::new(
            Arc::new(ReferenceGenerator::new()),
            &LedgerConfig::default(),
        )
    }

    fn open(store: &AccountStore) -> Account {
        store
            .open_account(UserId::new(1), AccountType::Checking, Currency::usd())
            .unwrap()
    }

    #[test]
    fn test_open_account_generates_valid_number() {
        let store = test_store();
        let account = open(&store);

        assert!(account.number.is_valid());
        assert_eq!(account.balance, Decimal::ZERO);
        assert_eq!(store.account_count(), 1);
    }

    #[test]
    fn test_account_ids_are_not_reused() {
        let store = test_store();
        let a = open(&store);
        let b = open(&store);
        assert!(a.id < b.id);
    }

    #[test]
    fn test_credit_increases_balance() {
        let store = test_store();
        let account = open(&store);

        let balance = store
            .credit(account.id, Decimal::from(100), AccountSide::Destination)
            .unwrap();
        assert_eq!(balance, Decimal::from(100));
    }

    #[test]
    fn test_debit_checks_sufficiency() {
        let store = test_store();
        let account = open(&store);
        store
            .credit(account.id, Decimal::from(100), AccountSide::Destination)
            .unwrap();

        let result = store.debit(account.id, Decimal::from(150), AccountSide::Source);
        assert!(matches!(
            result,
            Err(LedgerError::InsufficientFunds { available, requested, .. })
                if available == Decimal::from(100) && requested == Decimal::from(150)
        ));

        // Balance untouched by the failed debit.
        assert_eq!(store.get(account.id).unwrap().balance, Decimal::from(100));
    }

    #[test]
    fn test_mutations_reject_inactive_account() {
        let store = test_store();
        let account = open(&store);
        store.deactivate(account.id).unwrap();

        let result = store.credit(account.id, Decimal::from(10), AccountSide::Destination);
        assert!(matches!(result, Err(LedgerError::AccountInactive { .. })));
    }

    #[test]
    fn test_transfer_balances_moves_funds() {
        let store = test_store();
        let a = open(&store);
        let b = open(&store);
        store
            .credit(a.id, Decimal::from(200), AccountSide::Destination)
            .unwrap();

        let (from_balance, to_balance) = store
            .transfer_balances(a.id, b.id, Decimal::from(50))
            .unwrap();

        assert_eq!(from_balance, Decimal::from(150));
        assert_eq!(to_balance, Decimal::from(50));
    }

    #[test]
    fn test_transfer_balances_insufficient_leaves_destination_untouched() {
        let store = test_store();
        let a = open(&store);
        let b = open(&store);
        store
            .credit(a.id, Decimal::from(30), AccountSide::Destination)
            .unwrap();

        let result = store.transfer_balances(a.id, b.id, Decimal::from(50));
        assert!(matches!(result, Err(LedgerError::InsufficientFunds { .. })));
        assert_eq!(store.get(a.id).unwrap().balance, Decimal::from(30));
        assert_eq!(store.get(b.id).unwrap().balance, Decimal::ZERO);
    }

    #[test]
    fn test_find_active_by_number() {
        let store = test_store();
        let account = open(&store);

        let found = store
            .find_active_by_number(&account.number, AccountSide::Subject)
            .unwrap();
        assert_eq!(found.id, account.id);

        let missing = store.find_active_by_number(
            &AccountNumber::new("000000000000"),
            AccountSide::Source,
        );
        assert!(matches!(
            missing,
            Err(LedgerError::AccountNotFound {
                side: AccountSide::Source,
                ..
            })
        ));
    }

    #[test]
    fn test_deactivate_requires_zero_balance() {
        let store = test_store();
        let account = open(&store);
        store
            .credit(account.id, Decimal::from(5), AccountSide::Destination)
            .unwrap();

        let result = store.deactivate(account.id);
        assert!(matches!(result, Err(LedgerError::NonZeroBalance { .. })));

        store.debit(account.id, Decimal::from(5), AccountSide::Source).unwrap();
        let account = store.deactivate(account.id).unwrap();
        assert!(!account.active);

        let account = store.reactivate(account.id).unwrap();
        assert!(account.active);
    }

    #[test]
    fn test_customer_numbers_are_unique() {
        let store = test_store();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..500 {
            let number = store.issue_customer_number().unwrap();
            assert!(number.is_valid());
            assert!(seen.insert(number.as_str().to_string()));
        }
    }

    #[test]
    fn test_concurrent_debits_never_overdraw() {
        let store = Arc::new(test_store());
        let account = open(&store);
        store
            .credit(account.id, Decimal::from(100), AccountSide::Destination)
            .unwrap();

        let handles: Vec<_> = (0..50)
            .map(|_| {
                let store = Arc::clone(&store);
                let id = account.id;
                std::thread::spawn(move || {
                    store.debit(id, Decimal::from(10), AccountSide::Source).is_ok()
                })
            })
            .collect();

        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|&ok| ok)
            .count();

        assert_eq!(successes, 10);
        assert_eq!(store.get(account.id).unwrap().balance, Decimal::ZERO);
    }

    #[test]
    fn test_opposing_transfers_do_not_deadlock() {
        let store = Arc::new(test_store());
        let a = open(&store);
        let b = open(&store);
        store
            .credit(a.id, Decimal::from(10_000), AccountSide::Destination)
            .unwrap();
        store
            .credit(b.id, Decimal::from(10_000), AccountSide::Destination)
            .unwrap();

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = Arc::clone(&store);
            let (from, to) = if i % 2 == 0 { (a.id, b.id) } else { (b.id, a.id) };
            handles.push(std::thread::spawn(move || {
                for _ in 0..200 {
                    store.transfer_balances(from, to, Decimal::ONE).unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let total = store.get(a.id).unwrap().balance + store.get(b.id).unwrap().balance;
        assert_eq!(total, Decimal::from(20_000));
    }
}
