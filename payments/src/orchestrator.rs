//! Payment orchestrator: bill-payment lifecycle over the movement engine.
//!
//! The orchestrator owns the payment state machine; the actual funds
//! movement is delegated to the engine as a payment withdrawal, so the
//! ledger's atomicity guarantees carry over unchanged.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use rust_decimal::Decimal;
use tracing::{error, info, instrument, warn};

use corebank_common::{
    AccountId, CorrelationId, LedgerError, MovementReference, PaymentId, Result, Timestamp,
    UserId,
};
use corebank_ledger::{AccountStore, MovementEngine, ReferenceGenerator};

use crate::config::PaymentConfig;
use crate::payment::{Payment, PaymentStatus, PaymentType};

/// Filter for payment history queries.
#[derive(Debug, Clone, Default)]
pub struct PaymentFilter {
    /// Only payments with this status.
    pub status: Option<PaymentStatus>,
    /// Only payments of this type.
    pub payment_type: Option<PaymentType>,
    /// Only payments created at or after this instant.
    pub from: Option<Timestamp>,
    /// Only payments created before this instant.
    pub to: Option<Timestamp>,
    /// Truncate the result to the newest N payments.
    pub limit: Option<usize>,
}

impl PaymentFilter {
    fn matches(&self, payment: &Payment) -> bool {
        if let Some(status) = self.status {
            if payment.status != status {
                return false;
            }
        }
        if let Some(payment_type) = self.payment_type {
            if payment.payment_type != payment_type {
                return false;
            }
        }
        if let Some(from) = self.from {
            if payment.created_at < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if payment.created_at >= to {
                return false;
            }
        }
        true
    }
}

/// Aggregated payment counts for one user.
#[derive(Debug, Clone)]
pub struct PaymentSummary {
    pub pending_count: u64,
    pub completed_count: u64,
    pub failed_count: u64,
    /// Sum over completed payments.
    pub total_completed_amount: Decimal,
}

/// Store of payment records.
struct PaymentLog {
    payments: DashMap<PaymentId, Payment>,
    by_correlation: DashMap<CorrelationId, PaymentId>,
    next_id: AtomicI64,
}

impl PaymentLog {
    fn new() -> Self {
        Self {
            payments: DashMap::new(),
            by_correlation: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    fn next_id(&self) -> PaymentId {
        PaymentId::new(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn insert(&self, payment: Payment) {
        self.by_correlation
            .insert(payment.correlation.clone(), payment.id);
        self.payments.insert(payment.id, payment);
    }

    fn get(&self, id: PaymentId) -> Result<Payment> {
        self.payments
            .get(&id)
            .map(|entry| entry.clone())
            .ok_or(LedgerError::PaymentNotFound { id })
    }

    fn by_correlation(&self, correlation: &CorrelationId) -> Option<Payment> {
        let id = *self.by_correlation.get(correlation)?.value();
        self.get(id).ok()
    }

    /// Transition a payment, optionally attaching the movement that
    /// executed it. The single writer of payment status.
    fn transition(
        &self,
        id: PaymentId,
        status: PaymentStatus,
        movement: Option<MovementReference>,
    ) -> Result<Payment> {
        let mut entry = self
            .payments
            .get_mut(&id)
            .ok_or(LedgerError::PaymentNotFound { id })?;

        entry.transition_to(status)?;
        if let Some(reference) = movement {
            entry.movement_reference = Some(reference);
        }
        Ok(entry.clone())
    }

    fn snapshot(&self) -> Vec<Payment> {
        self.payments.iter().map(|entry| entry.clone()).collect()
    }
}

/// Orchestrates the bill-payment lifecycle.
pub struct PaymentOrchestrator {
    engine: Arc<MovementEngine>,
    accounts: Arc<AccountStore>,
    references: Arc<ReferenceGenerator>,
    payments: PaymentLog,
    config: PaymentConfig,
}

impl PaymentOrchestrator {
    /// Create a new orchestrator.
    pub fn new(
        engine: Arc<MovementEngine>,
        accounts: Arc<AccountStore>,
        references: Arc<ReferenceGenerator>,
        config: PaymentConfig,
    ) -> Self {
        Self {
            engine,
            accounts,
            references,
            payments: PaymentLog::new(),
            config,
        }
    }

    /// Create a `Pending` payment.
    ///
    /// The balance check here is an eager pre-check for early feedback;
    /// the debit inside [`process_payment`] remains the atomicity guard.
    ///
    /// [`process_payment`]: PaymentOrchestrator::process_payment
    #[allow(clippy::too_many_arguments)]
    #[instrument(skip(self, recipient_name, recipient_account, external_reference, description))]
    pub fn create_payment(
        &self,
        user: UserId,
        account_id: AccountId,
        payment_type: PaymentType,
        amount: Decimal,
        recipient_name: &str,
        recipient_account: Option<String>,
        external_reference: Option<String>,
        description: Option<String>,
    ) -> Result<Payment> {
        if amount <= Decimal::ZERO || amount > self.config.max_amount {
            return Err(LedgerError::InvalidAmount {
                amount,
                ceiling: self.config.max_amount,
            });
        }
        if recipient_name.trim().is_empty() {
            return Err(LedgerError::RecipientRequired);
        }

        let account = self.accounts.get(account_id).ok_or_else(|| {
            LedgerError::AccountNotFound {
                account: account_id.to_string(),
                side: corebank_common::AccountSide::Subject,
            }
        })?;
        if account.owner != user {
            return Err(LedgerError::NotAccountOwner {
                account: account.number.clone(),
                user,
            });
        }
        if account.balance < amount {
            return Err(LedgerError::InsufficientFunds {
                number: account.number.clone(),
                available: account.balance,
                requested: amount,
            });
        }

        let correlation = self
            .references
            .correlation_id(|candidate| self.payments.by_correlation.contains_key(candidate))?;

        let payment = Payment::new(
            self.payments.next_id(),
            user,
            account_id,
            payment_type,
            amount,
            recipient_name,
            recipient_account,
            external_reference,
            description,
            correlation,
        );
        self.payments.insert(payment.clone());

        info!(
            correlation = %payment.correlation,
            amount = %amount,
            payment_type = payment_type.as_str(),
            "Payment created"
        );

        Ok(payment)
    }

    /// Process a pending payment.
    ///
    /// Transitions `Pending -> Processing`, delegates the funds movement
    /// to the engine, then lands on `Completed` or `Failed`. A failed
    /// payment is never retried automatically; the failure is surfaced to
    /// the caller.
    #[instrument(skip(self))]
    pub fn process_payment(&self, payment_id: PaymentId) -> Result<Payment> {
        let payment = self.payments.get(payment_id)?;
        if !payment.is_pending() {
            return Err(LedgerError::InvalidStateTransition {
                from: payment.status.as_str().to_string(),
                to: PaymentStatus::Processing.as_str().to_string(),
            });
        }

        let payment = self
            .payments
            .transition(payment_id, PaymentStatus::Processing, None)?;

        let account = self.accounts.get(payment.account).ok_or_else(|| {
            LedgerError::OperationFailed {
                detail: format!("payment {payment_id} references unknown account"),
            }
        })?;

        let description = format!(
            "Payment: {} - {}",
            payment.payment_type.as_str(),
            payment.recipient_name
        );

        match self
            .engine
            .payment_withdrawal(&account.number, payment.amount, &description)
        {
            Ok(movement) => {
                let completed = self.payments.transition(
                    payment_id,
                    PaymentStatus::Completed,
                    Some(movement.reference.clone()),
                )?;
                info!(
                    correlation = %completed.correlation,
                    movement = %movement.reference,
                    "Payment completed"
                );
                Ok(completed)
            }
            Err(cause) => {
                warn!(
                    correlation = %payment.correlation,
                    error = %cause,
                    "Payment failed"
                );
                if let Err(transition_err) =
                    self.payments
                        .transition(payment_id, PaymentStatus::Failed, None)
                {
                    error!(
                        payment = %payment_id,
                        error = %transition_err,
                        "Could not record payment failure"
                    );
                }
                Err(cause)
            }
        }
    }

    /// Cancel a payment. Requires the requester to own the payment and the
    /// status to still be `Pending`.
    #[instrument(skip(self))]
    pub fn cancel_payment(&self, payment_id: PaymentId, user: UserId) -> Result<Payment> {
        let payment = self.payments.get(payment_id)?;
        if payment.user != user {
            return Err(LedgerError::NotPaymentOwner {
                payment: payment_id,
                user,
            });
        }

        let cancelled = self
            .payments
            .transition(payment_id, PaymentStatus::Cancelled, None)?;
        info!(correlation = %cancelled.correlation, "Payment cancelled");
        Ok(cancelled)
    }

    /// Look up a payment by id.
    pub fn payment(&self, payment_id: PaymentId) -> Result<Payment> {
        self.payments.get(payment_id)
    }

    /// Look up a payment by its correlation id.
    pub fn payment_by_correlation(&self, correlation: &CorrelationId) -> Option<Payment> {
        self.payments.by_correlation(correlation)
    }

    /// Payment history for a user, newest first.
    pub fn payments_for_user(&self, user: UserId, filter: &PaymentFilter) -> Vec<Payment> {
        let mut payments: Vec<Payment> = self
            .payments
            .snapshot()
            .into_iter()
            .filter(|payment| payment.user == user && filter.matches(payment))
            .collect();
        payments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = filter.limit {
            payments.truncate(limit);
        }
        payments
    }

    /// The newest payments for a user.
    pub fn recent_payments(&self, user: UserId, limit: usize) -> Vec<Payment> {
        self.payments_for_user(
            user,
            &PaymentFilter {
                limit: Some(limit),
                ..PaymentFilter::default()
            },
        )
    }

    /// Aggregated payment counts for a user.
    pub fn summary_for_user(&self, user: UserId) -> PaymentSummary {
        let mut summary = PaymentSummary {
            pending_count: 0,
            completed_count: 0,
            failed_count: 0,
            total_completed_amount: Decimal::ZERO,
        };

        for payment in self.payments.snapshot() {
            if payment.user != user {
                continue;
            }
            match payment.status {
                PaymentStatus::Pending => summary.pending_count += 1,
                PaymentStatus::Completed => {
                    summary.completed_count += 1;
                    summary.total_completed_amount += payment.amount;
                }
                PaymentStatus::Failed => summary.failed_count += 1,
                PaymentStatus::Processing | PaymentStatus::Cancelled => {}
            }
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corebank_common::{Currency, MovementKind, MovementStatus};
    use corebank_ledger::{Account, AccountType, LedgerConfig, LedgerQuery, MovementLog};

    struct Fixture {
        accounts: Arc<AccountStore>,
        engine: Arc<MovementEngine>,
        query: LedgerQuery,
        orchestrator: PaymentOrchestrator,
    }

    fn fixture() -> Fixture {
        let config = LedgerConfig::default();
        let references = Arc::new(ReferenceGenerator::new());
        let accounts = Arc::new(AccountStore::new(Arc::clone(&references), &config));
        let movements = Arc::new(MovementLog::new());
        let engine = Arc::new(MovementEngine::new(
            Arc::clone(&accounts),
            Arc::clone(&movements),
            Arc::clone(&references),
            config,
        ));
        let query = LedgerQuery::new(Arc::clone(&accounts), movements);
        let orchestrator = PaymentOrchestrator::new(
            Arc::clone(&engine),
            Arc::clone(&accounts),
            references,
            PaymentConfig::default(),
        );
        Fixture {
            accounts,
            engine,
            query,
            orchestrator,
        }
    }

    fn account_with_balance(fx: &Fixture, user: UserId, amount: i64) -> Account {
        let account = fx
            .accounts
            .open_account(user, AccountType::Checking, Currency::usd())
            .unwrap();
        fx.engine
            .deposit(&account.number, Decimal::from(amount), "seed")
            .unwrap();
        fx.accounts.get(account.id).unwrap()
    }

    fn create(fx: &Fixture, user: UserId, account: &Account, amount: i64) -> Payment {
        fx.orchestrator
            .create_payment(
                user,
                account.id,
                PaymentType::Electricity,
                Decimal::from(amount),
                "Metro Utilities",
                Some("subscriber 4417".to_string()),
                None,
                Some("march invoice".to_string()),
            )
            .unwrap()
    }

    #[test]
    fn test_create_and_process_payment() {
        let fx = fixture();
        let user = UserId::new(1);
        let account = account_with_balance(&fx, user, 200);

        let payment = create(&fx, user, &account, 75);
        assert!(payment.is_pending());
        assert!(payment.correlation.is_valid());

        let processed = fx.orchestrator.process_payment(payment.id).unwrap();
        assert_eq!(processed.status, PaymentStatus::Completed);
        assert!(processed.processed_at.is_some());

        // The delegated movement exists, carries kind PAYMENT, and the
        // balance reflects the withdrawal.
        let reference = processed.movement_reference.unwrap();
        let movement = fx.query.movement_by_reference(&reference).unwrap();
        assert_eq!(movement.kind, MovementKind::Payment);
        assert_eq!(movement.status, MovementStatus::Completed);
        assert_eq!(fx.accounts.get(account.id).unwrap().balance, Decimal::from(125));
    }

    #[test]
    fn test_create_rejects_bad_amounts() {
        let fx = fixture();
        let user = UserId::new(1);
        let account = account_with_balance(&fx, user, 200);

        for amount in [Decimal::ZERO, Decimal::from(-10), Decimal::from(100_001)] {
            let result = fx.orchestrator.create_payment(
                user,
                account.id,
                PaymentType::Tax,
                amount,
                "Treasury",
                None,
                None,
                None,
            );
            assert!(matches!(result, Err(LedgerError::InvalidAmount { .. })));
        }
    }

    #[test]
    fn test_create_requires_recipient_name() {
        let fx = fixture();
        let user = UserId::new(1);
        let account = account_with_balance(&fx, user, 200);

        let result = fx.orchestrator.create_payment(
            user,
            account.id,
            PaymentType::Water,
            Decimal::from(10),
            "   ",
            None,
            None,
            None,
        );
        assert!(matches!(result, Err(LedgerError::RecipientRequired)));
    }

    #[test]
    fn test_create_enforces_account_ownership() {
        let fx = fixture();
        let owner = UserId::new(1);
        let stranger = UserId::new(2);
        let account = account_with_balance(&fx, owner, 200);

        let result = fx.orchestrator.create_payment(
            stranger,
            account.id,
            PaymentType::Gas,
            Decimal::from(10),
            "City Gas",
            None,
            None,
            None,
        );
        assert!(matches!(result, Err(LedgerError::NotAccountOwner { .. })));
    }

    #[test]
    fn test_create_pre_checks_balance() {
        let fx = fixture();
        let user = UserId::new(1);
        let account = account_with_balance(&fx, user, 60);

        let result = fx.orchestrator.create_payment(
            user,
            account.id,
            PaymentType::Loan,
            Decimal::from(75),
            "Home Loan",
            None,
            None,
            None,
        );
        assert!(matches!(result, Err(LedgerError::InsufficientFunds { .. })));
    }

    #[test]
    fn test_lost_pre_check_race_fails_at_processing() {
        let fx = fixture();
        let user = UserId::new(1);
        let account = account_with_balance(&fx, user, 100);

        // Pre-check passes with 100 on balance.
        let payment = create(&fx, user, &account, 75);

        // The balance drains between creation and processing.
        fx.engine
            .withdraw(&account.number, Decimal::from(50), "rent")
            .unwrap();

        let result = fx.orchestrator.process_payment(payment.id);
        assert!(matches!(result, Err(LedgerError::InsufficientFunds { .. })));

        let payment = fx.orchestrator.payment(payment.id).unwrap();
        assert_eq!(payment.status, PaymentStatus::Failed);
        assert!(payment.movement_reference.is_none());
        // No balance change beyond the unrelated withdrawal.
        assert_eq!(fx.accounts.get(account.id).unwrap().balance, Decimal::from(50));
    }

    #[test]
    fn test_process_requires_pending() {
        let fx = fixture();
        let user = UserId::new(1);
        let account = account_with_balance(&fx, user, 200);
        let payment = create(&fx, user, &account, 75);

        fx.orchestrator.process_payment(payment.id).unwrap();
        let result = fx.orchestrator.process_payment(payment.id);
        assert!(matches!(
            result,
            Err(LedgerError::InvalidStateTransition { .. })
        ));

        let missing = fx.orchestrator.process_payment(PaymentId::new(999));
        assert!(matches!(missing, Err(LedgerError::PaymentNotFound { .. })));
    }

    #[test]
    fn test_cancel_rules() {
        let fx = fixture();
        let user = UserId::new(1);
        let stranger = UserId::new(2);
        let account = account_with_balance(&fx, user, 200);

        let payment = create(&fx, user, &account, 75);
        let result = fx.orchestrator.cancel_payment(payment.id, stranger);
        assert!(matches!(result, Err(LedgerError::NotPaymentOwner { .. })));

        let cancelled = fx.orchestrator.cancel_payment(payment.id, user).unwrap();
        assert_eq!(cancelled.status, PaymentStatus::Cancelled);
        assert!(cancelled.processed_at.is_some());
        // Cancellation has no balance effect.
        assert_eq!(fx.accounts.get(account.id).unwrap().balance, Decimal::from(200));

        // A completed payment rejects cancellation.
        let payment = create(&fx, user, &account, 30);
        fx.orchestrator.process_payment(payment.id).unwrap();
        let result = fx.orchestrator.cancel_payment(payment.id, user);
        assert!(matches!(
            result,
            Err(LedgerError::InvalidStateTransition { .. })
        ));
    }

    #[test]
    fn test_queries_and_summary() {
        let fx = fixture();
        let user = UserId::new(1);
        let other = UserId::new(2);
        let account = account_with_balance(&fx, user, 500);
        let other_account = account_with_balance(&fx, other, 500);

        let completed = create(&fx, user, &account, 100);
        fx.orchestrator.process_payment(completed.id).unwrap();

        let pending = create(&fx, user, &account, 50);

        let failing = create(&fx, user, &account, 400);
        fx.engine
            .withdraw(&account.number, Decimal::from(300), "drain")
            .unwrap();
        let _ = fx.orchestrator.process_payment(failing.id);

        create(&fx, other, &other_account, 25);

        let all = fx
            .orchestrator
            .payments_for_user(user, &PaymentFilter::default());
        assert_eq!(all.len(), 3);
        for pair in all.windows(2) {
            assert!(pair[0].created_at >= pair[1].created_at);
        }

        let pending_only = fx.orchestrator.payments_for_user(
            user,
            &PaymentFilter {
                status: Some(PaymentStatus::Pending),
                ..PaymentFilter::default()
            },
        );
        assert_eq!(pending_only.len(), 1);
        assert_eq!(pending_only[0].id, pending.id);

        let recent = fx.orchestrator.recent_payments(user, 2);
        assert_eq!(recent.len(), 2);

        let by_correlation = fx
            .orchestrator
            .payment_by_correlation(&completed.correlation)
            .unwrap();
        assert_eq!(by_correlation.id, completed.id);

        let summary = fx.orchestrator.summary_for_user(user);
        assert_eq!(summary.pending_count, 1);
        assert_eq!(summary.completed_count, 1);
        assert_eq!(summary.failed_count, 1);
        assert_eq!(summary.total_completed_amount, Decimal::from(100));
    }
}
