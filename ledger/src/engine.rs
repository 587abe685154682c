//! Movement engine: deposits, withdrawals, transfers and cancellation.
//!
//! Every public operation runs as one atomic unit of work: validation
//! happens before any record exists, the movement is then created
//! `Pending`, the balance mutation runs under the account lock(s), and the
//! movement reaches its terminal status in the same unit. Failures after
//! the record is created are written to the movement and re-raised, so the
//! caller sees the failure while the log keeps the audit trail.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

use corebank_common::{
    AccountNumber, AccountSide, LedgerError, Movement, MovementKind, MovementReference,
    MovementStatus, Result,
};

use crate::config::LedgerConfig;
use crate::log::MovementLog;
use crate::reference::ReferenceGenerator;
use crate::store::AccountStore;

/// Orchestrates balance movements over the account store.
pub struct MovementEngine {
    accounts: Arc<AccountStore>,
    movements: Arc<MovementLog>,
    references: Arc<ReferenceGenerator>,
    config: LedgerConfig,
}

impl MovementEngine {
    /// Create a new engine.
    pub fn new(
        accounts: Arc<AccountStore>,
        movements: Arc<MovementLog>,
        references: Arc<ReferenceGenerator>,
        config: LedgerConfig,
    ) -> Self {
        Self {
            accounts,
            movements,
            references,
            config,
        }
    }

    /// Deposit funds into an account.
    #[instrument(skip(self, description))]
    pub fn deposit(
        &self,
        account_number: &AccountNumber,
        amount: Decimal,
        description: &str,
    ) -> Result<Movement> {
        self.validate_amount(amount)?;
        let account = self
            .accounts
            .find_active_by_number(account_number, AccountSide::Destination)?;

        let movement = self.movements.create(
            &self.references,
            None,
            Some(account.id),
            amount,
            account.currency.clone(),
            MovementKind::Deposit,
            description,
        )?;

        match self
            .accounts
            .credit(account.id, amount, AccountSide::Destination)
        {
            Ok(balance) => {
                info!(reference = %movement.reference, balance = %balance, "Deposit completed");
                self.movements
                    .transition(movement.id, MovementStatus::Completed, None)
            }
            Err(cause) => self.fail(movement, cause),
        }
    }

    /// Withdraw funds from an account.
    #[instrument(skip(self, description))]
    pub fn withdraw(
        &self,
        account_number: &AccountNumber,
        amount: Decimal,
        description: &str,
    ) -> Result<Movement> {
        self.outbound(MovementKind::Withdrawal, account_number, amount, description)
    }

    /// Withdraw funds on behalf of a bill payment.
    ///
    /// Identical to [`withdraw`] except the movement is recorded with kind
    /// `PAYMENT`, so account history distinguishes bill payments from
    /// plain withdrawals.
    ///
    /// [`withdraw`]: MovementEngine::withdraw
    #[instrument(skip(self, description))]
    pub fn payment_withdrawal(
        &self,
        account_number: &AccountNumber,
        amount: Decimal,
        description: &str,
    ) -> Result<Movement> {
        self.outbound(MovementKind::Payment, account_number, amount, description)
    }

    /// Transfer funds between two accounts.
    ///
    /// The debit and credit execute inside one atomic unit with both
    /// account locks held; the destination is never touched if the debit
    /// fails, so a transfer can never create money.
    #[instrument(skip(self, description))]
    pub fn transfer(
        &self,
        from_number: &AccountNumber,
        to_number: &AccountNumber,
        amount: Decimal,
        description: &str,
    ) -> Result<Movement> {
        self.validate_amount(amount)?;
        if from_number == to_number {
            return Err(LedgerError::SameAccountTransfer);
        }

        let from = self
            .accounts
            .find_active_by_number(from_number, AccountSide::Source)?;
        let to = self
            .accounts
            .find_active_by_number(to_number, AccountSide::Destination)?;

        if from.currency != to.currency {
            return Err(LedgerError::CurrencyMismatch {
                expected: from.currency.code().to_string(),
                actual: to.currency.code().to_string(),
            });
        }

        let movement = self.movements.create(
            &self.references,
            Some(from.id),
            Some(to.id),
            amount,
            from.currency.clone(),
            MovementKind::Transfer,
            description,
        )?;

        match self.accounts.transfer_balances(from.id, to.id, amount) {
            Ok((from_balance, to_balance)) => {
                info!(
                    reference = %movement.reference,
                    from_balance = %from_balance,
                    to_balance = %to_balance,
                    "Transfer completed"
                );
                self.movements
                    .transition(movement.id, MovementStatus::Completed, None)
            }
            Err(cause) => self.fail(movement, cause),
        }
    }

    /// Cancel a movement that is still pending.
    ///
    /// Applies only to movements whose balance mutation has not run (ones
    /// staged but never executed); a movement the engine is processing
    /// reaches a terminal status in the same unit of work, so cancellation
    /// of it is rejected with `InvalidStateTransition`.
    #[instrument(skip(self))]
    pub fn cancel_movement(&self, reference: &MovementReference) -> Result<Movement> {
        let movement = self.movements.by_reference(reference).ok_or_else(|| {
            LedgerError::MovementNotFound {
                reference: reference.clone(),
            }
        })?;

        let cancelled = self
            .movements
            .transition(movement.id, MovementStatus::Cancelled, None)?;
        info!(reference = %reference, "Movement cancelled");
        Ok(cancelled)
    }

    fn outbound(
        &self,
        kind: MovementKind,
        account_number: &AccountNumber,
        amount: Decimal,
        description: &str,
    ) -> Result<Movement> {
        self.validate_amount(amount)?;
        let account = self
            .accounts
            .find_active_by_number(account_number, AccountSide::Source)?;

        let movement = self.movements.create(
            &self.references,
            Some(account.id),
            None,
            amount,
            account.currency.clone(),
            kind,
            description,
        )?;

        match self.accounts.debit(account.id, amount, AccountSide::Source) {
            Ok(balance) => {
                info!(
                    reference = %movement.reference,
                    kind = kind.as_str(),
                    balance = %balance,
                    "Withdrawal completed"
                );
                self.movements
                    .transition(movement.id, MovementStatus::Completed, None)
            }
            Err(cause) => self.fail(movement, cause),
        }
    }

    fn validate_amount(&self, amount: Decimal) -> Result<()> {
        if amount <= Decimal::ZERO || amount > self.config.max_amount {
            return Err(LedgerError::InvalidAmount {
                amount,
                ceiling: self.config.max_amount,
            });
        }
        Ok(())
    }

    /// Record a mutation failure on the movement, then re-raise it.
    fn fail(&self, movement: Movement, cause: LedgerError) -> Result<Movement> {
        warn!(
            reference = %movement.reference,
            error = %cause,
            "Movement failed"
        );
        // The transition cannot be rejected here: the movement was created
        // Pending within this unit of work.
        self.movements
            .transition(movement.id, MovementStatus::Failed, Some(cause.to_string()))?;
        Err(Self::escalate(cause))
    }

    /// Map a store failure to the error the caller sees. Domain outcomes
    /// keep their kind so callers can branch; infrastructure failures
    /// surface uniformly as `OperationFailed`.
    fn escalate(cause: LedgerError) -> LedgerError {
        match cause {
            LedgerError::InsufficientFunds { .. }
            | LedgerError::AccountInactive { .. }
            | LedgerError::OperationFailed { .. } => cause,
            other => LedgerError::OperationFailed {
                detail: other.to_string(),
            },
        }
    }
}
