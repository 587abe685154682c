//! Movement log: the immutable record of every balance-affecting attempt.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use tracing::info;

use corebank_common::{
    AccountId, Currency, LedgerError, Movement, MovementId, MovementKind, MovementReference,
    MovementStatus, Result,
};

use crate::reference::ReferenceGenerator;

/// Append-oriented store of movement records.
///
/// Records are never removed; status changes go through [`transition`],
/// which delegates to the movement's own transition table so terminal
/// records stay immutable.
///
/// [`transition`]: MovementLog::transition
pub struct MovementLog {
    movements: DashMap<MovementId, Movement>,
    by_reference: DashMap<MovementReference, MovementId>,
    next_id: AtomicI64,
}

impl MovementLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self {
            movements: DashMap::new(),
            by_reference: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    /// Create and record a new `Pending` movement with a fresh unique
    /// reference.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        &self,
        references: &ReferenceGenerator,
        from_account: Option<AccountId>,
        to_account: Option<AccountId>,
        amount: Decimal,
        currency: Currency,
        kind: MovementKind,
        description: impl Into<String>,
    ) -> Result<Movement> {
        let reference =
            references.movement_reference(|candidate| self.by_reference.contains_key(candidate))?;

        let id = MovementId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        let movement = Movement::new(
            id,
            reference.clone(),
            from_account,
            to_account,
            amount,
            currency,
            kind,
            description,
        );

        match self.by_reference.entry(reference.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                // Lost a race on the reference between generation and
                // insertion; with a 16^12 keyspace this is pathological.
                return Err(LedgerError::DuplicateReference {
                    namespace: "movement_reference",
                });
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(id);
            }
        }
        self.movements.insert(id, movement.clone());

        info!(
            reference = %reference,
            kind = kind.as_str(),
            amount = %amount,
            "Movement recorded"
        );

        Ok(movement)
    }

    /// Transition a movement to a new status, returning the updated record.
    pub fn transition(
        &self,
        id: MovementId,
        status: MovementStatus,
        reason: Option<String>,
    ) -> Result<Movement> {
        let mut entry =
            self.movements
                .get_mut(&id)
                .ok_or_else(|| LedgerError::OperationFailed {
                    detail: format!("unknown movement id {id}"),
                })?;

        entry.transition_to(status, reason)?;
        Ok(entry.clone())
    }

    /// Get a movement by internal id.
    pub fn get(&self, id: MovementId) -> Option<Movement> {
        self.movements.get(&id).map(|entry| entry.clone())
    }

    /// Get a movement by its external reference.
    pub fn by_reference(&self, reference: &MovementReference) -> Option<Movement> {
        let id = *self.by_reference.get(reference)?.value();
        self.get(id)
    }

    /// Snapshot of every movement in the log.
    pub fn snapshot(&self) -> Vec<Movement> {
        self.movements.iter().map(|entry| entry.clone()).collect()
    }

    /// Pending movements created before the cutoff.
    pub fn pending_older_than(&self, cutoff: DateTime<Utc>) -> Vec<Movement> {
        self.movements
            .iter()
            .filter(|entry| entry.is_pending() && entry.created_at < cutoff)
            .map(|entry| entry.clone())
            .collect()
    }

    /// Number of recorded movements.
    pub fn len(&self) -> usize {
        self.movements.len()
    }

    /// Check whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.movements.is_empty()
    }
}

impl Default for MovementLog {
    fn default() -> Self {
        Self::new()
    }
}
