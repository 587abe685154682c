//! Reconciliation sweep for stale pending movements.
//!
//! The engine completes or fails a movement in the same unit of work as
//! its balance mutation, so a movement still `Pending` past the configured
//! threshold means the process died between record creation and the
//! mutation: no balance change was committed. The sweep resolves such
//! records to `FAILED` rather than leaving the ambiguity unsurfaced.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use corebank_common::{Movement, MovementStatus};

use crate::config::LedgerConfig;
use crate::log::MovementLog;

/// Reason recorded on movements resolved by the sweep.
const STALE_REASON: &str = "reconciliation: pending past threshold, mutation never committed";

/// Periodic resolver of movements stuck in `Pending`.
pub struct Reconciler {
    movements: Arc<MovementLog>,
    config: LedgerConfig,
}

impl Reconciler {
    /// Create a new reconciler.
    pub fn new(movements: Arc<MovementLog>, config: LedgerConfig) -> Self {
        Self { movements, config }
    }

    /// Resolve every stale pending movement once, returning the records
    /// that were failed by this pass.
    pub fn sweep_once(&self) -> Vec<Movement> {
        let cutoff = Utc::now() - self.config.stale_pending_after;
        let stale = self.movements.pending_older_than(cutoff);
        if stale.is_empty() {
            return Vec::new();
        }

        let mut resolved = Vec::with_capacity(stale.len());
        for movement in stale {
            match self.movements.transition(
                movement.id,
                MovementStatus::Failed,
                Some(STALE_REASON.to_string()),
            ) {
                Ok(failed) => {
                    warn!(
                        reference = %failed.reference,
                        created_at = %failed.created_at,
                        "Stale pending movement failed by reconciliation"
                    );
                    resolved.push(failed);
                }
                // Raced to a terminal status since the snapshot; nothing to do.
                Err(_) => continue,
            }
        }

        info!(count = resolved.len(), "Reconciliation sweep completed");
        resolved
    }

    /// Run the sweep on the configured interval.
    pub async fn run_sweep_loop(&self) {
        loop {
            tokio::time::sleep(self.config.sweep_interval).await;
            self.sweep_once();
        }
    }
}
