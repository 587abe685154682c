//! CoreBank Ledger Engine
//!
//! The ledger core: an account store with atomic balance mutations, the
//! movement engine orchestrating deposits, withdrawals and transfers, the
//! collision-checked reference generator, the read-only query layer and
//! the reconciliation sweep for stale pending movements.

pub mod account;
pub mod config;
pub mod engine;
pub mod log;
pub mod query;
pub mod reconcile;
pub mod reference;
pub mod store;

pub use account::{Account, AccountType};
pub use config::LedgerConfig;
pub use engine::MovementEngine;
pub use log::MovementLog;
pub use query::{BalanceSummary, LedgerQuery, MovementFilter};
pub use reconcile::Reconciler;
pub use reference::ReferenceGenerator;
pub use store::AccountStore;
