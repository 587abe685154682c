//! CoreBank Payments
//!
//! Bill-payment orchestration on top of the movement engine. A payment
//! models the pending/processing lifecycle of a bill payment and delegates
//! the actual funds movement to a ledger withdrawal.

pub mod config;
pub mod orchestrator;
pub mod payment;

pub use config::PaymentConfig;
pub use orchestrator::{PaymentFilter, PaymentOrchestrator, PaymentSummary};
pub use payment::{Payment, PaymentStatus, PaymentType};
