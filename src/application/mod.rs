//! Application layer - Commands, Queries, and Handlers.
//!
//! Orchestrates the appointment, payment, and queue domains over the ports.
//! Adapters talk to [`VisitEngine`]; background work runs in [`VisitSweeper`].

pub mod config;
pub mod context;
pub mod engine;
pub mod handlers;
pub mod locks;
pub mod payment_sessions;
pub mod sweeper;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::EngineConfig;
pub use context::VisitContext;
pub use engine::VisitEngine;
pub use handlers::appointment::{BookAppointmentResult, HoldSweepReport, ListAvailableSlotsResult};
pub use handlers::payment::ReconciliationReport;
pub use locks::{KeyedLocks, LockKey};
pub use payment_sessions::{PaymentConfirmation, PaymentSession, PaymentSessionManager, Settlement};
pub use sweeper::{SweepReport, SweeperConfig, VisitSweeper};
