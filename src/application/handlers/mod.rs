//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations. Each
//! handler holds the shared `VisitContext` and exposes one `handle` call.

pub mod appointment;
pub mod payment;
pub mod queue;
