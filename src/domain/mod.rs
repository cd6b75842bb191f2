//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, errors, events)
//! - `appointment` - Doctor slots and the booking lifecycle
//! - `payment` - Payment attempts against appointments and invoices
//! - `queue` - Walk-in tokens and queue statistics
//! - `errors` - `VisitError`, the engine's typed failure

pub mod appointment;
pub mod errors;
pub mod foundation;
pub mod payment;
pub mod queue;

pub use errors::VisitError;
