//! In-memory store adapters.
//!
//! Back the store ports with tokio locks for tests and local runs. They keep
//! the same guarantees the PostgreSQL adapters get from constraints: atomic
//! slot claims, one active payment per subject, status compare-and-swap, and
//! a strictly increasing queue counter.

mod appointment_repository;
mod payment_repository;
mod slot_ledger;
mod token_repository;

pub use appointment_repository::InMemoryAppointmentRepository;
pub use payment_repository::InMemoryPaymentRepository;
pub use slot_ledger::InMemorySlotLedger;
pub use token_repository::InMemoryTokenRepository;
