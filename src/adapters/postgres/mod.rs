//! PostgreSQL adapters - Database implementations for the store ports.
//!
//! - `PostgresSlotLedger` - Slot holds keyed by (doctor, date, slot)
//! - `PostgresAppointmentRepository` - Appointments with status CAS
//! - `PostgresPaymentRepository` - Payments, one active per subject
//! - `PostgresTokenRepository` - Tokens and the daily queue counter
//!
//! The schema lives in `migrations/` and is applied at startup.

mod appointment_repository;
mod payment_repository;
mod slot_ledger;
mod token_repository;

pub use appointment_repository::PostgresAppointmentRepository;
pub use payment_repository::PostgresPaymentRepository;
pub use slot_ledger::PostgresSlotLedger;
pub use token_repository::PostgresTokenRepository;

use std::fmt::Display;

use crate::domain::foundation::DomainError;

/// Maps a driver error to a database `DomainError`, naming the operation.
fn db_error(operation: &str, err: sqlx::Error) -> DomainError {
    tracing::error!(operation, error = %err, "Database operation failed");
    DomainError::database(format!("Failed to {}: {}", operation, err))
}

/// A stored value that no longer decodes into its domain type.
fn corrupt(column: &str, err: impl Display) -> DomainError {
    DomainError::database(format!("Invalid stored {}: {}", column, err)).with_detail("column", column)
}
