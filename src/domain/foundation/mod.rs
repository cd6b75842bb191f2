//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, error types, the status state
//! machine trait, and event plumbing used by every other domain module.

mod errors;
mod events;
mod ids;
mod money;
mod state_machine;
mod timestamp;

pub use errors::{DomainError, ErrorCode, UnknownVariant, ValidationError};
pub use events::{DomainEvent, EventEnvelope, EventId, SerializableDomainEvent};
pub use ids::{
    AppointmentId, DepartmentId, DoctorId, InvoiceId, PatientId, PaymentId, StaffId, TokenId,
};
pub use money::Money;
pub use state_machine::{StateMachine, TransitionError};
pub use timestamp::Timestamp;
