//! Appointment repository port.
//!
//! # Design
//!
//! - **Compare-and-swap writes**: `update` succeeds only if the stored status
//!   still equals `expected`, so a stale writer can never overwrite a newer
//!   terminal state

use async_trait::async_trait;

use crate::domain::appointment::{Appointment, AppointmentStatus};
use crate::domain::foundation::{AppointmentId, DomainError, Timestamp};

#[async_trait]
pub trait AppointmentRepository: Send + Sync {
    /// Insert a new appointment.
    async fn save(&self, appointment: &Appointment) -> Result<(), DomainError>;

    /// Replace a stored appointment whose status is still `expected`.
    ///
    /// # Errors
    ///
    /// - `AppointmentNotFound` if the id is unknown
    /// - `ConcurrentModification` if the stored status differs from `expected`
    async fn update(
        &self,
        appointment: &Appointment,
        expected: AppointmentStatus,
    ) -> Result<(), DomainError>;

    async fn find_by_id(&self, id: &AppointmentId) -> Result<Option<Appointment>, DomainError>;

    /// The appointments among `ids` that exist, in no particular order.
    async fn find_by_ids(&self, ids: &[AppointmentId]) -> Result<Vec<Appointment>, DomainError>;

    /// Pending appointments created at or before `cutoff`, oldest first.
    async fn find_pending_created_by(
        &self,
        cutoff: Timestamp,
        limit: u32,
    ) -> Result<Vec<Appointment>, DomainError>;
}
