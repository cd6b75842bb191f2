//! Payment repository port.
//!
//! Implementations enforce at most one active (initiated or successful)
//! payment per subject, e.g. with a partial unique index.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, PaymentId, Timestamp};
use crate::domain::payment::{Payment, PaymentStatus, PaymentSubject};

/// Result of inserting a payment for a subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The new payment was stored.
    Inserted,
    /// Another active payment already exists; it is returned instead.
    Existing(Payment),
}

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Stores `payment` unless its subject already has an active payment.
    async fn insert_if_no_active(&self, payment: &Payment) -> Result<InsertOutcome, DomainError>;

    /// Replace a stored payment whose status is still `expected`.
    ///
    /// # Errors
    ///
    /// - `PaymentNotFound` if the id is unknown
    /// - `ConcurrentModification` if the stored status differs
    async fn update(&self, payment: &Payment, expected: PaymentStatus) -> Result<(), DomainError>;

    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<Payment>, DomainError>;

    /// The initiated or successful payment for a subject, if any.
    async fn find_active_by_subject(
        &self,
        subject: &PaymentSubject,
    ) -> Result<Option<Payment>, DomainError>;

    /// Initiated payments created strictly before `cutoff`, oldest first.
    async fn find_initiated_before(
        &self,
        cutoff: Timestamp,
        limit: u32,
    ) -> Result<Vec<Payment>, DomainError>;
}
