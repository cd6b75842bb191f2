//! In-memory payment repository.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, PaymentId, Timestamp};
use crate::domain::payment::{Payment, PaymentStatus, PaymentSubject};
use crate::ports::{InsertOutcome, PaymentRepository};

#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentRepository {
    payments: Arc<RwLock<HashMap<PaymentId, Payment>>>,
}

impl InMemoryPaymentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every payment ever stored for a subject, active or not.
    pub async fn for_subject(&self, subject: &PaymentSubject) -> Vec<Payment> {
        let payments = self.payments.read().await;
        let mut found: Vec<Payment> = payments
            .values()
            .filter(|p| &p.subject == subject)
            .cloned()
            .collect();
        found.sort_by_key(|p| p.created_at);
        found
    }

    pub async fn count(&self) -> usize {
        self.payments.read().await.len()
    }
}

#[async_trait]
impl PaymentRepository for InMemoryPaymentRepository {
    async fn insert_if_no_active(&self, payment: &Payment) -> Result<InsertOutcome, DomainError> {
        let mut payments = self.payments.write().await;
        if let Some(existing) = payments
            .values()
            .find(|p| p.subject == payment.subject && p.status.is_active())
        {
            return Ok(InsertOutcome::Existing(existing.clone()));
        }
        payments.insert(payment.id, payment.clone());
        Ok(InsertOutcome::Inserted)
    }

    async fn update(&self, payment: &Payment, expected: PaymentStatus) -> Result<(), DomainError> {
        let mut payments = self.payments.write().await;
        let stored = payments.get_mut(&payment.id).ok_or_else(|| {
            DomainError::new(ErrorCode::PaymentNotFound, "Payment not found")
                .with_detail("id", payment.id.to_string())
        })?;
        if stored.status != expected {
            return Err(DomainError::new(
                ErrorCode::ConcurrentModification,
                format!(
                    "Payment {} is {}, expected {}",
                    payment.id, stored.status, expected
                ),
            ));
        }
        *stored = payment.clone();
        Ok(())
    }

    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<Payment>, DomainError> {
        Ok(self.payments.read().await.get(id).cloned())
    }

    async fn find_active_by_subject(
        &self,
        subject: &PaymentSubject,
    ) -> Result<Option<Payment>, DomainError> {
        let payments = self.payments.read().await;
        Ok(payments
            .values()
            .find(|p| &p.subject == subject && p.status.is_active())
            .cloned())
    }

    async fn find_initiated_before(
        &self,
        cutoff: Timestamp,
        limit: u32,
    ) -> Result<Vec<Payment>, DomainError> {
        let payments = self.payments.read().await;
        let mut initiated: Vec<Payment> = payments
            .values()
            .filter(|p| p.status == PaymentStatus::Initiated && p.created_at.is_before(&cutoff))
            .cloned()
            .collect();
        initiated.sort_by_key(|p| p.created_at);
        initiated.truncate(limit as usize);
        Ok(initiated)
    }
}
