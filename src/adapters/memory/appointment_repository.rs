//! In-memory appointment repository.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::appointment::{Appointment, AppointmentStatus};
use crate::domain::foundation::{AppointmentId, DomainError, ErrorCode, Timestamp};
use crate::ports::AppointmentRepository;

#[derive(Debug, Clone, Default)]
pub struct InMemoryAppointmentRepository {
    appointments: Arc<RwLock<HashMap<AppointmentId, Appointment>>>,
    fail_writes: Arc<AtomicBool>,
}

impl InMemoryAppointmentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `save` and `update` fail with a database error.
    pub fn set_failing(&self, failing: bool) {
        self.fail_writes.store(failing, Ordering::SeqCst);
    }

    pub async fn count(&self) -> usize {
        self.appointments.read().await.len()
    }

    pub async fn all(&self) -> Vec<Appointment> {
        self.appointments.read().await.values().cloned().collect()
    }

    fn check_writable(&self) -> Result<(), DomainError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DomainError::database("Simulated appointment store failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl AppointmentRepository for InMemoryAppointmentRepository {
    async fn save(&self, appointment: &Appointment) -> Result<(), DomainError> {
        self.check_writable()?;
        let mut appointments = self.appointments.write().await;
        if appointments.contains_key(&appointment.id) {
            return Err(DomainError::database(format!(
                "Appointment {} already exists",
                appointment.id
            )));
        }
        appointments.insert(appointment.id, appointment.clone());
        Ok(())
    }

    async fn update(
        &self,
        appointment: &Appointment,
        expected: AppointmentStatus,
    ) -> Result<(), DomainError> {
        self.check_writable()?;
        let mut appointments = self.appointments.write().await;
        let stored = appointments.get_mut(&appointment.id).ok_or_else(|| {
            DomainError::new(ErrorCode::AppointmentNotFound, "Appointment not found")
                .with_detail("id", appointment.id.to_string())
        })?;
        if stored.status != expected {
            return Err(DomainError::new(
                ErrorCode::ConcurrentModification,
                format!(
                    "Appointment {} is {}, expected {}",
                    appointment.id, stored.status, expected
                ),
            ));
        }
        *stored = appointment.clone();
        Ok(())
    }

    async fn find_by_id(&self, id: &AppointmentId) -> Result<Option<Appointment>, DomainError> {
        Ok(self.appointments.read().await.get(id).cloned())
    }

    async fn find_by_ids(&self, ids: &[AppointmentId]) -> Result<Vec<Appointment>, DomainError> {
        let appointments = self.appointments.read().await;
        Ok(ids.iter().filter_map(|id| appointments.get(id).cloned()).collect())
    }

    async fn find_pending_created_by(
        &self,
        cutoff: Timestamp,
        limit: u32,
    ) -> Result<Vec<Appointment>, DomainError> {
        let appointments = self.appointments.read().await;
        let mut pending: Vec<Appointment> = appointments
            .values()
            .filter(|a| a.status == AppointmentStatus::Pending && !a.created_at.is_after(&cutoff))
            .cloned()
            .collect();
        pending.sort_by_key(|a| a.created_at);
        pending.truncate(limit as usize);
        Ok(pending)
    }
}
