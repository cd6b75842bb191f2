//! Shared handler context.
//!
//! Every handler holds an `Arc<VisitContext>`: the ports it may touch, the
//! clock, the engine policy, and the in-process key locks. Handlers are the
//! only code that writes through these ports.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::domain::appointment::{
    Appointment, AppointmentEvent, AppointmentStatus, CancellationReason,
};
use crate::domain::foundation::{SerializableDomainEvent, Timestamp};
use crate::domain::VisitError;
use crate::ports::{
    AppointmentRepository, Clock, EventPublisher, PaymentGateway, PaymentRepository, Reservation,
    SlotLedger, TokenRepository,
};

use super::locks::{KeyedLocks, LockKey};
use super::EngineConfig;

/// Ports and policy shared by all handlers.
pub struct VisitContext {
    pub appointments: Arc<dyn AppointmentRepository>,
    pub payments: Arc<dyn PaymentRepository>,
    pub tokens: Arc<dyn TokenRepository>,
    pub ledger: Arc<dyn SlotLedger>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub events: Arc<dyn EventPublisher>,
    pub clock: Arc<dyn Clock>,
    pub config: EngineConfig,
    pub locks: KeyedLocks<LockKey>,
}

impl VisitContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        appointments: Arc<dyn AppointmentRepository>,
        payments: Arc<dyn PaymentRepository>,
        tokens: Arc<dyn TokenRepository>,
        ledger: Arc<dyn SlotLedger>,
        gateway: Arc<dyn PaymentGateway>,
        events: Arc<dyn EventPublisher>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Self {
        Self {
            appointments,
            payments,
            tokens,
            ledger,
            gateway,
            events,
            clock,
            config,
            locks: KeyedLocks::new(),
        }
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Clinic-local calendar day of `now`.
    pub fn today(&self, now: Timestamp) -> NaiveDate {
        now.local_date(self.config.utc_offset)
    }

    /// Publishes an event after the state change it describes is stored.
    ///
    /// Failures are logged and swallowed: notification delivery never
    /// rolls back engine state.
    pub async fn emit<E: SerializableDomainEvent>(&self, event: &E) {
        let envelope = match event.to_envelope() {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(
                    event_type = event.event_type(),
                    error = %e,
                    "Failed to serialize event"
                );
                return;
            }
        };

        let event_type = envelope.event_type.clone();
        let aggregate_id = envelope.aggregate_id.clone();
        if let Err(e) = self.events.publish(envelope).await {
            tracing::warn!(
                event_type = %event_type,
                aggregate_id = %aggregate_id,
                error = %e,
                "Event delivery failed"
            );
        }
    }

    /// Frees the slot held by a no longer active appointment.
    ///
    /// The appointment write is already durable at this point, so a ledger
    /// failure is logged for manual cleanup instead of being surfaced.
    pub async fn release_slot(&self, appointment: &Appointment) {
        let reservation = Reservation {
            key: appointment.slot_key(),
            holder: appointment.id,
        };
        if let Err(e) = self.ledger.release(&reservation).await {
            tracing::error!(
                appointment_id = %appointment.id,
                slot = %reservation.key,
                error = %e,
                "Slot release failed; reservation needs manual cleanup"
            );
        }
    }

    /// Ends a pending appointment whose hold window has elapsed.
    ///
    /// Becomes `Expired` if the visit start has already passed and
    /// `Cancelled(HoldExpired)` otherwise. Caller holds the appointment lock.
    pub async fn lapse_hold(
        &self,
        mut appointment: Appointment,
        now: Timestamp,
    ) -> Result<Appointment, VisitError> {
        let starts_at = appointment.starts_at(self.config.utc_offset);
        let event = if now.is_before(&starts_at) {
            appointment.cancel(CancellationReason::HoldExpired, now)?;
            AppointmentEvent::Cancelled {
                appointment_id: appointment.id,
                patient_id: appointment.patient_id.clone(),
                doctor_id: appointment.doctor_id.clone(),
                reason: CancellationReason::HoldExpired,
                occurred_at: now,
            }
        } else {
            appointment.expire(now)?;
            AppointmentEvent::Expired {
                appointment_id: appointment.id,
                patient_id: appointment.patient_id.clone(),
                occurred_at: now,
            }
        };

        self.appointments
            .update(&appointment, AppointmentStatus::Pending)
            .await?;
        self.release_slot(&appointment).await;

        tracing::info!(
            audit = true,
            appointment_id = %appointment.id,
            slot = %appointment.slot_key(),
            status = %appointment.status,
            "Unpaid hold lapsed; slot released"
        );
        self.emit(&event).await;
        Ok(appointment)
    }
}
