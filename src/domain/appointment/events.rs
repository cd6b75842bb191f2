//! Appointment domain events.
//!
//! Emitted after the state change is durable. Consumers (notifications,
//! billing) react to them; they never drive engine logic.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    AppointmentId, DoctorId, DomainEvent, PatientId, PaymentId, Timestamp,
};

use super::{CancellationReason, TimeSlot};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppointmentEvent {
    /// Slot reserved and pending appointment created.
    Booked {
        appointment_id: AppointmentId,
        patient_id: PatientId,
        doctor_id: DoctorId,
        date: NaiveDate,
        time_slot: TimeSlot,
        occurred_at: Timestamp,
    },

    /// Pending → Confirmed after a successful payment.
    Confirmed {
        appointment_id: AppointmentId,
        patient_id: PatientId,
        doctor_id: DoctorId,
        date: NaiveDate,
        time_slot: TimeSlot,
        payment_id: PaymentId,
        occurred_at: Timestamp,
    },

    /// Pending → Cancelled, by request or hold expiry.
    Cancelled {
        appointment_id: AppointmentId,
        patient_id: PatientId,
        doctor_id: DoctorId,
        reason: CancellationReason,
        occurred_at: Timestamp,
    },

    /// Pending → Expired once the visit time passed unpaid.
    Expired {
        appointment_id: AppointmentId,
        patient_id: PatientId,
        occurred_at: Timestamp,
    },
}

impl AppointmentEvent {
    pub fn appointment_id(&self) -> AppointmentId {
        match self {
            AppointmentEvent::Booked { appointment_id, .. }
            | AppointmentEvent::Confirmed { appointment_id, .. }
            | AppointmentEvent::Cancelled { appointment_id, .. }
            | AppointmentEvent::Expired { appointment_id, .. } => *appointment_id,
        }
    }
}

impl DomainEvent for AppointmentEvent {
    fn event_type(&self) -> &'static str {
        match self {
            AppointmentEvent::Booked { .. } => "appointment.booked.v1",
            AppointmentEvent::Confirmed { .. } => "appointment.confirmed.v1",
            AppointmentEvent::Cancelled { .. } => "appointment.cancelled.v1",
            AppointmentEvent::Expired { .. } => "appointment.expired.v1",
        }
    }

    fn aggregate_id(&self) -> String {
        self.appointment_id().to_string()
    }

    fn aggregate_type(&self) -> &'static str {
        "Appointment"
    }

    fn occurred_at(&self) -> Timestamp {
        match self {
            AppointmentEvent::Booked { occurred_at, .. }
            | AppointmentEvent::Confirmed { occurred_at, .. }
            | AppointmentEvent::Cancelled { occurred_at, .. }
            | AppointmentEvent::Expired { occurred_at, .. } => *occurred_at,
        }
    }
}
