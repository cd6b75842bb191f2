//! GetAppointmentHandler - Query handler for a single appointment.

use std::sync::Arc;

use crate::application::context::VisitContext;
use crate::domain::appointment::Appointment;
use crate::domain::foundation::{AppointmentId, PatientId};
use crate::domain::VisitError;

/// Query for one appointment.
///
/// With `patient_id` set, an appointment owned by someone else is reported
/// as not found rather than leaking its existence.
#[derive(Debug, Clone)]
pub struct GetAppointmentQuery {
    pub appointment_id: AppointmentId,
    pub patient_id: Option<PatientId>,
}

pub struct GetAppointmentHandler {
    ctx: Arc<VisitContext>,
}

impl GetAppointmentHandler {
    pub fn new(ctx: Arc<VisitContext>) -> Self {
        Self { ctx }
    }

    pub async fn handle(&self, query: GetAppointmentQuery) -> Result<Appointment, VisitError> {
        let appointment = self
            .ctx
            .appointments
            .find_by_id(&query.appointment_id)
            .await?
            .ok_or_else(|| VisitError::not_found("appointment", query.appointment_id))?;

        match &query.patient_id {
            Some(patient_id) if *patient_id != appointment.patient_id => {
                Err(VisitError::not_found("appointment", query.appointment_id))
            }
            _ => Ok(appointment),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::appointment::{
        BookAppointmentCommand, BookAppointmentHandler,
    };
    use crate::application::test_support::{clinic_day, doctor, patient, Harness};

    async fn booked(h: &Harness) -> Appointment {
        BookAppointmentHandler::new(h.ctx.clone())
            .handle(BookAppointmentCommand {
                patient_id: patient("P-1"),
                doctor_id: doctor("D101"),
                date: clinic_day(),
                time_slot: "11:00".to_string(),
            })
            .await
            .unwrap()
            .appointment
    }

    #[tokio::test]
    async fn owner_and_staff_can_read() {
        let h = Harness::new();
        let appointment = booked(&h).await;
        let handler = GetAppointmentHandler::new(h.ctx.clone());

        let as_owner = handler
            .handle(GetAppointmentQuery {
                appointment_id: appointment.id,
                patient_id: Some(patient("P-1")),
            })
            .await
            .unwrap();
        let as_staff = handler
            .handle(GetAppointmentQuery {
                appointment_id: appointment.id,
                patient_id: None,
            })
            .await
            .unwrap();

        assert_eq!(as_owner, appointment);
        assert_eq!(as_staff, appointment);
    }

    #[tokio::test]
    async fn another_patient_sees_not_found() {
        let h = Harness::new();
        let appointment = booked(&h).await;

        let err = GetAppointmentHandler::new(h.ctx.clone())
            .handle(GetAppointmentQuery {
                appointment_id: appointment.id,
                patient_id: Some(patient("P-2")),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, VisitError::NotFound { entity: "appointment", .. }));
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let h = Harness::new();
        let err = GetAppointmentHandler::new(h.ctx.clone())
            .handle(GetAppointmentQuery {
                appointment_id: AppointmentId::new(),
                patient_id: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, VisitError::NotFound { .. }));
    }
}
