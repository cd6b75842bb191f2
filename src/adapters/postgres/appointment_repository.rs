//! PostgreSQL implementation of AppointmentRepository.
//!
//! Status writes are compare-and-swap on the expected prior status, so two
//! processes racing on one appointment cannot both win.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::appointment::{Appointment, AppointmentStatus};
use crate::domain::foundation::{
    AppointmentId, DoctorId, DomainError, ErrorCode, PatientId, PaymentId, Timestamp,
};
use crate::ports::AppointmentRepository;

use super::{corrupt, db_error};

pub struct PostgresAppointmentRepository {
    pool: PgPool,
}

impl PostgresAppointmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of an appointment.
#[derive(Debug, sqlx::FromRow)]
struct AppointmentRow {
    id: Uuid,
    patient_id: String,
    doctor_id: String,
    appointment_date: NaiveDate,
    time_slot: String,
    status: String,
    payment_id: Option<Uuid>,
    cancellation_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    cancelled_at: Option<DateTime<Utc>>,
}

impl TryFrom<AppointmentRow> for Appointment {
    type Error = DomainError;

    fn try_from(row: AppointmentRow) -> Result<Self, Self::Error> {
        Ok(Appointment {
            id: AppointmentId::from_uuid(row.id),
            patient_id: PatientId::new(row.patient_id).map_err(|e| corrupt("patient_id", e))?,
            doctor_id: DoctorId::new(row.doctor_id).map_err(|e| corrupt("doctor_id", e))?,
            date: row.appointment_date,
            time_slot: row.time_slot.parse().map_err(|e| corrupt("time_slot", e))?,
            status: row.status.parse().map_err(|e| corrupt("status", e))?,
            payment_id: row.payment_id.map(PaymentId::from_uuid),
            cancellation_reason: row
                .cancellation_reason
                .map(|r| r.parse())
                .transpose()
                .map_err(|e| corrupt("cancellation_reason", e))?,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
            cancelled_at: row.cancelled_at.map(Timestamp::from_datetime),
        })
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, patient_id, doctor_id, appointment_date, time_slot, status, payment_id,
           cancellation_reason, created_at, updated_at, cancelled_at
    FROM appointments
"#;

#[async_trait]
impl AppointmentRepository for PostgresAppointmentRepository {
    async fn save(&self, appointment: &Appointment) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO appointments (
                id, patient_id, doctor_id, appointment_date, time_slot, status, payment_id,
                cancellation_reason, created_at, updated_at, cancelled_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(appointment.id.as_uuid())
        .bind(appointment.patient_id.as_str())
        .bind(appointment.doctor_id.as_str())
        .bind(appointment.date)
        .bind(appointment.time_slot.to_string())
        .bind(appointment.status.as_str())
        .bind(appointment.payment_id.map(|id| *id.as_uuid()))
        .bind(appointment.cancellation_reason.map(|r| r.as_str()))
        .bind(appointment.created_at.as_datetime())
        .bind(appointment.updated_at.as_datetime())
        .bind(appointment.cancelled_at.as_ref().map(|t| *t.as_datetime()))
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("save appointment", e))?;

        Ok(())
    }

    async fn update(
        &self,
        appointment: &Appointment,
        expected: AppointmentStatus,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE appointments SET
                status = $2,
                payment_id = $3,
                cancellation_reason = $4,
                updated_at = $5,
                cancelled_at = $6
            WHERE id = $1 AND status = $7
            "#,
        )
        .bind(appointment.id.as_uuid())
        .bind(appointment.status.as_str())
        .bind(appointment.payment_id.map(|id| *id.as_uuid()))
        .bind(appointment.cancellation_reason.map(|r| r.as_str()))
        .bind(appointment.updated_at.as_datetime())
        .bind(appointment.cancelled_at.as_ref().map(|t| *t.as_datetime()))
        .bind(expected.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("update appointment", e))?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        match self.find_by_id(&appointment.id).await? {
            None => Err(
                DomainError::new(ErrorCode::AppointmentNotFound, "Appointment not found")
                    .with_detail("id", appointment.id.to_string()),
            ),
            Some(stored) => Err(DomainError::new(
                ErrorCode::ConcurrentModification,
                format!(
                    "Appointment {} is {}, expected {}",
                    appointment.id, stored.status, expected
                ),
            )),
        }
    }

    async fn find_by_id(&self, id: &AppointmentId) -> Result<Option<Appointment>, DomainError> {
        let row: Option<AppointmentRow> =
            sqlx::query_as(&format!("{} WHERE id = $1", SELECT_COLUMNS))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("find appointment", e))?;

        row.map(Appointment::try_from).transpose()
    }

    async fn find_by_ids(&self, ids: &[AppointmentId]) -> Result<Vec<Appointment>, DomainError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let uuids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
        let rows: Vec<AppointmentRow> =
            sqlx::query_as(&format!("{} WHERE id = ANY($1)", SELECT_COLUMNS))
                .bind(uuids)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| db_error("find appointments", e))?;

        rows.into_iter().map(Appointment::try_from).collect()
    }

    async fn find_pending_created_by(
        &self,
        cutoff: Timestamp,
        limit: u32,
    ) -> Result<Vec<Appointment>, DomainError> {
        let rows: Vec<AppointmentRow> = sqlx::query_as(&format!(
            "{} WHERE status = 'pending' AND created_at <= $1 ORDER BY created_at LIMIT $2",
            SELECT_COLUMNS
        ))
        .bind(cutoff.as_datetime())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list pending appointments", e))?;

        rows.into_iter().map(Appointment::try_from).collect()
    }
}
