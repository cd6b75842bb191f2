//! PostgreSQL implementation of SlotLedger.
//!
//! The `(doctor_id, slot_date, time_slot)` primary key makes a claim atomic:
//! the first `INSERT` wins and every concurrent one conflicts. `reserved_at`
//! dates each hold so the sweep can tell an orphan from a booking in flight.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::appointment::{SlotKey, TimeSlot};
use crate::domain::foundation::{AppointmentId, DoctorId, DomainError, Timestamp};
use crate::ports::{Reservation, ReserveOutcome, SlotLedger};

use super::{corrupt, db_error};

pub struct PostgresSlotLedger {
    pool: PgPool,
}

impl PostgresSlotLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SlotLedger for PostgresSlotLedger {
    async fn try_reserve(
        &self,
        key: &SlotKey,
        holder: AppointmentId,
        reserved_at: Timestamp,
    ) -> Result<ReserveOutcome, DomainError> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO slot_reservations (doctor_id, slot_date, time_slot, appointment_id, reserved_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (doctor_id, slot_date, time_slot) DO NOTHING
            "#,
        )
        .bind(key.doctor_id.as_str())
        .bind(key.date)
        .bind(key.time_slot.to_string())
        .bind(holder.as_uuid())
        .bind(reserved_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("reserve slot", e))?;

        let reservation = Reservation {
            key: key.clone(),
            holder,
        };
        if inserted.rows_affected() == 1 {
            return Ok(ReserveOutcome::Reserved(reservation));
        }

        // A repeated claim by the same appointment is not a conflict.
        let current: Option<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT appointment_id FROM slot_reservations
            WHERE doctor_id = $1 AND slot_date = $2 AND time_slot = $3
            "#,
        )
        .bind(key.doctor_id.as_str())
        .bind(key.date)
        .bind(key.time_slot.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("read slot holder", e))?;

        match current {
            Some((existing,)) if existing == *holder.as_uuid() => {
                Ok(ReserveOutcome::Reserved(reservation))
            }
            _ => Ok(ReserveOutcome::Busy),
        }
    }

    async fn release(&self, reservation: &Reservation) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            DELETE FROM slot_reservations
            WHERE doctor_id = $1 AND slot_date = $2 AND time_slot = $3 AND appointment_id = $4
            "#,
        )
        .bind(reservation.key.doctor_id.as_str())
        .bind(reservation.key.date)
        .bind(reservation.key.time_slot.to_string())
        .bind(reservation.holder.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("release slot", e))?;

        Ok(())
    }

    async fn reserved_slots(
        &self,
        doctor_id: &DoctorId,
        date: NaiveDate,
    ) -> Result<Vec<TimeSlot>, DomainError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT time_slot FROM slot_reservations
            WHERE doctor_id = $1 AND slot_date = $2
            ORDER BY time_slot
            "#,
        )
        .bind(doctor_id.as_str())
        .bind(date)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list reserved slots", e))?;

        rows.into_iter()
            .map(|(label,)| label.parse().map_err(|e| corrupt("time_slot", e)))
            .collect()
    }

    async fn held_reservations(
        &self,
        from: NaiveDate,
        reserved_by: Timestamp,
    ) -> Result<Vec<Reservation>, DomainError> {
        let rows: Vec<(String, NaiveDate, String, Uuid)> = sqlx::query_as(
            r#"
            SELECT doctor_id, slot_date, time_slot, appointment_id FROM slot_reservations
            WHERE slot_date >= $1 AND reserved_at <= $2
            ORDER BY reserved_at
            "#,
        )
        .bind(from)
        .bind(reserved_by.as_datetime())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list held reservations", e))?;

        rows.into_iter()
            .map(|(doctor_id, date, label, holder)| {
                let doctor_id = DoctorId::new(doctor_id).map_err(|e| corrupt("doctor_id", e))?;
                let time_slot = label.parse().map_err(|e| corrupt("time_slot", e))?;
                Ok::<_, DomainError>(Reservation {
                    key: SlotKey::new(doctor_id, date, time_slot),
                    holder: AppointmentId::from_uuid(holder),
                })
            })
            .collect()
    }
}
