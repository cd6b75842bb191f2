//! PostgreSQL implementation of PaymentRepository.
//!
//! The partial unique index `payments_one_active_per_subject` is what keeps a
//! subject from carrying two live payments; `insert_if_no_active` leans on it
//! with `ON CONFLICT DO NOTHING` and then reads back the winner.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{DomainError, ErrorCode, Money, PaymentId, Timestamp};
use crate::domain::payment::{GatewaySession, Payment, PaymentStatus, PaymentSubject};
use crate::ports::{InsertOutcome, PaymentRepository};

use super::{corrupt, db_error};

/// Attempts to read back the conflicting payment before giving up.
///
/// The winner can settle to FAILED between our conflict and our read, in
/// which case the insert is retried.
const INSERT_ATTEMPTS: usize = 3;

pub struct PostgresPaymentRepository {
    pool: PgPool,
}

impl PostgresPaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn try_insert(&self, payment: &Payment) -> Result<bool, DomainError> {
        let session = payment
            .session
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| DomainError::database(format!("Failed to encode session: {}", e)))?;

        let result = sqlx::query(
            r#"
            INSERT INTO payments (
                id, subject_type, subject_id, amount_minor, currency, provider, status,
                gateway_ref, payment_ref, session, failure_reason,
                created_at, updated_at, completed_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (subject_type, subject_id) WHERE status IN ('initiated', 'success')
            DO NOTHING
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(payment.subject.subject_type())
        .bind(payment.subject.subject_id())
        .bind(payment.amount.amount_minor())
        .bind(payment.amount.currency())
        .bind(&payment.provider)
        .bind(payment.status.as_str())
        .bind(&payment.gateway_ref)
        .bind(&payment.payment_ref)
        .bind(session)
        .bind(&payment.failure_reason)
        .bind(payment.created_at.as_datetime())
        .bind(payment.updated_at.as_datetime())
        .bind(payment.completed_at.as_ref().map(|t| *t.as_datetime()))
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("insert payment", e))?;

        Ok(result.rows_affected() == 1)
    }
}

/// Database row representation of a payment.
#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    subject_type: String,
    subject_id: String,
    amount_minor: i64,
    currency: String,
    provider: String,
    status: String,
    gateway_ref: Option<String>,
    payment_ref: Option<String>,
    session: Option<serde_json::Value>,
    failure_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = DomainError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let session: Option<GatewaySession> = row
            .session
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| corrupt("session", e))?;

        Ok(Payment {
            id: PaymentId::from_uuid(row.id),
            subject: PaymentSubject::parse(&row.subject_type, &row.subject_id)
                .map_err(|e| corrupt("subject", e))?,
            amount: Money::new(row.amount_minor, row.currency.trim())
                .map_err(|e| corrupt("amount", e))?,
            provider: row.provider,
            status: row.status.parse().map_err(|e| corrupt("status", e))?,
            gateway_ref: row.gateway_ref,
            payment_ref: row.payment_ref,
            session,
            failure_reason: row.failure_reason,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
            completed_at: row.completed_at.map(Timestamp::from_datetime),
        })
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, subject_type, subject_id, amount_minor, currency, provider, status,
           gateway_ref, payment_ref, session, failure_reason,
           created_at, updated_at, completed_at
    FROM payments
"#;

#[async_trait]
impl PaymentRepository for PostgresPaymentRepository {
    async fn insert_if_no_active(&self, payment: &Payment) -> Result<InsertOutcome, DomainError> {
        for _ in 0..INSERT_ATTEMPTS {
            if self.try_insert(payment).await? {
                return Ok(InsertOutcome::Inserted);
            }
            if let Some(existing) = self.find_active_by_subject(&payment.subject).await? {
                return Ok(InsertOutcome::Existing(existing));
            }
        }

        Err(DomainError::new(
            ErrorCode::ConcurrentModification,
            format!("Active payment for {} kept changing", payment.subject),
        ))
    }

    async fn update(&self, payment: &Payment, expected: PaymentStatus) -> Result<(), DomainError> {
        let session = payment
            .session
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| DomainError::database(format!("Failed to encode session: {}", e)))?;

        let result = sqlx::query(
            r#"
            UPDATE payments SET
                status = $2,
                gateway_ref = $3,
                payment_ref = $4,
                session = $5,
                failure_reason = $6,
                updated_at = $7,
                completed_at = $8
            WHERE id = $1 AND status = $9
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(payment.status.as_str())
        .bind(&payment.gateway_ref)
        .bind(&payment.payment_ref)
        .bind(session)
        .bind(&payment.failure_reason)
        .bind(payment.updated_at.as_datetime())
        .bind(payment.completed_at.as_ref().map(|t| *t.as_datetime()))
        .bind(expected.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("update payment", e))?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        match self.find_by_id(&payment.id).await? {
            None => Err(
                DomainError::new(ErrorCode::PaymentNotFound, "Payment not found")
                    .with_detail("id", payment.id.to_string()),
            ),
            Some(stored) => Err(DomainError::new(
                ErrorCode::ConcurrentModification,
                format!(
                    "Payment {} is {}, expected {}",
                    payment.id,
                    stored.status.as_str(),
                    expected.as_str()
                ),
            )),
        }
    }

    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<Payment>, DomainError> {
        let row: Option<PaymentRow> = sqlx::query_as(&format!("{} WHERE id = $1", SELECT_COLUMNS))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("find payment", e))?;

        row.map(Payment::try_from).transpose()
    }

    async fn find_active_by_subject(
        &self,
        subject: &PaymentSubject,
    ) -> Result<Option<Payment>, DomainError> {
        let row: Option<PaymentRow> = sqlx::query_as(&format!(
            "{} WHERE subject_type = $1 AND subject_id = $2 AND status IN ('initiated', 'success')",
            SELECT_COLUMNS
        ))
        .bind(subject.subject_type())
        .bind(subject.subject_id())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("find active payment", e))?;

        row.map(Payment::try_from).transpose()
    }

    async fn find_initiated_before(
        &self,
        cutoff: Timestamp,
        limit: u32,
    ) -> Result<Vec<Payment>, DomainError> {
        let rows: Vec<PaymentRow> = sqlx::query_as(&format!(
            "{} WHERE status = 'initiated' AND created_at < $1 ORDER BY created_at LIMIT $2",
            SELECT_COLUMNS
        ))
        .bind(cutoff.as_datetime())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list initiated payments", e))?;

        rows.into_iter().map(Payment::try_from).collect()
    }
}
