//! PostgreSQL implementation of TokenRepository.
//!
//! Queue numbers come from `queue_counters`, bumped with an upsert so
//! concurrent issuers serialize on the counter row. The bump and the token
//! insert share one transaction, so a failed insert rolls the counter back.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{
    DepartmentId, DomainError, ErrorCode, PatientId, Timestamp, TokenId,
};
use crate::domain::queue::{Token, TokenRequest, TokenStatus};
use crate::ports::TokenRepository;

use super::{corrupt, db_error};

pub struct PostgresTokenRepository {
    pool: PgPool,
}

impl PostgresTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TokenRow {
    id: Uuid,
    patient_id: String,
    department_id: String,
    queue_date: NaiveDate,
    queue_number: i32,
    status: String,
    issued_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TokenRow> for Token {
    type Error = DomainError;

    fn try_from(row: TokenRow) -> Result<Self, Self::Error> {
        Ok(Token {
            id: TokenId::from_uuid(row.id),
            patient_id: PatientId::new(row.patient_id).map_err(|e| corrupt("patient_id", e))?,
            department_id: DepartmentId::new(row.department_id)
                .map_err(|e| corrupt("department_id", e))?,
            queue_date: row.queue_date,
            queue_number: u32::try_from(row.queue_number)
                .map_err(|e| corrupt("queue_number", e))?,
            status: row.status.parse().map_err(|e| corrupt("status", e))?,
            issued_at: Timestamp::from_datetime(row.issued_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn number_column(number: u32) -> Result<i32, DomainError> {
    i32::try_from(number)
        .map_err(|_| DomainError::database(format!("Queue number {} out of range", number)))
}

fn number_from_column(number: i32) -> Result<u32, DomainError> {
    u32::try_from(number).map_err(|e| corrupt("last_number", e))
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, patient_id, department_id, queue_date, queue_number, status, issued_at, updated_at
    FROM tokens
"#;

#[async_trait]
impl TokenRepository for PostgresTokenRepository {
    async fn issue(&self, request: TokenRequest) -> Result<Token, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("start token transaction", e))?;

        let (number,): (i32,) = sqlx::query_as(
            r#"
            INSERT INTO queue_counters (department_id, queue_date, last_number)
            VALUES ($1, $2, 1)
            ON CONFLICT (department_id, queue_date)
            DO UPDATE SET last_number = queue_counters.last_number + 1
            RETURNING last_number
            "#,
        )
        .bind(request.department_id.as_str())
        .bind(request.queue_date)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| db_error("increment queue counter", e))?;

        let token = request.numbered(number_from_column(number)?);
        sqlx::query(
            r#"
            INSERT INTO tokens (
                id, patient_id, department_id, queue_date, queue_number, status,
                issued_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(token.id.as_uuid())
        .bind(token.patient_id.as_str())
        .bind(token.department_id.as_str())
        .bind(token.queue_date)
        .bind(number_column(token.queue_number)?)
        .bind(token.status.as_str())
        .bind(token.issued_at.as_datetime())
        .bind(token.updated_at.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("save token", e))?;

        tx.commit()
            .await
            .map_err(|e| db_error("commit token", e))?;
        Ok(token)
    }

    async fn last_queue_number(
        &self,
        department_id: &DepartmentId,
        date: NaiveDate,
    ) -> Result<Option<u32>, DomainError> {
        let row: Option<(i32,)> = sqlx::query_as(
            "SELECT last_number FROM queue_counters WHERE department_id = $1 AND queue_date = $2",
        )
        .bind(department_id.as_str())
        .bind(date)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("read queue counter", e))?;

        row.map(|(n,)| number_from_column(n)).transpose()
    }

    async fn update(&self, token: &Token, expected: TokenStatus) -> Result<(), DomainError> {
        let result = sqlx::query(
            "UPDATE tokens SET status = $2, updated_at = $3 WHERE id = $1 AND status = $4",
        )
        .bind(token.id.as_uuid())
        .bind(token.status.as_str())
        .bind(token.updated_at.as_datetime())
        .bind(expected.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("update token", e))?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        match self.find_by_id(&token.id).await? {
            None => Err(DomainError::new(ErrorCode::TokenNotFound, "Token not found")
                .with_detail("id", token.id.to_string())),
            Some(stored) => Err(DomainError::new(
                ErrorCode::ConcurrentModification,
                format!(
                    "Token {} is {}, expected {}",
                    token.id,
                    stored.status.as_str(),
                    expected.as_str()
                ),
            )),
        }
    }

    async fn find_by_id(&self, id: &TokenId) -> Result<Option<Token>, DomainError> {
        let row: Option<TokenRow> = sqlx::query_as(&format!("{} WHERE id = $1", SELECT_COLUMNS))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("find token", e))?;

        row.map(Token::try_from).transpose()
    }

    async fn delete(&self, id: &TokenId) -> Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM tokens WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("delete token", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_for_day(
        &self,
        department_id: &DepartmentId,
        date: NaiveDate,
    ) -> Result<Vec<Token>, DomainError> {
        let rows: Vec<TokenRow> = sqlx::query_as(&format!(
            "{} WHERE department_id = $1 AND queue_date = $2 ORDER BY queue_number",
            SELECT_COLUMNS
        ))
        .bind(department_id.as_str())
        .bind(date)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list tokens", e))?;

        rows.into_iter().map(Token::try_from).collect()
    }
}
