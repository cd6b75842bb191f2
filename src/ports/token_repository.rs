//! Token repository port, including the per-department daily counter.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::foundation::{DepartmentId, DomainError, TokenId};
use crate::domain::queue::{Token, TokenRequest, TokenStatus};

#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// Draws the next number for the request's (department, day) and stores
    /// the numbered token, as one atomic step.
    ///
    /// The first token of a key gets 1. A failed insert consumes no number,
    /// so issued numbers have no gaps. Numbers are never handed out twice,
    /// even if the token that took one is later removed.
    async fn issue(&self, request: TokenRequest) -> Result<Token, DomainError>;

    /// Highest number issued so far for (department, day).
    async fn last_queue_number(
        &self,
        department_id: &DepartmentId,
        date: NaiveDate,
    ) -> Result<Option<u32>, DomainError>;

    /// Replace a stored token whose status is still `expected`.
    ///
    /// # Errors
    ///
    /// - `TokenNotFound` if the id is unknown
    /// - `ConcurrentModification` if the stored status differs
    async fn update(&self, token: &Token, expected: TokenStatus) -> Result<(), DomainError>;

    async fn find_by_id(&self, id: &TokenId) -> Result<Option<Token>, DomainError>;

    /// Hard delete. Returns false if nothing was deleted.
    async fn delete(&self, id: &TokenId) -> Result<bool, DomainError>;

    /// All tokens of a department's day, ordered by queue number.
    async fn list_for_day(
        &self,
        department_id: &DepartmentId,
        date: NaiveDate,
    ) -> Result<Vec<Token>, DomainError>;
}
