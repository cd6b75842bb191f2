//! Token aggregate and derived queue statistics.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    DepartmentId, DomainError, ErrorCode, PatientId, StateMachine, Timestamp, TokenId,
};

use super::TokenStatus;

/// A walk-in patient asking for a token; the store assigns the number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRequest {
    pub patient_id: PatientId,
    pub department_id: DepartmentId,
    pub queue_date: NaiveDate,
    pub requested_at: Timestamp,
}

impl TokenRequest {
    /// The waiting token this request becomes once `queue_number` is drawn.
    pub fn numbered(self, queue_number: u32) -> Token {
        Token::issue(
            self.patient_id,
            self.department_id,
            self.queue_date,
            queue_number,
            self.requested_at,
        )
    }
}

/// A walk-in patient's place in a department's queue for one day.
///
/// # Invariants
///
/// - `queue_number` is assigned once at issue and never changes
/// - status only moves forward along the legal edges of [`TokenStatus`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub id: TokenId,
    pub patient_id: PatientId,
    pub department_id: DepartmentId,
    /// Local calendar day the queue number belongs to.
    pub queue_date: NaiveDate,
    pub queue_number: u32,
    pub status: TokenStatus,
    pub issued_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Token {
    /// Issues a waiting token with a number already drawn from the counter.
    pub fn issue(
        patient_id: PatientId,
        department_id: DepartmentId,
        queue_date: NaiveDate,
        queue_number: u32,
        now: Timestamp,
    ) -> Self {
        Self {
            id: TokenId::new(),
            patient_id,
            department_id,
            queue_date,
            queue_number,
            status: TokenStatus::Waiting,
            issued_at: now,
            updated_at: now,
        }
    }

    /// Moves the token to `target`, returning the previous status.
    ///
    /// # Errors
    ///
    /// `InvalidStateTransition` for any edge not in the token lifecycle.
    pub fn advance(&mut self, target: TokenStatus, now: Timestamp) -> Result<TokenStatus, DomainError> {
        let previous = self.status;
        self.status = self.status.transition_to(target).map_err(|err| {
            DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!("Token {}: {}", self.id, err),
            )
            .with_detail("from", err.from)
            .with_detail("to", err.to)
        })?;
        self.updated_at = now;
        Ok(previous)
    }
}

/// Per-department, per-day counts derived from the token store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub department_id: DepartmentId,
    pub date: NaiveDate,
    pub waiting: u32,
    pub in_progress: u32,
    pub completed: u32,
    pub cancelled: u32,
    /// Highest queue number issued so far, if any.
    pub last_issued: Option<u32>,
}

impl QueueStats {
    /// Folds a day's tokens into counts.
    ///
    /// `last_issued` comes from the counter, not the tokens, because removed
    /// tokens still consumed their numbers.
    pub fn from_tokens<'a>(
        department_id: DepartmentId,
        date: NaiveDate,
        tokens: impl IntoIterator<Item = &'a Token>,
        last_issued: Option<u32>,
    ) -> Self {
        let mut stats = Self {
            department_id,
            date,
            waiting: 0,
            in_progress: 0,
            completed: 0,
            cancelled: 0,
            last_issued,
        };
        for token in tokens {
            match token.status {
                TokenStatus::Waiting => stats.waiting += 1,
                TokenStatus::InProgress => stats.in_progress += 1,
                TokenStatus::Completed => stats.completed += 1,
                TokenStatus::Cancelled => stats.cancelled += 1,
            }
        }
        stats
    }
}
