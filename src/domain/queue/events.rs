//! Queue token events.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DepartmentId, DomainEvent, PatientId, Timestamp, TokenId};

use super::TokenStatus;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TokenEvent {
    Issued {
        token_id: TokenId,
        patient_id: PatientId,
        department_id: DepartmentId,
        queue_date: NaiveDate,
        queue_number: u32,
        occurred_at: Timestamp,
    },

    /// Any status change, including cancellation.
    Advanced {
        token_id: TokenId,
        department_id: DepartmentId,
        queue_number: u32,
        from: TokenStatus,
        to: TokenStatus,
        occurred_at: Timestamp,
    },

    Removed {
        token_id: TokenId,
        department_id: DepartmentId,
        status: TokenStatus,
        admin_override: bool,
        occurred_at: Timestamp,
    },
}

impl DomainEvent for TokenEvent {
    fn event_type(&self) -> &'static str {
        match self {
            TokenEvent::Issued { .. } => "token.issued.v1",
            TokenEvent::Advanced { .. } => "token.advanced.v1",
            TokenEvent::Removed { .. } => "token.removed.v1",
        }
    }

    fn aggregate_id(&self) -> String {
        match self {
            TokenEvent::Issued { token_id, .. }
            | TokenEvent::Advanced { token_id, .. }
            | TokenEvent::Removed { token_id, .. } => token_id.to_string(),
        }
    }

    fn aggregate_type(&self) -> &'static str {
        "Token"
    }

    fn occurred_at(&self) -> Timestamp {
        match self {
            TokenEvent::Issued { occurred_at, .. }
            | TokenEvent::Advanced { occurred_at, .. }
            | TokenEvent::Removed { occurred_at, .. } => *occurred_at,
        }
    }
}
