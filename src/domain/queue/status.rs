//! Walk-in token status.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{StateMachine, UnknownVariant};

/// Status of a queue token.
///
/// ```text
/// Waiting ──► InProgress ──► Completed
///    │             │
///    └──► Cancelled ◄┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenStatus {
    Waiting,
    InProgress,
    Completed,
    Cancelled,
}

impl TokenStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenStatus::Waiting => "waiting",
            TokenStatus::InProgress => "in_progress",
            TokenStatus::Completed => "completed",
            TokenStatus::Cancelled => "cancelled",
        }
    }

    /// Tokens in these states may be hard-deleted without an override.
    pub fn is_removable(&self) -> bool {
        self.is_terminal()
    }
}

impl StateMachine for TokenStatus {
    fn valid_transitions(&self) -> &'static [Self] {
        use TokenStatus::*;
        match self {
            Waiting => &[InProgress, Cancelled],
            InProgress => &[Completed, Cancelled],
            Completed | Cancelled => &[],
        }
    }
}

impl fmt::Display for TokenStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(TokenStatus::Waiting),
            "in_progress" => Ok(TokenStatus::InProgress),
            "completed" => Ok(TokenStatus::Completed),
            "cancelled" => Ok(TokenStatus::Cancelled),
            other => Err(UnknownVariant::new("token status", other)),
        }
    }
}
