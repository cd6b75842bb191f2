//! Payment status and subject.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{
    AppointmentId, DomainError, InvoiceId, StateMachine, UnknownVariant,
};

/// Payment attempt status. Success and failure are both terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Initiated,
    Success,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Initiated => "initiated",
            PaymentStatus::Success => "success",
            PaymentStatus::Failed => "failed",
        }
    }

    /// True for statuses that block a second payment on the same subject.
    pub fn is_active(&self) -> bool {
        matches!(self, PaymentStatus::Initiated | PaymentStatus::Success)
    }
}

impl StateMachine for PaymentStatus {
    fn valid_transitions(&self) -> &'static [Self] {
        match self {
            PaymentStatus::Initiated => &[PaymentStatus::Success, PaymentStatus::Failed],
            PaymentStatus::Success | PaymentStatus::Failed => &[],
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initiated" => Ok(PaymentStatus::Initiated),
            "success" => Ok(PaymentStatus::Success),
            "failed" => Ok(PaymentStatus::Failed),
            other => Err(UnknownVariant::new("payment status", other)),
        }
    }
}

/// The object a payment settles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "subject_type", content = "subject_id", rename_all = "snake_case")]
pub enum PaymentSubject {
    Appointment(AppointmentId),
    Invoice(InvoiceId),
}

impl PaymentSubject {
    /// Discriminator stored alongside the id.
    pub fn subject_type(&self) -> &'static str {
        match self {
            PaymentSubject::Appointment(_) => "appointment",
            PaymentSubject::Invoice(_) => "invoice",
        }
    }

    pub fn subject_id(&self) -> String {
        match self {
            PaymentSubject::Appointment(id) => id.to_string(),
            PaymentSubject::Invoice(id) => id.to_string(),
        }
    }

    /// Rebuilds a subject from its stored columns.
    pub fn parse(subject_type: &str, subject_id: &str) -> Result<Self, DomainError> {
        match subject_type {
            "appointment" => subject_id
                .parse::<AppointmentId>()
                .map(PaymentSubject::Appointment)
                .map_err(|e| DomainError::validation("subject_id", e.to_string())),
            "invoice" => Ok(PaymentSubject::Invoice(InvoiceId::new(subject_id)?)),
            other => Err(UnknownVariant::new("payment subject type", other).into()),
        }
    }
}

impl fmt::Display for PaymentSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.subject_type(), self.subject_id())
    }
}
