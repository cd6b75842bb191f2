//! Appointment lifecycle status.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{StateMachine, UnknownVariant};

/// Lifecycle status of an appointment.
///
/// Only `Pending` has outgoing edges; everything else is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    /// Slot held, awaiting payment.
    Pending,
    /// Paid and booked.
    Confirmed,
    /// Cancelled by the patient, staff, or hold expiry.
    Cancelled,
    /// Visit time passed while still unpaid.
    Expired,
}

impl AppointmentStatus {
    /// Canonical storage and wire form.
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Expired => "expired",
        }
    }

    /// True while the appointment occupies its slot.
    pub fn holds_slot(&self) -> bool {
        matches!(self, AppointmentStatus::Pending | AppointmentStatus::Confirmed)
    }
}

impl StateMachine for AppointmentStatus {
    fn valid_transitions(&self) -> &'static [Self] {
        use AppointmentStatus::*;
        match self {
            Pending => &[Confirmed, Cancelled, Expired],
            Confirmed | Cancelled | Expired => &[],
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AppointmentStatus::Pending),
            "confirmed" => Ok(AppointmentStatus::Confirmed),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            "expired" => Ok(AppointmentStatus::Expired),
            other => Err(UnknownVariant::new("appointment status", other)),
        }
    }
}

/// Why an appointment was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancellationReason {
    PatientRequest,
    HoldExpired,
    StaffRequest,
}

impl CancellationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CancellationReason::PatientRequest => "patient_request",
            CancellationReason::HoldExpired => "hold_expired",
            CancellationReason::StaffRequest => "staff_request",
        }
    }
}

impl fmt::Display for CancellationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CancellationReason {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "patient_request" => Ok(CancellationReason::PatientRequest),
            "hold_expired" => Ok(CancellationReason::HoldExpired),
            "staff_request" => Ok(CancellationReason::StaffRequest),
            other => Err(UnknownVariant::new("cancellation reason", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_can_reach_every_terminal_state() {
        for target in [
            AppointmentStatus::Confirmed,
            AppointmentStatus::Cancelled,
            AppointmentStatus::Expired,
        ] {
            assert!(AppointmentStatus::Pending.can_transition_to(&target));
        }
    }

    #[test]
    fn confirmed_and_cancelled_are_immutable() {
        assert!(AppointmentStatus::Confirmed.is_terminal());
        assert!(AppointmentStatus::Cancelled.is_terminal());
        assert!(AppointmentStatus::Confirmed
            .transition_to(AppointmentStatus::Cancelled)
            .is_err());
    }

    #[test]
    fn only_active_states_hold_the_slot() {
        assert!(AppointmentStatus::Pending.holds_slot());
        assert!(AppointmentStatus::Confirmed.holds_slot());
        assert!(!AppointmentStatus::Cancelled.holds_slot());
        assert!(!AppointmentStatus::Expired.holds_slot());
    }

    #[test]
    fn parsing_is_exact() {
        assert_eq!("pending".parse(), Ok(AppointmentStatus::Pending));
        assert!("PENDING".parse::<AppointmentStatus>().is_err());
        assert!("Confirmed ".parse::<AppointmentStatus>().is_err());
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&CancellationReason::HoldExpired).unwrap();
        assert_eq!(json, "\"hold_expired\"");
    }
}
