//! Strongly-typed identifier value objects.
//!
//! Records owned by the engine (appointments, payments, tokens) get UUID
//! identifiers minted here. Identities owned by other systems (patients,
//! doctors, departments, invoices, staff) arrive as opaque strings and are
//! only checked for emptiness.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::ValidationError;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wraps an existing UUID.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

macro_rules! external_id {
    ($(#[$meta:meta])* $name:ident, $field:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates the identifier, rejecting blank values.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                let trimmed = id.trim();
                if trimmed.is_empty() {
                    return Err(ValidationError::empty_field($field));
                }
                Ok(Self(trimmed.to_string()))
            }

            /// Returns the inner string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for an appointment.
    AppointmentId
);

uuid_id!(
    /// Unique identifier for a payment attempt.
    PaymentId
);

uuid_id!(
    /// Unique identifier for a walk-in queue token.
    TokenId
);

external_id!(
    /// Patient identity supplied by the upstream identity provider.
    PatientId,
    "patient_id"
);

external_id!(
    /// Doctor identifier (e.g. `D101`).
    DoctorId,
    "doctor_id"
);

external_id!(
    /// Department (or doctor) a walk-in queue belongs to.
    DepartmentId,
    "department_id"
);

external_id!(
    /// Invoice identifier issued by the external billing system.
    InvoiceId,
    "invoice_id"
);

external_id!(
    /// Staff identity supplied by the upstream identity provider.
    StaffId,
    "staff_id"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appointment_id_generates_unique_values() {
        assert_ne!(AppointmentId::new(), AppointmentId::new());
    }

    #[test]
    fn payment_id_parses_from_valid_string() {
        let uuid_str = "550e8400-e29b-41d4-a716-446655440000";
        let id: PaymentId = uuid_str.parse().unwrap();
        assert_eq!(id.to_string(), uuid_str);
    }

    #[test]
    fn token_id_serializes_as_bare_uuid() {
        let uuid_str = "550e8400-e29b-41d4-a716-446655440000";
        let id: TokenId = uuid_str.parse().unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", uuid_str));
    }

    #[test]
    fn doctor_id_trims_whitespace() {
        let id = DoctorId::new("  D101 ").unwrap();
        assert_eq!(id.as_str(), "D101");
    }

    #[test]
    fn patient_id_rejects_blank_string() {
        match PatientId::new("   ") {
            Err(ValidationError::EmptyField { field }) => assert_eq!(field, "patient_id"),
            other => panic!("Expected EmptyField error, got {:?}", other),
        }
    }

    #[test]
    fn external_ids_reject_empty_json_strings() {
        let result: Result<DepartmentId, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());

        let id: DepartmentId = serde_json::from_str("\"cardiology\"").unwrap();
        assert_eq!(id.as_str(), "cardiology");
    }
}
