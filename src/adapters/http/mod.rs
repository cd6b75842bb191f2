//! HTTP adapters - REST API implementations.

pub mod visit;

pub use visit::{visit_router, ApiError, VisitAppState, PATIENT_HEADER, STAFF_HEADER};
