//! Visit HTTP module - REST endpoints over `VisitEngine`.
//!
//! - `dto` - Request/response bodies
//! - `handlers` - Axum handlers, identity extractors, error mapping
//! - `routes` - Router configuration

mod dto;
mod handlers;
mod routes;

pub use dto::*;
pub use handlers::{
    ApiError, AuthenticationRequired, Caller, PatientIdentity, StaffIdentity, VisitAppState,
    PATIENT_HEADER, STAFF_HEADER,
};
pub use routes::{appointment_routes, queue_routes, visit_router};
