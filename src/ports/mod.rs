//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the engine and the outside world. Adapters implement these ports.
//!
//! ## Stores
//!
//! - `SlotLedger` - Exclusive doctor-slot holds
//! - `AppointmentRepository` - Appointment persistence with status CAS
//! - `PaymentRepository` - Payments, one active per subject
//! - `TokenRepository` - Walk-in tokens and the daily queue counter
//!
//! ## Collaborators
//!
//! - `PaymentGateway` - Opens orders, verifies results, reports status
//! - `EventPublisher` - Fire-and-forget notifications
//! - `Clock` - Current time

mod appointment_repository;
mod clock;
mod event_publisher;
mod payment_gateway;
mod payment_repository;
mod slot_ledger;
mod token_repository;

pub use appointment_repository::AppointmentRepository;
pub use clock::Clock;
pub use event_publisher::EventPublisher;
pub use payment_gateway::{
    GatewayError, GatewayErrorCode, GatewayOrderStatus, GatewayResult, OpenOrderRequest,
    PaymentGateway, VerifiedPayment,
};
pub use payment_repository::{InsertOutcome, PaymentRepository};
pub use slot_ledger::{Reservation, ReserveOutcome, SlotLedger};
pub use token_repository::TokenRepository;
