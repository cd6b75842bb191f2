//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the engine to external systems:
//! - `clock` - Wall clock and a manual clock for tests
//! - `memory` - In-process stores for tests and local runs
//! - `postgres` - PostgreSQL stores (sqlx)
//! - `gateway` - Hosted-checkout gateway over HTTPS, and a mock
//! - `events` - Notification publishers (in-memory, Redis, tracing)
//! - `http` - REST API (axum)

pub mod clock;
pub mod events;
pub mod gateway;
pub mod http;
pub mod memory;
pub mod postgres;

pub use clock::{ManualClock, SystemClock};
pub use events::{InMemoryEventBus, RedisEventPublisher, TracingEventPublisher};
pub use gateway::{HttpGatewayConfig, HttpPaymentGateway, MockPaymentGateway};
pub use memory::{
    InMemoryAppointmentRepository, InMemoryPaymentRepository, InMemorySlotLedger,
    InMemoryTokenRepository,
};
pub use postgres::{
    PostgresAppointmentRepository, PostgresPaymentRepository, PostgresSlotLedger,
    PostgresTokenRepository,
};
