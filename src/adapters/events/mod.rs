//! Event publisher adapters.
//!
//! - `InMemoryEventBus` - Captures events for tests
//! - `RedisEventPublisher` - Redis pub/sub for production
//! - `TracingEventPublisher` - Logs events when no broker is configured

mod in_memory;
mod redis_publisher;
mod tracing_publisher;

pub use in_memory::InMemoryEventBus;
pub use redis_publisher::RedisEventPublisher;
pub use tracing_publisher::TracingEventPublisher;
