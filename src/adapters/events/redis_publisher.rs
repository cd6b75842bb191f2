//! Redis pub/sub event publisher for production deployments.
//!
//! Each envelope is serialized to JSON and PUBLISHed on
//! `{channel_prefix}.{event_type}`, so subscribers can pattern-match
//! (`PSUBSCRIBE visit.appointment.*`).

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use crate::domain::foundation::{DomainError, ErrorCode, EventEnvelope};
use crate::ports::EventPublisher;

#[derive(Clone)]
pub struct RedisEventPublisher {
    conn: MultiplexedConnection,
    channel_prefix: String,
}

impl RedisEventPublisher {
    pub fn new(conn: MultiplexedConnection, channel_prefix: impl Into<String>) -> Self {
        Self {
            conn,
            channel_prefix: channel_prefix.into(),
        }
    }

    /// Connects to `url` and returns a publisher on a multiplexed connection.
    pub async fn connect(url: &str, channel_prefix: impl Into<String>) -> Result<Self, DomainError> {
        let client = redis::Client::open(url)
            .map_err(|e| DomainError::new(ErrorCode::CacheError, e.to_string()))?;
        let conn = client
            .get_multiplexed_tokio_connection()
            .await
            .map_err(|e| DomainError::new(ErrorCode::CacheError, e.to_string()))?;
        Ok(Self::new(conn, channel_prefix))
    }

    fn channel_for(&self, event_type: &str) -> String {
        channel_name(&self.channel_prefix, event_type)
    }
}

fn channel_name(prefix: &str, event_type: &str) -> String {
    if prefix.is_empty() {
        event_type.to_string()
    } else {
        format!("{}.{}", prefix, event_type)
    }
}

#[async_trait]
impl EventPublisher for RedisEventPublisher {
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError> {
        let channel = self.channel_for(&event.event_type);
        let body = serde_json::to_string(&event)
            .map_err(|e| DomainError::new(ErrorCode::InternalError, e.to_string()))?;

        let mut conn = self.conn.clone();
        let receivers: i64 = conn
            .publish(&channel, body)
            .await
            .map_err(|e: redis::RedisError| DomainError::new(ErrorCode::CacheError, e.to_string()))?;

        tracing::debug!(
            channel = %channel,
            event_id = %event.event_id,
            receivers,
            "Event published"
        );
        Ok(())
    }
}
