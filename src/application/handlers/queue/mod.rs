//! Queue handlers.
//!
//! ## Commands
//! - Issuing walk-in tokens
//! - Advancing (and cancelling) tokens
//! - Removing tokens
//!
//! ## Queries
//! - Per-department queue statistics

mod advance_token;
mod generate_token;
mod get_queue_stats;
mod remove_token;

// Commands
pub use advance_token::{AdvanceTokenCommand, AdvanceTokenHandler};
pub use generate_token::{GenerateTokenCommand, GenerateTokenHandler};
pub use remove_token::{RemoveTokenCommand, RemoveTokenHandler};

// Queries
pub use get_queue_stats::{GetQueueStatsHandler, GetQueueStatsQuery};
