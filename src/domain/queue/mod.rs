//! Queue module - walk-in tokens per department and day.

mod events;
mod status;
mod token;

pub use events::TokenEvent;
pub use status::TokenStatus;
pub use token::{QueueStats, Token, TokenRequest};
