//! Clock port - the engine's only source of "now".

use crate::domain::foundation::Timestamp;

/// Supplies the current instant for slot validity and expiry checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}
