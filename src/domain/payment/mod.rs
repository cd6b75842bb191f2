//! Payment module - one payment attempt per payable subject.

mod aggregate;
mod events;
mod status;

pub use aggregate::{GatewaySession, Payment, REASON_GATEWAY_TIMEOUT, REASON_SUBJECT_NOT_PAYABLE};
pub use events::PaymentEvent;
pub use status::{PaymentStatus, PaymentSubject};
