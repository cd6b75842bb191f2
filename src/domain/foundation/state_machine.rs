//! State machine trait for lifecycle status enums.
//!
//! Appointment, payment, and token statuses all implement [`StateMachine`]
//! so that every status change goes through the same legality check.

use std::fmt;

use thiserror::Error;

/// Rejected status change.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Cannot transition from {from} to {to}")]
pub struct TransitionError {
    pub from: String,
    pub to: String,
}

/// Trait for status enums that represent state machines.
///
/// Implementors list their legal edges once in `valid_transitions`;
/// `can_transition_to`, `transition_to`, and `is_terminal` derive from it.
pub trait StateMachine: Sized + Copy + PartialEq + fmt::Display + 'static {
    /// Returns all valid target states from current state.
    fn valid_transitions(&self) -> &'static [Self];

    /// Returns true if transition from self to target is valid.
    fn can_transition_to(&self, target: &Self) -> bool {
        self.valid_transitions().contains(target)
    }

    /// Performs transition with validation.
    fn transition_to(&self, target: Self) -> Result<Self, TransitionError> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(TransitionError {
                from: self.to_string(),
                to: target.to_string(),
            })
        }
    }

    /// Checks if current state is terminal (no valid outgoing transitions).
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}
