//! Visit Engine - Appointment, payment, and walk-in queue lifecycle
//!
//! This crate holds doctor slots for unpaid bookings, settles them through a
//! hosted-checkout gateway exactly once, sweeps lapsed holds, reconciles
//! orphaned payments, and issues gap-free walk-in queue numbers.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
