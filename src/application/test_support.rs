//! Shared fixtures for handler tests.
//!
//! Wires a `VisitContext` to in-memory stores, the mock gateway, a manual
//! clock, and a capturing event bus. The clock starts at 2025-01-10 09:00
//! clinic time (UTC+05:30), which is when the clinic opens.

use std::sync::Arc;

use chrono::{FixedOffset, NaiveDate, TimeZone, Utc};

use crate::adapters::{
    InMemoryAppointmentRepository, InMemoryEventBus, InMemoryPaymentRepository,
    InMemorySlotLedger, InMemoryTokenRepository, ManualClock, MockPaymentGateway,
};
use crate::domain::appointment::{SlotGrid, TimeSlot};
use crate::domain::foundation::{DepartmentId, DoctorId, Money, PatientId};

use super::context::VisitContext;
use super::EngineConfig;

pub(crate) struct Harness {
    pub ctx: Arc<VisitContext>,
    pub appointments: InMemoryAppointmentRepository,
    pub payments: InMemoryPaymentRepository,
    pub tokens: InMemoryTokenRepository,
    pub ledger: InMemorySlotLedger,
    pub gateway: MockPaymentGateway,
    pub events: Arc<InMemoryEventBus>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(|config| config)
    }

    pub fn with_config(adjust: impl FnOnce(EngineConfig) -> EngineConfig) -> Self {
        let appointments = InMemoryAppointmentRepository::new();
        let payments = InMemoryPaymentRepository::new();
        let tokens = InMemoryTokenRepository::new();
        let ledger = InMemorySlotLedger::new();
        let gateway = MockPaymentGateway::new();
        let events = Arc::new(InMemoryEventBus::new());
        let clock = Arc::new(ManualClock::at(
            Utc.with_ymd_and_hms(2025, 1, 10, 3, 30, 0).unwrap(),
        ));

        let ctx = Arc::new(VisitContext::new(
            Arc::new(appointments.clone()),
            Arc::new(payments.clone()),
            Arc::new(tokens.clone()),
            Arc::new(ledger.clone()),
            Arc::new(gateway.clone()),
            events.clone(),
            clock.clone(),
            adjust(default_config()),
        ));

        Self {
            ctx,
            appointments,
            payments,
            tokens,
            ledger,
            gateway,
            events,
            clock,
        }
    }
}

pub(crate) fn default_config() -> EngineConfig {
    let grid = SlotGrid::new(
        TimeSlot::from_hm(9, 0).unwrap(),
        TimeSlot::from_hm(17, 0).unwrap(),
        30,
    )
    .unwrap();
    EngineConfig::new(grid, Money::new(50_000, "INR").unwrap())
        .with_utc_offset(FixedOffset::east_opt(330 * 60).unwrap())
}

pub(crate) fn clinic_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 10).unwrap()
}

pub(crate) fn patient(id: &str) -> PatientId {
    PatientId::new(id).unwrap()
}

pub(crate) fn doctor(id: &str) -> DoctorId {
    DoctorId::new(id).unwrap()
}

pub(crate) fn department(id: &str) -> DepartmentId {
    DepartmentId::new(id).unwrap()
}
