//! ListAvailableSlotsHandler - Query handler for a doctor's free slots.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;

use crate::application::context::VisitContext;
use crate::domain::appointment::{SlotAvailability, TimeSlot};
use crate::domain::foundation::{DoctorId, Timestamp};
use crate::domain::VisitError;

/// Query for one doctor's day.
#[derive(Debug, Clone)]
pub struct ListAvailableSlotsQuery {
    pub doctor_id: DoctorId,
    pub date: NaiveDate,
}

/// Every grid slot of the day, flagged free or taken.
#[derive(Debug, Clone)]
pub struct ListAvailableSlotsResult {
    pub doctor_id: DoctorId,
    pub date: NaiveDate,
    pub slots: Vec<SlotAvailability>,
}

impl ListAvailableSlotsResult {
    /// Only the slots a patient could book right now.
    pub fn available(&self) -> impl Iterator<Item = TimeSlot> + '_ {
        self.slots.iter().filter(|s| s.available).map(|s| s.slot)
    }
}

/// Lists availability from the slot ledger.
///
/// A slot is unavailable if it is reserved, if the day is in the past, or
/// if it has already started today. The answer is advisory: booking still
/// races through the ledger.
pub struct ListAvailableSlotsHandler {
    ctx: Arc<VisitContext>,
}

impl ListAvailableSlotsHandler {
    pub fn new(ctx: Arc<VisitContext>) -> Self {
        Self { ctx }
    }

    pub async fn handle(
        &self,
        query: ListAvailableSlotsQuery,
    ) -> Result<ListAvailableSlotsResult, VisitError> {
        let reserved: HashSet<TimeSlot> = self
            .ctx
            .ledger
            .reserved_slots(&query.doctor_id, query.date)
            .await?
            .into_iter()
            .collect();

        let now = self.ctx.now();
        let offset = self.ctx.config.utc_offset;
        let past_day = query.date < self.ctx.today(now);

        let slots = self
            .ctx
            .config
            .grid
            .slots()
            .into_iter()
            .map(|slot| {
                let started = !now.is_before(&Timestamp::from_local(query.date, slot.start(), offset));
                SlotAvailability {
                    slot,
                    available: !past_day && !started && !reserved.contains(&slot),
                }
            })
            .collect();

        Ok(ListAvailableSlotsResult {
            doctor_id: query.doctor_id,
            date: query.date,
            slots,
        })
    }
}
