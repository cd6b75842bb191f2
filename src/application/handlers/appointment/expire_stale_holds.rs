//! ExpireStaleHoldsHandler - Sweeps pending appointments whose hold lapsed.
//!
//! Run periodically by the sweeper. Each candidate is re-read under its
//! lock, so an appointment confirmed between the scan and the write is left
//! alone.
//!
//! A second pass frees orphaned slot holds: holds older than the hold window
//! whose appointment was never stored (a crash between reserve and save) or
//! already finished (a release that failed). Without it such a slot would
//! stay hidden for good.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::application::context::VisitContext;
use crate::application::locks::LockKey;
use crate::domain::appointment::AppointmentStatus;
use crate::domain::foundation::{ErrorCode, Timestamp};
use crate::domain::VisitError;

/// Outcome counts of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HoldSweepReport {
    /// Holds cancelled before the visit started.
    pub cancelled: u32,
    /// Holds whose visit time had already passed.
    pub expired: u32,
    /// Candidates that changed under the sweep or failed to write.
    pub skipped: u32,
    /// Slot holds freed because no live appointment owned them.
    pub orphaned: u32,
}

impl HoldSweepReport {
    pub fn total(&self) -> u32 {
        self.cancelled + self.expired + self.skipped + self.orphaned
    }
}

pub struct ExpireStaleHoldsHandler {
    ctx: Arc<VisitContext>,
}

impl ExpireStaleHoldsHandler {
    pub fn new(ctx: Arc<VisitContext>) -> Self {
        Self { ctx }
    }

    pub async fn handle(&self) -> Result<HoldSweepReport, VisitError> {
        let now = self.ctx.now();
        let hold_minutes = self.ctx.config.hold_minutes;
        let cutoff = now.plus_minutes(-hold_minutes);

        let candidates = self
            .ctx
            .appointments
            .find_pending_created_by(cutoff, self.ctx.config.batch_size)
            .await?;

        let mut report = HoldSweepReport::default();
        for candidate in candidates {
            let _guard = self
                .ctx
                .locks
                .acquire(LockKey::Appointment(candidate.id))
                .await;

            let current = match self.ctx.appointments.find_by_id(&candidate.id).await {
                Ok(Some(current)) if current.is_hold_expired(now, hold_minutes) => current,
                Ok(_) => {
                    report.skipped += 1;
                    continue;
                }
                Err(e) => {
                    tracing::warn!(appointment_id = %candidate.id, error = %e, "Sweep read failed");
                    report.skipped += 1;
                    continue;
                }
            };

            match self.ctx.lapse_hold(current, now).await {
                Ok(lapsed) if lapsed.status == AppointmentStatus::Expired => report.expired += 1,
                Ok(_) => report.cancelled += 1,
                Err(e) => {
                    if e.code() != ErrorCode::InvalidState {
                        tracing::warn!(
                            appointment_id = %candidate.id,
                            error = %e,
                            "Failed to lapse hold; will retry next sweep"
                        );
                    }
                    report.skipped += 1;
                }
            }
        }

        report.orphaned = self.release_orphaned_holds(now).await?;

        if report.total() > 0 {
            tracing::info!(
                cancelled = report.cancelled,
                expired = report.expired,
                skipped = report.skipped,
                orphaned = report.orphaned,
                "Hold sweep finished"
            );
        }
        Ok(report)
    }

    async fn release_orphaned_holds(&self, now: Timestamp) -> Result<u32, VisitError> {
        let reserved_by = now.plus_minutes(-self.ctx.config.hold_minutes);
        let holds = self
            .ctx
            .ledger
            .held_reservations(self.ctx.today(now), reserved_by)
            .await?;
        if holds.is_empty() {
            return Ok(0);
        }

        let holders: Vec<_> = holds.iter().map(|r| r.holder).collect();
        let owners: HashMap<_, _> = self
            .ctx
            .appointments
            .find_by_ids(&holders)
            .await?
            .into_iter()
            .map(|a| (a.id, a.status))
            .collect();

        let mut released = 0;
        for reservation in holds {
            let owner = owners.get(&reservation.holder).copied();
            if matches!(
                owner,
                Some(AppointmentStatus::Pending | AppointmentStatus::Confirmed)
            ) {
                continue;
            }
            match self.ctx.ledger.release(&reservation).await {
                Ok(()) => {
                    released += 1;
                    tracing::info!(
                        audit = true,
                        slot = %reservation.key,
                        appointment_id = %reservation.holder,
                        owner_state = owner.map_or("missing", |s| s.as_str()),
                        "Released orphaned slot hold"
                    );
                }
                Err(e) => tracing::warn!(
                    slot = %reservation.key,
                    error = %e,
                    "Failed to release orphaned hold; will retry next sweep"
                ),
            }
        }
        Ok(released)
    }
}
