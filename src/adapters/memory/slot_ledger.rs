//! In-memory slot ledger.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::domain::appointment::{SlotKey, TimeSlot};
use crate::domain::foundation::{AppointmentId, DoctorId, DomainError, Timestamp};
use crate::ports::{Reservation, ReserveOutcome, SlotLedger};

#[derive(Debug, Clone, Copy)]
struct Hold {
    holder: AppointmentId,
    reserved_at: Timestamp,
}

/// Slot holds keyed by doctor, day, and slot.
#[derive(Debug, Clone, Default)]
pub struct InMemorySlotLedger {
    holds: Arc<Mutex<HashMap<SlotKey, Hold>>>,
}

impl InMemorySlotLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current holder of a slot, if any.
    pub async fn holder(&self, key: &SlotKey) -> Option<AppointmentId> {
        self.holds.lock().await.get(key).map(|hold| hold.holder)
    }

    pub async fn hold_count(&self) -> usize {
        self.holds.lock().await.len()
    }
}

#[async_trait]
impl SlotLedger for InMemorySlotLedger {
    async fn try_reserve(
        &self,
        key: &SlotKey,
        holder: AppointmentId,
        reserved_at: Timestamp,
    ) -> Result<ReserveOutcome, DomainError> {
        let mut holds = self.holds.lock().await;
        match holds.get(key) {
            Some(existing) if existing.holder != holder => Ok(ReserveOutcome::Busy),
            Some(_) => Ok(ReserveOutcome::Reserved(Reservation {
                key: key.clone(),
                holder,
            })),
            None => {
                holds.insert(
                    key.clone(),
                    Hold {
                        holder,
                        reserved_at,
                    },
                );
                Ok(ReserveOutcome::Reserved(Reservation {
                    key: key.clone(),
                    holder,
                }))
            }
        }
    }

    async fn release(&self, reservation: &Reservation) -> Result<(), DomainError> {
        let mut holds = self.holds.lock().await;
        if holds.get(&reservation.key).map(|hold| hold.holder) == Some(reservation.holder) {
            holds.remove(&reservation.key);
        }
        Ok(())
    }

    async fn reserved_slots(
        &self,
        doctor_id: &DoctorId,
        date: NaiveDate,
    ) -> Result<Vec<TimeSlot>, DomainError> {
        let holds = self.holds.lock().await;
        let mut slots: Vec<TimeSlot> = holds
            .keys()
            .filter(|key| &key.doctor_id == doctor_id && key.date == date)
            .map(|key| key.time_slot)
            .collect();
        slots.sort();
        Ok(slots)
    }

    async fn held_reservations(
        &self,
        from: NaiveDate,
        reserved_by: Timestamp,
    ) -> Result<Vec<Reservation>, DomainError> {
        let holds = self.holds.lock().await;
        let mut found: Vec<(Timestamp, Reservation)> = holds
            .iter()
            .filter(|(key, hold)| key.date >= from && !hold.reserved_at.is_after(&reserved_by))
            .map(|(key, hold)| {
                (
                    hold.reserved_at,
                    Reservation {
                        key: key.clone(),
                        holder: hold.holder,
                    },
                )
            })
            .collect();
        found.sort_by_key(|(reserved_at, _)| *reserved_at);
        Ok(found.into_iter().map(|(_, reservation)| reservation).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(slot: &str) -> SlotKey {
        SlotKey::new(
            DoctorId::new("D101").unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            slot.parse().unwrap(),
        )
    }

    #[tokio::test]
    async fn second_holder_is_busy() {
        let ledger = InMemorySlotLedger::new();
        let first = AppointmentId::new();

        let outcome = ledger.try_reserve(&key("10:00"), first, Timestamp::now()).await.unwrap();
        assert!(matches!(outcome, ReserveOutcome::Reserved(_)));

        let outcome = ledger
            .try_reserve(&key("10:00"), AppointmentId::new(), Timestamp::now())
            .await
            .unwrap();
        assert_eq!(outcome, ReserveOutcome::Busy);
        assert_eq!(ledger.holder(&key("10:00")).await, Some(first));
    }

    #[tokio::test]
    async fn release_by_a_stranger_is_a_no_op() {
        let ledger = InMemorySlotLedger::new();
        let holder = AppointmentId::new();
        ledger.try_reserve(&key("10:00"), holder, Timestamp::now()).await.unwrap();

        ledger
            .release(&Reservation {
                key: key("10:00"),
                holder: AppointmentId::new(),
            })
            .await
            .unwrap();
        assert_eq!(ledger.holder(&key("10:00")).await, Some(holder));

        ledger
            .release(&Reservation {
                key: key("10:00"),
                holder,
            })
            .await
            .unwrap();
        assert_eq!(ledger.hold_count().await, 0);
    }

    #[tokio::test]
    async fn reserved_slots_are_sorted_and_scoped() {
        let ledger = InMemorySlotLedger::new();
        ledger.try_reserve(&key("11:00"), AppointmentId::new(), Timestamp::now()).await.unwrap();
        ledger.try_reserve(&key("09:30"), AppointmentId::new(), Timestamp::now()).await.unwrap();
        let other_doctor = SlotKey::new(
            DoctorId::new("D202").unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            "10:00".parse().unwrap(),
        );
        ledger.try_reserve(&other_doctor, AppointmentId::new(), Timestamp::now()).await.unwrap();

        let slots = ledger
            .reserved_slots(
                &DoctorId::new("D101").unwrap(),
                NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            )
            .await
            .unwrap();
        let labels: Vec<String> = slots.iter().map(|s| s.to_string()).collect();
        assert_eq!(labels, vec!["09:30", "11:00"]);
    }

    #[tokio::test]
    async fn held_reservations_filter_by_day_and_age() {
        let ledger = InMemorySlotLedger::new();
        let base = Timestamp::now();
        let old = AppointmentId::new();
        ledger.try_reserve(&key("10:00"), old, base).await.unwrap();
        ledger
            .try_reserve(&key("10:30"), AppointmentId::new(), base.plus_minutes(10))
            .await
            .unwrap();
        let yesterday = SlotKey::new(
            DoctorId::new("D101").unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 9).unwrap(),
            "10:00".parse().unwrap(),
        );
        ledger
            .try_reserve(&yesterday, AppointmentId::new(), base)
            .await
            .unwrap();

        let found = ledger
            .held_reservations(NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(), base.plus_minutes(5))
            .await
            .unwrap();
        assert_eq!(
            found,
            vec![Reservation {
                key: key("10:00"),
                holder: old,
            }]
        );
    }
}
