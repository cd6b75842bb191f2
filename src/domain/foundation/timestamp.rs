//! Timestamp value object for immutable points in time.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Immutable point in time, always UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a timestamp for the current moment.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a timestamp from a DateTime<Utc>.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Builds the UTC instant of a local wall-clock time on `date`.
    pub fn from_local(date: NaiveDate, time: NaiveTime, offset: FixedOffset) -> Self {
        let local = date.and_time(time);
        let instant = offset
            .from_local_datetime(&local)
            .single()
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| local.and_utc());
        Self(instant)
    }

    /// Returns the inner DateTime.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Checks if this timestamp is before another.
    pub fn is_before(&self, other: &Timestamp) -> bool {
        self.0 < other.0
    }

    /// Checks if this timestamp is after another.
    pub fn is_after(&self, other: &Timestamp) -> bool {
        self.0 > other.0
    }

    /// Returns the duration from another timestamp to this one.
    ///
    /// Negative if `other` is after `self`.
    pub fn duration_since(&self, other: &Timestamp) -> Duration {
        self.0.signed_duration_since(other.0)
    }

    /// Returns a new timestamp shifted by `minutes` (negative values go back).
    pub fn plus_minutes(&self, minutes: i64) -> Self {
        Self(self.0 + Duration::minutes(minutes))
    }

    /// Returns a new timestamp shifted by `secs` seconds.
    pub fn plus_secs(&self, secs: i64) -> Self {
        Self(self.0 + Duration::seconds(secs))
    }

    /// Calendar day of this instant at the given UTC offset.
    pub fn local_date(&self, offset: FixedOffset) -> NaiveDate {
        self.0.with_timezone(&offset).date_naive()
    }

    /// Wall-clock time of this instant at the given UTC offset.
    pub fn local_time(&self, offset: FixedOffset) -> NaiveTime {
        self.0.with_timezone(&offset).time()
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn at(rfc3339: &str) -> Timestamp {
        Timestamp::from_datetime(
            DateTime::parse_from_rfc3339(rfc3339)
                .unwrap()
                .with_timezone(&Utc),
        )
    }

    #[test]
    fn plus_minutes_moves_forward_and_back() {
        let ts = at("2025-01-10T10:00:00Z");
        assert_eq!(ts.plus_minutes(5), at("2025-01-10T10:05:00Z"));
        assert_eq!(ts.plus_minutes(-60), at("2025-01-10T09:00:00Z"));
    }

    #[test]
    fn duration_since_is_signed() {
        let earlier = at("2025-01-10T10:00:00Z");
        let later = at("2025-01-10T10:05:00Z");
        assert_eq!(later.duration_since(&earlier).num_minutes(), 5);
        assert_eq!(earlier.duration_since(&later).num_minutes(), -5);
    }

    #[test]
    fn local_date_respects_offset() {
        let ts = at("2025-01-10T20:30:00Z");
        let ist = FixedOffset::east_opt(5 * 3600 + 1800).unwrap();
        assert_eq!(ts.local_date(ist), NaiveDate::from_ymd_opt(2025, 1, 11).unwrap());
        assert_eq!(ts.local_time(ist).hour(), 2);
    }

    #[test]
    fn from_local_converts_to_utc() {
        let ist = FixedOffset::east_opt(5 * 3600 + 1800).unwrap();
        let ts = Timestamp::from_local(
            NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            ist,
        );
        assert_eq!(ts, at("2025-01-10T04:30:00Z"));
    }

    #[test]
    fn timestamp_serializes_as_rfc3339() {
        let json = serde_json::to_string(&at("2024-01-15T10:30:00Z")).unwrap();
        assert!(json.contains("2024-01-15T10:30:00"));
    }
}
