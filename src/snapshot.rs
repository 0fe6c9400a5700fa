//! Export snapshot.
//!
//! `Stopwatch::snapshot` is the sole payload offered to exporters (file
//! download, share-sheet collaborators). The JSON shape matches the
//! original widget's download format.

use chrono::{DateTime, Utc};
use serde::Serialize;
use stopwatch_core::{format_hms_ms, TimeParts};

/// A duration in both raw and human-readable form.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimedValue {
    pub human_readable_time: String,
    pub time_in_ms: u64,
}

impl TimedValue {
    pub fn from_ms(ms: u64) -> Self {
        Self {
            human_readable_time: format_hms_ms(ms),
            time_in_ms: ms,
        }
    }
}

/// Wall-clock bounds of the session. While the watch is running, `stop`
/// carries the current time rather than a past stop stamp.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SessionDates {
    pub start: Option<DateTime<Utc>>,
    pub stop: Option<DateTime<Utc>>,
}

/// Immutable view of the engine state at one instant.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Snapshot {
    pub laps: Vec<TimedValue>,
    pub time: TimedValue,
    pub date: SessionDates,
}

impl Snapshot {
    /// Per-digit form of the total, for symbolic renderers that draw
    /// individual characters.
    pub fn time_parts(&self) -> TimeParts {
        TimeParts::from_ms(self.time.time_in_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timed_value() {
        let v = TimedValue::from_ms(3_661_042);
        assert_eq!(v.human_readable_time, "01:01:01:042");
        assert_eq!(v.time_in_ms, 3_661_042);
    }

    #[test]
    fn test_export_shape() {
        let snap = Snapshot {
            laps: vec![TimedValue::from_ms(1500)],
            time: TimedValue::from_ms(4000),
            date: SessionDates { start: None, stop: None },
        };
        let raw = serde_json::to_string(&snap).unwrap();
        assert!(raw.contains("\"humanReadableTime\":\"00:00:01:500\""));
        assert!(raw.contains("\"timeInMs\":4000"));
        assert!(raw.contains("\"date\":{\"start\":null,\"stop\":null}"));
    }

    #[test]
    fn test_digit_view() {
        let snap = Snapshot {
            laps: vec![],
            time: TimedValue::from_ms(45_296_789),
            date: SessionDates { start: None, stop: None },
        };
        assert_eq!(snap.time_parts().digits().millis, [7, 8, 9]);
    }
}
