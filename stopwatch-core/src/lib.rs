//! Pure elapsed-time arithmetic and digit formatting.
//! No platform dependencies; testable on host with plain millisecond values.

/// Elapsed-time accounting with pause/resume continuity.
///
/// All values are unsigned milliseconds from a caller-supplied monotonic
/// clock. Elapsed time is always derived, never accumulated on a tick, so
/// repeated reads cannot drift:
///
/// `elapsed = base + (running ? now : stopped) - started`
///
/// On resume, `started` is re-anchored by the width of the pause gap so the
/// formula stays continuous across stop/start cycles.
#[derive(Clone, Copy, Debug)]
pub struct ElapsedCore {
    started_mono: u64,
    stopped_mono: u64,
    base_ms: u64,
    running: bool,
}

impl ElapsedCore {
    pub fn new() -> Self {
        Self {
            started_mono: 0,
            stopped_mono: 0,
            base_ms: 0,
            running: false,
        }
    }

    /// Begin (or resume) counting at monotonic time `now_ms`.
    /// No-op if already running.
    pub fn start(&mut self, now_ms: u64) {
        if self.running {
            return;
        }
        // Shift the anchor forward by the pause gap so elapsed time
        // continues exactly where it stopped.
        let frozen = self.stopped_mono.saturating_sub(self.started_mono);
        self.started_mono = now_ms.saturating_sub(frozen);
        self.running = true;
    }

    /// Freeze counting at monotonic time `now_ms`. No-op if not running.
    pub fn stop(&mut self, now_ms: u64) {
        if !self.running {
            return;
        }
        self.stopped_mono = now_ms;
        self.running = false;
    }

    /// Zero every field, including any rehydrated base.
    pub fn reset(&mut self) {
        self.started_mono = 0;
        self.stopped_mono = 0;
        self.base_ms = 0;
        self.running = false;
    }

    /// Carry over elapsed time from a previous session. Only meaningful on
    /// a reset core; the carried value is frozen until the next `start`.
    pub fn set_base(&mut self, ms: u64) {
        self.base_ms = ms;
    }

    pub fn elapsed_ms(&self, now_ms: u64) -> u64 {
        let reference = if self.running { now_ms } else { self.stopped_mono };
        self.base_ms + reference.saturating_sub(self.started_mono)
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}

impl Default for ElapsedCore {
    fn default() -> Self {
        Self::new()
    }
}

/// A millisecond count broken into display groups by integer truncation.
/// Hours are unbounded (no day rollover).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TimeParts {
    pub hours: u64,
    pub minutes: u8,
    pub seconds: u8,
    pub millis: u16,
}

/// Fixed-width digit values (0-9) for symbolic renderers: two digits each
/// for hours/minutes/seconds, three for milliseconds.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TimeDigits {
    pub hours: [u8; 2],
    pub minutes: [u8; 2],
    pub seconds: [u8; 2],
    pub millis: [u8; 3],
}

impl TimeParts {
    pub fn from_ms(ms: u64) -> Self {
        let total_secs = ms / 1000;
        Self {
            hours: total_secs / 3600,
            minutes: ((total_secs % 3600) / 60) as u8,
            seconds: (total_secs % 60) as u8,
            millis: (ms % 1000) as u16,
        }
    }

    /// Per-digit view. The hour group saturates at 99 here because the
    /// fixed two-slot display cannot show more; the numeric fields do not.
    pub fn digits(&self) -> TimeDigits {
        let h = self.hours.min(99) as u8;
        TimeDigits {
            hours: [h / 10, h % 10],
            minutes: [self.minutes / 10, self.minutes % 10],
            seconds: [self.seconds / 10, self.seconds % 10],
            millis: [
                (self.millis / 100) as u8,
                ((self.millis / 10) % 10) as u8,
                (self.millis % 10) as u8,
            ],
        }
    }
}

/// Format milliseconds as "HH:MM:SS" (laps and totals in text displays).
pub fn format_hms(ms: u64) -> String {
    let t = TimeParts::from_ms(ms);
    format!("{:02}:{:02}:{:02}", t.hours, t.minutes, t.seconds)
}

/// Format milliseconds as "HH:MM:SS:mmm", the full human-readable form
/// used in exports.
pub fn format_hms_ms(ms: u64) -> String {
    let t = TimeParts::from_ms(ms);
    format!("{:02}:{:02}:{:02}:{:03}", t.hours, t.minutes, t.seconds, t.millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed_basic() {
        let mut core = ElapsedCore::new();
        assert_eq!(core.elapsed_ms(0), 0);
        assert!(!core.is_running());

        core.start(1000);
        assert!(core.is_running());
        assert_eq!(core.elapsed_ms(1500), 500);
        assert_eq!(core.elapsed_ms(2000), 1000);

        core.stop(2000);
        assert!(!core.is_running());
        assert_eq!(core.elapsed_ms(5000), 1000); // Frozen while stopped

        core.start(5000);
        assert_eq!(core.elapsed_ms(5500), 1500);

        core.reset();
        assert_eq!(core.elapsed_ms(10000), 0);
    }

    #[test]
    fn test_resume_continuity_across_many_pauses() {
        let mut core = ElapsedCore::new();
        core.start(0);
        core.stop(100);
        core.start(1000);
        core.stop(1100);
        core.start(50_000);
        assert_eq!(core.elapsed_ms(50_300), 500);
    }

    #[test]
    fn test_start_while_running_is_noop() {
        let mut core = ElapsedCore::new();
        core.start(0);
        core.start(5000); // Must not re-anchor
        assert_eq!(core.elapsed_ms(6000), 6000);
    }

    #[test]
    fn test_stop_while_stopped_is_noop() {
        let mut core = ElapsedCore::new();
        core.start(0);
        core.stop(1000);
        core.stop(9000);
        assert_eq!(core.elapsed_ms(9000), 1000);
    }

    #[test]
    fn test_base_carry_over() {
        let mut core = ElapsedCore::new();
        core.set_base(5000);
        assert_eq!(core.elapsed_ms(0), 5000);
        assert!(!core.is_running());

        core.start(100);
        assert_eq!(core.elapsed_ms(600), 5500);
        core.stop(600);
        assert_eq!(core.elapsed_ms(99_999), 5500);
    }

    #[test]
    fn test_time_parts_truncation() {
        let t = TimeParts::from_ms(3_661_999);
        assert_eq!(t.hours, 1);
        assert_eq!(t.minutes, 1);
        assert_eq!(t.seconds, 1);
        assert_eq!(t.millis, 999);

        assert_eq!(TimeParts::from_ms(0), TimeParts { hours: 0, minutes: 0, seconds: 0, millis: 0 });
    }

    #[test]
    fn test_time_parts_no_day_rollover() {
        // 100 hours
        let t = TimeParts::from_ms(100 * 3_600_000);
        assert_eq!(t.hours, 100);
        // Digit view saturates at the display width
        assert_eq!(t.digits().hours, [9, 9]);
    }

    #[test]
    fn test_digits() {
        let d = TimeParts::from_ms(45_296_789).digits(); // 12:34:56.789
        assert_eq!(d.hours, [1, 2]);
        assert_eq!(d.minutes, [3, 4]);
        assert_eq!(d.seconds, [5, 6]);
        assert_eq!(d.millis, [7, 8, 9]);
    }

    #[test]
    fn test_format_hms() {
        assert_eq!(format_hms(0), "00:00:00");
        assert_eq!(format_hms(61_000), "00:01:01");
        assert_eq!(format_hms(3_661_000), "01:01:01");
    }

    #[test]
    fn test_format_hms_ms() {
        assert_eq!(format_hms_ms(0), "00:00:00:000");
        assert_eq!(format_hms_ms(3_661_042), "01:01:01:042");
    }
}
