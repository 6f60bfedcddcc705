//! Time-left formatting for market resolution countdowns.
//!
//! [`time_left`] is pure: the caller supplies "now" and owns whatever timer
//! drives re-evaluation. [`Countdown`] is a small ticker for callers that want
//! one.

use std::time::Duration;

use serde::Serialize;
use time::OffsetDateTime;
use tokio::time::{interval, Interval, MissedTickBehavior};

/// Below this many seconds remaining a countdown is urgent.
pub const URGENT_THRESHOLD_SECS: i64 = 60;

/// Text shown once the resolution time has passed.
pub const ENDED: &str = "Ended";

/// Remaining time until a market resolves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeLeft {
    /// Display string: "{d}d {h}h", "{h}h {m}m", "{m}:{ss}" or "Ended".
    pub text: String,
    /// Less than a minute remains.
    pub is_urgent: bool,
    /// Whole seconds remaining, zero once ended.
    pub total_seconds: i64,
}

impl TimeLeft {
    /// Whether the countdown has run out.
    pub fn has_ended(&self) -> bool {
        self.total_seconds == 0
    }

    /// Fill level of the last-minute progress bar, `None` outside the urgent window.
    pub fn urgent_fraction(&self) -> Option<f64> {
        if !self.is_urgent {
            return None;
        }
        Some(self.total_seconds as f64 / URGENT_THRESHOLD_SECS as f64)
    }
}

/// Compute the time left until `resolution_time`, both in unix seconds.
pub fn time_left(resolution_time: i64, now: i64) -> TimeLeft {
    let remaining = resolution_time.saturating_sub(now);
    if remaining <= 0 {
        return TimeLeft {
            text: ENDED.to_string(),
            is_urgent: false,
            total_seconds: 0,
        };
    }

    TimeLeft {
        text: format_remaining(remaining),
        is_urgent: remaining < URGENT_THRESHOLD_SECS,
        total_seconds: remaining,
    }
}

/// [`time_left`] against the current wall clock.
pub fn time_left_now(resolution_time: i64) -> TimeLeft {
    time_left(resolution_time, OffsetDateTime::now_utc().unix_timestamp())
}

/// Format a positive number of seconds with the coarsest useful units.
pub fn format_remaining(seconds: i64) -> String {
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;
    let secs = seconds % 60;

    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

/// Fixed-cadence ticker yielding a fresh [`TimeLeft`] on every tick.
pub struct Countdown {
    resolution_time: i64,
    ticker: Interval,
}

impl Countdown {
    /// Tick every `period` for the market resolving at `resolution_time`.
    pub fn new(resolution_time: i64, period: Duration) -> Self {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self {
            resolution_time,
            ticker,
        }
    }

    /// Wait for the next tick and evaluate the countdown.
    pub async fn tick(&mut self) -> TimeLeft {
        self.ticker.tick().await;
        time_left_now(self.resolution_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const NOW: i64 = 1_700_000_000;

    #[test]
    fn past_resolution_has_ended() {
        let left = time_left(NOW - 10, NOW);
        assert_eq!(
            left,
            TimeLeft {
                text: "Ended".to_string(),
                is_urgent: false,
                total_seconds: 0,
            }
        );
        assert!(left.has_ended());
        assert_eq!(time_left(NOW, NOW).text, ENDED);
    }

    #[test]
    fn urgency_starts_under_a_minute() {
        let left = time_left(NOW + 45, NOW);
        assert!(left.is_urgent);
        assert_eq!(left.text, "0:45");
        assert_eq!(left.total_seconds, 45);

        let left = time_left(NOW + 61, NOW);
        assert!(!left.is_urgent);
        assert_eq!(left.text, "1:01");
    }

    #[test]
    fn formats_by_magnitude() {
        assert_eq!(time_left(NOW + 2 * 86_400 + 5 * 3_600 + 30, NOW).text, "2d 5h");
        assert_eq!(time_left(NOW + 3 * 3_600 + 7 * 60, NOW).text, "3h 7m");
        assert_eq!(time_left(NOW + 59 * 60 + 9, NOW).text, "59:09");
    }

    #[test]
    fn urgent_fraction_only_in_last_minute() {
        assert_eq!(time_left(NOW + 30, NOW).urgent_fraction(), Some(0.5));
        assert_eq!(time_left(NOW + 300, NOW).urgent_fraction(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_ticks_without_owning_state() {
        let resolution = OffsetDateTime::now_utc().unix_timestamp() + 3_600;
        let mut countdown = Countdown::new(resolution, Duration::from_secs(1));

        let first = countdown.tick().await;
        let second = countdown.tick().await;
        assert!(!first.has_ended());
        assert!(second.total_seconds <= first.total_seconds);
    }
}
