//! Watch-time arithmetic

use chrono::{DateTime, Utc};

/// Watch-time contribution of one closed view session, in whole minutes.
///
/// Rounds half-up per session; analytics totals sum these per-session values
/// rather than rounding the summed duration, so a viewer with many short
/// sessions is credited the same way the dashboard displays them.
pub fn session_minutes(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    let millis = (end - start).num_milliseconds().max(0);
    // f64::round is half-away-from-zero, which is half-up for non-negative input
    (millis as f64 / 60_000.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn t0() -> DateTime<Utc> {
        "2025-01-01T18:00:00Z".parse().unwrap()
    }

    #[test]
    fn test_exact_minutes() {
        assert_eq!(session_minutes(t0(), t0() + Duration::minutes(42)), 42);
    }

    #[test]
    fn test_half_rounds_up() {
        assert_eq!(session_minutes(t0(), t0() + Duration::seconds(30)), 1);
        assert_eq!(session_minutes(t0(), t0() + Duration::seconds(90)), 2);
    }

    #[test]
    fn test_below_half_rounds_down() {
        assert_eq!(session_minutes(t0(), t0() + Duration::seconds(29)), 0);
        assert_eq!(session_minutes(t0(), t0() + Duration::seconds(89)), 1);
    }

    #[test]
    fn test_negative_interval_clamps_to_zero() {
        assert_eq!(session_minutes(t0() + Duration::minutes(5), t0()), 0);
    }
}
