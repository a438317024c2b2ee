//! Time-based parking tariff
//!
//! Pure computation: (entry time, now, rate) -> elapsed hours and amount
//! due. No I/O, no clock access; callers supply `now`.

use chrono::NaiveDateTime;
use thiserror::Error;

/// Default tariff in currency units per hour
pub const DEFAULT_RATE_PER_HOUR: i64 = 200;

/// Computed fee for one parking session
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fee {
    /// Elapsed time in hours, rounded to 2 decimals
    pub duration_hours: f64,
    /// Amount due, rounded to the nearest integer currency unit
    pub amount_due: i64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FeeError {
    #[error("exit time {now} precedes entry time {entered_at}")]
    InvalidInterval {
        entered_at: NaiveDateTime,
        now: NaiveDateTime,
    },
}

/// Compute the fee for a stay from `entered_at` to `now`
///
/// `now` must not precede `entered_at`; a skewed entry timestamp must not
/// turn into a negative fee.
pub fn compute(
    entered_at: NaiveDateTime,
    now: NaiveDateTime,
    rate_per_hour: i64,
) -> Result<Fee, FeeError> {
    let elapsed = now - entered_at;
    if elapsed < chrono::Duration::zero() {
        return Err(FeeError::InvalidInterval { entered_at, now });
    }

    let hours = elapsed.num_milliseconds() as f64 / 3_600_000.0;
    let duration_hours = (hours * 100.0).round() / 100.0;
    let amount_due = (duration_hours * rate_per_hour as f64).round() as i64;

    Ok(Fee {
        duration_hours,
        amount_due,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn ts(s: &str) -> NaiveDateTime {
        s.parse().unwrap()
    }

    #[test]
    fn test_one_hour_at_200() {
        let entry = ts("2024-01-01T10:00:00");
        let fee = compute(entry, entry + Duration::hours(1), 200).unwrap();
        assert_eq!(fee.duration_hours, 1.00);
        assert_eq!(fee.amount_due, 200);
    }

    #[test]
    fn test_ninety_minutes_at_200() {
        let entry = ts("2024-01-01T10:00:00");
        let fee = compute(entry, entry + Duration::minutes(90), 200).unwrap();
        assert_eq!(fee.duration_hours, 1.50);
        assert_eq!(fee.amount_due, 300);
    }

    #[test]
    fn test_two_hours_scenario() {
        // entry 10:00, event at 12:00, rate 200 -> due 400
        let fee = compute(ts("2024-01-01T10:00:00"), ts("2024-01-01T12:00:00"), 200).unwrap();
        assert_eq!(fee.duration_hours, 2.00);
        assert_eq!(fee.amount_due, 400);
    }

    #[test]
    fn test_duration_rounds_to_two_decimals() {
        let entry = ts("2024-01-01T10:00:00");
        // 10 minutes = 0.1666... hours
        let fee = compute(entry, entry + Duration::minutes(10), 200).unwrap();
        assert_eq!(fee.duration_hours, 0.17);
        assert_eq!(fee.amount_due, 34);
    }

    #[test]
    fn test_zero_duration_is_free() {
        let entry = ts("2024-01-01T10:00:00");
        let fee = compute(entry, entry, 200).unwrap();
        assert_eq!(fee.duration_hours, 0.0);
        assert_eq!(fee.amount_due, 0);
    }

    #[test]
    fn test_monotonic_in_elapsed_time() {
        let entry = ts("2024-01-01T10:00:00");
        let mut last = 0;
        for minutes in [5, 30, 60, 95, 240, 1440] {
            let fee = compute(entry, entry + Duration::minutes(minutes), 200).unwrap();
            assert!(fee.amount_due >= last);
            last = fee.amount_due;
        }
    }

    #[test]
    fn test_future_entry_rejected() {
        let entry = ts("2024-01-01T10:00:00");
        let err = compute(entry, entry - Duration::seconds(1), 200).unwrap_err();
        assert!(matches!(err, FeeError::InvalidInterval { .. }));
    }

    #[test]
    fn test_deterministic() {
        let entry = ts("2024-01-01T10:00:00");
        let now = ts("2024-01-01T13:45:00");
        assert_eq!(compute(entry, now, 200), compute(entry, now, 200));
    }
}
