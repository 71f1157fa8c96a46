//! Period bucketing and cycle-length arithmetic.
//!
//! Quarters are calendar quarters (Q1 = Jan-Mar). There is no fiscal-year
//! offset; that is a fixed choice, not a configuration point.

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// Grain at which records are bucketed into periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodGrain {
    Day,
    Week,
    Month,
    Quarter,
}

/// First day of the period containing `date`. Weeks start on Monday.
pub fn bucket_start(date: NaiveDate, grain: PeriodGrain) -> NaiveDate {
    match grain {
        PeriodGrain::Day => date,
        PeriodGrain::Week => {
            let back = date.weekday().num_days_from_monday() as u64;
            date - Days::new(back)
        }
        PeriodGrain::Month => NaiveDate::from_ymd_opt(date.year(), date.month(), 1)
            .unwrap_or(date),
        PeriodGrain::Quarter => {
            let start_month = ((date.month() - 1) / 3) * 3 + 1;
            NaiveDate::from_ymd_opt(date.year(), start_month, 1).unwrap_or(date)
        }
    }
}

/// Inclusive start, exclusive end of the period containing `date`.
pub fn period_range(date: NaiveDate, grain: PeriodGrain) -> (NaiveDate, NaiveDate) {
    let start = bucket_start(date, grain);
    let end = match grain {
        PeriodGrain::Day => start + Days::new(1),
        PeriodGrain::Week => start + Days::new(7),
        PeriodGrain::Month => next_month(start),
        PeriodGrain::Quarter => {
            let mut end = start;
            for _ in 0..3 {
                end = next_month(end);
            }
            end
        }
    };
    (start, end)
}

fn next_month(first_of_month: NaiveDate) -> NaiveDate {
    let (y, m) = if first_of_month.month() == 12 {
        (first_of_month.year() + 1, 1)
    } else {
        (first_of_month.year(), first_of_month.month() + 1)
    };
    NaiveDate::from_ymd_opt(y, m, 1).unwrap_or(first_of_month)
}

/// Human-readable label for the period containing `date`:
/// `2025-08-15`, week-start date, `2025-08`, or `2025-Q3`.
pub fn period_label(date: NaiveDate, grain: PeriodGrain) -> String {
    let start = bucket_start(date, grain);
    match grain {
        PeriodGrain::Day | PeriodGrain::Week => start.format("%Y-%m-%d").to_string(),
        PeriodGrain::Month => start.format("%Y-%m").to_string(),
        PeriodGrain::Quarter => {
            format!("{}-Q{}", start.year(), (start.month() - 1) / 3 + 1)
        }
    }
}

/// The calendar quarter containing `today`, as an inclusive-start,
/// exclusive-end range.
pub fn current_quarter_range(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    period_range(today, PeriodGrain::Quarter)
}

/// Days between deal creation and close. `None` when either date is absent.
pub fn cycle_days(created: Option<NaiveDate>, closed: Option<NaiveDate>) -> Option<i64> {
    Some((closed? - created?).num_days())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn quarter_boundaries_are_calendar_quarters() {
        assert_eq!(
            period_range(d(2025, 2, 14), PeriodGrain::Quarter),
            (d(2025, 1, 1), d(2025, 4, 1))
        );
        assert_eq!(
            period_range(d(2025, 12, 31), PeriodGrain::Quarter),
            (d(2025, 10, 1), d(2026, 1, 1))
        );
    }

    #[test]
    fn week_buckets_start_monday() {
        // 2025-08-15 is a Friday; its week starts Monday the 11th.
        assert_eq!(bucket_start(d(2025, 8, 15), PeriodGrain::Week), d(2025, 8, 11));
        assert_eq!(bucket_start(d(2025, 8, 11), PeriodGrain::Week), d(2025, 8, 11));
    }

    #[test]
    fn month_range_handles_december() {
        assert_eq!(
            period_range(d(2024, 12, 5), PeriodGrain::Month),
            (d(2024, 12, 1), d(2025, 1, 1))
        );
    }

    #[test]
    fn labels_match_grain() {
        assert_eq!(period_label(d(2025, 8, 15), PeriodGrain::Quarter), "2025-Q3");
        assert_eq!(period_label(d(2025, 8, 15), PeriodGrain::Month), "2025-08");
        assert_eq!(period_label(d(2025, 8, 15), PeriodGrain::Week), "2025-08-11");
        assert_eq!(period_label(d(2025, 8, 15), PeriodGrain::Day), "2025-08-15");
    }

    #[test]
    fn cycle_days_requires_both_dates() {
        assert_eq!(cycle_days(Some(d(2025, 1, 1)), Some(d(2025, 1, 31))), Some(30));
        assert_eq!(cycle_days(None, Some(d(2025, 1, 31))), None);
        assert_eq!(cycle_days(Some(d(2025, 1, 1)), None), None);
    }
}
