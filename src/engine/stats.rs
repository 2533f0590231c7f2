use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Utc};
use uuid::Uuid;

use crate::models::order::{OrderStats, OrderStatus};
use crate::state::AppState;

/// Epoch-second starts of the reporting windows containing `now`, in UTC.
/// Weeks start on Monday.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodStarts {
    pub day: i64,
    pub week: i64,
    pub month: i64,
}

impl PeriodStarts {
    pub fn containing(now: DateTime<Utc>) -> Self {
        let today = now.date_naive();
        let week_start = today - Duration::days(i64::from(today.weekday().num_days_from_monday()));
        let month_start = today.with_day(1).unwrap_or(today);

        let midnight = |date: chrono::NaiveDate| {
            Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)).timestamp()
        };

        Self {
            day: midnight(today),
            week: midnight(week_start),
            month: midnight(month_start),
        }
    }
}

pub fn delivered_counts(state: &AppState, delivery_person_id: Uuid, now: DateTime<Utc>) -> OrderStats {
    let starts = PeriodStarts::containing(now);
    let mut stats = OrderStats::default();

    for entry in state.orders.iter() {
        let order = entry.value();
        if !order.is_assigned_to(delivery_person_id) || order.status != OrderStatus::Delivered {
            continue;
        }
        let Some(delivered_at) = order.delivered_at else {
            continue;
        };

        if delivered_at >= starts.day {
            stats.today += 1;
        }
        if delivered_at >= starts.week {
            stats.this_week += 1;
        }
        if delivered_at >= starts.month {
            stats.this_month += 1;
        }
    }

    stats
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::PeriodStarts;

    #[test]
    fn windows_for_a_thursday_afternoon() {
        // 2024-05-16 is a Thursday.
        let now = Utc.with_ymd_and_hms(2024, 5, 16, 15, 30, 0).unwrap();
        let starts = PeriodStarts::containing(now);

        assert_eq!(starts.day, Utc.with_ymd_and_hms(2024, 5, 16, 0, 0, 0).unwrap().timestamp());
        assert_eq!(starts.week, Utc.with_ymd_and_hms(2024, 5, 13, 0, 0, 0).unwrap().timestamp());
        assert_eq!(starts.month, Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap().timestamp());
    }

    #[test]
    fn week_may_start_in_the_previous_month() {
        // 2024-06-02 is a Sunday; its week began on Monday 2024-05-27.
        let now = Utc.with_ymd_and_hms(2024, 6, 2, 9, 0, 0).unwrap();
        let starts = PeriodStarts::containing(now);

        assert!(starts.week < starts.month);
        assert_eq!(starts.week, Utc.with_ymd_and_hms(2024, 5, 27, 0, 0, 0).unwrap().timestamp());
    }
}
