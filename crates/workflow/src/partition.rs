//! TimeRangePartitioner - slices an interval into job windows

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, Utc};
use contracts::{Granularity, TimeWindow};

/// Split `interval` into ordered, contiguous windows
///
/// Month windows are cut at calendar-month boundaries; day and hour windows
/// step from the interval start. The first and last windows are truncated to
/// the interval. An empty interval yields no windows.
pub fn partition(interval: &TimeWindow, granularity: Granularity) -> Vec<TimeWindow> {
    if interval.is_empty() {
        return Vec::new();
    }

    let mut windows = Vec::new();
    match granularity {
        Granularity::Months(n) => {
            let mut cursor = interval.start;
            let mut boundary = month_start(cursor);
            while cursor < interval.end {
                boundary = match boundary.checked_add_months(Months::new(n.max(1))) {
                    Some(next) => next,
                    None => interval.end,
                };
                let end = boundary.min(interval.end);
                windows.push(TimeWindow::new(cursor, end));
                cursor = end;
            }
        }
        Granularity::Days(n) => {
            step(interval, Duration::days(i64::from(n.max(1))), &mut windows);
        }
        Granularity::Hours(n) => {
            step(interval, Duration::hours(i64::from(n.max(1))), &mut windows);
        }
    }
    windows
}

fn step(interval: &TimeWindow, length: Duration, windows: &mut Vec<TimeWindow>) {
    let mut cursor = interval.start;
    while cursor < interval.end {
        let end = cursor
            .checked_add_signed(length)
            .map_or(interval.end, |next| next.min(interval.end));
        windows.push(TimeWindow::new(cursor, end));
        cursor = end;
    }
}

/// Midnight on the first day of the instant's month
fn month_start(instant: DateTime<Utc>) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(instant.year(), instant.month(), 1)
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map_or(instant, |midnight| midnight.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn assert_exact_cover(interval: &TimeWindow, windows: &[TimeWindow]) {
        assert_eq!(windows.first().unwrap().start, interval.start);
        assert_eq!(windows.last().unwrap().end, interval.end);
        for pair in windows.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        assert!(windows.iter().all(|w| !w.is_empty()));
    }

    #[test]
    fn test_monthly_campaign() {
        // avhrr-m02 validity 2006-10-30 .. 2015-12-31 inclusive
        let interval = TimeWindow::new(at(2006, 10, 30), at(2016, 1, 1));
        let windows = partition(&interval, Granularity::Months(1));

        assert_eq!(windows.len(), 111);
        assert_exact_cover(&interval, &windows);
        assert_eq!(windows[0], TimeWindow::new(at(2006, 10, 30), at(2006, 11, 1)));
        assert_eq!(windows[1], TimeWindow::new(at(2006, 11, 1), at(2006, 12, 1)));
        assert_eq!(windows[110], TimeWindow::new(at(2015, 12, 1), at(2016, 1, 1)));
    }

    #[test]
    fn test_multi_month_steps_follow_calendar() {
        let interval = TimeWindow::new(at(2010, 2, 15), at(2010, 8, 10));
        let windows = partition(&interval, Granularity::Months(3));
        assert_eq!(
            windows,
            vec![
                TimeWindow::new(at(2010, 2, 15), at(2010, 5, 1)),
                TimeWindow::new(at(2010, 5, 1), at(2010, 8, 1)),
                TimeWindow::new(at(2010, 8, 1), at(2010, 8, 10)),
            ]
        );
    }

    #[test]
    fn test_days_truncate_last_window() {
        let interval = TimeWindow::new(at(2010, 1, 1), at(2010, 1, 26));
        let windows = partition(&interval, Granularity::Days(10));
        assert_eq!(windows.len(), 3);
        assert_eq!(windows[2], TimeWindow::new(at(2010, 1, 21), at(2010, 1, 26)));
        assert_exact_cover(&interval, &windows);
    }

    #[test]
    fn test_hours() {
        let interval = TimeWindow::new(at(2010, 1, 1), at(2010, 1, 2));
        let windows = partition(&interval, Granularity::Hours(6));
        assert_eq!(windows.len(), 4);
        assert_exact_cover(&interval, &windows);
    }

    #[test]
    fn test_interval_shorter_than_step() {
        let interval = TimeWindow::new(at(2010, 1, 10), at(2010, 1, 12));
        assert_eq!(partition(&interval, Granularity::Months(1)), vec![interval]);
        assert_eq!(partition(&interval, Granularity::Days(30)), vec![interval]);
    }

    #[test]
    fn test_empty_interval() {
        let empty = TimeWindow::new(at(2010, 1, 1), at(2010, 1, 1));
        assert!(partition(&empty, Granularity::Months(1)).is_empty());
        assert!(partition(&empty, Granularity::Hours(1)).is_empty());
    }

    #[test]
    fn test_deterministic() {
        let interval = TimeWindow::new(at(2001, 3, 7), at(2003, 9, 1));
        assert_eq!(
            partition(&interval, Granularity::Months(2)),
            partition(&interval, Granularity::Months(2))
        );
    }
}
