//! Weekly aggregation of logbook records into fixed 7-day windows that all
//! begin on the same anchor weekday.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use logbook_client::Record;
use logbook_client::utils::parse_record_date;
use tracing::warn;

/// Seven calendar days, `end = start + 6`, inclusive on both ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WeekWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl WeekWindow {
    pub fn starting(start: NaiveDate) -> Self {
        Self {
            start,
            end: start + Duration::days(6),
        }
    }

    /// The window beginning on the most recent `anchor` on or before `date`.
    pub fn containing(date: NaiveDate, anchor: Weekday) -> Self {
        Self::starting(window_start_for(date, anchor))
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn next(&self) -> Self {
        Self::starting(self.start + Duration::days(7))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WeeklyAggregate {
    pub window: WeekWindow,
    pub sessions: u32,
    pub distance_total: i64,
    pub calories_total: i64,
}

/// Aggregates ordered most-recent-first, plus the number of records left out
/// because their date could not be parsed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WeeklyReport {
    pub weeks: Vec<WeeklyAggregate>,
    pub excluded: usize,
}

/// Most recent date on or before `date` that falls on `anchor` (0..=6 days back).
pub fn window_start_for(date: NaiveDate, anchor: Weekday) -> NaiveDate {
    let back = (date.weekday().num_days_from_monday() + 7 - anchor.num_days_from_monday()) % 7;
    date - Duration::days(i64::from(back))
}

/// Contiguous windows from the one containing `first` through the one
/// containing `last`, oldest first.
pub fn windows_between(first: NaiveDate, last: NaiveDate, anchor: Weekday) -> Vec<WeekWindow> {
    let mut windows = Vec::new();
    let mut window = WeekWindow::containing(first, anchor);
    while window.start <= last {
        windows.push(window);
        window = window.next();
    }
    windows
}

/// Bucket `records` into weekly windows anchored on `anchor`.
///
/// Windows run from the one containing the earliest record through the one
/// containing `now` (or the latest record, if that is later); weeks without
/// records are still emitted with zero totals. Distance and calories are
/// summed as floats and truncated to integers per window. Records with an
/// unparseable date or a non-numeric amount are left out and counted in
/// [`WeeklyReport::excluded`].
pub fn aggregate(records: &[Record], anchor: Weekday, now: NaiveDate) -> WeeklyReport {
    let mut excluded = 0usize;
    let mut dated: Vec<(NaiveDate, &Record)> = Vec::with_capacity(records.len());
    for record in records {
        match record.date.as_deref().and_then(parse_record_date) {
            Some(date) if record.has_valid_amounts() => dated.push((date, record)),
            Some(_) => {
                excluded += 1;
                warn!(
                    id = record.id.as_deref().unwrap_or("-"),
                    "record with non-numeric distance or calories excluded from weekly totals"
                );
            }
            None => {
                excluded += 1;
                warn!(
                    id = record.id.as_deref().unwrap_or("-"),
                    date = record.date.as_deref().unwrap_or(""),
                    "record with unparseable date excluded from weekly totals"
                );
            }
        }
    }
    if excluded > 0 {
        metrics::counter!("logbook_records_excluded_total").increment(excluded as u64);
    }

    dated.sort_by_key(|(date, _)| *date);
    let (Some((earliest, _)), Some((latest, _))) = (dated.first(), dated.last()) else {
        return WeeklyReport {
            weeks: Vec::new(),
            excluded,
        };
    };

    let windows = windows_between(*earliest, (*latest).max(now), anchor);
    let first_start = windows[0].start;
    let mut sums = vec![(0u32, 0f64, 0f64); windows.len()];
    for (date, record) in &dated {
        let idx = ((*date - first_start).num_days() / 7) as usize;
        debug_assert!(windows[idx].contains(*date));
        let slot = &mut sums[idx];
        slot.0 += 1;
        slot.1 += record.distance;
        slot.2 += record.calories_total;
    }

    let weeks = windows
        .into_iter()
        .zip(sums)
        .rev()
        .map(|(window, (sessions, distance, calories))| WeeklyAggregate {
            window,
            sessions,
            distance_total: distance as i64,
            calories_total: calories as i64,
        })
        .collect();

    WeeklyReport { weeks, excluded }
}
