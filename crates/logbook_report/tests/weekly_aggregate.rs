use chrono::{Datelike, Duration, NaiveDate, Weekday};
use logbook_client::Record;
use logbook_report::aggregate::{WeekWindow, aggregate, window_start_for};
use serde_json::json;

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn rec(date: &str, distance: f64, calories: f64) -> Record {
    serde_json::from_value(json!({"date": date, "distance": distance, "calories_total": calories}))
        .unwrap()
}

#[test]
fn two_mondays_with_saturday_anchor() {
    let records = vec![
        rec("2024-01-01 07:00:00", 1000.0, 60.0),
        rec("2024-01-08 07:00:00", 2000.0, 110.0),
    ];
    let report = aggregate(&records, Weekday::Sat, ymd(2024, 1, 10));

    assert_eq!(report.excluded, 0);
    assert_eq!(report.weeks.len(), 2);
    for week in &report.weeks {
        assert_eq!(week.window.start.weekday(), Weekday::Sat);
        assert_eq!(week.sessions, 1);
    }
    // Most recent first.
    assert_eq!(report.weeks[0].window.start, ymd(2024, 1, 6));
    assert_eq!(report.weeks[0].distance_total, 2000);
    assert_eq!(report.weeks[1].window.start, ymd(2023, 12, 30));
    assert_eq!(report.weeks[1].distance_total, 1000);
    assert_eq!(report.weeks[1].calories_total, 60);
}

#[test]
fn inactive_and_trailing_weeks_are_emitted_with_zero_totals() {
    let records = vec![
        rec("2024-01-01 07:00:00", 1000.0, 60.0),
        rec("2024-01-15 07:00:00", 2000.0, 110.0),
    ];
    let now = ymd(2024, 1, 30);
    let report = aggregate(&records, Weekday::Sat, now);

    let starts: Vec<NaiveDate> = report.weeks.iter().map(|w| w.window.start).collect();
    assert_eq!(
        starts,
        vec![
            ymd(2024, 1, 27),
            ymd(2024, 1, 20),
            ymd(2024, 1, 13),
            ymd(2024, 1, 6),
            ymd(2023, 12, 30),
        ]
    );
    let sessions: Vec<u32> = report.weeks.iter().map(|w| w.sessions).collect();
    assert_eq!(sessions, vec![0, 0, 1, 0, 1]);
    let empty = &report.weeks[3];
    assert_eq!((empty.distance_total, empty.calories_total), (0, 0));
    // The newest window contains `now`.
    assert!(report.weeks[0].window.contains(now));
}

#[test]
fn windows_are_contiguous_and_non_overlapping() {
    let records = vec![rec("2023-03-14", 1.0, 1.0), rec("2023-11-02", 1.0, 1.0)];
    let report = aggregate(&records, Weekday::Wed, ymd(2024, 2, 29));
    for pair in report.weeks.windows(2) {
        let (newer, older) = (&pair[0].window, &pair[1].window);
        assert_eq!(older.end + Duration::days(1), newer.start);
        assert_eq!((newer.end - newer.start).num_days(), 6);
    }
    assert_eq!(report.weeks.iter().map(|w| w.sessions).sum::<u32>(), 2);
}

#[test]
fn record_on_window_end_counts_in_that_week_only() {
    // Saturday anchor: 2024-01-05 is the Friday that closes the 2023-12-30 window.
    let records = vec![
        rec("2023-12-30", 100.0, 1.0),
        rec("2024-01-05 23:59:59", 200.0, 2.0),
        rec("2024-01-06 00:00:00", 400.0, 4.0),
    ];
    let report = aggregate(&records, Weekday::Sat, ymd(2024, 1, 6));

    assert_eq!(report.weeks.len(), 2);
    let newer = &report.weeks[0];
    let older = &report.weeks[1];
    assert_eq!(older.window, WeekWindow::starting(ymd(2023, 12, 30)));
    assert_eq!(older.sessions, 2);
    assert_eq!(older.distance_total, 300);
    assert_eq!(newer.sessions, 1);
    assert_eq!(newer.distance_total, 400);
}

#[test]
fn input_order_does_not_matter() {
    let a = vec![
        rec("2024-02-10", 500.0, 30.0),
        rec("2024-01-03", 700.0, 40.0),
        rec("2024-01-20", 900.0, 50.0),
    ];
    let mut b = a.clone();
    b.reverse();
    let now = ymd(2024, 2, 12);
    assert_eq!(aggregate(&a, Weekday::Sun, now), aggregate(&b, Weekday::Sun, now));
}

#[test]
fn totals_are_additive_across_disjoint_batches() {
    let batch_a = vec![
        rec("2024-01-01", 1000.0, 60.0),
        rec("2024-01-09", 3000.0, 150.0),
        rec("2024-01-24", 500.0, 25.0),
    ];
    let batch_b = vec![
        rec("2024-01-02", 2000.0, 90.0),
        rec("2024-01-17", 4000.0, 210.0),
    ];
    let now = ymd(2024, 1, 31);
    let anchor = Weekday::Sat;

    let mut union = batch_a.clone();
    union.extend(batch_b.iter().cloned());
    let whole = aggregate(&union, anchor, now);

    // Both batches share the same earliest window, so their window sets match.
    let a = aggregate(&batch_a, anchor, now);
    let b = aggregate(&batch_b, anchor, now);
    assert_eq!(a.weeks.len(), whole.weeks.len());
    assert_eq!(b.weeks.len(), whole.weeks.len());

    for ((w, x), y) in whole.weeks.iter().zip(&a.weeks).zip(&b.weeks) {
        assert_eq!(w.window, x.window);
        assert_eq!(w.window, y.window);
        assert_eq!(w.sessions, x.sessions + y.sessions);
        assert_eq!(w.distance_total, x.distance_total + y.distance_total);
        assert_eq!(w.calories_total, x.calories_total + y.calories_total);
    }
}

#[test]
fn malformed_dates_are_excluded_and_counted() {
    let mut records = vec![
        rec("2024-01-01", 1000.0, 60.0),
        rec("yesterday", 5000.0, 300.0),
        rec("2024-02-31", 5000.0, 300.0),
    ];
    records.push(serde_json::from_value(json!({"distance": 5000})).unwrap());

    let report = aggregate(&records, Weekday::Sat, ymd(2024, 1, 3));
    assert_eq!(report.excluded, 3);
    assert_eq!(report.weeks.len(), 1);
    assert_eq!(report.weeks[0].sessions, 1);
    assert_eq!(report.weeks[0].distance_total, 1000);
}

#[test]
fn every_anchor_produces_windows_starting_on_that_day() {
    let records = vec![rec("2024-05-15", 1.0, 1.0)];
    let now = ymd(2024, 6, 1);
    for anchor in [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ] {
        let report = aggregate(&records, anchor, now);
        assert!(report.weeks.iter().all(|w| w.window.start.weekday() == anchor));
        let oldest = report.weeks.last().expect("window");
        assert!(oldest.window.contains(ymd(2024, 5, 15)));
        assert_eq!(oldest.window.start, window_start_for(ymd(2024, 5, 15), anchor));
        assert!(report.weeks[0].window.contains(now));
    }
}

#[test]
fn records_with_odd_field_types_are_counted_not_fatal() {
    let records: Vec<Record> = serde_json::from_value(json!([
        {"id": 1, "date": "2024-01-01", "distance": 1000, "calories_total": 60},
        {"id": 2, "date": true, "distance": 2000, "calories_total": 90},
        {"id": 3, "date": [], "distance": 2000, "calories_total": 90},
        {"id": 4, "date": "2024-01-02", "distance": {}, "calories_total": 90}
    ]))
    .unwrap();

    let report = aggregate(&records, Weekday::Sat, ymd(2024, 1, 3));
    assert_eq!(report.excluded, 3);
    assert_eq!(report.weeks.len(), 1);
    assert_eq!(report.weeks[0].sessions, 1);
    assert_eq!(report.weeks[0].distance_total, 1000);
}
