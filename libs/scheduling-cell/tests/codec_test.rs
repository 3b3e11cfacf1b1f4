// libs/scheduling-cell/tests/codec_test.rs
//
// Display and canonical conversions, checked over the full value ranges.

use proptest::prelude::*;

use scheduling_cell::services::codec::{
    combine_local_timestamp, format_calendar_date_to_display, format_clock_time_to_display,
    parse_display_date, parse_display_time,
};
use scheduling_cell::services::input::{auto_format, DateFormat, TimeFormat};
use scheduling_cell::{CalendarDate, ClockTime, LocalTimestamp};

fn any_date() -> impl Strategy<Value = CalendarDate> {
    (1000i32..=9999, 1u32..=12, 1u32..=31)
        .prop_map(|(year, month, day)| CalendarDate::new(year, month, day).unwrap())
}

fn any_time() -> impl Strategy<Value = ClockTime> {
    (0u32..=23, 0u32..=59).prop_map(|(hour, minute)| ClockTime::new(hour, minute).unwrap())
}

proptest! {
    #[test]
    fn display_date_round_trips(date in any_date()) {
        let shown = format_calendar_date_to_display(&date);
        prop_assert_eq!(shown.len(), 10);
        prop_assert_eq!(parse_display_date(&shown), Some(date));
    }

    #[test]
    fn display_time_round_trips(time in any_time()) {
        let shown = format_clock_time_to_display(&time);
        prop_assert_eq!(parse_display_time(&shown), Some(time));
    }

    #[test]
    fn typed_digits_reach_the_same_date(date in any_date()) {
        let digits = format!("{:02}{:02}{:04}", date.day(), date.month(), date.year());
        let formatted = auto_format::<DateFormat>(&digits);
        prop_assert_eq!(parse_display_date(&formatted), Some(date));
    }

    #[test]
    fn combined_timestamp_splits_back(date in any_date(), time in any_time()) {
        let timestamp = combine_local_timestamp(Some(&date), Some(&time)).unwrap();
        prop_assert_eq!(timestamp.split(), (date, time));
        prop_assert_eq!(timestamp.second(), 0);
        prop_assert!(timestamp.as_str().ends_with(":00"));

        let reparsed = LocalTimestamp::parse(timestamp.as_str());
        prop_assert_eq!(reparsed.map(|t| t.split()), Some((date, time)));
    }

    #[test]
    fn auto_format_is_idempotent(raw in "\\PC{0,16}") {
        let once = auto_format::<DateFormat>(&raw);
        prop_assert_eq!(auto_format::<DateFormat>(&once), once.clone());
        prop_assert!(once.len() <= 10);

        let once = auto_format::<TimeFormat>(&raw);
        prop_assert_eq!(auto_format::<TimeFormat>(&once), once.clone());
        prop_assert!(once.len() <= 5);
    }
}

#[test]
fn test_missing_part_combines_to_nothing() {
    let date = CalendarDate::new(2027, 3, 9).unwrap();
    let time = ClockTime::new(7, 5).unwrap();
    assert_eq!(combine_local_timestamp(Some(&date), None), None);
    assert_eq!(combine_local_timestamp(None, Some(&time)), None);
}
