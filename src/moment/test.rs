// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Unit tests for moment parsing and grouping

use super::*;

#[test]
fn test_parse_julian_round_trip() {
    let moments = Moment::parse("20253161601").unwrap();
    assert_eq!(moments.len(), 1);
    let m = moments[0];
    assert_eq!(m.format(), "20253161601");
    assert_eq!(m.year, 2025);
    assert_eq!(m.ordinal, 316);
    // 2025 day 316 is November 12th.
    assert_eq!(m.month, 11);
    assert_eq!(m.day, 12);
    assert_eq!(m.hour, 16);
    assert_eq!(m.minute, 1);
}

#[test]
fn test_parse_gregorian_matches_julian() {
    let julian = Moment::parse("20253161601").unwrap();
    let gregorian = Moment::parse("202511121601").unwrap();
    assert_eq!(julian, gregorian);
}

#[test]
fn test_parse_leap_day() {
    let m = Moment::parse("20240600000").unwrap()[0];
    assert_eq!((m.month, m.day), (2, 29));
    assert_eq!(Moment::parse("202402290000").unwrap()[0], m);
}

#[test]
fn test_parse_rejects_bad_lengths() {
    for s in ["", "2025316160", "202531616011", "202531616010000", "1"] {
        assert!(
            matches!(Moment::parse(s), Err(MomentError::BadFormat(_))),
            "'{s}' should be BadFormat"
        );
    }
}

#[test]
fn test_parse_rejects_non_digits() {
    assert!(matches!(
        Moment::parse("2025316160x"),
        Err(MomentError::BadFormat(_))
    ));
}

#[test]
fn test_parse_rejects_impossible_dates() {
    // Day 366 of a non-leap year, month 13, minute 61.
    assert!(matches!(
        Moment::parse("20253661601"),
        Err(MomentError::BadMoment(_))
    ));
    assert!(matches!(
        Moment::parse("202513121601"),
        Err(MomentError::BadMoment(_))
    ));
    assert!(matches!(
        Moment::parse("20253161661"),
        Err(MomentError::BadMoment(_))
    ));
}

#[test]
fn test_parse_julian_range_expansion() {
    let moments = Moment::parse("20253161601-1631").unwrap();
    // (1631 - 1601) / 5 + 1 = 7 moments, endpoints included.
    assert_eq!(moments.len(), 7);
    assert_eq!(moments[0].format(), "20253161601");
    assert_eq!(moments[6].format(), "20253161631");
    for pair in moments.windows(2) {
        let gap = pair[1].to_datetime() - pair[0].to_datetime();
        assert_eq!(gap, Duration::minutes(5));
    }
}

#[test]
fn test_parse_gregorian_range_expansion() {
    let moments = Moment::parse("202511121601-1611").unwrap();
    assert_eq!(moments.len(), 3);
    assert_eq!(moments[2].format(), "20253161611");
}

#[test]
fn test_parse_degenerate_range() {
    let moments = Moment::parse("20253161601-1601").unwrap();
    assert_eq!(moments.len(), 1);
}

#[test]
fn test_parse_backwards_range() {
    assert!(matches!(
        Moment::parse("20253161631-1601"),
        Err(MomentError::BadRange(_))
    ));
}

#[test]
fn test_parse_range_needs_separator() {
    assert!(matches!(
        Moment::parse("20253161601x1631"),
        Err(MomentError::BadFormat(_))
    ));
}

#[test]
fn test_quantize_conus() {
    let cases = [
        // (wall minute, expected scan minute)
        (1u32, 1u32),
        (5, 1),
        (6, 6),
        (9, 6),
        (31, 31),
        (59, 56),
    ];
    for (minute, expected) in cases {
        let dt = NaiveDate::from_ymd_opt(2025, 11, 12)
            .unwrap()
            .and_hms_opt(16, minute, 42)
            .unwrap();
        let q = quantize(dt, ImagingMode::Conus);
        assert_eq!(q.minute(), expected, "wall minute {minute}");
        assert_eq!(q.second(), 0);
        assert!(q <= dt);
    }
}

#[test]
fn test_quantize_conus_carries_across_the_hour() {
    let dt = NaiveDate::from_ymd_opt(2025, 11, 12)
        .unwrap()
        .and_hms_opt(16, 0, 30)
        .unwrap();
    let q = quantize(dt, ImagingMode::Conus);
    assert_eq!((q.hour(), q.minute()), (15, 56));
}

#[test]
fn test_quantize_conus_carries_across_the_day() {
    let dt = NaiveDate::from_ymd_opt(2025, 11, 12)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let q = quantize(dt, ImagingMode::Conus);
    assert_eq!((q.hour(), q.minute()), (23, 56));
    assert_eq!(q.day(), 11);
}

#[test]
fn test_quantize_fulldisk() {
    let dt = NaiveDate::from_ymd_opt(2025, 11, 12)
        .unwrap()
        .and_hms_opt(16, 39, 59)
        .unwrap();
    let q = quantize(dt, ImagingMode::FullDisk);
    assert_eq!(q.minute(), 30);
}

#[test]
fn test_group_failures_single_run() {
    let moments = Moment::parse("20253161601-1631").unwrap();
    let intervals = group_failures(&moments, 5);
    assert_eq!(intervals.len(), 1);
    assert_eq!(intervals[0].0.format(), "20253161601");
    assert_eq!(intervals[0].1.format(), "20253161631");
}

#[test]
fn test_group_failures_two_runs() {
    let mut moments = Moment::parse("20253161601-1611").unwrap();
    moments.extend(Moment::parse("20253161641-1651").unwrap());
    let intervals = group_failures(&moments, 5);
    assert_eq!(intervals.len(), 2);
    assert_eq!(intervals[0].1.format(), "20253161611");
    assert_eq!(intervals[1].0.format(), "20253161641");
}

#[test]
fn test_group_failures_singletons() {
    let moments = [
        Moment::parse("20253161601").unwrap()[0],
        Moment::parse("20253161616").unwrap()[0],
        Moment::parse("20253161631").unwrap()[0],
    ];
    let intervals = group_failures(&moments, 5);
    assert_eq!(intervals.len(), 3);
    for (first, last) in intervals {
        assert_eq!(first, last);
    }
}

#[test]
fn test_group_failures_unsorted_input() {
    let mut moments = Moment::parse("20253161601-1611").unwrap();
    moments.reverse();
    let intervals = group_failures(&moments, 5);
    assert_eq!(intervals.len(), 1);
}

#[test]
fn test_group_failures_empty() {
    assert!(group_failures(&[], 5).is_empty());
}
