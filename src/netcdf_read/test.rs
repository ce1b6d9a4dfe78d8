// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Unit tests for NetCDF unpacking helpers

use super::*;

#[test]
fn test_unpack_applies_scale_and_offset() {
    let packing = Packing {
        scale: 0.5,
        offset: 100.0,
        fill: Some(-1.0),
    };
    assert_eq!(unpack(4.0, &packing), 102.0);
}

#[test]
fn test_unpack_fill_becomes_nan() {
    let packing = Packing {
        scale: 0.5,
        offset: 100.0,
        fill: Some(-1.0),
    };
    assert!(unpack(-1.0, &packing).is_nan());
}

#[test]
fn test_unpack_without_fill() {
    let packing = Packing {
        scale: 1.0,
        offset: 0.0,
        fill: None,
    };
    assert_eq!(unpack(-1.0, &packing), -1.0);
}

#[test]
fn test_attr_f64_accepts_scalars_and_singletons() {
    use netcdf::AttributeValue;
    assert_eq!(attr_f64(&AttributeValue::Short(7)), Some(7.0));
    assert_eq!(attr_f64(&AttributeValue::Double(1.5)), Some(1.5));
    assert_eq!(attr_f64(&AttributeValue::Floats(vec![2.0])), Some(2.0));
    assert_eq!(attr_f64(&AttributeValue::Floats(vec![2.0, 3.0])), None);
    assert_eq!(attr_f64(&AttributeValue::Str("x".into())), None);
}

#[test]
fn test_parse_utc_variants() {
    let dt = parse_utc("2025-11-12T16:01:17.1Z").unwrap();
    assert_eq!(dt.to_rfc3339(), "2025-11-12T16:01:17.100+00:00");
    assert!(parse_utc("2025-11-12T16:01:17").is_some());
    assert!(parse_utc("not a time").is_none());
}

#[test]
fn test_open_missing_file_fails() {
    let err = ProductFile::open("/definitely/not/here.nc").unwrap_err();
    assert!(matches!(err, NcReadError::OpenFailed { .. }));
}
