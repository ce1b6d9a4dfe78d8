// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Structs and helper methods for acquisition moments.

A moment is a quantized UTC instant identifying one ABI image. Two string
encodings are accepted at the boundary: the Julian form `YYYYjjjHHMM`
(day-of-year) used in ABI L2 filenames, and the Gregorian form
`YYYYMMDDHHMM`. Ranges share the date of a single day and expand at the
5-minute ABI cadence.
*/
pub mod error;

use std::fmt;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Timelike, Utc};

use crate::MOMENT_STRIDE_MINUTES;
pub use error::MomentError;

#[cfg(test)]
mod test;

/// The ABI scan domain a wall-clock moment is quantized against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImagingMode {
    /// CONUS scans start on minutes ending in 1 or 6.
    Conus,
    /// Full-disk scans start on multiples of 10 minutes.
    FullDisk,
}

/// A quantized UTC instant identifying one image.
///
/// The canonical encoding is the Julian form; the Gregorian calendar fields
/// are carried alongside so date-tiered archive lookups (`root/YYYY/MM/DD`)
/// need no re-derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Moment {
    /// Calendar year
    pub year: i32,
    /// Day of year (001..366)
    pub ordinal: u32,
    /// Calendar month (1..12)
    pub month: u32,
    /// Calendar day of month (1..31)
    pub day: u32,
    /// Hour of day (0..23)
    pub hour: u32,
    /// Minute of hour (0..59)
    pub minute: u32,
}

impl Moment {
    /// Builds a moment from a chrono datetime, truncating below the minute.
    pub fn from_datetime(dt: NaiveDateTime) -> Self {
        Self {
            year: dt.year(),
            ordinal: dt.ordinal(),
            month: dt.month(),
            day: dt.day(),
            hour: dt.hour(),
            minute: dt.minute(),
        }
    }

    /// Returns the instant this moment names.
    pub fn to_datetime(self) -> NaiveDateTime {
        NaiveDate::from_yo_opt(self.year, self.ordinal)
            .expect("moment carries a valid ordinal date")
            .and_hms_opt(self.hour, self.minute, 0)
            .expect("moment carries a valid time of day")
    }

    /// Formats the canonical Julian form `YYYYjjjHHMM`.
    pub fn format(&self) -> String {
        format!(
            "{:04}{:03}{:02}{:02}",
            self.year, self.ordinal, self.hour, self.minute
        )
    }

    /// Parses a single 11-char Julian or 12-char Gregorian moment.
    fn parse_single(s: &str) -> Result<Moment, MomentError> {
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(MomentError::BadFormat(s.to_string()));
        }
        let date = match s.len() {
            11 => {
                let year: i32 = s[0..4].parse().unwrap();
                let ordinal: u32 = s[4..7].parse().unwrap();
                NaiveDate::from_yo_opt(year, ordinal)
            }
            12 => {
                let year: i32 = s[0..4].parse().unwrap();
                let month: u32 = s[4..6].parse().unwrap();
                let day: u32 = s[6..8].parse().unwrap();
                NaiveDate::from_ymd_opt(year, month, day)
            }
            _ => return Err(MomentError::BadFormat(s.to_string())),
        };
        let date = date.ok_or_else(|| MomentError::BadMoment(s.to_string()))?;

        let hhmm = &s[s.len() - 4..];
        let hour: u32 = hhmm[0..2].parse().unwrap();
        let minute: u32 = hhmm[2..4].parse().unwrap();
        let dt = date
            .and_hms_opt(hour, minute, 0)
            .ok_or_else(|| MomentError::BadMoment(s.to_string()))?;

        Ok(Moment::from_datetime(dt))
    }

    /// Parses a moment or a same-day moment range into the list of moments
    /// it covers.
    ///
    /// Accepted shapes are the 11-/12-char singletons and the 16-/17-char
    /// ranges `YYYYjjjHHMM-HHMM` / `YYYYMMDDHHMM-HHMM`. Ranges expand at the
    /// 5-minute ABI cadence, inclusive of both endpoints.
    ///
    /// # Arguments
    ///
    /// * `s` - the moment or range string.
    ///
    ///
    /// # Returns
    ///
    /// * A Result containing the expanded, ascending list of moments.
    ///
    pub fn parse(s: &str) -> Result<Vec<Moment>, MomentError> {
        if !s.is_ascii() {
            return Err(MomentError::BadFormat(s.to_string()));
        }
        let single_len = match s.len() {
            11 | 12 => return Ok(vec![Self::parse_single(s)?]),
            16 => 11,
            17 => 12,
            _ => return Err(MomentError::BadFormat(s.to_string())),
        };

        let (head, tail) = s.split_at(single_len);
        let end_hhmm = tail
            .strip_prefix('-')
            .ok_or_else(|| MomentError::BadFormat(s.to_string()))?;

        let start = Self::parse_single(head)?;
        // The end shares the start's date; re-parse with the tail's time.
        let end = Self::parse_single(&format!("{}{}", &head[..single_len - 4], end_hhmm))?;

        if end < start {
            return Err(MomentError::BadRange(s.to_string()));
        }

        let mut moments = vec![];
        let mut dt = start.to_datetime();
        let end_dt = end.to_datetime();
        while dt <= end_dt {
            moments.push(Moment::from_datetime(dt));
            dt += Duration::minutes(MOMENT_STRIDE_MINUTES);
        }
        Ok(moments)
    }
}

impl fmt::Display for Moment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format())
    }
}

/// Quantizes an instant down to the most recent scan-start minute for the
/// given imaging mode.
///
/// CONUS scans start on minutes ending in 1 or 6; the quantizer carries
/// back across the hour when the instant falls on minute 0. Full-disk scans
/// start on multiples of 10 minutes.
///
/// # Arguments
///
/// * `dt` - the instant to quantize.
///
/// * `mode` - the scan domain whose cadence applies.
///
///
/// # Returns
///
/// * The most recent scan-start instant not after `dt`.
///
pub fn quantize(dt: NaiveDateTime, mode: ImagingMode) -> NaiveDateTime {
    let truncated = dt
        .with_second(0)
        .and_then(|d| d.with_nanosecond(0))
        .expect("second 0 is always representable");
    let minute = truncated.minute() as i64;
    let offset = match mode {
        ImagingMode::Conus => (minute - 1).rem_euclid(5),
        ImagingMode::FullDisk => minute % 10,
    };
    truncated - Duration::minutes(offset)
}

/// Returns the most recent scan-start moment for the given imaging mode
/// according to the wall clock.
pub fn now_quantized(mode: ImagingMode) -> Moment {
    let now: DateTime<Utc> = Utc::now();
    Moment::from_datetime(quantize(now.naive_utc(), mode))
}

/// Collapses a list of moments into the consecutive intervals they form.
///
/// Moments whose gap is at most `stride_minutes` belong to the same
/// interval. Used to report the coverage gaps of a processed range as a
/// handful of `(first, last)` pairs rather than one line per moment.
///
/// # Arguments
///
/// * `moments` - the moments to group; order does not matter.
///
/// * `stride_minutes` - the cadence that makes two moments consecutive.
///
///
/// # Returns
///
/// * Ascending, disjoint `(first, last)` interval pairs.
///
pub fn group_failures(moments: &[Moment], stride_minutes: i64) -> Vec<(Moment, Moment)> {
    if moments.is_empty() {
        return vec![];
    }

    let mut sorted: Vec<Moment> = moments.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut intervals = vec![];
    let mut first = sorted[0];
    let mut last = sorted[0];
    for &m in &sorted[1..] {
        let gap = m.to_datetime() - last.to_datetime();
        if gap <= Duration::minutes(stride_minutes) {
            last = m;
        } else {
            intervals.push((first, last));
            first = m;
            last = m;
        }
    }
    intervals.push((first, last));
    intervals
}
