// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Solar geometry: per-pixel solar zenith angle.

The Sun's geocentric right ascension and declination and the Greenwich
apparent sidereal time are evaluated once per image instant from compact
analytic series (good to a couple of hundredths of a degree against the
NREL SPA reference), then spherical geometry gives the zenith angle at
every pixel. No per-pixel ephemeris work happens.
*/

use chrono::{DateTime, Datelike, Timelike, Utc};
use ndarray::{Array2, Zip};


/// The Sun's apparent geocentric position and the Earth orientation for one
/// instant, shared across a whole scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SunGeometry {
    /// Right ascension, radians
    pub ra: f64,
    /// Declination, radians
    pub dec: f64,
    /// Greenwich apparent sidereal time, radians
    pub gast: f64,
}

/// Julian date of a UTC instant.
fn julian_date(t: DateTime<Utc>) -> f64 {
    let (mut y, mut m) = (t.year() as i64, t.month() as i64);
    if m <= 2 {
        y -= 1;
        m += 12;
    }
    let a = y / 100;
    let b = 2 - a + a / 4;
    let day_fraction = (t.hour() as f64
        + t.minute() as f64 / 60.0
        + (t.second() as f64 + t.nanosecond() as f64 * 1e-9) / 3600.0)
        / 24.0;
    (365.25 * (y + 4716) as f64).floor() + (30.6001 * (m + 1) as f64).floor()
        + t.day() as f64
        + b as f64
        - 1524.5
        + day_fraction
}

impl SunGeometry {
    /// Evaluates the solar position and sidereal time for one instant.
    pub fn at(t: DateTime<Utc>) -> SunGeometry {
        let jd = julian_date(t);
        let n = jd - 2451545.0;

        // Low-precision solar ephemeris (Astronomical Almanac pp. C24).
        let mean_lon = (280.460 + 0.9856474 * n).rem_euclid(360.0).to_radians();
        let mean_anom = (357.528 + 0.9856003 * n).rem_euclid(360.0).to_radians();
        let ecliptic_lon = mean_lon
            + 1.915_f64.to_radians() * mean_anom.sin()
            + 0.020_f64.to_radians() * (2.0 * mean_anom).sin();
        let obliquity = (23.439 - 0.0000004 * n).to_radians();

        let ra = (obliquity.cos() * ecliptic_lon.sin())
            .atan2(ecliptic_lon.cos())
            .rem_euclid(std::f64::consts::TAU);
        let dec = (obliquity.sin() * ecliptic_lon.sin()).asin();

        // GMST plus the equation of the equinoxes (USNO short series).
        let gmst_h = (18.697374558 + 24.06570982441908 * n).rem_euclid(24.0);
        let omega = (125.04 - 0.052954 * n).to_radians();
        let sun_lon = (280.47 + 0.98565 * n).to_radians();
        let dpsi_h = -0.000319 * omega.sin() - 0.000024 * (2.0 * sun_lon).sin();
        let gast_h = gmst_h + dpsi_h * obliquity.cos();
        let gast = (gast_h * 15.0).to_radians().rem_euclid(std::f64::consts::TAU);

        SunGeometry { ra, dec, gast }
    }

    /// Solar zenith angle in degrees at one geographic point.
    pub fn zenith_angle(&self, lat_deg: f64, lon_deg: f64) -> f64 {
        let lat = lat_deg.to_radians();
        let lon = lon_deg.to_radians();
        let hour_angle = self.gast + lon - self.ra;
        let cos_sza =
            lat.sin() * self.dec.sin() + lat.cos() * self.dec.cos() * hour_angle.cos();
        cos_sza.clamp(-1.0, 1.0).acos().to_degrees()
    }
}

/// Computes the solar zenith angle for every pixel of a lat/lon grid.
///
/// NaN coordinates (off-disk pixels) propagate to NaN zenith angles.
///
/// # Arguments
///
/// * `lat` - per-pixel latitude, degrees.
///
/// * `lon` - per-pixel longitude, degrees, same shape as `lat`.
///
/// * `t` - the image acquisition instant.
///
///
/// # Returns
///
/// * An array of zenith angles in degrees `[0, 180]`, shaped like `lat`.
///
pub fn solar_zenith_angle(lat: &Array2<f64>, lon: &Array2<f64>, t: DateTime<Utc>) -> Array2<f64> {
    let sun = SunGeometry::at(t);
    let mut sza = Array2::zeros(lat.raw_dim());
    Zip::from(&mut sza).and(lat).and(lon).for_each(|out, &la, &lo| {
        *out = if la.is_finite() && lo.is_finite() {
            sun.zenith_angle(la, lo)
        } else {
            f64::NAN
        };
    });
    sza
}
