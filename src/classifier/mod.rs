// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
The staged per-pixel ash classification.

Brightness-temperature differences between the longwave window bands are
combined with a local texture anomaly, the solar illumination regime and
the cloud-top phase into an ash-confidence category per pixel. The
classifier is a pure function of its input arrays: no I/O, no state, and
running it twice yields identical output.
*/

use ndarray::Array2;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive as _;

use crate::netcdf_read::PHASE_FILL;
use crate::texture;
use crate::NODATA;


/// Kernel size of the texture statistics.
const TEXTURE_KERNEL: usize = 5;

/// Cloud-top phase categories of the ACTP product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum Phase {
    /// Clear sky
    Clear = 0,
    /// Liquid water cloud
    Water = 1,
    /// Supercooled liquid cloud
    Supercooled = 2,
    /// Ice cloud
    Ice = 3,
    /// Dust / aerosol class
    Dust = 4,
}

impl Phase {
    /// Decodes a raw ACTP code; fill and unknown codes yield `None`.
    pub fn from_code(code: i8) -> Option<Phase> {
        Phase::from_i8(code)
    }
}

/// The output categories of the classification raster.
///
/// Codes 4 and 5 are reserved by the palette but not produced under the
/// current rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum AshCategory {
    /// No ash
    Clear = 0,
    /// Ash
    Ash = 1,
    /// Probable ash
    ProbableAsh = 2,
    /// Less-probable ash
    LessProbableAsh = 3,
    /// Reserved palette slot
    Reserved4 = 4,
    /// Reserved palette slot
    Reserved5 = 5,
    /// No valid input at this pixel
    Nodata = 255,
}

impl AshCategory {
    /// The raster code of this category.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

/// The per-pixel inputs of one moment, all on the same window.
///
/// Band arrays hold reflectance (C04) or brightness temperature in kelvin
/// with NaN for missing samples; `phase` holds raw ACTP codes with
/// [`PHASE_FILL`] for missing samples. All arrays must share one shape;
/// the pipeline guarantees this by reading every product over the same
/// pixel window.
#[derive(Debug, Clone)]
pub struct BandStack {
    pub c04: Array2<f32>,
    pub c07: Array2<f32>,
    pub c11: Array2<f32>,
    pub c13: Array2<f32>,
    pub c14: Array2<f32>,
    pub c15: Array2<f32>,
    pub phase: Array2<i8>,
}

impl BandStack {
    /// The common `(rows, cols)` shape.
    pub fn dim(&self) -> (usize, usize) {
        self.c13.dim()
    }

    /// The valid-pixel mask: finite across all seven arrays and across the
    /// geographic coordinates.
    ///
    /// The complement of this mask and the nodata code in the output
    /// raster coincide exactly.
    pub fn valid_mask(&self, lat: &Array2<f64>, lon: &Array2<f64>) -> Array2<bool> {
        let mut valid = Array2::from_elem(self.dim(), true);
        for band in [&self.c04, &self.c07, &self.c11, &self.c13, &self.c14, &self.c15] {
            ndarray::Zip::from(&mut valid)
                .and(band)
                .for_each(|m, &v| *m &= v.is_finite());
        }
        ndarray::Zip::from(&mut valid)
            .and(&self.phase)
            .for_each(|m, &p| *m &= p != PHASE_FILL);
        ndarray::Zip::from(&mut valid)
            .and(lat)
            .and(lon)
            .for_each(|m, &la, &lo| *m &= la.is_finite() && lo.is_finite());
        valid
    }
}

/// Texture score from the clean-window BTD and its local statistics.
fn texture_score(d1: f32, anomaly: f32) -> u8 {
    if d1 < 0.0 && anomaly < -1.0 {
        1
    } else if d1 < 1.0 && anomaly < -1.0 {
        2
    } else {
        0
    }
}

/// Raw code under night illumination.
fn raw_night(d1: f32, d2: f32, d3: f32, n: u8) -> u8 {
    if (d1 < 0.0 && d2 > 0.0 && d3 > 2.0) || n == 1 {
        1
    } else if (d1 < 1.0 && d2 > -0.5 && d3 > 2.0) || n == 2 {
        2
    } else {
        0
    }
}

/// Raw code under twilight illumination.
///
/// The second arm only fires with texture support: its extra gates reduce
/// to the texture score being non-zero.
fn raw_twilight(d1: f32, d2: f32, d3: f32, n: u8) -> u8 {
    if (d1 < 0.0 && d2 > 0.0 && d3 > 2.0) || n == 1 {
        1
    } else if (d1 < 1.0 && d2 > -0.5 && d3 > 2.0 && n >= 1) || n == 2 {
        2
    } else {
        0
    }
}

/// Raw code under day illumination.
///
/// As for twilight, the second arm is gated on a non-zero texture score:
/// the brightness-temperature differences alone never promote a daytime
/// pixel past clear.
fn raw_day(d1: f32, d2: f32, d3: f32, n: u8) -> u8 {
    if (d1 < 0.0 && d2 > 0.0 && d3 > 2.0) || n == 1 {
        1
    } else if (d1 < 1.0 && d2 > -0.5 && d3 > 2.0 && n >= 1) || n == 2 {
        2
    } else {
        0
    }
}

/// Threshold refinement on the water-vapour window BTD.
fn refine_thresholds(r: u8, d2: f32) -> u8 {
    if r == 1 {
        1
    } else if r == 2 && d2 >= -1.0 {
        2
    } else if r == 2 && d2 >= -1.5 {
        3
    } else {
        r
    }
}

/// Refinement on the shortwave BTD.
fn refine_shortwave(u1: u8, d3: f32) -> u8 {
    if u1 <= 2 && d3 <= 0.0 {
        0
    } else if u1 >= 3 && d3 <= 1.5 {
        0
    } else {
        u1
    }
}

/// Refinement against the cloud-top phase.
fn refine_phase(u2: u8, phase: i8) -> u8 {
    if u2 == 2 && phase == Phase::Water as i8 {
        3
    } else if u2 == 2 && phase == Phase::Dust as i8 {
        0
    } else if u2 == 3 && phase == Phase::Water as i8 {
        0
    } else if u2 == 3 && phase >= Phase::Supercooled as i8 {
        0
    } else {
        u2
    }
}

/// Classifies every pixel of a band stack into an ash category code.
///
/// Stages: brightness-temperature differences, texture anomaly
/// `T = d1 - mean*std` over a 5x5 window, per-regime raw code selected by
/// the solar zenith angle (night > 85, day < 70, twilight between),
/// threshold refinements, phase refinement, and finally the nodata
/// sentinel wherever the valid mask is false.
///
/// # Arguments
///
/// * `bands` - the per-pixel inputs, all on one shape.
///
/// * `sza` - per-pixel solar zenith angle, degrees, same shape.
///
/// * `valid` - the valid-pixel mask, same shape.
///
///
/// # Returns
///
/// * The ash category raster (0..5 and 255).
///
pub fn classify(bands: &BandStack, sza: &Array2<f64>, valid: &Array2<bool>) -> Array2<u8> {
    let dim = bands.dim();
    assert_eq!(sza.dim(), dim, "sza shape mismatch");
    assert_eq!(valid.dim(), dim, "valid mask shape mismatch");

    let d1 = &bands.c13 - &bands.c15;
    let d2 = &bands.c11 - &bands.c13;
    let d3 = &bands.c07 - &bands.c13;

    let (mean, std) = texture::local_mean_std(&d1, TEXTURE_KERNEL);

    let mut out = Array2::from_elem(dim, 0u8);
    for ((i, j), code) in out.indexed_iter_mut() {
        if !valid[[i, j]] {
            *code = NODATA;
            continue;
        }
        let (d1v, d2v, d3v) = (d1[[i, j]], d2[[i, j]], d3[[i, j]]);
        let anomaly = d1v - mean[[i, j]] * std[[i, j]];
        let n = texture_score(d1v, anomaly);

        let zenith = sza[[i, j]];
        let r = if zenith > 85.0 {
            raw_night(d1v, d2v, d3v, n)
        } else if zenith < 70.0 {
            raw_day(d1v, d2v, d3v, n)
        } else if zenith.is_finite() {
            raw_twilight(d1v, d2v, d3v, n)
        } else {
            0
        };

        let u1 = refine_thresholds(r, d2v);
        let u2 = refine_shortwave(u1, d3v);
        *code = refine_phase(u2, bands.phase[[i, j]]);
    }
    out
}
