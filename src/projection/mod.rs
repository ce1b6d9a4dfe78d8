// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
The geostationary fixed-grid projection and its pixel/world transforms.

The forward and inverse mappings implement the GOES-R Product User Guide
geodesy: geodetic lon/lat against the file's ellipsoid to and from scan
angles as seen from the satellite. World coordinates are scan angles times
the perspective height ("projection metres"). Points outside the visible
Earth disk map to NaN on the way out and to `None` on the way in.
*/
pub mod error;

use ndarray::Array2;

use crate::netcdf_read::ProjectionAttrs;
pub use error::ProjectionError;


/// Scan sweep axis convention. GOES-R sweeps about x; the legacy
/// (Meteosat-style) convention sweeps about y.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sweep {
    X,
    Y,
}

/// A geographic bounding box in the `(lon_min, lat_max, lon_max, lat_min)`
/// order used by the clip-region tables.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLonBounds {
    pub lon_min: f64,
    pub lat_max: f64,
    pub lon_max: f64,
    pub lat_min: f64,
}

impl LatLonBounds {
    pub fn new(lon_min: f64, lat_max: f64, lon_max: f64, lat_min: f64) -> Self {
        Self {
            lon_min,
            lat_max,
            lon_max,
            lat_min,
        }
    }

    /// Longitude span in degrees.
    pub fn width(&self) -> f64 {
        self.lon_max - self.lon_min
    }

    /// Latitude span in degrees.
    pub fn height(&self) -> f64 {
        self.lat_max - self.lat_min
    }
}

impl std::fmt::Display for LatLonBounds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.lon_min, self.lat_max, self.lon_max, self.lat_min
        )
    }
}

/// The geostationary CRS of one ABI scene.
#[derive(Debug, Clone, PartialEq)]
pub struct GeosProjection {
    /// Perspective point height above the ellipsoid, metres
    pub h: f64,
    /// Longitude of the projection origin, degrees
    pub lon0: f64,
    /// Sweep axis
    pub sweep: Sweep,
    /// Ellipsoid semi-major axis, metres
    pub a: f64,
    /// Ellipsoid semi-minor axis, metres
    pub b: f64,
}

impl GeosProjection {
    /// Builds the CRS from a product file's projection attributes.
    ///
    /// Fails with `BadProjection` when a parameter is non-finite,
    /// non-positive or the sweep axis is not recognised.
    pub fn from_attrs(attrs: &ProjectionAttrs) -> Result<GeosProjection, ProjectionError> {
        let sweep = match attrs.sweep_angle_axis.as_str() {
            "x" => Sweep::X,
            "y" => Sweep::Y,
            other => {
                return Err(ProjectionError::BadProjection(format!(
                    "unsupported sweep_angle_axis '{other}'"
                )))
            }
        };
        let check = |name: &str, v: f64| {
            if v.is_finite() && v > 0.0 {
                Ok(v)
            } else {
                Err(ProjectionError::BadProjection(format!("{name} = {v}")))
            }
        };
        if !attrs.longitude_of_projection_origin.is_finite() {
            return Err(ProjectionError::BadProjection(format!(
                "longitude_of_projection_origin = {}",
                attrs.longitude_of_projection_origin
            )));
        }
        Ok(GeosProjection {
            h: check("perspective_point_height", attrs.perspective_point_height)?,
            lon0: attrs.longitude_of_projection_origin,
            sweep,
            a: check("semi_major_axis", attrs.semi_major_axis)?,
            b: check("semi_minor_axis", attrs.semi_minor_axis)?,
        })
    }

    /// Distance from the Earth centre to the satellite, metres.
    fn radius(&self) -> f64 {
        self.h + self.a
    }

    /// PROJ string naming this CRS, used as the GeoTIFF citation.
    pub fn proj_string(&self) -> String {
        let sweep = match self.sweep {
            Sweep::X => "x",
            Sweep::Y => "y",
        };
        format!(
            "+proj=geos +lon_0={} +h={} +x_0=0 +y_0=0 +a={} +b={} +sweep={} +units=m +no_defs",
            self.lon0, self.h, self.a, self.b, sweep
        )
    }

    /// Projects geodetic lon/lat (degrees) to world coordinates in
    /// projection metres.
    ///
    /// Returns `None` when the point is on the far side of the Earth from
    /// the satellite.
    pub fn forward(&self, lon_deg: f64, lat_deg: f64) -> Option<(f64, f64)> {
        if !lon_deg.is_finite() || !lat_deg.is_finite() {
            return None;
        }
        let big_h = self.radius();
        let lat = lat_deg.to_radians();
        let dlon = (lon_deg - self.lon0).to_radians();
        let e2 = (self.a * self.a - self.b * self.b) / (self.a * self.a);

        // Geocentric latitude and radius on the ellipsoid surface.
        let phi_c = ((self.b * self.b) / (self.a * self.a) * lat.tan()).atan();
        let rc = self.b / (1.0 - e2 * phi_c.cos().powi(2)).sqrt();

        let sx = big_h - rc * phi_c.cos() * dlon.cos();
        let sy = -rc * phi_c.cos() * dlon.sin();
        let sz = rc * phi_c.sin();

        // Visibility test: the surface point must face the satellite.
        if big_h * (big_h - sx) < sy * sy + (self.a * self.a) / (self.b * self.b) * sz * sz {
            return None;
        }

        let norm = (sx * sx + sy * sy + sz * sz).sqrt();
        let (x, y) = match self.sweep {
            Sweep::X => ((-sy / norm).asin(), (sz / sx).atan()),
            Sweep::Y => ((-sy / sx).atan(), (sz / norm).asin()),
        };
        Some((x * self.h, y * self.h))
    }

    /// Unprojects world coordinates in projection metres to geodetic
    /// `(lat, lon)` degrees.
    ///
    /// Off-disk coordinates yield `(NaN, NaN)`.
    pub fn inverse(&self, x_m: f64, y_m: f64) -> (f64, f64) {
        let big_h = self.radius();
        let x = x_m / self.h;
        let y = y_m / self.h;
        let k = (self.a * self.a) / (self.b * self.b);

        let (cos_x, sin_x) = (x.cos(), x.sin());
        let (cos_y, sin_y) = (y.cos(), y.sin());

        // Quadratic for the slant range along the view ray.
        let qa = match self.sweep {
            Sweep::X => sin_x * sin_x + cos_x * cos_x * (cos_y * cos_y + k * sin_y * sin_y),
            Sweep::Y => cos_y * cos_y + k * sin_y * sin_y,
        };
        let qb = -2.0 * big_h * cos_x * cos_y;
        let qc = big_h * big_h - self.a * self.a;
        let disc = qb * qb - 4.0 * qa * qc;
        if disc < 0.0 {
            return (f64::NAN, f64::NAN);
        }
        let rs = (-qb - disc.sqrt()) / (2.0 * qa);

        let (sx, sy, sz) = match self.sweep {
            Sweep::X => (rs * cos_x * cos_y, -rs * sin_x, rs * cos_x * sin_y),
            Sweep::Y => (rs * cos_x * cos_y, -rs * cos_y * sin_x, rs * sin_y),
        };

        let lat = (k * sz / ((big_h - sx).powi(2) + sy * sy).sqrt()).atan();
        let lon = self.lon0.to_radians() - (sy / (big_h - sx)).atan();
        (lat.to_degrees(), lon.to_degrees())
    }
}

/// The affine pixel→world transform `(xres, 0, x_ul, 0, yres, y_ul)`.
///
/// `(x_ul, y_ul)` is the outer corner of pixel (0,0): the first pixel
/// centre minus half a pixel. `xres > 0`, `yres < 0` (north-up).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    pub xres: f64,
    pub x_ul: f64,
    pub yres: f64,
    pub y_ul: f64,
}

impl GeoTransform {
    /// Derives the transform from pixel-centre coordinate arrays.
    pub fn from_coords(x: &[f64], y: &[f64]) -> Result<GeoTransform, ProjectionError> {
        if x.len() < 2 || y.len() < 2 {
            return Err(ProjectionError::DegenerateCoords {
                x: x.len(),
                y: y.len(),
            });
        }
        let xres = (x[1] - x[0]).abs();
        let yres = -(y[1] - y[0]).abs();
        Ok(GeoTransform {
            xres,
            x_ul: x[0] - xres / 2.0,
            yres,
            y_ul: y[0] - yres / 2.0,
        })
    }

    /// The six-element affine tuple `(xres, 0, x_ul, 0, yres, y_ul)`.
    pub fn as_tuple(&self) -> (f64, f64, f64, f64, f64, f64) {
        (self.xres, 0.0, self.x_ul, 0.0, self.yres, self.y_ul)
    }

    /// World coordinates of a pixel centre.
    pub fn pixel_centre(&self, row: usize, col: usize) -> (f64, f64) {
        (
            self.x_ul + (col as f64 + 0.5) * self.xres,
            self.y_ul + (row as f64 + 0.5) * self.yres,
        )
    }

    /// Fractional pixel indices `(row, col)` of a world coordinate.
    pub fn world_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        ((y - self.y_ul) / self.yres - 0.5, (x - self.x_ul) / self.xres - 0.5)
    }
}

/// Index of the coordinate nearest to `target`.
fn nearest_index(coords: &[f64], target: f64) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (i, &c) in coords.iter().enumerate() {
        let d = (c - target).abs();
        if d < best_dist {
            best_dist = d;
            best = i;
        }
    }
    best
}

/// Computes the native pixel window covering a geographic bbox.
///
/// The bbox corners are projected into projection metres, the nearest
/// pixel-centre index is found on each axis, order is normalized and the
/// endpoints are included. `pad` expands the window by that fraction of its
/// own size on every side (used when a reprojection will follow, so nearest
/// neighbour sampling never runs off the edge), clamped to the grid.
///
/// # Arguments
///
/// * `x_m` - full-grid pixel-centre x coordinates, projection metres.
///
/// * `y_m` - full-grid pixel-centre y coordinates, projection metres.
///
/// * `proj` - the scene's geostationary CRS.
///
/// * `bbox` - the clip bounds in EPSG:4326.
///
/// * `pad` - relative padding, e.g. 0.1 for 10 % on each side.
///
///
/// # Returns
///
/// * A Result containing `(rows, cols)` half-open index ranges.
///
pub fn window_from_bbox(
    x_m: &[f64],
    y_m: &[f64],
    proj: &GeosProjection,
    bbox: &LatLonBounds,
    pad: f64,
) -> Result<(std::ops::Range<usize>, std::ops::Range<usize>), ProjectionError> {
    let corners = [
        (bbox.lon_min, bbox.lat_max),
        (bbox.lon_max, bbox.lat_max),
        (bbox.lon_min, bbox.lat_min),
        (bbox.lon_max, bbox.lat_min),
    ];
    let projected: Vec<(f64, f64)> = corners
        .iter()
        .filter_map(|&(lon, lat)| proj.forward(lon, lat))
        .collect();
    if projected.is_empty() {
        return Err(ProjectionError::EmptyWindow(bbox.to_string()));
    }

    let x_lo = projected.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
    let x_hi = projected.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
    let y_lo = projected.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
    let y_hi = projected.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);

    let (c0, c1) = order(nearest_index(x_m, x_lo), nearest_index(x_m, x_hi));
    let (r0, r1) = order(nearest_index(y_m, y_lo), nearest_index(y_m, y_hi));

    let (r0, r1) = pad_range(r0, r1, pad, y_m.len());
    let (c0, c1) = pad_range(c0, c1, pad, x_m.len());

    if r1 <= r0 || c1 <= c0 {
        return Err(ProjectionError::EmptyWindow(bbox.to_string()));
    }
    Ok((r0..r1, c0..c1))
}

fn order(a: usize, b: usize) -> (usize, usize) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Expands an inclusive index pair by a relative padding and returns the
/// half-open clamped range.
fn pad_range(lo: usize, hi: usize, pad: f64, len: usize) -> (usize, usize) {
    let span = (hi - lo + 1) as f64;
    let extra = (span * pad).round() as usize;
    (lo.saturating_sub(extra), (hi + extra + 1).min(len))
}

/// Reverse-projects a window's pixel centres to geographic coordinates.
///
/// Returns `(lat, lon)` arrays of shape `(y_m.len(), x_m.len())`. Pixels
/// outside the Earth disk are NaN and must be excluded by the valid-pixel
/// mask downstream.
pub fn pixel_grid_to_latlon(
    x_m: &[f64],
    y_m: &[f64],
    proj: &GeosProjection,
) -> (Array2<f64>, Array2<f64>) {
    let (rows, cols) = (y_m.len(), x_m.len());
    let mut lat = Array2::from_elem((rows, cols), f64::NAN);
    let mut lon = Array2::from_elem((rows, cols), f64::NAN);
    for (i, &y) in y_m.iter().enumerate() {
        for (j, &x) in x_m.iter().enumerate() {
            let (la, lo) = proj.inverse(x, y);
            lat[[i, j]] = la;
            lon[[i, j]] = lo;
        }
    }
    (lat, lon)
}
