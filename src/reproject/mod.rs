// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Warping the categorical ash raster to a geographic grid.

The target grid is anchored on the exact clip bbox: integer width and
height come from rounding range/resolution, and the cell sizes are then
back-solved from range/size so the grid spans precisely the requested
bounds. Resampling is nearest neighbour (the raster is categorical) and
the nodata code passes through for target cells that fall outside the
source window or off the Earth disk.
*/

use ndarray::Array2;

use crate::projection::{GeoTransform, GeosProjection, LatLonBounds};
use crate::NODATA;

#[cfg(test)]
mod test;

/// Default target resolution in degrees, about 2 km at the equator.
pub const DEFAULT_GEO_RES: f64 = 0.02;

/// A regular EPSG:4326 grid anchored on a clip bbox.
#[derive(Debug, Clone, PartialEq)]
pub struct GeographicGrid {
    pub bounds: LatLonBounds,
    pub width: usize,
    pub height: usize,
    pub res_lon: f64,
    pub res_lat: f64,
}

impl GeographicGrid {
    /// Builds the grid covering `bounds` at approximately `res` degrees.
    ///
    /// `width = round(lon range / res)`, `height = round(lat range / res)`
    /// (at least 1), then the exact per-axis resolutions are back-solved
    /// from range/size so the grid's outer edges are the requested bounds.
    pub fn from_bounds(bounds: &LatLonBounds, res: f64) -> GeographicGrid {
        let width = (bounds.width() / res).round().max(1.0) as usize;
        let height = (bounds.height() / res).round().max(1.0) as usize;
        GeographicGrid {
            bounds: *bounds,
            width,
            height,
            res_lon: bounds.width() / width as f64,
            res_lat: bounds.height() / height as f64,
        }
    }

    /// The affine `(res_lon, 0, lon_min, 0, -res_lat, lat_max)`.
    pub fn transform(&self) -> GeoTransform {
        GeoTransform {
            xres: self.res_lon,
            x_ul: self.bounds.lon_min,
            yres: -self.res_lat,
            y_ul: self.bounds.lat_max,
        }
    }
}

/// Warps a categorical raster from the native geostationary grid to a
/// geographic grid, nearest neighbour.
///
/// # Arguments
///
/// * `ash` - the source raster on the native window.
///
/// * `native` - the window's pixel→world transform, projection metres.
///
/// * `proj` - the scene's geostationary CRS.
///
/// * `grid` - the target geographic grid.
///
///
/// # Returns
///
/// * The warped raster of shape `(grid.height, grid.width)`.
///
pub fn warp_to_geographic(
    ash: &Array2<u8>,
    native: &GeoTransform,
    proj: &GeosProjection,
    grid: &GeographicGrid,
) -> Array2<u8> {
    let (src_rows, src_cols) = ash.dim();
    let target = grid.transform();

    let mut out = Array2::from_elem((grid.height, grid.width), NODATA);
    for ((i, j), cell) in out.indexed_iter_mut() {
        let (lon, lat) = target.pixel_centre(i, j);
        let Some((x, y)) = proj.forward(lon, lat) else {
            continue;
        };
        let (row_f, col_f) = native.world_to_pixel(x, y);
        let row = row_f.round();
        let col = col_f.round();
        if row < 0.0 || col < 0.0 {
            continue;
        }
        let (row, col) = (row as usize, col as usize);
        if row < src_rows && col < src_cols {
            *cell = ash[[row, col]];
        }
    }
    out
}
