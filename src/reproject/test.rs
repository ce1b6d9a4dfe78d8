// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Unit tests for the geographic warp

use super::*;
use float_cmp::approx_eq;
use ndarray::Array2;

use crate::projection::Sweep;

fn goes16() -> GeosProjection {
    GeosProjection {
        h: 35_786_023.0,
        lon0: -75.0,
        sweep: Sweep::X,
        a: 6_378_137.0,
        b: 6_356_752.31414,
    }
}

#[test]
fn test_grid_sizing_and_back_solved_resolution() {
    let bounds = LatLonBounds::new(-100.0, 20.0, -98.0, 18.0);
    let grid = GeographicGrid::from_bounds(&bounds, 0.02);
    assert_eq!((grid.width, grid.height), (100, 100));
    assert!(approx_eq!(f64, grid.res_lon, 0.02, epsilon = 1e-12));
    assert!(approx_eq!(f64, grid.res_lat, 0.02, epsilon = 1e-12));

    // The affine anchors the exact bbox corner...
    let gt = grid.transform();
    assert_eq!(gt.x_ul, -100.0);
    assert_eq!(gt.y_ul, 20.0);
    assert_eq!(gt.yres, -grid.res_lat);
    // ...and the far edges land on the requested bounds.
    let lon_max = gt.x_ul + grid.width as f64 * gt.xres;
    let lat_min = gt.y_ul + grid.height as f64 * gt.yres;
    assert!(approx_eq!(f64, lon_max, -98.0, epsilon = 1e-9));
    assert!(approx_eq!(f64, lat_min, 18.0, epsilon = 1e-9));
}

#[test]
fn test_grid_rounds_size_to_nearest() {
    let bounds = LatLonBounds::new(0.0, 1.03, 1.03, 0.0);
    let grid = GeographicGrid::from_bounds(&bounds, 0.02);
    // 1.03 / 0.02 = 51.5 rounds away from zero.
    assert_eq!(grid.width, 52);
    assert!(approx_eq!(f64, grid.res_lon * 52.0, 1.03, epsilon = 1e-12));
}

#[test]
fn test_grid_never_degenerates() {
    let bounds = LatLonBounds::new(0.0, 0.001, 0.001, 0.0);
    let grid = GeographicGrid::from_bounds(&bounds, 1.0);
    assert_eq!((grid.width, grid.height), (1, 1));
}

/// An 11x11 native window around Popocatepetl with 10 km pixels.
fn native_window() -> (GeoTransform, Array2<u8>) {
    let x: Vec<f64> = (0..11).map(|i| -2_400_000.0 + 10_000.0 * i as f64).collect();
    let y: Vec<f64> = (0..11).map(|i| 2_060_000.0 - 10_000.0 * i as f64).collect();
    let gt = GeoTransform::from_coords(&x, &y).unwrap();
    (gt, Array2::zeros((11, 11)))
}

#[test]
fn test_warp_nearest_picks_the_right_source_pixel() {
    let proj = goes16();
    let (gt, mut ash) = native_window();
    // The volcano (19.02 N, 98.62 W) projects to scan metres
    // (-2353554, 2015310), which is source pixel (4, 5) on this window.
    ash[[4, 5]] = 1;

    let bounds = LatLonBounds::new(-98.63, 19.03, -98.61, 19.01);
    let grid = GeographicGrid::from_bounds(&bounds, 0.02);
    assert_eq!((grid.width, grid.height), (1, 1));

    let out = warp_to_geographic(&ash, &gt, &proj, &grid);
    assert_eq!(out[[0, 0]], 1);
}

#[test]
fn test_warp_uniform_source_inside_window() {
    let proj = goes16();
    let (gt, mut ash) = native_window();
    ash.fill(3);

    // A bbox well inside the native window samples only real pixels.
    let bounds = LatLonBounds::new(-98.9, 19.2, -98.4, 18.8);
    let grid = GeographicGrid::from_bounds(&bounds, 0.05);
    let out = warp_to_geographic(&ash, &gt, &proj, &grid);
    assert_eq!(out.dim(), (grid.height, grid.width));
    assert!(out.iter().all(|&v| v == 3), "{out:?}");
}

#[test]
fn test_warp_nodata_passes_through() {
    let proj = goes16();
    let (gt, mut ash) = native_window();
    ash.fill(NODATA);

    let bounds = LatLonBounds::new(-98.9, 19.2, -98.4, 18.8);
    let grid = GeographicGrid::from_bounds(&bounds, 0.05);
    let out = warp_to_geographic(&ash, &gt, &proj, &grid);
    assert!(out.iter().all(|&v| v == NODATA));
}

#[test]
fn test_warp_outside_window_is_nodata() {
    let proj = goes16();
    let (gt, mut ash) = native_window();
    ash.fill(2);

    // A bbox far west of the 11x11 window maps entirely off it.
    let bounds = LatLonBounds::new(-110.0, 19.2, -109.5, 18.8);
    let grid = GeographicGrid::from_bounds(&bounds, 0.05);
    let out = warp_to_geographic(&ash, &gt, &proj, &grid);
    assert!(out.iter().all(|&v| v == NODATA));
}

#[test]
fn test_warp_clips_partial_coverage() {
    let proj = goes16();
    let (gt, mut ash) = native_window();
    ash.fill(2);

    // Window spans roughly 98.2..99.3 W; this bbox hangs off its west edge.
    let bounds = LatLonBounds::new(-100.0, 19.1, -98.5, 18.9);
    let grid = GeographicGrid::from_bounds(&bounds, 0.02);
    let out = warp_to_geographic(&ash, &gt, &proj, &grid);
    let covered = out.iter().filter(|&&v| v == 2).count();
    let uncovered = out.iter().filter(|&&v| v == NODATA).count();
    assert!(covered > 0 && uncovered > 0);
    assert_eq!(covered + uncovered, out.len());
}
