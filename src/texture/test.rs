// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Unit tests for the NaN-aware kernel filters

use super::*;
use float_cmp::approx_eq;
use ndarray::{array, Array2};

const NAN: f32 = f32::NAN;

/// Reference implementation: direct per-window evaluation.
fn brute_mean(a: &Array2<f32>, k: usize) -> Array2<f32> {
    let r = k / 2;
    let (h, w) = a.dim();
    let mut out = Array2::from_elem((h, w), f32::NAN);
    for i in 0..h {
        for j in 0..w {
            let mut n = 0u32;
            let mut sum = 0.0f64;
            for ii in i.saturating_sub(r)..(i + r + 1).min(h) {
                for jj in j.saturating_sub(r)..(j + r + 1).min(w) {
                    let v = a[[ii, jj]];
                    if v.is_finite() {
                        n += 1;
                        sum += v as f64;
                    }
                }
            }
            if n > 0 {
                out[[i, j]] = (sum / n as f64) as f32;
            }
        }
    }
    out
}

fn assert_arrays_close(a: &Array2<f32>, b: &Array2<f32>) {
    assert_eq!(a.dim(), b.dim());
    for ((idx, &x), &y) in a.indexed_iter().zip(b.iter()) {
        if x.is_nan() || y.is_nan() {
            assert!(x.is_nan() && y.is_nan(), "at {idx:?}: {x} vs {y}");
        } else {
            assert!(approx_eq!(f32, x, y, epsilon = 1e-4), "at {idx:?}: {x} vs {y}");
        }
    }
}

/// Deterministic pseudo-random array with a sprinkle of NaNs.
fn noisy(h: usize, w: usize) -> Array2<f32> {
    let mut state = 0x2545f491u64;
    Array2::from_shape_fn((h, w), |_| {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let v = ((state >> 33) % 1000) as f32 / 100.0 - 5.0;
        if (state >> 20) % 7 == 0 {
            f32::NAN
        } else {
            v
        }
    })
}

#[test]
fn test_mean_all_finite_is_box_mean() {
    let a = Array2::from_shape_fn((5, 5), |(i, j)| (i * 5 + j) as f32);
    let mean = local_mean(&a, 3);
    // Interior pixel: plain 3x3 box mean.
    assert!(approx_eq!(f32, mean[[2, 2]], 12.0, epsilon = 1e-6));
    // Corner window shrinks to 4 samples: (0 + 1 + 5 + 6) / 4.
    assert!(approx_eq!(f32, mean[[0, 0]], 3.0, epsilon = 1e-6));
}

#[test]
fn test_mean_ignores_nans() {
    let a = array![[1.0, NAN, 3.0], [NAN, 5.0, NAN], [7.0, NAN, 9.0]];
    let mean = local_mean(&a, 3);
    // Centre window has finite {1, 3, 5, 7, 9}.
    assert!(approx_eq!(f32, mean[[1, 1]], 5.0, epsilon = 1e-6));
    // Corner window has finite {1, 5}.
    assert!(approx_eq!(f32, mean[[0, 0]], 3.0, epsilon = 1e-6));
}

#[test]
fn test_mean_empty_window_is_nan() {
    let a = Array2::from_elem((4, 4), NAN);
    let mean = local_mean(&a, 3);
    assert!(mean.iter().all(|v| v.is_nan()));
}

#[test]
fn test_mean_matches_brute_force() {
    let a = noisy(23, 17);
    for k in [1, 3, 5, 7] {
        assert_arrays_close(&local_mean(&a, k), &brute_mean(&a, k));
    }
}

#[test]
fn test_std_constant_input_is_zero() {
    let a = Array2::from_elem((6, 6), 2.5f32);
    let std = local_std(&a, 5);
    assert!(std.iter().all(|&v| v.abs() < 1e-6));
}

#[test]
fn test_std_known_window() {
    // One row; window at the centre sees {1, 2, 3}:
    // population std = sqrt(2/3).
    let a = array![[1.0f32, 2.0, 3.0]];
    let std = local_std(&a, 3);
    assert!(approx_eq!(f32, std[[0, 1]], (2.0f32 / 3.0).sqrt(), epsilon = 1e-6));
    // Edge window sees {1, 2}: std = 0.5.
    assert!(approx_eq!(f32, std[[0, 0]], 0.5, epsilon = 1e-6));
}

#[test]
fn test_std_ignores_nans() {
    let a = array![[1.0f32, NAN, 3.0]];
    let std = local_std(&a, 3);
    // Centre window finite samples {1, 3}: std = 1.
    assert!(approx_eq!(f32, std[[0, 1]], 1.0, epsilon = 1e-6));
    // Single finite sample: std = 0.
    assert!(approx_eq!(f32, std[[0, 0]], 0.0, epsilon = 1e-6));
}

#[test]
fn test_std_empty_window_is_nan() {
    let a = Array2::from_elem((3, 3), NAN);
    let std = local_std(&a, 3);
    assert!(std.iter().all(|v| v.is_nan()));
}

#[test]
fn test_std_parallel_blocks_match_serial_windows() {
    // Tall and narrow so the row blocks are shorter than the halo on many
    // threads; the result must not depend on the partition.
    let a = noisy(67, 5);
    let std = local_std(&a, 5);
    let r = 2;
    for i in 0..67 {
        for j in 0..5 {
            let expected = window_std(&a, i, j, r);
            let got = std[[i, j]];
            if expected.is_nan() {
                assert!(got.is_nan());
            } else {
                assert!(approx_eq!(f32, got, expected, epsilon = 1e-6));
            }
        }
    }
}

#[test]
fn test_mean_std_pair() {
    let a = noisy(12, 12);
    let (mean, std) = local_mean_std(&a, 5);
    assert_arrays_close(&mean, &local_mean(&a, 5));
    assert_arrays_close(&std, &local_std(&a, 5));
}

#[test]
#[should_panic(expected = "kernel size must be odd")]
fn test_even_kernel_panics() {
    let a = Array2::from_elem((2, 2), 0.0f32);
    local_mean(&a, 4);
}
