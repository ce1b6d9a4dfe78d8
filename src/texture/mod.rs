// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
NaN-aware local mean and standard deviation over a square kernel.

The mean uses two O(HW) separable box sums: one over the array with NaNs
substituted by zero, one over the finite-sample indicator. The standard
deviation evaluates each window directly (population form, matching
`nanstd`), parallelized over row blocks; each worker reads a `k/2` halo of
rows around its block. Boundary windows shrink to the array intersection,
and windows with no finite sample yield NaN.
*/

use ndarray::Array2;
use rayon::prelude::*;

#[cfg(test)]
mod test;

/// One axis of a separable box sum with constant-0 padding.
///
/// `out[i] = sum(a[i-r ..= i+r])` with out-of-range terms contributing 0.
fn box_sum_axis(values: &[f64], out: &mut [f64], r: usize) {
    let n = values.len();
    let mut acc = 0.0;
    // Prime the accumulator with the window centred at index 0.
    for &v in values.iter().take(r + 1) {
        acc += v;
    }
    for i in 0..n {
        out[i] = acc;
        if i + r + 1 < n {
            acc += values[i + r + 1];
        }
        if i >= r {
            acc -= values[i - r];
        }
    }
}

/// 2-D box sum with constant-0 padding, as two separable passes.
fn box_sum(a: &Array2<f64>, k: usize) -> Array2<f64> {
    let r = k / 2;
    let (h, w) = a.dim();
    let mut rows_done = Array2::zeros((h, w));
    let mut row_buf = vec![0.0; w];
    for i in 0..h {
        let row: Vec<f64> = a.row(i).to_vec();
        box_sum_axis(&row, &mut row_buf, r);
        rows_done
            .row_mut(i)
            .assign(&ndarray::ArrayView1::from(row_buf.as_slice()));
    }

    let mut out = Array2::zeros((h, w));
    let mut col_in = vec![0.0; h];
    let mut col_buf = vec![0.0; h];
    for j in 0..w {
        for i in 0..h {
            col_in[i] = rows_done[[i, j]];
        }
        box_sum_axis(&col_in, &mut col_buf, r);
        for i in 0..h {
            out[[i, j]] = col_buf[i];
        }
    }
    out
}

/// NaN-aware local mean over a k x k window.
///
/// Equivalent to the mean of the finite entries in the window centred at
/// each pixel; NaN where the window holds no finite entry.
///
/// # Arguments
///
/// * `a` - input array, may contain NaNs.
///
/// * `k` - odd kernel size.
///
///
/// # Returns
///
/// * The local-mean array, shaped like `a`.
///
pub fn local_mean(a: &Array2<f32>, k: usize) -> Array2<f32> {
    assert!(k % 2 == 1, "kernel size must be odd, got {k}");
    let zero_filled = a.mapv(|v| if v.is_finite() { v as f64 } else { 0.0 });
    let indicator = a.mapv(|v| if v.is_finite() { 1.0 } else { 0.0 });

    let sums = box_sum(&zero_filled, k);
    let counts = box_sum(&indicator, k);

    let mut out = Array2::from_elem(a.raw_dim(), f32::NAN);
    ndarray::Zip::from(&mut out)
        .and(&sums)
        .and(&counts)
        .for_each(|o, &s, &c| {
            if c > 0.5 {
                *o = (s / c) as f32;
            }
        });
    out
}

/// Population standard deviation of the finite entries of one window.
fn window_std(
    a: &Array2<f32>,
    centre_row: usize,
    centre_col: usize,
    r: usize,
) -> f32 {
    let (h, w) = a.dim();
    let row_lo = centre_row.saturating_sub(r);
    let row_hi = (centre_row + r + 1).min(h);
    let col_lo = centre_col.saturating_sub(r);
    let col_hi = (centre_col + r + 1).min(w);

    let mut n = 0u32;
    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    for i in row_lo..row_hi {
        for j in col_lo..col_hi {
            let v = a[[i, j]] as f64;
            if v.is_finite() {
                n += 1;
                sum += v;
                sum_sq += v * v;
            }
        }
    }
    if n == 0 {
        return f32::NAN;
    }
    let mean = sum / n as f64;
    let var = (sum_sq / n as f64 - mean * mean).max(0.0);
    var.sqrt() as f32
}

/// NaN-aware local standard deviation over a k x k window.
///
/// Population form (`nanstd`, ddof 0) over the finite entries of each
/// window; NaN where the window holds no finite entry. The work is
/// partitioned into row blocks evaluated on the rayon pool; every block
/// reads a `k/2` halo of rows beyond its own extent, so blocks shorter
/// than the halo are still exact.
///
/// # Arguments
///
/// * `a` - input array, may contain NaNs.
///
/// * `k` - odd kernel size.
///
///
/// # Returns
///
/// * The local-standard-deviation array, shaped like `a`.
///
pub fn local_std(a: &Array2<f32>, k: usize) -> Array2<f32> {
    assert!(k % 2 == 1, "kernel size must be odd, got {k}");
    let r = k / 2;
    let (h, w) = a.dim();
    if h == 0 || w == 0 {
        return Array2::from_elem((h, w), f32::NAN);
    }

    let block_rows = (h / rayon::current_num_threads().max(1)).max(1);
    let mut out = vec![0.0f32; h * w];
    out.par_chunks_mut(block_rows * w)
        .enumerate()
        .for_each(|(block, chunk)| {
            let first_row = block * block_rows;
            for (offset, row_out) in chunk.chunks_mut(w).enumerate() {
                let i = first_row + offset;
                for (j, o) in row_out.iter_mut().enumerate() {
                    *o = window_std(a, i, j, r);
                }
            }
        });

    Array2::from_shape_vec((h, w), out).expect("output matches input shape")
}

/// Both local statistics of one array in a single call.
pub fn local_mean_std(a: &Array2<f32>, k: usize) -> (Array2<f32>, Array2<f32>) {
    (local_mean(a, k), local_std(a, k))
}
