// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Two-dimensional FFTs on [`ndarray`] arrays, built on [`rustfft`].
//!
//! The forward transform is unnormalised; the inverse divides by the number
//! of elements, so `ifft_2d(fft_2d(a)) == a`. The zero spatial frequency
//! lives at index `[0, 0]`.


use ndarray::prelude::*;
use num_traits::Zero;
use rustfft::FftPlanner;

use crate::c64;

/// In-place forward 2D FFT, rows then columns.
pub(crate) fn fft_2d(a: &mut Array2<c64>) {
    fft_2d_with(a, true);
}

/// In-place inverse 2D FFT, normalised by `1 / (nx * ny)`.
pub(crate) fn ifft_2d(a: &mut Array2<c64>) {
    fft_2d_with(a, false);
    let norm = 1.0 / a.len() as f64;
    a.mapv_inplace(|v| v * norm);
}

fn fft_2d_with(a: &mut Array2<c64>, forward: bool) {
    let (ny, nx) = a.dim();
    let mut planner = FftPlanner::new();
    let (fft_x, fft_y) = if forward {
        (planner.plan_fft_forward(nx), planner.plan_fft_forward(ny))
    } else {
        (planner.plan_fft_inverse(nx), planner.plan_fft_inverse(ny))
    };

    // Rows are contiguous in ndarray's default layout.
    for mut row in a.outer_iter_mut() {
        if let Some(s) = row.as_slice_mut() {
            fft_x.process(s);
        }
    }

    let mut col = vec![c64::zero(); ny];
    for x in 0..nx {
        for (y, v) in col.iter_mut().enumerate() {
            *v = a[(y, x)];
        }
        fft_y.process(&mut col);
        for (y, v) in col.iter().enumerate() {
            a[(y, x)] = *v;
        }
    }
}

/// Cyclically shift an array so that the "centre" pixel `(ny / 2, nx / 2)`
/// lands on `[0, 0]`. This makes the FFT of a centred symmetric function
/// real-valued.
pub(crate) fn ifftshift_2d(a: &Array2<c64>) -> Array2<c64> {
    let (ny, nx) = a.dim();
    Array2::from_shape_fn((ny, nx), |(y, x)| a[((y + ny / 2) % ny, (x + nx / 2) % nx)])
}

/// The signed sample frequency (in cycles per world-coordinate unit) of FFT
/// bin `k` out of `n`, given the world increment between samples.
pub(crate) fn fft_freq(k: usize, n: usize, increment: f64) -> f64 {
    let ks = if k <= n / 2 {
        k as isize
    } else {
        k as isize - n as isize
    };
    ks as f64 / (n as f64 * increment)
}
