// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! In-memory radio images: pixel data on a linear direction grid, one or
//! more frequency planes, and optional metadata.

mod error;
pub(crate) mod regrid;

pub use error::ImageError;
pub use regrid::regrid_onto;

use marlu::RADec;
use ndarray::prelude::*;
use rayon::prelude::*;

use crate::{beam::GaussianBeam, c64, fft};

/// A linear mapping between pixel and world coordinates, a small-field
/// approximation of a tangent-plane projection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionGrid {
    /// The world coordinate at the reference pixel.
    pub centre: RADec,
    /// Radians per pixel along x (usually negative; RA increases leftwards).
    pub inc_x_rad: f64,
    /// Radians per pixel along y.
    pub inc_y_rad: f64,
    /// The reference pixel, x. Fractional positions are allowed.
    pub ref_x_pix: f64,
    /// The reference pixel, y.
    pub ref_y_pix: f64,
}

impl DirectionGrid {
    /// The world coordinate at a (fractional) pixel position.
    pub fn world_at(&self, x_pix: f64, y_pix: f64) -> RADec {
        RADec::from_radians(
            self.centre.ra + (x_pix - self.ref_x_pix) * self.inc_x_rad,
            self.centre.dec + (y_pix - self.ref_y_pix) * self.inc_y_rad,
        )
    }

    /// The (fractional) pixel position of a world coordinate.
    pub fn pix_at(&self, world: RADec) -> (f64, f64) {
        (
            (world.ra - self.centre.ra) / self.inc_x_rad + self.ref_x_pix,
            (world.dec - self.centre.dec) / self.inc_y_rad + self.ref_y_pix,
        )
    }
}

/// A radio image. The data is indexed `[plane, y, x]`, with one frequency
/// per plane.
#[derive(Debug, Clone)]
pub struct Image {
    pub name: String,
    pub data: Array3<f64>,
    pub grid: DirectionGrid,
    /// One sky frequency per plane \[Hz\].
    pub freqs_hz: Vec<f64>,
    /// The restoring beam, if known.
    pub beam: Option<GaussianBeam>,
    /// `true` marks a good pixel. `None` means everything is good.
    pub mask: Option<Array3<bool>>,
    /// The brightness unit, e.g. "Jy/beam".
    pub unit: String,
    pub telescope: Option<String>,
    /// Free-form provenance entries.
    pub history: Vec<String>,
}

impl Image {
    pub fn new(
        name: String,
        data: Array3<f64>,
        grid: DirectionGrid,
        freqs_hz: Vec<f64>,
    ) -> Result<Image, ImageError> {
        let (num_planes, ny, nx) = data.dim();
        if num_planes == 0 || ny == 0 || nx == 0 {
            return Err(ImageError::Empty);
        }
        if freqs_hz.len() != num_planes {
            return Err(ImageError::FreqCountMismatch {
                num_planes,
                num_freqs: freqs_hz.len(),
            });
        }
        if grid.inc_x_rad == 0.0 || grid.inc_y_rad == 0.0 {
            return Err(ImageError::ZeroIncrement);
        }
        Ok(Image {
            name,
            data,
            grid,
            freqs_hz,
            beam: None,
            mask: None,
            unit: "Jy/beam".to_string(),
            telescope: None,
            history: vec![],
        })
    }

    pub fn num_planes(&self) -> usize {
        self.data.dim().0
    }

    pub fn ny(&self) -> usize {
        self.data.dim().1
    }

    pub fn nx(&self) -> usize {
        self.data.dim().2
    }

    /// The frequency of the first plane.
    pub fn ref_freq_hz(&self) -> f64 {
        self.freqs_hz[0]
    }

    /// The world coordinate of the central pixel.
    pub fn pointing_centre(&self) -> RADec {
        self.grid
            .world_at((self.nx() / 2) as f64, (self.ny() / 2) as f64)
    }

    /// Attach a mask; its shape must match the data.
    pub fn set_mask(&mut self, mask: Array3<bool>) -> Result<(), ImageError> {
        if mask.dim() != self.data.dim() {
            return Err(ImageError::MaskShapeMismatch {
                data: self.data.dim(),
                mask: mask.dim(),
            });
        }
        self.mask = Some(mask);
        Ok(())
    }

    /// A copy of one plane with masked pixels zeroed.
    pub fn masked_plane(&self, plane: usize) -> Array2<f64> {
        let mut out = self.data.index_axis(Axis(0), plane).to_owned();
        if let Some(mask) = &self.mask {
            let m = mask.index_axis(Axis(0), plane);
            azip!((v in &mut out, &good in &m) if !good { *v = 0.0 });
        }
        out
    }

    /// Convolve every plane with a Gaussian kernel, in place, by tapering in
    /// the Fourier plane. The kernel has unit integral, so the image sum is
    /// preserved; callers holding Jy/beam data must rescale for the new
    /// beam themselves.
    pub fn convolve_in_place(&mut self, kernel: &GaussianBeam) {
        if kernel.is_point() {
            return;
        }
        let (_, ny, nx) = self.data.dim();
        let (inc_x, inc_y) = (self.grid.inc_x_rad, self.grid.inc_y_rad);

        let planes: Vec<Array2<f64>> = self
            .data
            .outer_iter()
            .collect::<Vec<_>>()
            .into_par_iter()
            .map(|plane| {
                let mut work: Array2<c64> = plane.mapv(|v| c64::new(v, 0.0));
                fft::fft_2d(&mut work);
                for ((y, x), v) in work.indexed_iter_mut() {
                    let u = fft::fft_freq(x, nx, inc_x);
                    let w = fft::fft_freq(y, ny, inc_y);
                    *v *= kernel.uv_taper(u, w);
                }
                fft::ifft_2d(&mut work);
                work.mapv(|v| v.re)
            })
            .collect();

        for (mut dst, src) in self.data.outer_iter_mut().zip(planes) {
            dst.assign(&src);
        }
    }

    pub fn append_history(&mut self, entry: impl Into<String>) {
        self.history.push(entry.into());
    }
}
