// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Feathering: merging a low-resolution image's large-scale emission with a
//! high-resolution image's fine detail in the Fourier plane.
//!
//! The high-resolution image's spatial frequencies are weighted by
//! `1 - R(u,v)`, where `R` is the low-resolution beam's Fourier response
//! normalised to its largest modulus. The low-resolution data, scaled by the
//! restoring-beam area ratio, fills in what the weight removed.

mod error;
#[cfg(feature = "plotting")]
pub(crate) mod plot;

pub use error::FeatherError;

use std::path::PathBuf;

use log::{info, warn};
use marlu::constants::VEL_C;
use ndarray::prelude::*;
use rayon::prelude::*;

use crate::{
    beam::GaussianBeam,
    c64, fft,
    image::{regrid_onto, DirectionGrid, Image},
    pb::PbModel,
};

/// Options for the one-shot [`feather`] function.
#[derive(Debug, Clone)]
pub struct FeatherParams {
    /// An extra multiplicative factor for the low-resolution data.
    pub sd_scale: f64,
    /// A PSF image to fit the low-resolution beam from, used when the
    /// low-resolution image has no restoring beam of its own.
    pub low_psf: Option<Image>,
    /// Fall back on the default primary beam of the low-resolution image's
    /// telescope.
    pub use_default_pb: bool,
    /// Fall back on a voltage-pattern description file.
    pub vp_table: Option<PathBuf>,
    /// Pretend the single dish had this diameter (metres). Must not exceed
    /// the diameter implied by the low-resolution beam.
    pub effective_diameter: Option<f64>,
    /// Degrade the low-resolution image to exactly its diffraction limit
    /// before combining.
    pub do_hi_pass_filter_on_sd: bool,
    /// Plot the weighting functions. Failure to plot is not fatal.
    pub do_plot: bool,
    /// Where to put the plot; defaults to `<name>.feather.png`.
    pub plot_file: Option<PathBuf>,
}

impl Default for FeatherParams {
    fn default() -> FeatherParams {
        FeatherParams {
            sd_scale: 1.0,
            low_psf: None,
            use_default_pb: false,
            vp_table: None,
            effective_diameter: None,
            do_hi_pass_filter_on_sd: false,
            do_plot: false,
            plot_file: None,
        }
    }
}

/// Cuts through a Fourier-plane quantity along the u and v axes. Distances
/// are baseline lengths in metres.
#[derive(Debug, Clone)]
pub struct WeightCuts {
    pub ux_m: Vec<f64>,
    pub x_amp: Vec<f64>,
    pub uy_m: Vec<f64>,
    pub y_amp: Vec<f64>,
}

/// A radially averaged cut through a Fourier-plane quantity.
#[derive(Debug, Clone)]
pub struct RadialCut {
    pub radius_m: Vec<f64>,
    pub amp: Vec<f64>,
}

/// The feathering engine. Holds the two images on a common grid and caches
/// the Fourier-plane weights between parameter changes.
pub struct Feather {
    high: Image,
    low: Image,
    /// The regridded low-resolution image as it arrived, so that effective-
    /// diameter changes can start from scratch.
    low_orig: Image,
    h_beam: Option<GaussianBeam>,
    l_beam: GaussianBeam,
    l_beam_orig: GaussianBeam,
    sd_scale: f64,
    dish_diam_m: Option<f64>,
    cweight: Option<Array2<c64>>,
    weighted_high: Option<Vec<Array2<c64>>>,
}

impl Feather {
    /// Set up feathering of `low` into `high`. The low-resolution image is
    /// regridded onto the high-resolution grid; it must carry a restoring
    /// beam, and must have either the same number of planes as `high` or a
    /// single plane (which is then used for every high-resolution plane).
    pub fn new(high: Image, low: &Image, sd_scale: f64) -> Result<Feather, FeatherError> {
        let l_beam = low.beam.ok_or(FeatherError::NoLowResBeam)?;
        let h_beam = high.beam;
        if h_beam.is_none() {
            warn!("The high-resolution image has no restoring beam; flux scaling will be approximate");
        }
        if low.num_planes() != high.num_planes() && low.num_planes() != 1 {
            return Err(FeatherError::PlaneMismatch {
                high: high.num_planes(),
                low: low.num_planes(),
            });
        }

        let mut low = regrid_onto(low, &high.grid, high.ny(), high.nx())?;
        if low.num_planes() != high.num_planes() {
            low = replicate_planes(&low, high.num_planes(), &high.freqs_hz)?;
        }

        Ok(Feather {
            low_orig: low.clone(),
            high,
            low,
            h_beam,
            l_beam,
            l_beam_orig: l_beam,
            sd_scale,
            dish_diam_m: None,
            cweight: None,
            weighted_high: None,
        })
    }

    /// Change the extra scaling applied to the low-resolution data.
    pub fn set_sd_scale(&mut self, sd_scale: f64) {
        self.sd_scale = sd_scale;
    }

    /// Drop the cached weights so the next operation recomputes them.
    pub fn clear_weight_flags(&mut self) {
        self.cweight = None;
        self.weighted_high = None;
    }

    /// The dish diameters (metres) implied by the low-resolution beam's
    /// major and minor axes at the image's reference frequency.
    pub fn effective_dish_diam(&self) -> (f64, f64) {
        let freq = self.low.ref_freq_hz();
        (
            1.22 * VEL_C / freq / self.l_beam.major_rad(),
            1.22 * VEL_C / freq / self.l_beam.minor_rad(),
        )
    }

    /// Degrade the low-resolution image as if its dish had the given
    /// diameter (the smaller of `x_diam_m` and `y_diam_m`; pass a
    /// non-positive `y_diam_m` to use `x_diam_m` alone). The image is reset
    /// to its original resolution first, so successive calls don't
    /// accumulate. Fails if the requested diameter is bigger than what the
    /// current beam supports, as resolution can't be recovered.
    pub fn set_effective_dish_diam(
        &mut self,
        x_diam_m: f64,
        y_diam_m: f64,
    ) -> Result<(), FeatherError> {
        let diam = if y_diam_m > 0.0 {
            x_diam_m.min(y_diam_m)
        } else {
            x_diam_m
        };
        if diam <= 0.0 {
            return Err(FeatherError::InvalidDiameter(diam));
        }

        // Start over from the as-supplied low image.
        self.low = self.low_orig.clone();
        self.l_beam = self.l_beam_orig;

        let freq = self.low.ref_freq_hz();
        let new_beam = GaussianBeam::diffraction_limited(diam, freq)?;
        let residual = new_beam.deconvolve(&self.l_beam).map_err(|_| {
            let (max_m, _) = self.effective_dish_diam();
            FeatherError::EffectiveDiameterTooBig {
                requested_m: diam,
                max_m,
            }
        })?;
        info!(
            "Degrading the low-resolution image to an effective dish diameter of {diam:.2} m"
        );
        self.low.convolve_in_place(&residual);
        // The data is per beam; relabel it for the wider one.
        let factor = new_beam.area_sr() / self.l_beam.area_sr();
        self.low.data.mapv_inplace(|v| v * factor);
        self.l_beam = new_beam;
        self.low.beam = Some(new_beam);
        self.dish_diam_m = Some(diam);
        self.clear_weight_flags();
        Ok(())
    }

    /// Degrade the high-resolution image to a new (wider) restoring beam.
    pub fn convolve_int(&mut self, new_beam: &GaussianBeam) -> Result<(), FeatherError> {
        let h_beam = self.h_beam.ok_or(FeatherError::NoHighResBeam)?;
        let residual = new_beam.deconvolve(&h_beam)?;
        self.high.convolve_in_place(&residual);
        let factor = new_beam.area_sr() / h_beam.area_sr();
        self.high.data.mapv_inplace(|v| v * factor);
        self.h_beam = Some(*new_beam);
        self.high.beam = Some(*new_beam);
        self.weighted_high = None;
        Ok(())
    }

    fn ensure_cweight(&mut self) -> &Array2<c64> {
        let l_beam = self.l_beam;
        let grid = self.high.grid;
        let (ny, nx) = (self.high.ny(), self.high.nx());
        self.cweight.get_or_insert_with(|| {
            info!("Calculating the feathering weights from the low-resolution beam");
            complement_weight(&l_beam, &grid, ny, nx)
        })
    }

    fn apply_feather(&mut self) {
        if self.weighted_high.is_some() {
            return;
        }
        let cweight = self.ensure_cweight().clone();
        let weighted: Vec<Array2<c64>> = self
            .high
            .data
            .outer_iter()
            .collect::<Vec<_>>()
            .into_par_iter()
            .map(|plane| {
                let mut work: Array2<c64> = plane.mapv(|v| c64::new(v, 0.0));
                fft::fft_2d(&mut work);
                work *= &cweight;
                work
            })
            .collect();
        self.weighted_high = Some(weighted);
    }

    /// The factor applied to the low-resolution data: the user factor times
    /// the ratio of the restoring-beam areas.
    fn sd_scaling(&self) -> f64 {
        if (self.sd_scale - 1.0).abs() > f64::EPSILON {
            info!(
                "Multiplying the low-resolution data by the user factor {}",
                self.sd_scale
            );
        }
        match self.h_beam {
            Some(h_beam) => {
                let ratio = h_beam.area_sr() / self.l_beam.area_sr();
                info!(
                    "Applying scaling for the ratio of the restoring-beam areas: {ratio:.6e}"
                );
                self.sd_scale * ratio
            }
            None => {
                warn!("Insufficient beam information to scale the low-resolution data; applying the user factor only");
                self.sd_scale
            }
        }
    }

    /// Perform the combination and return the feathered image, named `name`.
    pub fn feathered_image(&mut self, name: &str) -> Result<Image, FeatherError> {
        self.apply_feather();
        let scaling = self.sd_scaling();
        let weighted_high = self.weighted_high.take().unwrap_or_default();

        let (num_planes, ny, nx) = self.high.data.dim();
        let planes: Vec<Array2<f64>> = (0..num_planes)
            .into_par_iter()
            .map(|p| {
                let mut work: Array2<c64> = self
                    .low
                    .data
                    .index_axis(Axis(0), p)
                    .mapv(|v| c64::new(v * scaling, 0.0));
                fft::fft_2d(&mut work);
                work += &weighted_high[p];
                fft::ifft_2d(&mut work);
                work.mapv(|v| v.re)
            })
            .collect();
        let mut data = Array3::zeros((num_planes, ny, nx));
        for (mut dst, src) in data.outer_iter_mut().zip(planes) {
            dst.assign(&src);
        }
        self.weighted_high = Some(weighted_high);

        let mut out = Image::new(
            name.to_string(),
            data,
            self.high.grid,
            self.high.freqs_hz.clone(),
        )?;
        out.beam = self.h_beam;
        out.unit = self.high.unit.clone();
        out.telescope = self.high.telescope.clone();
        out.history = self.high.history.clone();
        out.append_history(format!(
            "feather: high='{}', low='{}', sdfactor={}{}",
            self.high.name,
            self.low.name,
            self.sd_scale,
            match self.dish_diam_m {
                Some(d) => format!(", effdishdiam={d} m"),
                None => String::new(),
            }
        ));

        // Both masks have to agree for an output pixel to be good.
        let mask = match (&self.high.mask, &self.low.mask) {
            (None, None) => None,
            (Some(h), None) => Some(h.clone()),
            (None, Some(l)) => Some(l.clone()),
            (Some(h), Some(l)) => {
                let mut m = h.clone();
                azip!((a in &mut m, &b in l) *a = *a && b);
                Some(m)
            }
        };
        if let Some(mask) = mask {
            out.set_mask(mask)?;
        }
        Ok(out)
    }

    /// u- and v-axis cuts through the weight applied to the high-resolution
    /// data.
    pub fn ft_cut_int_weight(&mut self) -> WeightCuts {
        self.ensure_cweight();
        let spectra = self.cweight.iter().cloned().collect::<Vec<_>>();
        self.axis_cuts(&spectra, |amp| amp)
    }

    /// u- and v-axis cuts through the weight applied to the low-resolution
    /// data, including the flux scaling.
    pub fn ft_cut_sd_weight(&mut self) -> WeightCuts {
        self.ensure_cweight();
        let scaling = self.sd_scaling();
        let spectra = self.cweight.iter().cloned().collect::<Vec<_>>();
        self.axis_cuts(&spectra, move |amp| (1.0 - amp) * scaling)
    }

    /// Cuts through the low-resolution image's Fourier amplitudes.
    pub fn ft_cut_sd_image(&self) -> WeightCuts {
        let spectra = image_spectra(&self.low);
        self.axis_cuts(&spectra, |amp| amp)
    }

    /// Cuts through the high-resolution image's Fourier amplitudes.
    pub fn ft_cut_int_image(&self) -> WeightCuts {
        let spectra = image_spectra(&self.high);
        self.axis_cuts(&spectra, |amp| amp)
    }

    /// Cuts through the weighted high-resolution Fourier data, as it enters
    /// the combination.
    pub fn feathered_cut_int(&mut self) -> WeightCuts {
        self.apply_feather();
        let spectra = self.weighted_high.clone().unwrap_or_default();
        self.axis_cuts(&spectra, |amp| amp)
    }

    /// Cuts through the scaled low-resolution Fourier data, as it enters the
    /// combination.
    pub fn feathered_cut_sd(&mut self) -> WeightCuts {
        let scaling = self.sd_scaling();
        let spectra = image_spectra(&self.low);
        self.axis_cuts(&spectra, move |amp| amp * scaling)
    }

    /// A radially averaged cut through the high-resolution weight.
    pub fn radial_cut_int_weight(&mut self) -> RadialCut {
        self.ensure_cweight();
        let spectra = self.cweight.iter().cloned().collect::<Vec<_>>();
        self.radial_cut(&spectra, |amp| amp)
    }

    /// A radially averaged cut through the low-resolution weight, including
    /// the flux scaling.
    pub fn radial_cut_sd_weight(&mut self) -> RadialCut {
        self.ensure_cweight();
        let scaling = self.sd_scaling();
        let spectra = self.cweight.iter().cloned().collect::<Vec<_>>();
        self.radial_cut(&spectra, move |amp| (1.0 - amp) * scaling)
    }

    // The baseline length (metres) of one Fourier bin along x.
    fn uv_metre_scale(&self) -> (f64, f64) {
        let freq = self.high.ref_freq_hz();
        let lambda = VEL_C / freq;
        let nx = self.high.nx() as f64;
        let ny = self.high.ny() as f64;
        (
            lambda / (nx * self.high.grid.inc_x_rad.abs()),
            lambda / (ny * self.high.grid.inc_y_rad.abs()),
        )
    }

    fn axis_cuts(&self, spectra: &[Array2<c64>], f: impl Fn(f64) -> f64) -> WeightCuts {
        let (du_m, dv_m) = self.uv_metre_scale();
        let (ny, nx) = (self.high.ny(), self.high.nx());
        let mut cuts = WeightCuts {
            ux_m: Vec::with_capacity(nx / 2),
            x_amp: Vec::with_capacity(nx / 2),
            uy_m: Vec::with_capacity(ny / 2),
            y_amp: Vec::with_capacity(ny / 2),
        };
        for k in 0..nx / 2 {
            cuts.ux_m.push(k as f64 * du_m);
            cuts.x_amp.push(f(plane_mean(spectra, 0, k).norm()));
        }
        for k in 0..ny / 2 {
            cuts.uy_m.push(k as f64 * dv_m);
            cuts.y_amp.push(f(plane_mean(spectra, k, 0).norm()));
        }
        cuts
    }

    fn radial_cut(&self, spectra: &[Array2<c64>], f: impl Fn(f64) -> f64) -> RadialCut {
        let (du_m, _) = self.uv_metre_scale();
        let (ny, nx) = (self.high.ny(), self.high.nx());
        let nrad = nx.min(ny) / 2;
        let mut cut = RadialCut {
            radius_m: Vec::with_capacity(nrad),
            amp: Vec::with_capacity(nrad),
        };
        for r in 0..nrad {
            let mut sum = 0.0;
            let mut count = 0usize;
            for x in 0..=r {
                let y = ((r * r - x * x) as f64).sqrt().round() as usize;
                if y < ny && x < nx {
                    sum += plane_mean(spectra, y, x).norm();
                    count += 1;
                }
            }
            cut.radius_m.push(r as f64 * du_m);
            cut.amp.push(if count > 0 { f(sum / count as f64) } else { 0.0 });
        }
        cut
    }
}

/// `1 - R(u,v)`, where `R` is the beam's Fourier response over the given
/// grid, normalised by its largest modulus. The zero spatial frequency sits
/// at `[0, 0]` and gets a weight of exactly zero.
fn complement_weight(
    beam: &GaussianBeam,
    grid: &DirectionGrid,
    ny: usize,
    nx: usize,
) -> Array2<c64> {
    let (cy, cx) = ((ny / 2) as f64, (nx / 2) as f64);
    let beam_image = Array2::from_shape_fn((ny, nx), |(y, x)| {
        let dx = (x as f64 - cx) * grid.inc_x_rad;
        let dy = (y as f64 - cy) * grid.inc_y_rad;
        c64::new(beam.image_response(dx, dy), 0.0)
    });
    let mut response = fft::ifftshift_2d(&beam_image);
    fft::fft_2d(&mut response);
    let fmax = response.iter().map(|v| v.norm()).fold(0.0, f64::max);
    response.mapv(|v| c64::new(1.0, 0.0) - v / fmax)
}

/// The per-plane Fourier transforms of an image.
fn image_spectra(image: &Image) -> Vec<Array2<c64>> {
    image
        .data
        .outer_iter()
        .map(|plane| {
            let mut work: Array2<c64> = plane.mapv(|v| c64::new(v, 0.0));
            fft::fft_2d(&mut work);
            work
        })
        .collect()
}

/// The mean over planes of a Fourier-plane sample.
fn plane_mean(spectra: &[Array2<c64>], y: usize, x: usize) -> c64 {
    if spectra.is_empty() {
        return c64::new(0.0, 0.0);
    }
    let sum: c64 = spectra.iter().map(|s| s[(y, x)]).sum();
    sum / spectra.len() as f64
}

fn replicate_planes(
    image: &Image,
    num_planes: usize,
    freqs_hz: &[f64],
) -> Result<Image, FeatherError> {
    let plane = image.data.index_axis(Axis(0), 0);
    let data = Array3::from_shape_fn((num_planes, image.ny(), image.nx()), |(_, y, x)| {
        plane[(y, x)]
    });
    let mut out = Image::new(image.name.clone(), data, image.grid, freqs_hz.to_vec())?;
    out.beam = image.beam;
    out.unit = image.unit.clone();
    out.telescope = image.telescope.clone();
    out.history = image.history.clone();
    if let Some(mask) = &image.mask {
        let m = mask.index_axis(Axis(0), 0);
        let full = Array3::from_shape_fn((num_planes, image.ny(), image.nx()), |(_, y, x)| {
            m[(y, x)]
        });
        out.set_mask(full)?;
    }
    Ok(out)
}

/// Resolve a restoring beam for a beam-less low-resolution image, in order
/// of preference: fit the supplied PSF, use a voltage-pattern table, or use
/// the default primary beam of the image's telescope.
fn resolve_low_beam(params: &FeatherParams, low: &Image) -> Result<GaussianBeam, FeatherError> {
    if let Some(psf) = &params.low_psf {
        info!("Fitting a beam to the low-resolution PSF");
        let plane = psf.masked_plane(0);
        return Ok(GaussianBeam::fit(
            plane.view(),
            psf.grid.inc_x_rad,
            psf.grid.inc_y_rad,
        )?);
    }

    let model = if let Some(path) = &params.vp_table {
        info!("Using the voltage-pattern table to determine weighting");
        Some(PbModel::from_vp_table(path)?)
    } else if params.use_default_pb {
        info!("Using the primary beam to determine weighting");
        let telescope = low
            .telescope
            .as_deref()
            .ok_or(FeatherError::NoTelescope)?;
        Some(PbModel::common(telescope)?)
    } else {
        None
    };

    match model {
        Some(model) => {
            let pattern = model.evaluate_onto(&low.grid, low.ny(), low.nx(), low.ref_freq_hz());
            Ok(GaussianBeam::fit(
                pattern.view(),
                low.grid.inc_x_rad,
                low.grid.inc_y_rad,
            )?)
        }
        None => Err(FeatherError::NoLowResBeam),
    }
}

/// Feather `low` into `high` in one call, resolving a low-resolution beam
/// if needed. `name` names the output image.
pub fn feather(
    name: &str,
    params: &FeatherParams,
    high: &Image,
    low: &Image,
) -> Result<Image, FeatherError> {
    let mut low = low.clone();
    if low.beam.is_none() {
        low.beam = Some(resolve_low_beam(params, &low)?);
    }

    let mut plume = Feather::new(high.clone(), &low, params.sd_scale)?;

    if let Some(diam) = params.effective_diameter {
        let (max_m, _) = plume.effective_dish_diam();
        if diam > max_m {
            return Err(FeatherError::EffectiveDiameterTooBig {
                requested_m: diam,
                max_m,
            });
        }
        plume.set_effective_dish_diam(diam, -1.0)?;
    } else if params.do_hi_pass_filter_on_sd {
        let (x_diam, y_diam) = plume.effective_dish_diam();
        plume.set_effective_dish_diam(x_diam, y_diam)?;
    }

    if params.do_plot {
        plot_weights(name, params, &mut plume);
    }

    plume.feathered_image(name)
}

#[cfg(feature = "plotting")]
fn plot_weights(name: &str, params: &FeatherParams, plume: &mut Feather) {
    let file = params
        .plot_file
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("{name}.feather.png")));
    // A failed plot shouldn't sink the feathering itself.
    if let Err(e) = plot::plot_weights(&file, plume) {
        log::error!("Couldn't plot the feathering weights: {e}");
    }
}

#[cfg(not(feature = "plotting"))]
fn plot_weights(_name: &str, _params: &FeatherParams, _plume: &mut Feather) {
    warn!("Not compiled with the \"plotting\" feature; skipping the weight plot");
}
