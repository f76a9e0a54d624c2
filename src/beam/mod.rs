// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Elliptical Gaussian restoring beams.
//!
//! Beam sizes are full widths at half maximum in radians. The position angle
//! is measured from the +y (north) axis towards +x (east), also in radians.

mod error;

pub use error::BeamError;

use marlu::constants::VEL_C;
use ndarray::prelude::*;

use crate::math::{solve_3x3, FWHM_TO_SIGMA};

/// The area of a unit-FWHM elliptical Gaussian, `pi / (4 ln 2)`.
const GAUSSIAN_AREA_FACTOR: f64 = 1.1330900354567985;

/// An elliptical Gaussian beam. The major axis is always at least as big as
/// the minor axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianBeam {
    major_rad: f64,
    minor_rad: f64,
    pa_rad: f64,
}

impl GaussianBeam {
    /// Create a beam from FWHM axes and a position angle, all in radians.
    pub fn new(major_rad: f64, minor_rad: f64, pa_rad: f64) -> Result<GaussianBeam, BeamError> {
        if !(major_rad.is_finite() && minor_rad.is_finite() && pa_rad.is_finite()) {
            return Err(BeamError::NonFinite);
        }
        if minor_rad > major_rad {
            return Err(BeamError::MinorBiggerThanMajor {
                major_rad,
                minor_rad,
            });
        }
        if minor_rad < 0.0 {
            return Err(BeamError::NegativeSize(minor_rad));
        }
        Ok(GaussianBeam {
            major_rad,
            minor_rad,
            pa_rad,
        })
    }

    /// A zero-size beam, the identity under convolution.
    pub fn point() -> GaussianBeam {
        GaussianBeam {
            major_rad: 0.0,
            minor_rad: 0.0,
            pa_rad: 0.0,
        }
    }

    /// The Gaussian beam corresponding to the diffraction limit of a dish,
    /// `1.22 lambda / D`, circular with a position angle of zero.
    pub fn diffraction_limited(diameter_m: f64, freq_hz: f64) -> Result<GaussianBeam, BeamError> {
        if diameter_m <= 0.0 || freq_hz <= 0.0 {
            return Err(BeamError::NonFinite);
        }
        let fwhm = 1.22 * VEL_C / freq_hz / diameter_m;
        GaussianBeam::new(fwhm, fwhm, 0.0)
    }

    pub fn major_rad(&self) -> f64 {
        self.major_rad
    }

    pub fn minor_rad(&self) -> f64 {
        self.minor_rad
    }

    pub fn pa_rad(&self) -> f64 {
        self.pa_rad
    }

    pub fn is_point(&self) -> bool {
        self.major_rad == 0.0
    }

    /// The beam solid angle in steradians, `pi / (4 ln 2) * major * minor`.
    pub fn area_sr(&self) -> f64 {
        GAUSSIAN_AREA_FACTOR * self.major_rad * self.minor_rad
    }

    /// The beam area in square arcseconds.
    pub fn area_arcsec2(&self) -> f64 {
        const RAD_TO_ARCSEC: f64 = 3600.0 * 180.0 / std::f64::consts::PI;
        self.area_sr() * RAD_TO_ARCSEC * RAD_TO_ARCSEC
    }

    // The (alpha, beta, gamma) quadratic-form coefficients of the squared
    // beam, used by the convolution algebra.
    fn quadratic(&self) -> (f64, f64, f64) {
        let (s, c) = self.pa_rad.sin_cos();
        let maj2 = self.major_rad * self.major_rad;
        let min2 = self.minor_rad * self.minor_rad;
        let alpha = maj2 * c * c + min2 * s * s;
        let beta = maj2 * s * s + min2 * c * c;
        let gamma = 2.0 * (min2 - maj2) * s * c;
        (alpha, beta, gamma)
    }

    fn from_quadratic(
        alpha: f64,
        beta: f64,
        gamma: f64,
        scale: f64,
    ) -> Result<GaussianBeam, BeamError> {
        let s = alpha + beta;
        let t = ((alpha - beta) * (alpha - beta) + gamma * gamma).sqrt();
        let major2 = 0.5 * (s + t);
        let minor2 = 0.5 * (s - t);
        // Tolerate small negative values from floating-point cancellation,
        // judged against the size of the input beams; anything bigger means
        // the deconvolution has no solution.
        if minor2 < -1e-7 * scale.max(f64::MIN_POSITIVE) {
            return Err(BeamError::Undeconvolvable);
        }
        let pa = if t < 1e-300 {
            0.0
        } else {
            0.5 * f64::atan2(-gamma, alpha - beta)
        };
        GaussianBeam::new(major2.max(0.0).sqrt(), minor2.max(0.0).sqrt(), pa)
    }

    /// The beam resulting from convolving this beam with another.
    pub fn convolve(&self, other: &GaussianBeam) -> Result<GaussianBeam, BeamError> {
        let (a1, b1, g1) = self.quadratic();
        let (a2, b2, g2) = other.quadratic();
        GaussianBeam::from_quadratic(a1 + a2, b1 + b2, g1 + g2, a1 + b1 + a2 + b2)
    }

    /// The beam which, convolved with `other`, gives this beam. A point beam
    /// is returned when the two beams are equal. Fails with
    /// [`BeamError::Undeconvolvable`] when `other` is wider than this beam in
    /// any direction.
    pub fn deconvolve(&self, other: &GaussianBeam) -> Result<GaussianBeam, BeamError> {
        let (a1, b1, g1) = self.quadratic();
        let (a2, b2, g2) = other.quadratic();
        GaussianBeam::from_quadratic(a1 - a2, b1 - b2, g1 - g2, a1 + b1)
    }

    /// The beam's Fourier response at spatial frequency `(u, v)` in cycles
    /// per radian, normalised to 1 at the origin.
    pub fn uv_taper(&self, u: f64, v: f64) -> f64 {
        let (sin_pa, cos_pa) = self.pa_rad.sin_cos();
        // Components along the major (north-ish) and minor axes.
        let up = u * sin_pa + v * cos_pa;
        let vp = u * cos_pa - v * sin_pa;
        let s_maj = self.major_rad * FWHM_TO_SIGMA;
        let s_min = self.minor_rad * FWHM_TO_SIGMA;
        let two_pi2 = 2.0 * std::f64::consts::PI * std::f64::consts::PI;
        (-two_pi2 * ((s_maj * up).powi(2) + (s_min * vp).powi(2))).exp()
    }

    /// The beam's image-plane response at offset `(x, y)` radians from its
    /// centre, normalised to a peak of 1.
    pub fn image_response(&self, x: f64, y: f64) -> f64 {
        if self.is_point() {
            return if x == 0.0 && y == 0.0 { 1.0 } else { 0.0 };
        }
        let (sin_pa, cos_pa) = self.pa_rad.sin_cos();
        let xp = x * sin_pa + y * cos_pa;
        let yp = x * cos_pa - y * sin_pa;
        let s_maj = self.major_rad * FWHM_TO_SIGMA;
        let s_min = self.minor_rad * FWHM_TO_SIGMA;
        let r2 = (xp / s_maj).powi(2) + (yp / s_min).powi(2);
        (-0.5 * r2).exp()
    }

    /// Fit a Gaussian to the main lobe of an image-plane response pattern.
    ///
    /// The pattern's peak is located, then `-ln(value / peak)` over pixels
    /// above half power is fit with a quadratic form by least squares. Pixel
    /// offsets are converted to world offsets with the supplied increments
    /// (radians per pixel).
    pub fn fit(
        plane: ArrayView2<f64>,
        inc_x_rad: f64,
        inc_y_rad: f64,
    ) -> Result<GaussianBeam, BeamError> {
        let (ny, nx) = plane.dim();
        let mut peak = f64::MIN;
        let mut peak_pos = (0, 0);
        for ((y, x), &v) in plane.indexed_iter() {
            if v > peak {
                peak = v;
                peak_pos = (y, x);
            }
        }
        if !(peak > 0.0) {
            return Err(BeamError::FitNoPeak);
        }

        // Normal equations for ln(peak / v) = a dx^2 + b dx dy + c dy^2.
        let mut m = [[0.0; 3]; 3];
        let mut rhs = [0.0; 3];
        let mut n_used = 0;
        for ((y, x), &v) in plane.indexed_iter() {
            if v < 0.5 * peak {
                continue;
            }
            let dx = (x as f64 - peak_pos.1 as f64) * inc_x_rad;
            let dy = (y as f64 - peak_pos.0 as f64) * inc_y_rad;
            let basis = [dx * dx, dx * dy, dy * dy];
            let target = (peak / v).ln();
            for i in 0..3 {
                for j in 0..3 {
                    m[i][j] += basis[i] * basis[j];
                }
                rhs[i] += basis[i] * target;
            }
            n_used += 1;
        }
        if n_used < 6 {
            return Err(BeamError::FitTooFewPoints(n_used));
        }

        let [a, b, c] = solve_3x3(m, rhs).ok_or(BeamError::FitDegenerate)?;

        // Eigen-decompose the quadratic form; the smaller eigenvalue belongs
        // to the major axis.
        let tr = a + c;
        let det_term = (((a - c) / 2.0).powi(2) + (b / 2.0).powi(2)).sqrt();
        let lam_min = tr / 2.0 - det_term;
        let lam_max = tr / 2.0 + det_term;
        if lam_min <= 0.0 {
            return Err(BeamError::FitDegenerate);
        }
        let sigma_major = 1.0 / (2.0 * lam_min).sqrt();
        let sigma_minor = 1.0 / (2.0 * lam_max).sqrt();
        // Major-axis eigenvector, expressed as an angle from +y towards +x.
        let (ex, ey) = if b.abs() < 1e-300 && (a - lam_min).abs() < 1e-300 {
            (0.0, 1.0)
        } else if b.abs() < 1e-300 {
            if a < c {
                (1.0, 0.0)
            } else {
                (0.0, 1.0)
            }
        } else {
            (b / 2.0, lam_min - a)
        };
        // The position angle is only defined modulo pi; keep it in
        // (-pi/2, pi/2].
        let mut pa = f64::atan2(ex, ey);
        if pa > std::f64::consts::FRAC_PI_2 {
            pa -= std::f64::consts::PI;
        } else if pa <= -std::f64::consts::FRAC_PI_2 {
            pa += std::f64::consts::PI;
        }

        GaussianBeam::new(
            sigma_major / FWHM_TO_SIGMA,
            sigma_minor / FWHM_TO_SIGMA,
            pa,
        )
    }
}
