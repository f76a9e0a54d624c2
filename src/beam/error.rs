// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with Gaussian beams.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BeamError {
    #[error("The beam minor axis ({minor_rad} rad) is bigger than the major axis ({major_rad} rad)")]
    MinorBiggerThanMajor { major_rad: f64, minor_rad: f64 },

    #[error("A beam axis was negative ({0} rad)")]
    NegativeSize(f64),

    #[error("A beam parameter was not finite")]
    NonFinite,

    #[error("The beam to deconvolve is wider than this beam; there is no solution")]
    Undeconvolvable,

    #[error("Cannot fit a beam: the image plane has no positive peak")]
    FitNoPeak,

    #[error("Cannot fit a beam: only {0} pixels above half power (need at least 6)")]
    FitTooFewPoints(usize),

    #[error("Cannot fit a beam: the least-squares system is degenerate")]
    FitDegenerate,
}
