// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with feathering.

use thiserror::Error;

use crate::{beam::BeamError, image::ImageError, pb::PbError};

#[derive(Error, Debug)]
pub enum FeatherError {
    #[error("The low-resolution image has no restoring beam, and no PSF, primary beam or voltage pattern was supplied to derive one")]
    NoLowResBeam,

    #[error("The high-resolution image has no restoring beam")]
    NoHighResBeam,

    #[error("Need a primary beam, but the low-resolution image doesn't name its telescope")]
    NoTelescope,

    #[error("The high-resolution image has {high} planes but the low-resolution image has {low}; they must match, or the low-resolution image must have exactly one")]
    PlaneMismatch { high: usize, low: usize },

    #[error("An effective dish diameter must be positive, not {0} m")]
    InvalidDiameter(f64),

    #[error("Can't recover resolution beyond the data: an effective dish diameter of {requested_m:.2} m was requested, but the low-resolution beam supports at most {max_m:.2} m")]
    EffectiveDiameterTooBig { requested_m: f64, max_m: f64 },

    #[cfg(feature = "plotting")]
    #[error("Error from the plotters library: {0}")]
    Draw(String),

    #[error(transparent)]
    Beam(#[from] BeamError),

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error(transparent)]
    Pb(#[from] PbError),
}
