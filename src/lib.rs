// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Combine a low-resolution (usually single-dish) image with a
//! high-resolution (usually interferometric) image in the Fourier plane,
//! and look up antenna response patterns from on-disk tables.
//!
//! Feathering weights the high-resolution image's spatial frequencies by the
//! complement of the low-resolution beam's Fourier response, scales the
//! low-resolution data by the ratio of the restoring-beam areas, sums the
//! two and transforms back to the image plane.

pub mod beam;
pub mod feather;
pub(crate) mod fft;
pub mod image;
pub(crate) mod math;
pub mod pb;
pub mod response;

// Re-exports.
pub use beam::GaussianBeam;
pub use feather::{feather, Feather, FeatherParams};
pub use image::{DirectionGrid, Image};
pub use pb::PbModel;
pub use response::{AntennaResponseRegistry, FuncType, ResponseQuery, ResponseRow};

/// A shorthand for a complex number with double-precision components.
#[allow(non_camel_case_types)]
pub(crate) type c64 = num_complex::Complex<f64>;
