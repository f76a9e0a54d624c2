// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with images and regridding.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("The image has no pixels")]
    Empty,

    #[error("The image has {num_planes} planes but {num_freqs} frequencies")]
    FreqCountMismatch { num_planes: usize, num_freqs: usize },

    #[error("A direction increment was zero")]
    ZeroIncrement,

    #[error("The mask shape {mask:?} doesn't match the data shape {data:?}")]
    MaskShapeMismatch {
        data: (usize, usize, usize),
        mask: (usize, usize, usize),
    },

    #[error("Cannot regrid onto a target with no pixels")]
    EmptyTarget,
}
