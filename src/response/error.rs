// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with antenna response tables.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResponseError {
    #[error("The registry hasn't been initialised; call init first")]
    Uninitialised,

    #[error("Observatory {observatory} already has a row with beam ID {beam_id}")]
    DuplicateBeamId { observatory: String, beam_id: i32 },

    #[error("A row's centre and validity directions must share one reference frame")]
    FrameMismatch,

    #[error("Row {row}: NUM_SUBBANDS says {expected} sub-bands, but column {column} has {got} entries")]
    InconsistentSubBands {
        row: usize,
        column: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Response table {0} already exists; refusing to overwrite it")]
    TableExists(PathBuf),

    #[error("'{0}' is an invalid file type for a response table; must be yaml or json")]
    UnhandledFileType(String),

    #[error("Couldn't access response table {path}: {err}")]
    Io { path: PathBuf, err: std::io::Error },

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
