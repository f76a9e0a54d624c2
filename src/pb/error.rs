// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with primary-beam models.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PbError {
    #[error("No default primary beam is known for telescope '{0}'")]
    UnknownTelescope(String),

    #[error("'{0}' is an invalid file type for a voltage-pattern table; must be yaml or json")]
    UnhandledFileType(String),

    #[error("Couldn't access voltage-pattern table {path}: {err}")]
    Io { path: PathBuf, err: std::io::Error },

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
