// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Analytic primary-beam models, used when a low-resolution image arrives
//! without a restoring beam.

mod error;
#[cfg(test)]
mod tests;

pub use error::PbError;

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use lazy_static::lazy_static;
use marlu::constants::VEL_C;
use ndarray::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{image::DirectionGrid, math::bessel_j1};

lazy_static! {
    /// Dish and blockage diameters (metres) for telescopes with well-known
    /// primary beams. Keys are upper case.
    static ref COMMON_DISHES: HashMap<&'static str, (f64, f64)> = {
        let mut m = HashMap::new();
        m.insert("ALMA", (12.0, 0.75));
        m.insert("ACA", (7.0, 0.75));
        m.insert("VLA", (25.0, 2.0));
        m.insert("EVLA", (25.0, 2.0));
        m.insert("ATCA", (22.0, 1.0));
        m.insert("GBT", (100.0, 0.0));
        m.insert("GMRT", (45.0, 1.0));
        m.insert("IRAMPDB", (15.0, 1.0));
        m.insert("IRAM PDB", (15.0, 1.0));
        m.insert("IRAM30M", (30.0, 2.0));
        m.insert("NRO45M", (45.0, 1.0));
        m.insert("SMA", (6.0, 0.35));
        m.insert("WSRT", (25.0, 1.0));
        m.insert("ATA", (6.1, 0.5));
        m
    };
}

/// An analytic primary-beam (voltage-pattern) model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model")]
pub enum PbModel {
    /// A uniformly illuminated dish with an optional central blockage.
    #[serde(rename = "airy")]
    Airy {
        dish_diameter_m: f64,
        blockage_diameter_m: f64,
    },

    /// A Gaussian power pattern with a given FWHM at a reference frequency,
    /// scaling inversely with frequency.
    #[serde(rename = "gaussian")]
    Gaussian {
        fwhm_rad_at_ref: f64,
        ref_freq_hz: f64,
    },
}

impl PbModel {
    /// The default model for a well-known telescope.
    pub fn common(telescope: &str) -> Result<PbModel, PbError> {
        let key = telescope.trim().to_uppercase();
        match COMMON_DISHES.get(key.as_str()) {
            Some(&(dish_diameter_m, blockage_diameter_m)) => Ok(PbModel::Airy {
                dish_diameter_m,
                blockage_diameter_m,
            }),
            None => Err(PbError::UnknownTelescope(telescope.to_string())),
        }
    }

    /// Read a model from a voltage-pattern description file (yaml or json).
    pub fn from_vp_table(path: &Path) -> Result<PbModel, PbError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        let file = File::open(path).map_err(|err| PbError::Io {
            path: path.to_path_buf(),
            err,
        })?;
        let reader = BufReader::new(file);
        match ext.as_str() {
            "yaml" | "yml" => Ok(serde_yaml::from_reader(reader)?),
            "json" => Ok(serde_json::from_reader(reader)?),
            _ => Err(PbError::UnhandledFileType(path.display().to_string())),
        }
    }

    /// Write the model to a voltage-pattern description file (yaml or json).
    pub fn write_vp_table(&self, path: &Path) -> Result<(), PbError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        let file = File::create(path).map_err(|err| PbError::Io {
            path: path.to_path_buf(),
            err,
        })?;
        let writer = BufWriter::new(file);
        match ext.as_str() {
            "yaml" | "yml" => Ok(serde_yaml::to_writer(writer, self)?),
            "json" => Ok(serde_json::to_writer_pretty(writer, self)?),
            _ => Err(PbError::UnhandledFileType(path.display().to_string())),
        }
    }

    /// The power response at an angular radius from the pointing centre.
    pub fn power_response(&self, radius_rad: f64, freq_hz: f64) -> f64 {
        match self {
            PbModel::Airy {
                dish_diameter_m,
                blockage_diameter_m,
            } => {
                let x = std::f64::consts::PI * dish_diameter_m * freq_hz / VEL_C * radius_rad;
                let b = (blockage_diameter_m / dish_diameter_m).max(0.0);
                let voltage = if x.abs() < 1e-9 {
                    1.0
                } else if b > 0.0 {
                    // Uniform disc with a central hole.
                    (2.0 * bessel_j1(x) / x - 2.0 * b * bessel_j1(b * x) / x)
                        / (1.0 - b * b)
                } else {
                    2.0 * bessel_j1(x) / x
                };
                voltage * voltage
            }
            PbModel::Gaussian {
                fwhm_rad_at_ref,
                ref_freq_hz,
            } => {
                let fwhm = fwhm_rad_at_ref * ref_freq_hz / freq_hz;
                let four_ln2 = 4.0 * std::f64::consts::LN_2;
                (-four_ln2 * (radius_rad / fwhm).powi(2)).exp()
            }
        }
    }

    /// Evaluate the power pattern over a pixel grid, centred on the grid's
    /// central pixel.
    pub fn evaluate_onto(
        &self,
        grid: &DirectionGrid,
        ny: usize,
        nx: usize,
        freq_hz: f64,
    ) -> Array2<f64> {
        let (cx, cy) = ((nx / 2) as f64, (ny / 2) as f64);
        Array2::from_shape_fn((ny, nx), |(y, x)| {
            let dx = (x as f64 - cx) * grid.inc_x_rad;
            let dy = (y as f64 - cy) * grid.inc_y_rad;
            self.power_response(dx.hypot(dy), freq_hz)
        })
    }
}
