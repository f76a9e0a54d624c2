// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! An in-memory registry of antenna response patterns, loaded from on-disk
//! tables.
//!
//! Each row describes one observatory configuration: which beam image (or
//! analytic description) applies to a given antenna type, receiver, epoch,
//! pointing region and set of frequency sub-bands. Lookups return `None`
//! when nothing matches; only malformed input is an error.

mod error;
pub(crate) mod table;
#[cfg(test)]
mod tests;

pub use error::ResponseError;

use std::path::{Path, PathBuf};

use hifitime::Epoch;
use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

/// How a stored response pattern is meant to be interpreted.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
)]
pub enum FuncType {
    /// Not applicable; no response is available.
    #[serde(rename = "NA")]
    #[strum(serialize = "NA")]
    Na,

    /// An antenna interferometer function.
    #[serde(rename = "AIF")]
    #[strum(serialize = "AIF")]
    Aif,

    /// An electric field pattern image.
    #[serde(rename = "EFP")]
    #[strum(serialize = "EFP")]
    Efp,

    /// A voltage pattern image.
    #[serde(rename = "VP")]
    #[strum(serialize = "VP")]
    Vp,

    /// A manually defined voltage pattern.
    #[serde(rename = "VPMAN")]
    #[strum(serialize = "VPMAN")]
    VpMan,

    /// A pattern generated by internal code.
    #[serde(rename = "INTERNAL")]
    #[strum(serialize = "INTERNAL")]
    Internal,

    /// Anything unrecognised.
    #[serde(rename = "INVALID")]
    #[strum(serialize = "INVALID")]
    Invalid,
}

impl FuncType {
    /// The variant for an integer code; out-of-range codes give
    /// [`FuncType::Invalid`].
    pub fn from_int(i: i32) -> FuncType {
        match i {
            0 => FuncType::Na,
            1 => FuncType::Aif,
            2 => FuncType::Efp,
            3 => FuncType::Vp,
            4 => FuncType::VpMan,
            5 => FuncType::Internal,
            _ => FuncType::Invalid,
        }
    }

    /// The variant for a name; unrecognised names give
    /// [`FuncType::Invalid`].
    pub fn from_name(s: &str) -> FuncType {
        s.trim().to_uppercase().parse().unwrap_or(FuncType::Invalid)
    }
}

/// The reference frame of a stored direction.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumIter, EnumString,
)]
pub enum DirFrame {
    #[serde(rename = "J2000")]
    #[strum(serialize = "J2000")]
    J2000,

    #[serde(rename = "B1950")]
    #[strum(serialize = "B1950")]
    B1950,

    #[serde(rename = "GALACTIC")]
    #[strum(serialize = "GALACTIC")]
    Galactic,

    #[serde(rename = "AZEL")]
    #[strum(serialize = "AZEL")]
    AzEl,
}

/// A direction with its reference frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkyDir {
    pub frame: DirFrame,
    pub lon_rad: f64,
    pub lat_rad: f64,
}

impl SkyDir {
    /// Straight up, in the horizon frame. The default pointing of a row that
    /// doesn't care about direction.
    pub fn zenith() -> SkyDir {
        SkyDir {
            frame: DirFrame::AzEl,
            lon_rad: 0.0,
            lat_rad: std::f64::consts::FRAC_PI_2,
        }
    }
}

/// One frequency sub-band of a response row.
#[derive(Debug, Clone, PartialEq)]
pub struct SubBand {
    pub band_name: String,
    /// Inclusive lower edge \[Hz\].
    pub min_freq_hz: f64,
    /// Exclusive upper edge \[Hz\].
    pub max_freq_hz: f64,
    pub func_type: FuncType,
    /// The image name (or analytic description) for this sub-band.
    pub func_name: String,
    /// The channel to use from a response image cube; negative means all.
    pub func_channel: i32,
    pub nominal_freq_hz: f64,
    /// Rotation of the response pattern about the pointing axis \[rad\].
    pub rotation_offset_rad: f64,
}

impl SubBand {
    /// Closed-open containment: `min <= f < max`.
    fn contains(&self, freq_hz: f64) -> bool {
        self.min_freq_hz <= freq_hz && freq_hz < self.max_freq_hz
    }
}

/// One registry row.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseRow {
    /// The observatory name, e.g. "ALMA".
    pub observatory: String,
    /// Identifies this beam configuration uniquely within the observatory.
    pub beam_id: i32,
    pub beam_number: i32,
    /// The row applies to observations taken at or after this time.
    pub start_time: Epoch,
    pub antenna_type: String,
    pub receiver_type: String,
    /// The nominal pointing this row was characterised at.
    pub centre: SkyDir,
    /// The corner of the validity region with the smallest coordinates.
    pub valid_centre_min: SkyDir,
    /// The corner of the validity region with the largest coordinates.
    pub valid_centre_max: SkyDir,
    pub sub_bands: Vec<SubBand>,
}

impl ResponseRow {
    /// A row with the given identity and sub-bands, valid from the epoch
    /// origin for any antenna, receiver and pointing.
    pub fn new(observatory: &str, beam_id: i32, sub_bands: Vec<SubBand>) -> ResponseRow {
        ResponseRow {
            observatory: observatory.to_string(),
            beam_id,
            beam_number: 0,
            start_time: Epoch::from_mjd_utc(0.0),
            antenna_type: String::new(),
            receiver_type: String::new(),
            centre: SkyDir::zenith(),
            valid_centre_min: SkyDir::zenith(),
            valid_centre_max: SkyDir::zenith(),
            sub_bands,
        }
    }

    fn contains_direction(&self, dir: &SkyDir) -> bool {
        dir.frame == self.valid_centre_min.frame
            && self.valid_centre_min.lon_rad <= dir.lon_rad
            && dir.lon_rad <= self.valid_centre_max.lon_rad
            && self.valid_centre_min.lat_rad <= dir.lat_rad
            && dir.lat_rad <= self.valid_centre_max.lat_rad
    }
}

/// Search criteria for registry lookups. Optional fields don't constrain
/// the search.
#[derive(Debug, Clone, Default)]
pub struct ResponseQuery {
    pub observatory: String,
    pub freq_hz: f64,
    /// When set, selects by beam ID alone (plus frequency) and ignores the
    /// remaining criteria.
    pub beam_id: Option<i32>,
    pub obs_time: Option<Epoch>,
    pub func_type: Option<FuncType>,
    pub antenna_type: Option<String>,
    pub receiver_type: Option<String>,
    pub direction: Option<SkyDir>,
    pub beam_number: Option<i32>,
}

/// What a successful [`AntennaResponseRegistry::get_image_name`] lookup
/// yields.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageNameResult {
    pub func_name: String,
    pub func_type: FuncType,
    pub func_channel: i32,
    pub nominal_freq_hz: f64,
    /// The matched sub-band's `[min, max)` edges \[Hz\].
    pub freq_range_hz: (f64, f64),
    pub rotation_offset_rad: f64,
    pub row: usize,
    pub sub_band: usize,
}

/// Rows from one or more response tables, with lookups over them.
#[derive(Debug, Default)]
pub struct AntennaResponseRegistry {
    rows: Vec<ResponseRow>,
    paths: Vec<PathBuf>,
}

impl AntennaResponseRegistry {
    /// An empty, uninitialised registry.
    pub fn new() -> AntennaResponseRegistry {
        AntennaResponseRegistry::default()
    }

    /// Discard everything and load the given table. An empty path leaves
    /// the registry initialised but empty.
    pub fn init(&mut self, path: &Path) -> Result<(), ResponseError> {
        self.rows.clear();
        self.paths.clear();
        if path.as_os_str().is_empty() {
            self.paths.push(PathBuf::new());
            Ok(())
        } else {
            self.append(path).map(|_| ())
        }
    }

    /// Load another table on top of what's already loaded. Returns
    /// `Ok(false)` if this path has been loaded before (and changes
    /// nothing).
    pub fn append(&mut self, path: &Path) -> Result<bool, ResponseError> {
        if self.is_init(path) {
            debug!("Response table {} is already loaded", path.display());
            return Ok(false);
        }
        let rows = table::read_table(path)?;
        debug!(
            "Loaded {} response rows from {}",
            rows.len(),
            path.display()
        );
        self.rows.extend(rows);
        self.paths.push(path.to_path_buf());
        Ok(true)
    }

    /// Has this path been loaded?
    pub fn is_init(&self, path: &Path) -> bool {
        self.paths.iter().any(|p| p == path)
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Add or overwrite a row. `row_idx` at or beyond the current row count
    /// appends. Returns the index the row ended up at.
    ///
    /// The registry must have been initialised, and the row's beam ID must
    /// not collide with another row of the same observatory. The row's
    /// directions must share one reference frame.
    pub fn put_row(&mut self, row_idx: usize, row: ResponseRow) -> Result<usize, ResponseError> {
        if self.paths.is_empty() {
            return Err(ResponseError::Uninitialised);
        }
        if row.centre.frame != row.valid_centre_min.frame
            || row.centre.frame != row.valid_centre_max.frame
        {
            return Err(ResponseError::FrameMismatch);
        }
        let clash = self.rows.iter().enumerate().any(|(i, r)| {
            i != row_idx && r.observatory == row.observatory && r.beam_id == row.beam_id
        });
        if clash {
            return Err(ResponseError::DuplicateBeamId {
                observatory: row.observatory,
                beam_id: row.beam_id,
            });
        }

        if row_idx < self.rows.len() {
            self.rows[row_idx] = row;
            Ok(row_idx)
        } else {
            self.rows.push(row);
            Ok(self.rows.len() - 1)
        }
    }

    /// Write the in-memory rows to a new table. Refuses to overwrite an
    /// existing file.
    pub fn create(&self, path: &Path) -> Result<(), ResponseError> {
        if path.exists() {
            return Err(ResponseError::TableExists(path.to_path_buf()));
        }
        table::write_table(path, &self.rows)
    }

    /// The row and sub-band indices best matching a query, or `None`.
    ///
    /// Among rows passing all criteria with a sub-band covering the query
    /// frequency, the one with the greatest start time not after the
    /// observation time wins.
    pub fn get_row_and_index(&self, query: &ResponseQuery) -> Option<(usize, usize)> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.observatory == query.observatory)
            .filter(|(_, row)| match query.beam_id {
                Some(id) => row.beam_id == id,
                None => self.matches_criteria(row, query),
            })
            .filter_map(|(i, row)| {
                let sb = row
                    .sub_bands
                    .iter()
                    .position(|sb| self.matches_sub_band(sb, query))?;
                Some((i, sb, row.start_time))
            })
            .max_by(|(i1, _, t1), (i2, _, t2)| {
                t1.partial_cmp(t2)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(i1.cmp(i2))
            })
            .map(|(i, sb, _)| (i, sb))
    }

    fn matches_criteria(&self, row: &ResponseRow, query: &ResponseQuery) -> bool {
        if let Some(t) = query.obs_time {
            if row.start_time > t {
                return false;
            }
        }
        if let Some(antenna_type) = &query.antenna_type {
            if &row.antenna_type != antenna_type {
                return false;
            }
        }
        if let Some(receiver_type) = &query.receiver_type {
            if &row.receiver_type != receiver_type {
                return false;
            }
        }
        if let Some(beam_number) = query.beam_number {
            if row.beam_number != beam_number {
                return false;
            }
        }
        if let Some(dir) = &query.direction {
            if !row.contains_direction(dir) {
                return false;
            }
        }
        true
    }

    fn matches_sub_band(&self, sub_band: &SubBand, query: &ResponseQuery) -> bool {
        if !sub_band.contains(query.freq_hz) {
            return false;
        }
        // Beam-ID lookups don't constrain the function type.
        if query.beam_id.is_none() {
            if let Some(func_type) = query.func_type {
                if sub_band.func_type != func_type {
                    return false;
                }
            }
        }
        true
    }

    /// The best-matching row, or `None`.
    pub fn get_row(&self, query: &ResponseQuery) -> Option<&ResponseRow> {
        let (i, _) = self.get_row_and_index(query)?;
        self.rows.get(i)
    }

    /// The response image details for the best-matching row and sub-band,
    /// or `None`.
    pub fn get_image_name(&self, query: &ResponseQuery) -> Option<ImageNameResult> {
        let (i, sb) = self.get_row_and_index(query)?;
        let row = self.rows.get(i)?;
        let sub_band = row.sub_bands.get(sb)?;
        Some(ImageNameResult {
            func_name: sub_band.func_name.clone(),
            func_type: sub_band.func_type,
            func_channel: sub_band.func_channel,
            nominal_freq_hz: sub_band.nominal_freq_hz,
            freq_range_hz: (sub_band.min_freq_hz, sub_band.max_freq_hz),
            rotation_offset_rad: sub_band.rotation_offset_rad,
            row: i,
            sub_band: sb,
        })
    }

    /// All antenna types for which the query (with its own antenna type
    /// ignored) would succeed, sorted and deduplicated.
    pub fn get_antenna_types(&self, query: &ResponseQuery) -> Vec<String> {
        self.rows
            .iter()
            .filter(|row| row.observatory == query.observatory)
            .map(|row| row.antenna_type.clone())
            .unique()
            .filter(|antenna_type| {
                let q = ResponseQuery {
                    antenna_type: Some(antenna_type.clone()),
                    ..query.clone()
                };
                self.get_row_and_index(&q).is_some()
            })
            .sorted()
            .collect()
    }
}
