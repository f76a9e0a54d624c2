// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! On-disk layout of response tables.
//!
//! Tables are yaml or json sequences of rows with fixed column names. Each
//! row stores its sub-bands as parallel arrays, checked against
//! NUM_SUBBANDS on the way in.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use hifitime::Epoch;
use serde::{Deserialize, Serialize};

use super::{error::ResponseError, FuncType, ResponseRow, SkyDir, SubBand};

/// START_TIME is stored as seconds of Modified Julian Date (UTC).
mod mjd_seconds {
    use hifitime::Epoch;
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(epoch: &Epoch, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_f64(epoch.to_mjd_utc_days() * 86400.0)
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Epoch, D::Error> {
        let seconds = f64::deserialize(de)?;
        Ok(Epoch::from_mjd_utc(seconds / 86400.0))
    }
}

#[derive(Serialize, Deserialize)]
struct TableRow {
    #[serde(rename = "NAME")]
    name: String,

    #[serde(rename = "BEAM_ID")]
    beam_id: i32,

    #[serde(rename = "BEAM_NUMBER")]
    beam_number: i32,

    #[serde(rename = "START_TIME", with = "mjd_seconds")]
    start_time: Epoch,

    #[serde(rename = "ANTENNA_TYPE")]
    antenna_type: String,

    #[serde(rename = "RECEIVER_TYPE")]
    receiver_type: String,

    #[serde(rename = "CENTER")]
    center: SkyDir,

    #[serde(rename = "VALID_CENTER_MIN")]
    valid_center_min: SkyDir,

    #[serde(rename = "VALID_CENTER_MAX")]
    valid_center_max: SkyDir,

    #[serde(rename = "NUM_SUBBANDS")]
    num_subbands: usize,

    #[serde(rename = "BAND_NAME")]
    band_name: Vec<String>,

    #[serde(rename = "SUBBAND_MIN_FREQ")]
    subband_min_freq: Vec<f64>,

    #[serde(rename = "SUBBAND_MAX_FREQ")]
    subband_max_freq: Vec<f64>,

    #[serde(rename = "FUNCTION_TYPE")]
    function_type: Vec<FuncType>,

    #[serde(rename = "FUNCTION_NAME")]
    function_name: Vec<String>,

    #[serde(rename = "FUNCTION_CHANNEL")]
    function_channel: Vec<i32>,

    #[serde(rename = "NOMINAL_FREQ")]
    nominal_freq: Vec<f64>,

    #[serde(rename = "RESPONSE_ROTATION_OFFSET")]
    response_rotation_offset: Vec<f64>,
}

impl TableRow {
    fn from_row(row: &ResponseRow) -> TableRow {
        TableRow {
            name: row.observatory.clone(),
            beam_id: row.beam_id,
            beam_number: row.beam_number,
            start_time: row.start_time,
            antenna_type: row.antenna_type.clone(),
            receiver_type: row.receiver_type.clone(),
            center: row.centre,
            valid_center_min: row.valid_centre_min,
            valid_center_max: row.valid_centre_max,
            num_subbands: row.sub_bands.len(),
            band_name: row.sub_bands.iter().map(|s| s.band_name.clone()).collect(),
            subband_min_freq: row.sub_bands.iter().map(|s| s.min_freq_hz).collect(),
            subband_max_freq: row.sub_bands.iter().map(|s| s.max_freq_hz).collect(),
            function_type: row.sub_bands.iter().map(|s| s.func_type).collect(),
            function_name: row.sub_bands.iter().map(|s| s.func_name.clone()).collect(),
            function_channel: row.sub_bands.iter().map(|s| s.func_channel).collect(),
            nominal_freq: row.sub_bands.iter().map(|s| s.nominal_freq_hz).collect(),
            response_rotation_offset: row
                .sub_bands
                .iter()
                .map(|s| s.rotation_offset_rad)
                .collect(),
        }
    }

    fn into_row(self, row_idx: usize) -> Result<ResponseRow, ResponseError> {
        let n = self.num_subbands;
        let check = |column: &'static str, got: usize| {
            if got == n {
                Ok(())
            } else {
                Err(ResponseError::InconsistentSubBands {
                    row: row_idx,
                    column,
                    expected: n,
                    got,
                })
            }
        };
        check("BAND_NAME", self.band_name.len())?;
        check("SUBBAND_MIN_FREQ", self.subband_min_freq.len())?;
        check("SUBBAND_MAX_FREQ", self.subband_max_freq.len())?;
        check("FUNCTION_TYPE", self.function_type.len())?;
        check("FUNCTION_NAME", self.function_name.len())?;
        check("FUNCTION_CHANNEL", self.function_channel.len())?;
        check("NOMINAL_FREQ", self.nominal_freq.len())?;
        check(
            "RESPONSE_ROTATION_OFFSET",
            self.response_rotation_offset.len(),
        )?;

        let sub_bands = (0..n)
            .map(|i| SubBand {
                band_name: self.band_name[i].clone(),
                min_freq_hz: self.subband_min_freq[i],
                max_freq_hz: self.subband_max_freq[i],
                func_type: self.function_type[i],
                func_name: self.function_name[i].clone(),
                func_channel: self.function_channel[i],
                nominal_freq_hz: self.nominal_freq[i],
                rotation_offset_rad: self.response_rotation_offset[i],
            })
            .collect();
        Ok(ResponseRow {
            observatory: self.name,
            beam_id: self.beam_id,
            beam_number: self.beam_number,
            start_time: self.start_time,
            antenna_type: self.antenna_type,
            receiver_type: self.receiver_type,
            centre: self.center,
            valid_centre_min: self.valid_center_min,
            valid_centre_max: self.valid_center_max,
            sub_bands,
        })
    }
}

pub(crate) fn read_table(path: &Path) -> Result<Vec<ResponseRow>, ResponseError> {
    let file = File::open(path).map_err(|err| ResponseError::Io {
        path: path.to_path_buf(),
        err,
    })?;
    let reader = BufReader::new(file);
    let rows: Vec<TableRow> = match extension(path)?.as_str() {
        "yaml" | "yml" => serde_yaml::from_reader(reader)?,
        _ => serde_json::from_reader(reader)?,
    };
    rows.into_iter()
        .enumerate()
        .map(|(i, row)| row.into_row(i))
        .collect()
}

pub(crate) fn write_table(path: &Path, rows: &[ResponseRow]) -> Result<(), ResponseError> {
    let table: Vec<TableRow> = rows.iter().map(TableRow::from_row).collect();
    let file = File::create(path).map_err(|err| ResponseError::Io {
        path: path.to_path_buf(),
        err,
    })?;
    let writer = BufWriter::new(file);
    match extension(path)?.as_str() {
        "yaml" | "yml" => serde_yaml::to_writer(writer, &table)?,
        _ => serde_json::to_writer_pretty(writer, &table)?,
    }
    Ok(())
}

fn extension(path: &Path) -> Result<String, ResponseError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    match ext.as_str() {
        "yaml" | "yml" | "json" => Ok(ext),
        _ => Err(ResponseError::UnhandledFileType(path.display().to_string())),
    }
}
