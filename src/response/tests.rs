// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::Path;

use hifitime::Epoch;
use indoc::indoc;
use tempfile::TempDir;

use super::*;

fn sub_band(band_name: &str, min_ghz: f64, max_ghz: f64) -> SubBand {
    SubBand {
        band_name: band_name.to_string(),
        min_freq_hz: min_ghz * 1e9,
        max_freq_hz: max_ghz * 1e9,
        func_type: FuncType::Efp,
        func_name: format!("{band_name}_response.im"),
        func_channel: -1,
        nominal_freq_hz: 0.5e9 * (min_ghz + max_ghz),
        rotation_offset_rad: 0.0,
    }
}

fn alma_row(beam_id: i32, start_mjd_days: f64, antenna_type: &str) -> ResponseRow {
    let mut row = ResponseRow::new(
        "ALMA",
        beam_id,
        vec![sub_band("B3", 84.0, 116.0), sub_band("B6", 211.0, 275.0)],
    );
    row.start_time = Epoch::from_mjd_utc(start_mjd_days);
    row.antenna_type = antenna_type.to_string();
    row
}

fn initialised() -> AntennaResponseRegistry {
    let mut reg = AntennaResponseRegistry::new();
    reg.init(Path::new("")).unwrap();
    reg
}

#[test]
fn func_type_conversions() {
    assert_eq!(FuncType::from_int(0), FuncType::Na);
    assert_eq!(FuncType::from_int(2), FuncType::Efp);
    assert_eq!(FuncType::from_int(5), FuncType::Internal);
    assert_eq!(FuncType::from_int(99), FuncType::Invalid);
    assert_eq!(FuncType::from_int(-1), FuncType::Invalid);

    assert_eq!(FuncType::from_name("EFP"), FuncType::Efp);
    assert_eq!(FuncType::from_name(" vpman "), FuncType::VpMan);
    assert_eq!(FuncType::from_name("garbage"), FuncType::Invalid);

    assert_eq!(FuncType::Efp.to_string(), "EFP");
    assert_eq!(FuncType::VpMan.to_string(), "VPMAN");
}

#[test]
fn put_row_requires_init() {
    let mut reg = AntennaResponseRegistry::new();
    assert!(matches!(
        reg.put_row(0, alma_row(0, 55000.0, "DV")),
        Err(ResponseError::Uninitialised)
    ));
}

#[test]
fn beam_ids_are_unique_per_observatory() {
    let mut reg = initialised();
    reg.put_row(0, alma_row(3, 55000.0, "DV")).unwrap();

    // A second row with the same beam ID is refused, leaving the registry
    // untouched.
    assert!(matches!(
        reg.put_row(1, alma_row(3, 55100.0, "DA")),
        Err(ResponseError::DuplicateBeamId {
            beam_id: 3,
            ..
        })
    ));
    assert_eq!(reg.num_rows(), 1);

    // Overwriting the offending row in place is fine.
    assert_eq!(reg.put_row(0, alma_row(3, 55100.0, "DA")).unwrap(), 0);
    // So is the same beam ID at a different observatory.
    let mut vla = alma_row(3, 55000.0, "25m");
    vla.observatory = "VLA".to_string();
    assert_eq!(reg.put_row(5, vla).unwrap(), 1);
}

#[test]
fn put_row_rejects_mixed_frames() {
    let mut reg = initialised();
    let mut row = alma_row(0, 55000.0, "DV");
    row.valid_centre_min.frame = DirFrame::J2000;
    assert!(matches!(
        reg.put_row(0, row),
        Err(ResponseError::FrameMismatch)
    ));
}

#[test]
fn alma_beam_id_lookup() {
    let mut reg = initialised();
    reg.put_row(0, alma_row(3, 55000.0, "DV")).unwrap();

    let query = ResponseQuery {
        observatory: "ALMA".to_string(),
        freq_hz: 110e9,
        beam_id: Some(3),
        ..Default::default()
    };
    assert_eq!(reg.get_row_and_index(&query), Some((0, 0)));

    // Outside every sub-band.
    let query = ResponseQuery {
        freq_hz: 150e9,
        ..query
    };
    assert_eq!(reg.get_row_and_index(&query), None);

    // Wrong observatory.
    let query = ResponseQuery {
        observatory: "VLA".to_string(),
        freq_hz: 110e9,
        beam_id: Some(3),
        ..Default::default()
    };
    assert_eq!(reg.get_row_and_index(&query), None);
}

#[test]
fn sub_band_edges_are_closed_open() {
    let mut reg = initialised();
    reg.put_row(0, alma_row(1, 55000.0, "DV")).unwrap();

    let query = |freq_hz: f64| ResponseQuery {
        observatory: "ALMA".to_string(),
        freq_hz,
        beam_id: Some(1),
        ..Default::default()
    };
    // The lower edge is in, the upper edge is out.
    assert_eq!(reg.get_row_and_index(&query(84e9)), Some((0, 0)));
    assert_eq!(reg.get_row_and_index(&query(116e9)), None);
    // Second sub-band.
    assert_eq!(reg.get_row_and_index(&query(211e9)), Some((0, 1)));
}

#[test]
fn greatest_start_time_not_after_the_observation_wins() {
    let mut reg = initialised();
    reg.put_row(0, alma_row(10, 55000.0, "DV")).unwrap();
    reg.put_row(1, alma_row(11, 55100.0, "DV")).unwrap();
    reg.put_row(2, alma_row(12, 55200.0, "DV")).unwrap();

    let query = |mjd_days: f64| ResponseQuery {
        observatory: "ALMA".to_string(),
        freq_hz: 100e9,
        obs_time: Some(Epoch::from_mjd_utc(mjd_days)),
        antenna_type: Some("DV".to_string()),
        ..Default::default()
    };

    // An observation exactly at a row's start time belongs to that row.
    assert_eq!(reg.get_row_and_index(&query(55100.0)), Some((1, 0)));
    // Later observations pick the latest applicable row.
    assert_eq!(reg.get_row_and_index(&query(55150.0)), Some((1, 0)));
    assert_eq!(reg.get_row_and_index(&query(55999.0)), Some((2, 0)));
    // Before the first row, nothing applies.
    assert_eq!(reg.get_row_and_index(&query(54999.0)), None);
}

#[test]
fn criteria_filter_rows() {
    let mut reg = initialised();
    reg.put_row(0, alma_row(0, 55000.0, "DV")).unwrap();
    reg.put_row(1, alma_row(1, 55000.0, "DA")).unwrap();

    let base = ResponseQuery {
        observatory: "ALMA".to_string(),
        freq_hz: 100e9,
        ..Default::default()
    };

    let query = ResponseQuery {
        antenna_type: Some("DA".to_string()),
        ..base.clone()
    };
    assert_eq!(reg.get_row_and_index(&query), Some((1, 0)));

    let query = ResponseQuery {
        antenna_type: Some("PM".to_string()),
        ..base.clone()
    };
    assert_eq!(reg.get_row_and_index(&query), None);

    // An unsatisfied function type gives nothing; the stored one matches.
    let query = ResponseQuery {
        func_type: Some(FuncType::Vp),
        ..base.clone()
    };
    assert_eq!(reg.get_row_and_index(&query), None);
    let query = ResponseQuery {
        func_type: Some(FuncType::Efp),
        ..base
    };
    assert!(reg.get_row_and_index(&query).is_some());
}

#[test]
fn direction_must_fall_in_the_validity_region() {
    let mut reg = initialised();
    let mut row = alma_row(0, 55000.0, "DV");
    row.centre = SkyDir {
        frame: DirFrame::J2000,
        lon_rad: 1.0,
        lat_rad: -0.5,
    };
    row.valid_centre_min = SkyDir {
        frame: DirFrame::J2000,
        lon_rad: 0.8,
        lat_rad: -0.7,
    };
    row.valid_centre_max = SkyDir {
        frame: DirFrame::J2000,
        lon_rad: 1.2,
        lat_rad: -0.3,
    };
    reg.put_row(0, row).unwrap();

    let query = |dir: SkyDir| ResponseQuery {
        observatory: "ALMA".to_string(),
        freq_hz: 100e9,
        direction: Some(dir),
        ..Default::default()
    };

    let inside = SkyDir {
        frame: DirFrame::J2000,
        lon_rad: 1.1,
        lat_rad: -0.6,
    };
    assert!(reg.get_row_and_index(&query(inside)).is_some());

    let outside = SkyDir {
        frame: DirFrame::J2000,
        lon_rad: 1.5,
        lat_rad: -0.6,
    };
    assert!(reg.get_row_and_index(&query(outside)).is_none());

    // A direction in another frame never matches.
    let wrong_frame = SkyDir {
        frame: DirFrame::Galactic,
        ..inside
    };
    assert!(reg.get_row_and_index(&query(wrong_frame)).is_none());
}

#[test]
fn get_image_name_reports_the_sub_band() {
    let mut reg = initialised();
    reg.put_row(0, alma_row(7, 55000.0, "DV")).unwrap();

    let query = ResponseQuery {
        observatory: "ALMA".to_string(),
        freq_hz: 250e9,
        beam_id: Some(7),
        ..Default::default()
    };
    let result = reg.get_image_name(&query).unwrap();
    assert_eq!(result.func_name, "B6_response.im");
    assert_eq!(result.func_type, FuncType::Efp);
    assert_eq!(result.func_channel, -1);
    assert_eq!(result.freq_range_hz, (211e9, 275e9));
    assert_eq!((result.row, result.sub_band), (0, 1));
}

#[test]
fn get_antenna_types_is_sorted_and_unique() {
    let mut reg = initialised();
    reg.put_row(0, alma_row(0, 55000.0, "DV")).unwrap();
    reg.put_row(1, alma_row(1, 55000.0, "DA")).unwrap();
    reg.put_row(2, alma_row(2, 55000.0, "DV")).unwrap();

    let query = ResponseQuery {
        observatory: "ALMA".to_string(),
        freq_hz: 100e9,
        ..Default::default()
    };
    assert_eq!(reg.get_antenna_types(&query), vec!["DA", "DV"]);

    // Types whose rows can't serve the query frequency drop out.
    let query = ResponseQuery {
        freq_hz: 500e9,
        ..query
    };
    assert!(reg.get_antenna_types(&query).is_empty());
}

#[test]
fn tables_round_trip_and_appends_are_idempotent() {
    let tmp = TempDir::new().unwrap();
    let mut reg = initialised();
    reg.put_row(0, alma_row(0, 55000.0, "DV")).unwrap();
    reg.put_row(1, alma_row(1, 55100.0, "DA")).unwrap();

    for name in ["responses.yaml", "responses.json"] {
        let path = tmp.path().join(name);
        reg.create(&path).unwrap();

        let mut reg2 = AntennaResponseRegistry::new();
        reg2.init(&path).unwrap();
        assert_eq!(reg2.num_rows(), 2);
        assert_eq!(reg2.rows, reg.rows);
        assert!(reg2.is_init(&path));

        // A repeated append changes nothing and reports so.
        assert!(!reg2.append(&path).unwrap());
        assert_eq!(reg2.num_rows(), 2);
    }

    // create refuses to clobber.
    let path = tmp.path().join("responses.yaml");
    assert!(matches!(
        reg.create(&path),
        Err(ResponseError::TableExists(_))
    ));
}

#[test]
fn appending_a_second_table_accumulates_rows() {
    let tmp = TempDir::new().unwrap();
    let mut reg = initialised();
    reg.put_row(0, alma_row(0, 55000.0, "DV")).unwrap();
    let first = tmp.path().join("first.yaml");
    reg.create(&first).unwrap();

    let mut other = initialised();
    let mut row = alma_row(0, 55000.0, "25m");
    row.observatory = "VLA".to_string();
    other.put_row(0, row).unwrap();
    let second = tmp.path().join("second.yaml");
    other.create(&second).unwrap();

    let mut reg2 = AntennaResponseRegistry::new();
    reg2.init(&first).unwrap();
    assert!(reg2.append(&second).unwrap());
    assert_eq!(reg2.num_rows(), 2);
}

#[test]
fn malformed_tables_are_rejected() {
    let tmp = TempDir::new().unwrap();

    // NUM_SUBBANDS disagrees with the sub-band columns.
    let bad = tmp.path().join("bad.json");
    std::fs::write(
        &bad,
        indoc! {r#"
            [
              {
                "NAME": "ALMA",
                "BEAM_ID": 0,
                "BEAM_NUMBER": 0,
                "START_TIME": 4752000000.0,
                "ANTENNA_TYPE": "DV",
                "RECEIVER_TYPE": "",
                "CENTER": { "frame": "AZEL", "lon_rad": 0.0, "lat_rad": 1.5707963267948966 },
                "VALID_CENTER_MIN": { "frame": "AZEL", "lon_rad": 0.0, "lat_rad": 1.5707963267948966 },
                "VALID_CENTER_MAX": { "frame": "AZEL", "lon_rad": 0.0, "lat_rad": 1.5707963267948966 },
                "NUM_SUBBANDS": 2,
                "BAND_NAME": ["B3"],
                "SUBBAND_MIN_FREQ": [84e9, 211e9],
                "SUBBAND_MAX_FREQ": [116e9, 275e9],
                "FUNCTION_TYPE": ["EFP", "EFP"],
                "FUNCTION_NAME": ["a.im", "b.im"],
                "FUNCTION_CHANNEL": [-1, -1],
                "NOMINAL_FREQ": [100e9, 243e9],
                "RESPONSE_ROTATION_OFFSET": [0.0, 0.0]
              }
            ]
        "#},
    )
    .unwrap();
    let mut reg = AntennaResponseRegistry::new();
    assert!(matches!(
        reg.init(&bad),
        Err(ResponseError::InconsistentSubBands {
            column: "BAND_NAME",
            expected: 2,
            got: 1,
            ..
        })
    ));

    // An unknown extension is refused outright.
    let weird = tmp.path().join("table.csv");
    std::fs::write(&weird, "NAME,BEAM_ID").unwrap();
    let mut reg = AntennaResponseRegistry::new();
    assert!(matches!(
        reg.init(&weird),
        Err(ResponseError::UnhandledFileType(_))
    ));
}
