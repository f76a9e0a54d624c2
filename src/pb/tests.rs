// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;
use marlu::{constants::VEL_C, RADec};
use tempfile::TempDir;

use super::*;

#[test]
fn common_telescopes_are_known() {
    assert!(matches!(
        PbModel::common("ALMA"),
        Ok(PbModel::Airy {
            dish_diameter_m,
            ..
        }) if dish_diameter_m == 12.0
    ));
    // Lookups are case-insensitive.
    assert!(PbModel::common("gbt").is_ok());
    assert!(matches!(
        PbModel::common("MYSTERY_SCOPE"),
        Err(PbError::UnknownTelescope(_))
    ));
}

#[test]
fn airy_response_on_axis_is_unity() {
    let pb = PbModel::common("ALMA").unwrap();
    assert_abs_diff_eq!(pb.power_response(0.0, 100e9), 1.0, epsilon = 1e-12);
}

#[test]
fn unblocked_airy_half_power_radius() {
    let pb = PbModel::Airy {
        dish_diameter_m: 12.0,
        blockage_diameter_m: 0.0,
    };
    // (2 J1(x) / x)^2 = 0.5 at x ~= 1.61634.
    let freq = 100e9;
    let r_half = 1.61634 * VEL_C / (std::f64::consts::PI * 12.0 * freq);
    assert_abs_diff_eq!(pb.power_response(r_half, freq), 0.5, epsilon = 1e-4);
    // The response falls off that point.
    assert!(pb.power_response(2.0 * r_half, freq) < 0.5);
}

#[test]
fn airy_first_null() {
    let pb = PbModel::Airy {
        dish_diameter_m: 12.0,
        blockage_diameter_m: 0.0,
    };
    let freq = 100e9;
    // J1's first zero at x = 3.8317.
    let r_null = 3.8317059702075123 * VEL_C / (std::f64::consts::PI * 12.0 * freq);
    assert_abs_diff_eq!(pb.power_response(r_null, freq), 0.0, epsilon = 1e-10);
}

#[test]
fn gaussian_model_half_power() {
    let fwhm = 1e-4;
    let pb = PbModel::Gaussian {
        fwhm_rad_at_ref: fwhm,
        ref_freq_hz: 100e9,
    };
    assert_abs_diff_eq!(pb.power_response(fwhm / 2.0, 100e9), 0.5, epsilon = 1e-12);
    // The beam shrinks with increasing frequency.
    assert!(pb.power_response(fwhm / 2.0, 200e9) < 0.5);
}

#[test]
fn evaluate_onto_peaks_at_central_pixel() {
    let pb = PbModel::common("ACA").unwrap();
    let grid = DirectionGrid {
        centre: RADec::from_degrees(0.0, 0.0),
        inc_x_rad: -4.8e-6,
        inc_y_rad: 4.8e-6,
        ref_x_pix: 32.0,
        ref_y_pix: 32.0,
    };
    let pattern = pb.evaluate_onto(&grid, 64, 64, 100e9);
    assert_abs_diff_eq!(pattern[(32, 32)], 1.0, epsilon = 1e-12);
    assert!(pattern[(32, 40)] < 1.0);
    // Circular symmetry about the centre.
    assert_abs_diff_eq!(pattern[(32, 40)], pattern[(40, 32)], epsilon = 1e-12);
}

#[test]
fn vp_table_round_trips_through_yaml_and_json() {
    let tmp = TempDir::new().unwrap();
    let model = PbModel::Airy {
        dish_diameter_m: 9.5,
        blockage_diameter_m: 0.8,
    };

    for name in ["vp.yaml", "vp.json"] {
        let path = tmp.path().join(name);
        model.write_vp_table(&path).unwrap();
        let read = PbModel::from_vp_table(&path).unwrap();
        assert_eq!(read, model);
    }

    let bad = tmp.path().join("vp.fits");
    std::fs::write(&bad, b"SIMPLE").unwrap();
    assert!(matches!(
        PbModel::from_vp_table(&bad),
        Err(PbError::UnhandledFileType(_))
    ));
}
