// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Plot the feathering weight functions against baseline length.

use std::path::Path;

use plotters::prelude::*;

use super::{Feather, FeatherError};

const X_PIXELS: u32 = 1024;
const Y_PIXELS: u32 = 768;

/// Draw the u-axis cuts of the high- and low-resolution weights to a PNG
/// file.
pub(crate) fn plot_weights(file: &Path, plume: &mut Feather) -> Result<(), FeatherError> {
    let int_cuts = plume.ft_cut_int_weight();
    let sd_cuts = plume.ft_cut_sd_weight();

    let max_x = int_cuts.ux_m.last().copied().unwrap_or(1.0).max(1.0);
    let max_y = sd_cuts
        .x_amp
        .iter()
        .chain(int_cuts.x_amp.iter())
        .fold(1.0_f64, |acc, &v| acc.max(v));

    let drawing_area = BitMapBackend::new(file, (X_PIXELS, Y_PIXELS)).into_drawing_area();
    drawing_area
        .fill(&WHITE)
        .map_err(|e| FeatherError::Draw(e.to_string()))?;

    let mut cc = ChartBuilder::on(&drawing_area)
        .caption("Feathering weights", ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0.0..max_x, 0.0..max_y * 1.05)
        .map_err(|e| FeatherError::Draw(e.to_string()))?;

    cc.configure_mesh()
        .x_desc("Baseline length [m]")
        .y_desc("Weight")
        .draw()
        .map_err(|e| FeatherError::Draw(e.to_string()))?;

    cc.draw_series(LineSeries::new(
        int_cuts
            .ux_m
            .iter()
            .zip(int_cuts.x_amp.iter())
            .map(|(&x, &y)| (x, y)),
        &BLUE,
    ))
    .map_err(|e| FeatherError::Draw(e.to_string()))?
    .label("High resolution")
    .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE));

    cc.draw_series(LineSeries::new(
        sd_cuts
            .ux_m
            .iter()
            .zip(sd_cuts.x_amp.iter())
            .map(|(&x, &y)| (x, y)),
        &RED,
    ))
    .map_err(|e| FeatherError::Draw(e.to_string()))?
    .label("Low resolution")
    .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED));

    cc.configure_series_labels()
        .border_style(BLACK)
        .background_style(WHITE.mix(0.8))
        .draw()
        .map_err(|e| FeatherError::Draw(e.to_string()))?;

    drawing_area
        .present()
        .map_err(|e| FeatherError::Draw(e.to_string()))?;
    Ok(())
}
