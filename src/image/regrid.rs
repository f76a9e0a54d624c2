// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Bilinear regridding of images between direction grids.

use ndarray::prelude::*;

use super::{DirectionGrid, Image, ImageError};

/// Resample `src` onto a new direction grid and pixel shape `(ny, nx)` with
/// bilinear interpolation. Target pixels that fall outside the source, or
/// that interpolate from any masked source pixel, come out zeroed and
/// masked. All planes are resampled; frequencies, beam and metadata are
/// carried over.
pub fn regrid_onto(
    src: &Image,
    grid: &DirectionGrid,
    ny: usize,
    nx: usize,
) -> Result<Image, ImageError> {
    if ny == 0 || nx == 0 {
        return Err(ImageError::EmptyTarget);
    }
    let num_planes = src.num_planes();
    let (src_ny, src_nx) = (src.ny(), src.nx());

    let mut data = Array3::zeros((num_planes, ny, nx));
    let mut mask = Array3::from_elem((num_planes, ny, nx), true);
    let mut any_masked = false;

    for y in 0..ny {
        for x in 0..nx {
            let world = grid.world_at(x as f64, y as f64);
            let (sx, sy) = src.grid.pix_at(world);

            let x0 = sx.floor();
            let y0 = sy.floor();
            let fx = sx - x0;
            let fy = sy - y0;
            let (x0, y0) = (x0 as isize, y0 as isize);

            // The four interpolation corners. With a zero fraction the upper
            // neighbour has zero weight, so let it sit on the lower one to
            // keep edge pixels valid.
            let x1 = if fx == 0.0 { x0 } else { x0 + 1 };
            let y1 = if fy == 0.0 { y0 } else { y0 + 1 };

            if x0 < 0 || y0 < 0 || x1 >= src_nx as isize || y1 >= src_ny as isize {
                for p in 0..num_planes {
                    mask[(p, y, x)] = false;
                }
                any_masked = true;
                continue;
            }
            let (x0, y0, x1, y1) = (x0 as usize, y0 as usize, x1 as usize, y1 as usize);

            for p in 0..num_planes {
                // Conservative mask handling: any bad corner poisons the
                // target pixel.
                if let Some(src_mask) = &src.mask {
                    let good = src_mask[(p, y0, x0)]
                        && src_mask[(p, y0, x1)]
                        && src_mask[(p, y1, x0)]
                        && src_mask[(p, y1, x1)];
                    if !good {
                        mask[(p, y, x)] = false;
                        any_masked = true;
                        continue;
                    }
                }
                let v00 = src.data[(p, y0, x0)];
                let v01 = src.data[(p, y0, x1)];
                let v10 = src.data[(p, y1, x0)];
                let v11 = src.data[(p, y1, x1)];
                data[(p, y, x)] = v00 * (1.0 - fx) * (1.0 - fy)
                    + v01 * fx * (1.0 - fy)
                    + v10 * (1.0 - fx) * fy
                    + v11 * fx * fy;
            }
        }
    }

    let mut out = Image::new(src.name.clone(), data, *grid, src.freqs_hz.clone())?;
    out.beam = src.beam;
    out.unit = src.unit.clone();
    out.telescope = src.telescope.clone();
    out.history = src.history.clone();
    if any_masked || src.mask.is_some() {
        out.set_mask(mask)?;
    }
    Ok(out)
}
