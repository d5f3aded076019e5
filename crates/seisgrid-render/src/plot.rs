//! PNG rendering of scalar grids.

use std::path::Path;

use image::{Rgb, RgbImage};
use seisgrid_core::ScalarGrid;
use tracing::info;

use crate::Result;
use crate::colormap::Scale;

/// Cells with no data (NaN) render as white.
const NO_DATA: [u8; 3] = [255, 255, 255];

const COLORBAR_HEIGHT: u32 = 16;
const COLORBAR_GAP: u32 = 8;

#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    /// Pixels per grid cell; 0 picks a size that keeps the image readable.
    pub cell_size: u32,
    /// Append a horizontal colourbar strip under the grid.
    pub colorbar: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            cell_size: 0,
            colorbar: true,
        }
    }
}

fn cell_size(opts: &RenderOptions, num_x: usize) -> u32 {
    if opts.cell_size > 0 {
        return opts.cell_size;
    }
    (720 / num_x.max(1) as u32).clamp(1, 24)
}

/// Renders the grid nearest-cell upscaled through the scale's colour map.
pub fn render_image(grid: &ScalarGrid, scale: &Scale, opts: &RenderOptions) -> RgbImage {
    let cell = cell_size(opts, grid.num_x());
    let width = grid.num_x() as u32 * cell;
    let grid_height = grid.num_y() as u32 * cell;
    let height = if opts.colorbar {
        grid_height + COLORBAR_GAP + COLORBAR_HEIGHT
    } else {
        grid_height
    };

    let mut img = RgbImage::from_pixel(width, height, Rgb(NO_DATA));
    for y in 0..grid.num_y() {
        for x in 0..grid.num_x() {
            let v = grid.get(y, x);
            let rgb = if v.is_nan() {
                NO_DATA
            } else {
                scale.map.color_at(f64::from(v))
            };
            for py in 0..cell {
                for px in 0..cell {
                    img.put_pixel(x as u32 * cell + px, y as u32 * cell + py, Rgb(rgb));
                }
            }
        }
    }

    if opts.colorbar && width > 0 {
        let lo = scale.bounds[0];
        let hi = scale.bounds[scale.bounds.len() - 1];
        for px in 0..width {
            let v = lo + (hi - lo) * f64::from(px) / f64::from(width.saturating_sub(1).max(1));
            let rgb = scale.map.color_at(v);
            for py in 0..COLORBAR_HEIGHT {
                img.put_pixel(px, grid_height + COLORBAR_GAP + py, Rgb(rgb));
            }
        }
    }
    img
}

/// Renders and writes the plot. The format follows the file extension; the
/// toolkit writes `.png`.
pub fn save_plot(
    grid: &ScalarGrid,
    scale: &Scale,
    opts: &RenderOptions,
    path: &Path,
) -> Result<()> {
    let img = render_image(grid, scale, opts);
    img.save(path)?;
    info!(path = %path.display(), width = img.width(), height = img.height(), "wrote plot");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colormap::{ScaleKind, ScaleOptions};

    fn scale() -> Scale {
        Scale::build(&ScaleOptions::new(ScaleKind::Smooth), 0.0, 5.0).unwrap()
    }

    #[test]
    fn image_matches_grid_shape() {
        let grid = ScalarGrid::from_values(vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0], 3, 2).unwrap();
        let opts = RenderOptions {
            cell_size: 2,
            colorbar: false,
        };
        let img = render_image(&grid, &scale(), &opts);
        assert_eq!(img.width(), 6);
        assert_eq!(img.height(), 4);
        // Upper-left cell carries the low end of the ramp.
        assert_eq!(img.get_pixel(0, 0).0, scale().map.color_at(0.0));
    }

    #[test]
    fn nan_cells_render_white() {
        let grid = ScalarGrid::from_values(vec![f32::NAN, 2.0], 2, 1).unwrap();
        let opts = RenderOptions {
            cell_size: 1,
            colorbar: false,
        };
        let img = render_image(&grid, &scale(), &opts);
        assert_eq!(img.get_pixel(0, 0).0, NO_DATA);
        assert_ne!(img.get_pixel(1, 0).0, NO_DATA);
    }

    #[test]
    fn colorbar_strip_is_appended() {
        let grid = ScalarGrid::from_values(vec![1.0; 4], 2, 2).unwrap();
        let opts = RenderOptions {
            cell_size: 4,
            colorbar: true,
        };
        let img = render_image(&grid, &scale(), &opts);
        assert_eq!(img.height(), 8 + COLORBAR_GAP + COLORBAR_HEIGHT);
        // The strip sweeps the ramp left to right.
        let left = img.get_pixel(0, 8 + COLORBAR_GAP).0;
        let right = img.get_pixel(img.width() - 1, 8 + COLORBAR_GAP).0;
        assert_ne!(left, right);
    }

    #[test]
    fn save_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slice.png");
        let grid = ScalarGrid::from_values(vec![0.5, 1.5, 2.5, 3.5], 2, 2).unwrap();
        save_plot(&grid, &scale(), &RenderOptions::default(), &path).unwrap();
        assert!(path.exists());
    }
}
