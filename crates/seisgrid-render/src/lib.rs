#![forbid(unsafe_code)]

//! Colour-mapped rendering for velocity-model grids.
//!
//! Consumes the scaled grids produced by `seisgrid-core` and writes PNG
//! plots. The colour-scale tables mirror the conventions the toolkit's
//! users expect (seis ramp, gated two-colour, discretized variants, and a
//! diverging map for difference plots).

pub mod colormap;
pub mod plot;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unknown colour scale: {name}")]
    UnknownScale { name: String },
    #[error("invalid colour scale: {message}")]
    InvalidScale { message: String },
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Core(#[from] seisgrid_core::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

pub use colormap::{ColorMap, Scale, ScaleKind, ScaleOptions};
pub use plot::{RenderOptions, render_image, save_plot};
