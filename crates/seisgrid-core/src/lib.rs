#![forbid(unsafe_code)]

//! Velocity-model grid pipeline (headless).
//!
//! Turns a geographic region or path specification into an ordered query
//! lattice, fills it from the installed velocity-model query tools (or from
//! previously persisted data), and round-trips the resulting 2D grids
//! through paired array+metadata artifacts. Rendering lives in a separate
//! crate; this one never draws anything.

pub mod config;
pub mod diff;
pub mod error;
pub mod geom;
pub mod grid;
pub mod lattice;
pub mod material;
pub mod persist;
pub mod point;
pub mod proj;
pub mod query;
pub mod slice;

pub use config::{Floors, ToolkitConfig};
pub use error::{Error, Result};
pub use grid::{Grid, ScalarGrid};
pub use lattice::{Lattice, VerticalRange};
pub use material::{MaterialProperty, MaterialSample, PoissonForm};
pub use persist::{DataFormat, GridMetadata};
pub use point::{GeoPoint, VerticalCoord};
pub use query::{QueryClient, QueryMode};
pub use slice::{DataSource, SliceContext, SliceResult, SurfaceKind};
