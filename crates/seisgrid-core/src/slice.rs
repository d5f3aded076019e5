//! Slice operations: the pipeline from a region or path specification to a
//! populated, annotated, optionally persisted grid.
//!
//! Each operation builds a lattice, fills it from the query tools or from a
//! previously persisted datafile, derives the presentation-scaled grid, and
//! assembles the metadata record. Saving writes the raw (unscaled) array so
//! a regenerated plot starts from the same numbers.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::ToolkitConfig;
use crate::diff::{self, DifferenceReport};
use crate::error::Result;
use crate::grid::{Grid, ScalarGrid};
use crate::lattice::{Lattice, VerticalRange};
use crate::material::{MaterialProperty, MaterialSample, PoissonForm};
use crate::persist::{self, DataFormat, GridMetadata};
use crate::point::GeoPoint;
use crate::query::{QueryClient, QueryMode};

/// A persisted array to reuse instead of querying. The format is decided
/// here, once, from the name the user handed over.
#[derive(Debug, Clone)]
pub struct DataSource {
    pub path: PathBuf,
    pub format: DataFormat,
}

impl DataSource {
    pub fn from_name(name: &str) -> DataSource {
        DataSource {
            path: PathBuf::from(name),
            format: DataFormat::from_name(name),
        }
    }

    fn load(&self, num_x: usize, num_y: usize) -> Result<ScalarGrid> {
        let values = persist::read_grid_data(&self.path, self.format, num_x, num_y)?;
        ScalarGrid::from_values(values, num_x, num_y)
    }
}

/// Everything a slice needs besides its geometry.
#[derive(Debug, Clone)]
pub struct SliceContext<'a> {
    pub toolkit: &'a ToolkitConfig,
    pub model: String,
    pub property: MaterialProperty,
    pub poisson_form: PoissonForm,
    /// When set, the lattice shape is filled from this file and no
    /// subprocess runs.
    pub datafile: Option<DataSource>,
}

impl<'a> SliceContext<'a> {
    pub fn new(toolkit: &'a ToolkitConfig, model: impl Into<String>) -> Self {
        Self {
            toolkit,
            model: model.into(),
            property: MaterialProperty::Vs,
            poisson_form: PoissonForm::default(),
            datafile: None,
        }
    }

    pub fn with_property(mut self, property: MaterialProperty) -> Self {
        self.property = property;
        self
    }

    pub fn with_poisson_form(mut self, form: PoissonForm) -> Self {
        self.poisson_form = form;
        self
    }

    pub fn with_datafile(mut self, source: DataSource) -> Self {
        self.datafile = Some(source);
        self
    }

    fn populate(&self, lattice: &Lattice, mode: QueryMode) -> Result<ScalarGrid> {
        let raw = match &self.datafile {
            Some(source) => {
                info!(path = %source.path.display(), "reusing persisted grid data");
                let values = source.load(lattice.num_x(), lattice.num_y())?;
                let grid = Grid::from_scalar_data(
                    values.values(),
                    self.property,
                    lattice.num_x(),
                    lattice.num_y(),
                )?;
                grid.extract(self.property, self.poisson_form)
            }
            None => {
                let client = QueryClient::new(self.toolkit);
                let samples = client.query(lattice.points(), &self.model, mode)?;
                let grid = Grid::from_samples(samples, lattice.num_x(), lattice.num_y())?;
                grid.extract(self.property, self.poisson_form)
            }
        };
        Ok(raw)
    }
}

/// Presentation divisor: everything is shown in km/s (or g/cm3 scaled the
/// same way) except the dimensionless poisson ratio.
fn display_divisor(property: MaterialProperty) -> f64 {
    match property {
        MaterialProperty::Poisson => 1.0,
        _ => 1000.0,
    }
}

/// A populated slice: the raw grid as queried or loaded, the scaled grid
/// the renderer and the statistics use, and the metadata record so far.
#[derive(Debug, Clone)]
pub struct SliceResult {
    pub lattice: Lattice,
    pub raw: ScalarGrid,
    pub display: ScalarGrid,
    pub metadata: GridMetadata,
}

impl SliceResult {
    fn build(lattice: Lattice, raw: ScalarGrid, property: MaterialProperty) -> SliceResult {
        let display = raw.scaled(display_divisor(property));
        let metadata = GridMetadata::new();
        let mut result = SliceResult {
            lattice,
            raw,
            display,
            metadata,
        };
        result.annotate();
        result
    }

    /// Fills the computed metadata fields: shape, count, statistics over the
    /// scaled grid, and the coordinate lists the lattice produced.
    fn annotate(&mut self) {
        let meta = &mut self.metadata;
        meta.insert("num_x", self.lattice.num_x());
        meta.insert("num_y", self.lattice.num_y());
        meta.insert("datapoints", self.raw.len());
        meta.insert("max", self.display.max());
        meta.insert("min", self.display.min());
        meta.insert("mean", self.display.mean());
        meta.insert(
            "created",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        );
        let coords = self.lattice.coords();
        meta.insert("lon_list", coords.lon_list.clone());
        meta.insert("lat_list", coords.lat_list.clone());
        if !coords.depth_list.is_empty() {
            meta.insert("depth_list", coords.depth_list.clone());
        }
        if !coords.elevation_list.is_empty() {
            meta.insert("elevation_list", coords.elevation_list.clone());
        }
    }

    /// Writes the paired artifacts next to the logical output name: the raw
    /// array as a self-describing file plus the metadata JSON.
    pub fn save(&self, name: &str) -> Result<()> {
        persist::write_grid(&persist::data_path(name, DataFormat::Npy), &self.raw)?;
        self.metadata.write(&persist::meta_path(name))?;
        Ok(())
    }
}

/// Horizontal slice of one material property over a lat/lon box at the
/// vertical coordinate the corner points carry.
pub fn horizontal_slice(
    ctx: &SliceContext,
    upper_left: &GeoPoint,
    bottom_right: &GeoPoint,
    spacing: f64,
    steps: Option<(usize, usize)>,
) -> Result<SliceResult> {
    let lattice = Lattice::horizontal(upper_left, bottom_right, spacing, steps)?;
    let mode = if upper_left.vertical.is_elevation() {
        QueryMode::Elevation
    } else {
        QueryMode::Depth
    };
    let raw = ctx.populate(&lattice, mode)?;
    let mut result = SliceResult::build(lattice, raw, ctx.property);
    result.metadata.insert("cvm", ctx.model.clone());
    result.metadata.insert("mproperty", ctx.property.name());
    result.metadata.insert("spacing", spacing);
    Ok(result)
}

/// Vertical cross section along the straight path between two endpoints.
/// Depth and elevation sections differ only in the range and query mode.
pub fn cross_section(
    ctx: &SliceContext,
    start: &GeoPoint,
    end: &GeoPoint,
    hspacing: f64,
    vspacing: f64,
    range: VerticalRange,
) -> Result<SliceResult> {
    let lattice = Lattice::cross_section(start, end, hspacing, vspacing, range)?;
    let mode = if range.is_elevation() {
        QueryMode::Elevation
    } else {
        QueryMode::Depth
    };
    let raw = ctx.populate(&lattice, mode)?;
    let mut result = SliceResult::build(lattice, raw, ctx.property);
    result.metadata.insert("cvm", ctx.model.clone());
    result.metadata.insert("mproperty", ctx.property.name());
    result.metadata.insert("hspacing", hspacing);
    result.metadata.insert("vspacing", vspacing);
    Ok(result)
}

/// Surface-valued slices: one scalar per lat/lon point, no vertical sweep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SurfaceKind {
    /// `vs30_query`, the standalone tool.
    Vs30,
    /// Vs30 as stored in the model etree.
    Vs30Etree,
    /// Surface elevation as stored in the model etree.
    ElevationEtree,
    /// Depth at which Vs first exceeds the threshold (e.g. 1000 for Z1.0).
    BasinDepth { vs_threshold: f64 },
}

impl SurfaceKind {
    fn property_name(&self) -> &'static str {
        match self {
            SurfaceKind::Vs30 | SurfaceKind::Vs30Etree => "vs30",
            SurfaceKind::ElevationEtree => "elevation",
            SurfaceKind::BasinDepth { .. } => "basin_depth",
        }
    }
}

/// Horizontal slice of a surface quantity over a lat/lon box.
pub fn surface_slice(
    toolkit: &ToolkitConfig,
    model: &str,
    kind: SurfaceKind,
    upper_left: &GeoPoint,
    bottom_right: &GeoPoint,
    spacing: f64,
    steps: Option<(usize, usize)>,
) -> Result<SliceResult> {
    let lattice = Lattice::horizontal(upper_left, bottom_right, spacing, steps)?;
    let client = QueryClient::new(toolkit);
    let values = match kind {
        SurfaceKind::Vs30 => client.vs30(lattice.points(), model)?,
        SurfaceKind::Vs30Etree => client.vs30_etree(lattice.points(), model)?,
        SurfaceKind::ElevationEtree => client.elevation_etree(lattice.points(), model)?,
        SurfaceKind::BasinDepth { vs_threshold } => {
            client.basin_depth(lattice.points(), model, vs_threshold)?
        }
    };
    let raw = ScalarGrid::from_values(
        values.iter().map(|&v| v as f32).collect(),
        lattice.num_x(),
        lattice.num_y(),
    )?;
    let mut result = SliceResult::build(lattice, raw, MaterialProperty::Vs);
    result.metadata.insert("cvm", model);
    result.metadata.insert("mproperty", kind.property_name());
    result.metadata.insert("spacing", spacing);
    Ok(result)
}

/// One vertical column of full material samples at a single location.
#[derive(Debug, Clone)]
pub struct ProfileResult {
    pub lattice: Lattice,
    pub samples: Vec<MaterialSample>,
}

impl ProfileResult {
    /// One property as a curve over the vertical levels.
    pub fn series(&self, property: MaterialProperty, form: PoissonForm) -> Vec<f64> {
        self.samples
            .iter()
            .map(|s| match property {
                MaterialProperty::Poisson => match s.poisson {
                    Some(stored) => stored,
                    None => crate::material::poisson(s.vs, s.vp, form),
                },
                _ => s.get(property),
            })
            .collect()
    }

    /// Writes the velocity triples as a JSON sibling of the plot name.
    pub fn save_velocity(&self, name: &str) -> Result<()> {
        let vs: Vec<f64> = self.samples.iter().map(|s| s.vs).collect();
        let vp: Vec<f64> = self.samples.iter().map(|s| s.vp).collect();
        let rho: Vec<f64> = self.samples.iter().map(|s| s.density).collect();
        persist::write_velocity(&persist::velocity_path(name), &vs, &vp, &rho)
    }

    /// Writes the full material-property records as a JSON sibling.
    pub fn save_matprops(&self, name: &str) -> Result<()> {
        persist::write_matprops(&persist::matprops_path(name), &self.samples)
    }
}

pub fn depth_profile(
    toolkit: &ToolkitConfig,
    model: &str,
    at: &GeoPoint,
    vspacing: f64,
    range: VerticalRange,
) -> Result<ProfileResult> {
    let lattice = Lattice::profile(at, vspacing, range)?;
    let mode = if range.is_elevation() {
        QueryMode::Elevation
    } else {
        QueryMode::Depth
    };
    let client = QueryClient::new(toolkit);
    let samples = client.query(lattice.points(), model, mode)?;
    Ok(ProfileResult { lattice, samples })
}

/// A difference slice over two persisted grids sharing the given lattice.
/// The grids are loaded, differenced, and the metadata is flagged so the
/// renderer relabels units and switches to a diverging map.
pub fn difference_slice(
    lattice: Lattice,
    source_a: &DataSource,
    source_b: &DataSource,
    property: MaterialProperty,
    debug_path: Option<&Path>,
) -> Result<(SliceResult, DifferenceReport)> {
    let a = source_a.load(lattice.num_x(), lattice.num_y())?;
    let b = source_b.load(lattice.num_x(), lattice.num_y())?;
    let (raw, report) = diff::difference(&a, &b)?;
    if let Some(path) = debug_path {
        report.write(path)?;
    }
    let mut result = SliceResult::build(lattice, raw, property);
    result.metadata.insert("mproperty", property.name());
    result.metadata.insert("difference", property.name());
    Ok((result, report))
}
