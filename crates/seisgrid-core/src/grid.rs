use crate::error::{Error, Result};
use crate::material::{MaterialProperty, MaterialSample, PoissonForm, poisson};

fn check_shape(actual: usize, num_x: usize, num_y: usize) -> Result<()> {
    let expected = num_x * num_y;
    if actual != expected {
        return Err(Error::ShapeMismatch {
            actual,
            expected,
            num_x,
            num_y,
        });
    }
    Ok(())
}

/// 2D array of material samples aligned to a lattice, row-major, indexed
/// `[y][x]`.
#[derive(Debug, Clone)]
pub struct Grid {
    num_x: usize,
    num_y: usize,
    cells: Vec<MaterialSample>,
}

impl Grid {
    /// Redistributes the flat, input-ordered query result onto the 2D grid.
    pub fn from_samples(samples: Vec<MaterialSample>, num_x: usize, num_y: usize) -> Result<Grid> {
        check_shape(samples.len(), num_x, num_y)?;
        Ok(Grid {
            num_x,
            num_y,
            cells: samples,
        })
    }

    /// Rebuilds a grid from a persisted scalar array. Each cell carries only
    /// the one property the datafile holds; the rest stay unset.
    pub fn from_scalar_data(
        values: &[f32],
        property: MaterialProperty,
        num_x: usize,
        num_y: usize,
    ) -> Result<Grid> {
        check_shape(values.len(), num_x, num_y)?;
        let cells = values
            .iter()
            .map(|&v| {
                let mut cell = MaterialSample::unset();
                cell.set(property, f64::from(v));
                cell
            })
            .collect();
        Ok(Grid {
            num_x,
            num_y,
            cells,
        })
    }

    pub fn num_x(&self) -> usize {
        self.num_x
    }

    pub fn num_y(&self) -> usize {
        self.num_y
    }

    pub fn get(&self, y: usize, x: usize) -> &MaterialSample {
        &self.cells[y * self.num_x + x]
    }

    /// Pulls one property out of every cell. Poisson is derived from the
    /// (vs, vp) pair; it is never a stored value unless a datafile tagged it.
    pub fn extract(&self, property: MaterialProperty, form: PoissonForm) -> ScalarGrid {
        let values = self
            .cells
            .iter()
            .map(|cell| {
                let v = if property == MaterialProperty::Poisson {
                    match cell.poisson {
                        Some(stored) => stored,
                        None => poisson(cell.vs, cell.vp, form),
                    }
                } else {
                    cell.get(property)
                };
                v as f32
            })
            .collect();
        ScalarGrid {
            num_x: self.num_x,
            num_y: self.num_y,
            values,
        }
    }
}

/// 2D array of raw floats, the unit persisted, differenced and plotted.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarGrid {
    num_x: usize,
    num_y: usize,
    values: Vec<f32>,
}

impl ScalarGrid {
    pub fn from_values(values: Vec<f32>, num_x: usize, num_y: usize) -> Result<ScalarGrid> {
        check_shape(values.len(), num_x, num_y)?;
        Ok(ScalarGrid {
            num_x,
            num_y,
            values,
        })
    }

    pub fn num_x(&self) -> usize {
        self.num_x
    }

    pub fn num_y(&self) -> usize {
        self.num_y
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, y: usize, x: usize) -> f32 {
        self.values[y * self.num_x + x]
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// A copy with every value divided by `divisor` (1000 turns m/s into
    /// km/s for presentation; poisson keeps a divisor of 1).
    pub fn scaled(&self, divisor: f64) -> ScalarGrid {
        ScalarGrid {
            num_x: self.num_x,
            num_y: self.num_y,
            values: self
                .values
                .iter()
                .map(|&v| (f64::from(v) / divisor) as f32)
                .collect(),
        }
    }

    /// Maximum ignoring NaN cells.
    pub fn max(&self) -> f64 {
        self.values
            .iter()
            .filter(|v| !v.is_nan())
            .fold(f64::NEG_INFINITY, |acc, &v| acc.max(f64::from(v)))
    }

    /// Minimum ignoring NaN cells.
    pub fn min(&self) -> f64 {
        self.values
            .iter()
            .filter(|v| !v.is_nan())
            .fold(f64::INFINITY, |acc, &v| acc.min(f64::from(v)))
    }

    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return f64::NAN;
        }
        let sum: f64 = self.values.iter().map(|&v| f64::from(v)).sum();
        sum / self.values.len() as f64
    }
}
