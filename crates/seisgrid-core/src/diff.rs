//! Element-wise grid differencing with diagnostic bookkeeping.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde_json::Value;
use tracing::info;

use crate::error::{Error, Result};
use crate::grid::ScalarGrid;

/// Bookkeeping collected while differencing two grids. Lists every cell
/// where A fell below B along with both source values, plus category counts
/// and the running minimum. Written once as a JSON sibling file and never
/// read back by this toolkit.
#[derive(Debug, Clone, PartialEq)]
pub struct DifferenceReport {
    pub num_x: usize,
    pub num_y: usize,
    /// Most negative difference seen, 0.0 when no cell went negative.
    pub max_less: f64,
    pub max_less_i: usize,
    pub max_less_j: usize,
    pub less: usize,
    pub more: usize,
    pub zero: usize,
    /// Parallel per-negative-cell records: source values, the difference,
    /// and the lattice row/column.
    pub a: Vec<f64>,
    pub b: Vec<f64>,
    pub d: Vec<f64>,
    pub i: Vec<usize>,
    pub j: Vec<usize>,
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

/// Computes `a - b` cell by cell. Both grids must share a shape; a mismatch
/// is fatal since a partial difference plot would be silently wrong.
pub fn difference(a: &ScalarGrid, b: &ScalarGrid) -> Result<(ScalarGrid, DifferenceReport)> {
    if a.num_x() != b.num_x() || a.num_y() != b.num_y() {
        return Err(Error::ShapeMismatch {
            actual: b.len(),
            expected: a.len(),
            num_x: a.num_x(),
            num_y: a.num_y(),
        });
    }

    let num_x = a.num_x();
    let num_y = a.num_y();
    let mut report = DifferenceReport {
        num_x,
        num_y,
        max_less: 0.0,
        max_less_i: 0,
        max_less_j: 0,
        less: 0,
        more: 0,
        zero: 0,
        a: Vec::new(),
        b: Vec::new(),
        d: Vec::new(),
        i: Vec::new(),
        j: Vec::new(),
    };

    let mut values = Vec::with_capacity(a.len());
    for (idx, (&va, &vb)) in a.values().iter().zip(b.values()).enumerate() {
        let diff = f64::from(va) - f64::from(vb);
        values.push(diff as f32);

        let row = idx / num_x;
        let col = idx % num_x;
        if diff < 0.0 {
            report.less += 1;
            if diff < report.max_less {
                report.max_less = diff;
                report.max_less_i = row;
                report.max_less_j = col;
            }
            report.a.push(round4(f64::from(va)));
            report.b.push(round4(f64::from(vb)));
            report.d.push(round4(diff));
            report.i.push(row);
            report.j.push(col);
        } else if diff > 0.0 {
            report.more += 1;
        } else {
            report.zero += 1;
        }
    }

    info!(
        less = report.less,
        more = report.more,
        zero = report.zero,
        max_less = report.max_less,
        "differenced grids"
    );
    let grid = ScalarGrid::from_values(values, num_x, num_y)?;
    Ok((grid, report))
}

impl DifferenceReport {
    /// The diagnostic JSON object. Key order is part of the format.
    pub fn to_json(&self) -> Value {
        let mut root = serde_json::Map::new();
        root.insert("max_j".to_string(), self.num_x.into());
        root.insert("max_i".to_string(), self.num_y.into());
        root.insert("max_less".to_string(), self.max_less.into());
        root.insert("max_less_i".to_string(), self.max_less_i.into());
        root.insert("max_less_j".to_string(), self.max_less_j.into());
        root.insert("less".to_string(), self.less.into());
        root.insert("more".to_string(), self.more.into());
        root.insert("zero".to_string(), self.zero.into());
        root.insert("A".to_string(), self.a.clone().into());
        root.insert("B".to_string(), self.b.clone().into());
        root.insert("D".to_string(), self.d.clone().into());
        root.insert("i".to_string(), self.i.clone().into());
        root.insert("j".to_string(), self.j.clone().into());
        Value::Object(root)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        let mut w = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut w, &self.to_json())?;
        w.flush()?;
        info!(path = %path.display(), "wrote difference diagnostics");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difference_with_diagnostics() {
        let a = ScalarGrid::from_values(vec![1.0, 2.0, 3.0, 4.0], 2, 2).unwrap();
        let b = ScalarGrid::from_values(vec![1.0, 1.0, 1.0, 9.0], 2, 2).unwrap();
        let (d, report) = difference(&a, &b).unwrap();

        assert_eq!(d.values(), &[0.0, 1.0, 2.0, -5.0]);
        assert_eq!(report.less, 1);
        assert_eq!(report.more, 2);
        assert_eq!(report.zero, 1);
        assert_eq!(report.max_less, -5.0);
        assert_eq!(report.max_less_i, 1);
        assert_eq!(report.max_less_j, 1);
        assert_eq!(report.a, vec![4.0]);
        assert_eq!(report.b, vec![9.0]);
        assert_eq!(report.d, vec![-5.0]);
        assert_eq!(report.i, vec![1]);
        assert_eq!(report.j, vec![1]);
    }

    #[test]
    fn max_less_stays_zero_without_negatives() {
        let a = ScalarGrid::from_values(vec![2.0, 2.0], 2, 1).unwrap();
        let b = ScalarGrid::from_values(vec![1.0, 2.0], 2, 1).unwrap();
        let (_, report) = difference(&a, &b).unwrap();
        assert_eq!(report.less, 0);
        assert_eq!(report.max_less, 0.0);
        assert!(report.a.is_empty());
    }

    #[test]
    fn negative_records_are_rounded_to_4_decimals() {
        let a = ScalarGrid::from_values(vec![1.000049], 1, 1).unwrap();
        let b = ScalarGrid::from_values(vec![2.0], 1, 1).unwrap();
        let (_, report) = difference(&a, &b).unwrap();
        assert_eq!(report.a, vec![1.0]);
        assert_eq!(report.b, vec![2.0]);
        assert_eq!(report.d, vec![-1.0]);
    }

    #[test]
    fn shape_mismatch_is_fatal() {
        let a = ScalarGrid::from_values(vec![1.0, 2.0], 2, 1).unwrap();
        let b = ScalarGrid::from_values(vec![1.0, 2.0], 1, 2).unwrap();
        assert!(matches!(
            difference(&a, &b),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn report_json_key_order() {
        let a = ScalarGrid::from_values(vec![1.0], 1, 1).unwrap();
        let b = ScalarGrid::from_values(vec![2.0], 1, 1).unwrap();
        let (_, report) = difference(&a, &b).unwrap();
        let text = serde_json::to_string(&report.to_json()).unwrap();
        let order = [
            "\"max_j\"",
            "\"max_i\"",
            "\"max_less\"",
            "\"max_less_i\"",
            "\"max_less_j\"",
            "\"less\"",
            "\"more\"",
            "\"zero\"",
            "\"A\"",
            "\"B\"",
            "\"D\"",
            "\"i\"",
            "\"j\"",
        ];
        let positions: Vec<usize> = order.iter().map(|k| text.find(k).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }
}
