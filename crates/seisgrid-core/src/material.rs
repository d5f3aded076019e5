use crate::error::{Error, Result};

/// The material properties the query tool can report, plus the derived
/// poisson ratio. Used everywhere a property is selected, instead of
/// dispatching on strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialProperty {
    Vp,
    Vs,
    Density,
    Poisson,
    Qp,
    Qs,
}

impl MaterialProperty {
    pub fn name(&self) -> &'static str {
        match self {
            MaterialProperty::Vp => "vp",
            MaterialProperty::Vs => "vs",
            MaterialProperty::Density => "density",
            MaterialProperty::Poisson => "poisson",
            MaterialProperty::Qp => "qp",
            MaterialProperty::Qs => "qs",
        }
    }

    /// Colourbar label units. Velocities are plotted in km/s after the
    /// presentation-side divide by 1000.
    pub fn units(&self) -> &'static str {
        match self {
            MaterialProperty::Density => "g/cm^3",
            MaterialProperty::Poisson => "",
            _ => "km/s",
        }
    }
}

impl std::str::FromStr for MaterialProperty {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "vp" => Ok(MaterialProperty::Vp),
            "vs" => Ok(MaterialProperty::Vs),
            "density" | "rho" => Ok(MaterialProperty::Density),
            "poisson" => Ok(MaterialProperty::Poisson),
            "qp" => Ok(MaterialProperty::Qp),
            "qs" => Ok(MaterialProperty::Qs),
            other => Err(Error::UnknownProperty {
                name: other.to_string(),
            }),
        }
    }
}

/// One sample of material properties as returned by the query tool.
///
/// `vp`/`vs` are in m/s, `density` in g/cm^3. Cells that were never queried
/// carry the toolkit's -1 convention in the required trio; the optional trio
/// is `None` until set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialSample {
    pub vp: f64,
    pub vs: f64,
    pub density: f64,
    pub poisson: Option<f64>,
    pub qp: Option<f64>,
    pub qs: Option<f64>,
}

impl MaterialSample {
    pub fn new(vp: f64, vs: f64, density: f64) -> Self {
        Self {
            vp,
            vs,
            density,
            poisson: None,
            qp: None,
            qs: None,
        }
    }

    /// Placeholder for a cell that has not been filled from a query or a
    /// datafile. -1 mirrors what the query tool reports for missing data.
    pub fn unset() -> Self {
        Self::new(-1.0, -1.0, -1.0)
    }

    /// Parses a full material-query output line. Columns 14..16
    /// (0-indexed, whitespace-delimited) are vp, vs, density.
    pub fn from_query_line(line: &str) -> Result<Self> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 17 {
            return Err(Error::QueryParse {
                line: line.to_string(),
            });
        }
        let parse = |s: &str| -> Result<f64> {
            s.parse::<f64>().map_err(|_| Error::QueryParse {
                line: line.to_string(),
            })
        };
        Ok(Self::new(
            parse(fields[14])?,
            parse(fields[15])?,
            parse(fields[16])?,
        ))
    }

    pub fn get(&self, property: MaterialProperty) -> f64 {
        match property {
            MaterialProperty::Vp => self.vp,
            MaterialProperty::Vs => self.vs,
            MaterialProperty::Density => self.density,
            MaterialProperty::Poisson => self.poisson.unwrap_or(-1.0),
            MaterialProperty::Qp => self.qp.unwrap_or(-1.0),
            MaterialProperty::Qs => self.qs.unwrap_or(-1.0),
        }
    }

    pub fn set(&mut self, property: MaterialProperty, value: f64) {
        match property {
            MaterialProperty::Vp => self.vp = value,
            MaterialProperty::Vs => self.vs = value,
            MaterialProperty::Density => self.density = value,
            MaterialProperty::Poisson => self.poisson = Some(value),
            MaterialProperty::Qp => self.qp = Some(value),
            MaterialProperty::Qs => self.qs = Some(value),
        }
    }
}

impl std::ops::Sub for MaterialSample {
    type Output = MaterialSample;

    fn sub(self, other: MaterialSample) -> MaterialSample {
        let opt = |a: Option<f64>, b: Option<f64>| match (a, b) {
            (Some(a), Some(b)) => Some(a - b),
            _ => None,
        };
        MaterialSample {
            vp: self.vp - other.vp,
            vs: self.vs - other.vs,
            density: self.density - other.density,
            poisson: opt(self.poisson, other.poisson),
            qp: opt(self.qp, other.qp),
            qs: opt(self.qs, other.qs),
        }
    }
}

impl std::fmt::Display for MaterialSample {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Vp: {:.2}m/s, Vs: {:.2}m/s, Density: {:.2}g/cm^3",
            self.vp, self.vs, self.density
        )
    }
}

/// Which formula derives the poisson value from a (vs, vp) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PoissonForm {
    /// The plain vp/vs ratio.
    #[default]
    Simple,
    /// The textbook elastic ratio ((vp^2 - 2 vs^2) / 2) / (vp^2 - vs^2).
    Elastic,
}

/// Poisson is never queried directly; it is derived per cell after the fact.
/// Degenerate inputs return 0.0 rather than dividing by zero.
pub fn poisson(vs: f64, vp: f64, form: PoissonForm) -> f64 {
    if vs == 0.0 || vp == 0.0 {
        return 0.0;
    }
    match form {
        PoissonForm::Simple => vp / vs,
        PoissonForm::Elastic => {
            let denom = vp * vp - vs * vs;
            if denom == 0.0 {
                return 0.0;
            }
            ((vp * vp - 2.0 * vs * vs) / 2.0) / denom
        }
    }
}
