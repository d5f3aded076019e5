//! Colour scales and bound/tick tables.
//!
//! Scale names follow the plotting flags users already know: `s` (seis
//! ramp), `s_r` (reversed), `sd` (seis over the data range), `b` (two-colour
//! gate), `d`/`d_r` (discretized seis), `dd` (discretized over the data
//! range). Difference plots override the palette with a discretized
//! blue-white-red map so sign is readable at a glance.

use std::str::FromStr;

use tracing::debug;

use crate::{Error, Result};

pub type Rgb = [u8; 3];

/// Seis-style ramp, dark red through yellow to blue, as (position, colour)
/// stops on [0, 1].
const SEIS_STOPS: &[(f64, Rgb)] = &[
    (0.0, [170, 0, 0]),
    (0.125, [206, 46, 0]),
    (0.25, [243, 92, 0]),
    (0.375, [255, 153, 0]),
    (0.5, [255, 255, 0]),
    (0.625, [153, 235, 60]),
    (0.75, [60, 200, 120]),
    (0.875, [60, 130, 230]),
    (1.0, [40, 40, 255]),
];

const BWR_STOPS: &[(f64, Rgb)] = &[
    (0.0, [0, 0, 255]),
    (0.5, [255, 255, 255]),
    (1.0, [255, 0, 0]),
];

pub const DEFAULT_BOUNDS: [f64; 14] = [
    0.0, 0.2, 0.4, 0.6, 0.8, 1.0, 1.5, 2.0, 2.5, 3.0, 3.5, 4.0, 4.5, 5.0,
];

pub const DEFAULT_TICKS: [f64; 11] = [0.0, 0.5, 1.0, 1.5, 2.0, 2.5, 3.0, 3.5, 4.0, 4.5, 5.0];

pub const DEFAULT_GATE: f64 = 2.5;

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

/// Bound values subdividing `[min, max]` into `nstep` steps of `substep`
/// sub-bounds each, endpoint included.
pub fn makebounds(min: f64, max: f64, nstep: usize, substep: usize) -> Vec<f64> {
    let step = (max - min) / nstep as f64;
    let sub = step / substep as f64;
    let mut bounds = Vec::with_capacity(nstep * substep + 1);
    for i in 0..nstep {
        let s = min + step * i as f64;
        for j in 0..substep {
            bounds.push(round4(s + j as f64 * sub));
        }
    }
    bounds.push(round4(min + step * nstep as f64));
    bounds
}

/// Tick positions: `nstep + 1` evenly spaced values over `[min, max]`.
pub fn maketicks(min: f64, max: f64, nstep: usize) -> Vec<f64> {
    let step = (max - min) / nstep as f64;
    (0..=nstep).map(|i| round4(min + step * i as f64)).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleKind {
    /// `s`: continuous seis ramp.
    Smooth,
    /// `s_r`: continuous, reversed.
    SmoothReversed,
    /// `sd`: continuous over the rounded data range.
    SmoothData,
    /// `b`: grey below the gate value, red at or above it.
    Gate,
    /// `d`: seis discretized into the bound bands.
    Discrete,
    /// `d_r`: discretized, reversed.
    DiscreteReversed,
    /// `dd`: discretized over the rounded data range.
    DiscreteData,
}

impl FromStr for ScaleKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "s" => ScaleKind::Smooth,
            "s_r" => ScaleKind::SmoothReversed,
            "sd" => ScaleKind::SmoothData,
            "b" => ScaleKind::Gate,
            "d" => ScaleKind::Discrete,
            "d_r" => ScaleKind::DiscreteReversed,
            "dd" => ScaleKind::DiscreteData,
            other => {
                return Err(Error::UnknownScale {
                    name: other.to_string(),
                });
            }
        })
    }
}

#[derive(Debug, Clone)]
pub enum ColorMap {
    /// Interpolated stops normalized over `[vmin, vmax]`.
    Continuous {
        stops: Vec<(f64, Rgb)>,
        vmin: f64,
        vmax: f64,
    },
    /// One colour per bound band; values outside clamp to the end bands.
    Banded { bounds: Vec<f64>, colors: Vec<Rgb> },
}

fn lerp(a: Rgb, b: Rgb, t: f64) -> Rgb {
    let mix = |x: u8, y: u8| (f64::from(x) + (f64::from(y) - f64::from(x)) * t).round() as u8;
    [mix(a[0], b[0]), mix(a[1], b[1]), mix(a[2], b[2])]
}

fn sample(stops: &[(f64, Rgb)], t: f64) -> Rgb {
    let t = t.clamp(0.0, 1.0);
    for pair in stops.windows(2) {
        let (t0, c0) = pair[0];
        let (t1, c1) = pair[1];
        if t <= t1 {
            let f = if t1 > t0 { (t - t0) / (t1 - t0) } else { 0.0 };
            return lerp(c0, c1, f);
        }
    }
    stops.last().map(|&(_, c)| c).unwrap_or([0, 0, 0])
}

fn reversed(stops: &[(f64, Rgb)]) -> Vec<(f64, Rgb)> {
    stops
        .iter()
        .rev()
        .map(|&(t, c)| (1.0 - t, c))
        .collect()
}

/// Discretize a ramp into `n` flat colours.
fn discretize(stops: &[(f64, Rgb)], n: usize) -> Vec<Rgb> {
    (0..n)
        .map(|i| {
            let t = if n > 1 {
                i as f64 / (n - 1) as f64
            } else {
                0.5
            };
            sample(stops, t)
        })
        .collect()
}

impl ColorMap {
    pub fn color_at(&self, v: f64) -> Rgb {
        match self {
            ColorMap::Continuous { stops, vmin, vmax } => {
                let span = vmax - vmin;
                let t = if span > 0.0 { (v - vmin) / span } else { 0.0 };
                sample(stops, t)
            }
            ColorMap::Banded { bounds, colors } => {
                if colors.is_empty() {
                    return [0, 0, 0];
                }
                for (i, pair) in bounds.windows(2).enumerate() {
                    if v < pair[1] {
                        return colors[i.min(colors.len() - 1)];
                    }
                }
                colors[colors.len() - 1]
            }
        }
    }
}

/// What the caller knows before the scale is built.
#[derive(Debug, Clone, Copy)]
pub struct ScaleOptions {
    pub kind: ScaleKind,
    /// Explicit scale min/max from the user, overriding the default table.
    pub scale_bounds: Option<(f64, f64)>,
    /// Gate threshold for the `b` scale.
    pub gate: Option<f64>,
    /// Vp plots stretch the default bounds and ticks by 1.7.
    pub vp: bool,
    /// Poisson is dimensionless; smooth/discrete scales switch to their
    /// data-range variants.
    pub poisson: bool,
    /// Difference plots always use the diverging map.
    pub difference: bool,
}

impl ScaleOptions {
    pub fn new(kind: ScaleKind) -> Self {
        Self {
            kind,
            scale_bounds: None,
            gate: None,
            vp: false,
            poisson: false,
            difference: false,
        }
    }
}

/// A fully resolved scale: the colour map plus the bound and tick tables the
/// colourbar is drawn from.
#[derive(Debug, Clone)]
pub struct Scale {
    pub map: ColorMap,
    pub bounds: Vec<f64>,
    pub ticks: Vec<f64>,
}

impl Scale {
    /// Resolves a scale against the data statistics (already in display
    /// units). Data-range variants rebuild their bounds from the rounded
    /// min/max; everything else uses the default or user-supplied table.
    pub fn build(opts: &ScaleOptions, min: f64, max: f64) -> Result<Scale> {
        let kind = match (opts.poisson, opts.kind) {
            (true, ScaleKind::Smooth) => ScaleKind::SmoothData,
            (true, ScaleKind::Discrete) => ScaleKind::DiscreteData,
            (_, k) => k,
        };

        let (mut bounds, mut ticks, umin, umax) = match opts.scale_bounds {
            Some((lo, hi)) => (
                makebounds(lo, hi, 5, 5),
                maketicks(lo, hi, 5),
                lo.round(),
                hi.round(),
            ),
            None => (
                DEFAULT_BOUNDS.to_vec(),
                DEFAULT_TICKS.to_vec(),
                min.round(),
                max.round(),
            ),
        };
        if opts.vp {
            for b in &mut bounds {
                *b *= 1.7;
            }
            for t in &mut ticks {
                *t *= 1.7;
            }
        }
        // Only the data-range variants derive bounds from the rounded stats.
        if matches!(kind, ScaleKind::SmoothData | ScaleKind::DiscreteData) && umax <= umin {
            return Err(Error::InvalidScale {
                message: format!("data range [{umin}, {umax}] is too narrow for a scale"),
            });
        }

        let seis = SEIS_STOPS.to_vec();
        let seis_r = reversed(SEIS_STOPS);
        let mut scale = match kind {
            ScaleKind::Smooth | ScaleKind::SmoothReversed => {
                let stops = if kind == ScaleKind::Smooth {
                    seis
                } else {
                    seis_r
                };
                let vmin = bounds[0];
                let vmax = bounds[bounds.len() - 1];
                Scale {
                    map: ColorMap::Continuous { stops, vmin, vmax },
                    bounds,
                    ticks,
                }
            }
            ScaleKind::SmoothData => {
                let bounds = makebounds(umin, umax, 5, 5);
                let ticks = maketicks(umin, umax, 5);
                Scale {
                    map: ColorMap::Continuous {
                        stops: seis,
                        vmin: bounds[0],
                        vmax: bounds[bounds.len() - 1],
                    },
                    bounds,
                    ticks,
                }
            }
            ScaleKind::Gate => {
                let gate = opts.gate.unwrap_or(DEFAULT_GATE);
                let colors = bounds
                    .iter()
                    .map(|&b| {
                        if b < gate {
                            [128, 128, 128]
                        } else {
                            [255, 0, 0]
                        }
                    })
                    .collect();
                Scale {
                    map: ColorMap::Banded {
                        bounds: bounds.clone(),
                        colors,
                    },
                    bounds,
                    ticks,
                }
            }
            ScaleKind::Discrete | ScaleKind::DiscreteReversed => {
                let stops = if kind == ScaleKind::Discrete {
                    seis
                } else {
                    seis_r
                };
                let colors = discretize(&stops, bounds.len() - 1);
                Scale {
                    map: ColorMap::Banded {
                        bounds: bounds.clone(),
                        colors,
                    },
                    bounds,
                    ticks,
                }
            }
            ScaleKind::DiscreteData => {
                let bounds = makebounds(umin, umax, 5, 5);
                let ticks = maketicks(umin, umax, 5);
                let colors = discretize(&seis, bounds.len() - 1);
                Scale {
                    map: ColorMap::Banded {
                        bounds: bounds.clone(),
                        colors,
                    },
                    bounds,
                    ticks,
                }
            }
        };

        if opts.difference {
            let colors = discretize(BWR_STOPS, scale.bounds.len() - 1);
            scale.map = ColorMap::Banded {
                bounds: scale.bounds.clone(),
                colors,
            };
        }
        debug!(?kind, bounds = scale.bounds.len(), "built colour scale");
        Ok(scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_names_parse() {
        assert_eq!("s".parse::<ScaleKind>().unwrap(), ScaleKind::Smooth);
        assert_eq!("s_r".parse::<ScaleKind>().unwrap(), ScaleKind::SmoothReversed);
        assert_eq!("dd".parse::<ScaleKind>().unwrap(), ScaleKind::DiscreteData);
        assert!(matches!(
            "rainbow".parse::<ScaleKind>(),
            Err(Error::UnknownScale { .. })
        ));
    }

    #[test]
    fn default_tables() {
        assert_eq!(DEFAULT_BOUNDS.len(), 14);
        assert_eq!(DEFAULT_BOUNDS[0], 0.0);
        assert_eq!(DEFAULT_BOUNDS[13], 5.0);
        assert_eq!(DEFAULT_TICKS.len(), 11);
    }

    #[test]
    fn makebounds_subdivides_with_endpoint() {
        let bounds = makebounds(0.0, 5.0, 5, 5);
        assert_eq!(bounds.len(), 26);
        assert_eq!(bounds[0], 0.0);
        assert_eq!(bounds[25], 5.0);
        assert_eq!(bounds[1], 0.2);
    }

    #[test]
    fn maketicks_spans_range() {
        assert_eq!(maketicks(0.0, 5.0, 5), vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn gate_scale_splits_at_threshold() {
        let opts = ScaleOptions {
            gate: None,
            ..ScaleOptions::new(ScaleKind::Gate)
        };
        let scale = Scale::build(&opts, 0.5, 4.5).unwrap();
        // Default gate 2.5: below is grey, at and above is red.
        assert_eq!(scale.map.color_at(1.0), [128, 128, 128]);
        assert_eq!(scale.map.color_at(4.0), [255, 0, 0]);
    }

    #[test]
    fn vp_scale_stretches_bounds() {
        let opts = ScaleOptions {
            vp: true,
            ..ScaleOptions::new(ScaleKind::Smooth)
        };
        let scale = Scale::build(&opts, 0.0, 5.0).unwrap();
        assert_eq!(scale.bounds[13], 5.0 * 1.7);
        assert_eq!(scale.ticks[10], 5.0 * 1.7);
    }

    #[test]
    fn difference_uses_diverging_banded_map() {
        let opts = ScaleOptions {
            difference: true,
            scale_bounds: Some((-2.0, 2.0)),
            ..ScaleOptions::new(ScaleKind::Smooth)
        };
        let scale = Scale::build(&opts, -1.5, 1.5).unwrap();
        let low = scale.map.color_at(-2.0);
        let high = scale.map.color_at(2.0);
        // Blue end for negative, red end for positive.
        assert!(low[2] > low[0]);
        assert!(high[0] > high[2]);
    }

    #[test]
    fn poisson_switches_to_data_range() {
        let opts = ScaleOptions {
            poisson: true,
            ..ScaleOptions::new(ScaleKind::Smooth)
        };
        // Poisson values live around 0.25; round to integer stats 0 and 1.
        let scale = Scale::build(&opts, 0.0, 1.0).unwrap();
        assert_eq!(scale.bounds[0], 0.0);
        assert_eq!(scale.bounds[scale.bounds.len() - 1], 1.0);
        assert!(matches!(scale.map, ColorMap::Continuous { .. }));
    }

    #[test]
    fn continuous_map_interpolates_endpoints() {
        let scale = Scale::build(&ScaleOptions::new(ScaleKind::Smooth), 0.0, 5.0).unwrap();
        assert_eq!(scale.map.color_at(0.0), [170, 0, 0]);
        assert_eq!(scale.map.color_at(5.0), [40, 40, 255]);
    }

    #[test]
    fn banded_map_clamps_out_of_range() {
        let scale = Scale::build(&ScaleOptions::new(ScaleKind::Discrete), 0.0, 5.0).unwrap();
        assert_eq!(scale.map.color_at(-10.0), scale.map.color_at(0.05));
        assert_eq!(scale.map.color_at(99.0), scale.map.color_at(4.99));
    }
}
