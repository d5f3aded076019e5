//! Client for the velocity-model query tools.
//!
//! The tools are line-oriented subprocesses: the full point lattice is
//! written to stdin in one shot, then stdout is drained until the process
//! closes it. There is no streaming, no timeout and no retry; any failure is
//! terminal for the invocation.

use std::io::{Read, Write};
use std::process::{Command, Stdio};

use tracing::debug;

use crate::config::ToolkitConfig;
use crate::error::{Error, Result};
use crate::material::MaterialSample;
use crate::point::GeoPoint;

/// Friendly descriptions for models commonly installed with the toolkit.
pub fn model_description(model: &str) -> Option<&'static str> {
    Some(match model {
        "1d" => "1D(1d)",
        "1dgtl" => "1D w/ Vs30 GTL(1dgtl)",
        "bbp1d" => "Broadband Northridge Region 1D Model(bbp1d)",
        "cvms" => "CVM-S4(cvms)",
        "cvms5" => "CVM-S4.26(cvms5)",
        "cvms426" => "CVM-S4.26.M01(cvmsi)",
        "cca" => "CCA 06(cca)",
        "cs173" => "CyberShake 17.3(cs173)",
        "cs173h" => "CyberShake 17.3 with San Joaquin and Santa Maria Basins data(cs173h)",
        "cvmh1511" => "CVM-H 15.1.1(cvmh)",
        "albacore" => "ALBACORE(albacore)",
        "cencal" => "USGS Bay Area Model(cencal)",
        _ => return None,
    })
}

/// Coordinate mode for full material queries: `gd` (geodetic depth) or
/// `ge` (geodetic elevation).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    Depth,
    Elevation,
}

impl QueryMode {
    fn flag(&self) -> &'static str {
        match self {
            QueryMode::Depth => "gd",
            QueryMode::Elevation => "ge",
        }
    }
}

/// Lines the query tools emit that carry no data. They are discarded, not
/// treated as errors.
fn is_skip_line(line: &str) -> bool {
    line.contains("WARNING") || line.contains("slow performance") || line.contains("Using Geo")
}

/// Trims `header_offset` leading lines, drops skip-lines, and hands every
/// remaining line to `parse`. A non-skip line whose first token is not a
/// float means the tool reported a missing model or malformed output, which
/// is fatal.
pub(crate) fn parse_response<T>(
    raw: &str,
    header_offset: usize,
    parse: impl Fn(&str) -> Result<T>,
) -> Result<Vec<T>> {
    let mut records = Vec::new();
    for line in raw.lines().skip(header_offset) {
        if line.trim().is_empty() || is_skip_line(line) {
            continue;
        }
        let first = line.split_whitespace().next().unwrap_or("");
        if first.parse::<f64>().is_err() {
            return Err(Error::QueryParse {
                line: line.to_string(),
            });
        }
        records.push(parse(line)?);
    }
    if records.is_empty() {
        return Err(Error::EmptyResponse);
    }
    Ok(records)
}

/// Extracts the whitespace-delimited column at `index` as a float.
fn column(line: &str, index: usize) -> Result<f64> {
    line.split_whitespace()
        .nth(index)
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| Error::QueryParse {
            line: line.to_string(),
        })
}

pub struct QueryClient<'a> {
    toolkit: &'a ToolkitConfig,
}

impl<'a> QueryClient<'a> {
    pub fn new(toolkit: &'a ToolkitConfig) -> Self {
        Self { toolkit }
    }

    /// Full material query: one `MaterialSample` per input point, in input
    /// order. Header offset is one line.
    pub fn query(
        &self,
        points: &[GeoPoint],
        model: &str,
        mode: QueryMode,
    ) -> Result<Vec<MaterialSample>> {
        let mut cmd = Command::new(self.toolkit.utility_dir().join("run_ucvm_query.sh"));
        cmd.arg("-f")
            .arg(self.toolkit.config_file())
            .arg("-m")
            .arg(model)
            .arg("-c")
            .arg(mode.flag());
        if let Some((zmin, zmax)) = self.toolkit.z_range() {
            cmd.arg("-z").arg(format!("{zmin},{zmax}"));
        }
        if let Some(floors) = self.toolkit.floors() {
            cmd.arg("-L").arg(floors.flag_value());
        }

        let input: String = points.iter().map(GeoPoint::query_line).collect();
        let raw = self.exchange(cmd, &input)?;
        parse_response(&raw, 1, MaterialSample::from_query_line)
    }

    /// Vs30 query over `bin/vs30_query`. 2-column stdin; the value is at
    /// whitespace column 2.
    pub fn vs30(&self, points: &[GeoPoint], model: &str) -> Result<Vec<f64>> {
        let mut cmd = Command::new(self.toolkit.bin_dir().join("vs30_query"));
        cmd.arg("-f")
            .arg(self.toolkit.config_file())
            .arg("-m")
            .arg(model);
        let input: String = points.iter().map(GeoPoint::surface_query_line).collect();
        let raw = self.exchange(cmd, &input)?;
        parse_response(&raw, 0, |line| column(line, 2))
    }

    /// Basin depth at a Vs threshold over `bin/basin_query` (e.g. Z1.0 uses
    /// a threshold of 1000).
    pub fn basin_depth(
        &self,
        points: &[GeoPoint],
        model: &str,
        vs_threshold: f64,
    ) -> Result<Vec<f64>> {
        let mut cmd = Command::new(self.toolkit.bin_dir().join("basin_query"));
        cmd.arg("-f")
            .arg(self.toolkit.config_file())
            .arg("-m")
            .arg(model)
            .arg("-v")
            .arg(format!("{vs_threshold:.0}"));
        let input: String = points.iter().map(GeoPoint::surface_query_line).collect();
        let raw = self.exchange(cmd, &input)?;
        parse_response(&raw, 0, |line| column(line, 2))
    }

    /// Elevation value stored in the etree, column 3 of a default-mode query.
    pub fn elevation_etree(&self, points: &[GeoPoint], model: &str) -> Result<Vec<f64>> {
        let raw = self.default_mode_query(points, model)?;
        parse_response(&raw, 1, |line| column(line, 3))
    }

    /// Vs30 value stored in the etree, column 4 of a default-mode query.
    pub fn vs30_etree(&self, points: &[GeoPoint], model: &str) -> Result<Vec<f64>> {
        let raw = self.default_mode_query(points, model)?;
        parse_response(&raw, 1, |line| column(line, 4))
    }

    fn default_mode_query(&self, points: &[GeoPoint], model: &str) -> Result<String> {
        let mut cmd = Command::new(self.toolkit.utility_dir().join("run_ucvm_query.sh"));
        cmd.arg("-f")
            .arg(self.toolkit.config_file())
            .arg("-m")
            .arg(model);
        let input: String = points.iter().map(GeoPoint::query_line).collect();
        self.exchange(cmd, &input)
    }

    /// Writes the whole request, waits for the process to finish, and
    /// returns the combined stdout+stderr text. The write happens on a
    /// helper thread so a chatty tool cannot deadlock against a full pipe.
    fn exchange(&self, mut cmd: Command, input: &str) -> Result<String> {
        debug!(command = ?cmd, points = input.lines().count(), "spawning query tool");
        let mut child = cmd
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::query_tool(format!("cannot spawn {:?}: {e}", cmd.get_program())))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::query_tool("query tool stdin unavailable"))?;
        let owned_input = input.to_string();
        let writer = std::thread::spawn(move || stdin.write_all(owned_input.as_bytes()));

        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::query_tool("query tool stderr unavailable"))?;
        let err_reader = std::thread::spawn(move || {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf);
            buf
        });

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::query_tool("query tool stdout unavailable"))?;
        let mut output = String::new();
        stdout.read_to_string(&mut output)?;

        let status = child.wait()?;
        let err_text = err_reader.join().unwrap_or_default();
        let write_result = writer.join().unwrap_or(Ok(()));

        if !status.success() {
            let detail = err_text.lines().next().unwrap_or("no diagnostic output");
            return Err(Error::query_tool(format!(
                "query tool exited with {status}: {detail}"
            )));
        }
        // A broken pipe with a zero exit still means the tool ignored input.
        write_result.map_err(|e| Error::query_tool(format!("writing query points failed: {e}")))?;

        // Diagnostics may arrive on either stream; the skip-line filter
        // handles both once they are concatenated.
        if !err_text.is_empty() {
            output.push('\n');
            output.push_str(&err_text);
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MATERIAL_LINE: &str = "-118.00000 34.00000 0.00000 287.997 390.000 \
         cvms 696.491 213.000 1974.976 none 0.000 0.000 0.000 crust \
         696.491 213.000 1974.976";

    #[test]
    fn skip_lines_are_discarded_not_fatal() {
        let raw = format!(
            "Using Geo Depth coordinates as default mode.\n\
             {MATERIAL_LINE}\n\
             WARNING: this model may exhibit slow performance\n\
             {MATERIAL_LINE}\n"
        );
        let records = parse_response(&raw, 1, MaterialSample::from_query_line).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].vp, 696.491);
        assert_eq!(records[0].vs, 213.000);
        assert_eq!(records[0].density, 1974.976);
    }

    #[test]
    fn non_numeric_line_is_fatal() {
        let raw = format!(
            "header line\n\
             {MATERIAL_LINE}\n\
             model cvmx not found\n"
        );
        let err = parse_response(&raw, 1, MaterialSample::from_query_line).unwrap_err();
        assert!(matches!(err, Error::QueryParse { .. }));
        assert!(err.to_string().contains("cvmx"));
    }

    #[test]
    fn empty_response_is_fatal() {
        let raw = "header line\nWARNING: nothing to report\n";
        let err = parse_response(raw, 1, MaterialSample::from_query_line).unwrap_err();
        assert!(matches!(err, Error::EmptyResponse));
    }

    #[test]
    fn surface_query_column_2() {
        let raw = "-118.00000 34.00000 390.000\n-117.90000 34.00000 395.500\n";
        let values = parse_response(raw, 0, |line| column(line, 2)).unwrap();
        assert_eq!(values, vec![390.0, 395.5]);
    }

    #[test]
    fn header_offset_trims_leading_diagnostics() {
        // The first post-offset line may itself be a skip-line; both the
        // offset and the filter must cooperate.
        let raw = format!("Using Geo Depth coordinates as default mode.\n{MATERIAL_LINE}\n");
        let records = parse_response(&raw, 1, MaterialSample::from_query_line).unwrap();
        assert_eq!(records.len(), 1);
    }
}
