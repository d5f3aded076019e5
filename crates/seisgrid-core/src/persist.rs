//! Persisted grid artifacts.
//!
//! A slice produces a pair of files sharing a basename stem: the numeric
//! array (self-describing NPY subset by default) and a JSON metadata object.
//! Two legacy array encodings are read-only: a flat little-endian float32
//! stream (`.binary`) and one-float-per-line ASCII (`.raw`).

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::grid::ScalarGrid;

/// How a persisted array is encoded. Decided once from the user-supplied
/// filename at the call boundary, never re-derived downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataFormat {
    /// Self-describing array (shape + dtype header, then the data).
    #[default]
    Npy,
    /// Flat float32 stream, no header; element count is trusted from the
    /// metadata. Falls back to float64 when the count is off by exactly 2x.
    LegacyFloat32,
    /// One float per line, ASCII.
    RawAscii,
}

impl DataFormat {
    pub fn from_name(name: &str) -> DataFormat {
        if name.rfind(".binary").is_some() {
            DataFormat::LegacyFloat32
        } else if name.rfind(".raw").is_some() {
            DataFormat::RawAscii
        } else {
            DataFormat::Npy
        }
    }

    fn data_suffix(&self) -> &'static str {
        match self {
            DataFormat::Npy => "_data.bin",
            DataFormat::LegacyFloat32 => "_data.binary",
            DataFormat::RawAscii => "_data.raw",
        }
    }
}

/// Maps a logical output name (often a `.png` plot path) to a sibling
/// artifact name: a trailing `.png` is replaced by the suffix, anything
/// else gets the suffix appended.
fn sibling_path(name: &str, suffix: &str) -> PathBuf {
    match name.rfind(".png") {
        Some(k) => PathBuf::from(format!("{}{}", &name[..k], suffix)),
        None => PathBuf::from(format!("{name}{suffix}")),
    }
}

pub fn data_path(name: &str, format: DataFormat) -> PathBuf {
    sibling_path(name, format.data_suffix())
}

pub fn meta_path(name: &str) -> PathBuf {
    sibling_path(name, "_meta.json")
}

pub fn matprops_path(name: &str) -> PathBuf {
    sibling_path(name, "_matprops.json")
}

pub fn velocity_path(name: &str) -> PathBuf {
    sibling_path(name, "_data.json")
}

/// Writes the grid as an NPY array, shape `(num_y, num_x)`, dtype `<f4`.
pub fn write_grid(path: &Path, grid: &ScalarGrid) -> Result<()> {
    let file = File::create(path)?;
    let mut w = BufWriter::new(file);
    npy::write(&mut w, grid.values(), grid.num_y(), grid.num_x())?;
    w.flush()?;
    info!(path = %path.display(), datapoints = grid.len(), "wrote grid data");
    Ok(())
}

/// Reads a persisted array in the given format and validates the element
/// count against the declared shape. A mismatch is fatal; grids are never
/// truncated or padded.
pub fn read_grid_data(
    path: &Path,
    format: DataFormat,
    num_x: usize,
    num_y: usize,
) -> Result<Vec<f32>> {
    let expected = num_x * num_y;
    let values = match format {
        DataFormat::Npy => {
            let file = File::open(path)?;
            let (values, _shape) = npy::read(&mut BufReader::new(file))?;
            values
        }
        DataFormat::LegacyFloat32 => read_legacy_float32(path, expected)?,
        DataFormat::RawAscii => read_raw_ascii(path)?,
    };
    debug!(path = %path.display(), count = values.len(), "read grid data");
    if values.len() != expected {
        return Err(Error::ShapeMismatch {
            actual: values.len(),
            expected,
            num_x,
            num_y,
        });
    }
    Ok(values)
}

fn read_legacy_float32(path: &Path, expected: usize) -> Result<Vec<f32>> {
    let mut bytes = Vec::new();
    File::open(path)?.read_to_end(&mut bytes)?;
    if bytes.len() % 4 != 0 {
        return Err(Error::BadArrayFile {
            message: format!(
                "{} is not a float stream ({} bytes)",
                path.display(),
                bytes.len()
            ),
        });
    }
    // Some older exports wrote float64; the count being exactly double gives
    // them away.
    if bytes.len() / 8 == expected && bytes.len() % 8 == 0 {
        return Ok(bytes
            .chunks_exact(8)
            .map(|c| f64::from_le_bytes(c.try_into().expect("chunk of 8")) as f32)
            .collect());
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes(c.try_into().expect("chunk of 4")))
        .collect())
}

fn read_raw_ascii(path: &Path) -> Result<Vec<f32>> {
    let reader = BufReader::new(File::open(path)?);
    let mut values = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let Some(token) = line.split_whitespace().next() else {
            continue;
        };
        let v = token.parse::<f32>().map_err(|_| Error::BadArrayFile {
            message: format!("{}: non-numeric line: {line}", path.display()),
        })?;
        values.push(v);
    }
    Ok(values)
}

/// Minimal NPY v1.0 codec: little-endian f4/f8, C order, 1-D or 2-D shape.
mod npy {
    use super::*;

    const MAGIC: &[u8] = b"\x93NUMPY";

    pub fn write<W: Write>(w: &mut W, values: &[f32], num_y: usize, num_x: usize) -> Result<()> {
        let mut header = format!(
            "{{'descr': '<f4', 'fortran_order': False, 'shape': ({num_y}, {num_x}), }}"
        );
        // Pad so magic + version + length field + header is 64-byte aligned,
        // with a closing newline.
        let unpadded = MAGIC.len() + 2 + 2 + header.len() + 1;
        let pad = (64 - unpadded % 64) % 64;
        header.extend(std::iter::repeat_n(' ', pad));
        header.push('\n');

        w.write_all(MAGIC)?;
        w.write_all(&[1, 0])?;
        w.write_all(&(header.len() as u16).to_le_bytes())?;
        w.write_all(header.as_bytes())?;
        for v in values {
            w.write_all(&v.to_le_bytes())?;
        }
        Ok(())
    }

    pub fn read<R: Read>(r: &mut R) -> Result<(Vec<f32>, Vec<usize>)> {
        let bad = |message: String| Error::BadArrayFile { message };

        let mut magic = [0u8; 8];
        r.read_exact(&mut magic)?;
        if &magic[..6] != MAGIC {
            return Err(bad("missing NPY magic".to_string()));
        }
        if magic[6] != 1 {
            return Err(bad(format!("unsupported NPY version {}", magic[6])));
        }
        let mut len = [0u8; 2];
        r.read_exact(&mut len)?;
        let header_len = u16::from_le_bytes(len) as usize;
        let mut header = vec![0u8; header_len];
        r.read_exact(&mut header)?;
        let header = String::from_utf8(header).map_err(|_| bad("non-UTF8 header".to_string()))?;

        let descr = dict_field(&header, "descr")
            .ok_or_else(|| bad(format!("no descr in header: {header}")))?;
        let f64_data = match descr.trim_matches(['\'', '"']) {
            "<f4" => false,
            "<f8" => true,
            other => return Err(bad(format!("unsupported dtype {other}"))),
        };
        if dict_field(&header, "fortran_order").is_some_and(|v| v.contains("True")) {
            return Err(bad("fortran-order arrays are not supported".to_string()));
        }
        let shape_text = dict_field(&header, "shape")
            .ok_or_else(|| bad(format!("no shape in header: {header}")))?;
        let shape: Vec<usize> = shape_text
            .trim_matches(['(', ')'])
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<usize>()
                    .map_err(|_| bad(format!("bad shape: {shape_text}")))
            })
            .collect::<Result<_>>()?;
        let count: usize = shape.iter().product();

        let mut data = Vec::new();
        r.read_to_end(&mut data)?;
        let width = if f64_data { 8 } else { 4 };
        if data.len() != count * width {
            return Err(bad(format!(
                "payload is {} bytes, shape {shape_text} needs {}",
                data.len(),
                count * width
            )));
        }
        let values = if f64_data {
            data.chunks_exact(8)
                .map(|c| f64::from_le_bytes(c.try_into().expect("chunk of 8")) as f32)
                .collect()
        } else {
            data.chunks_exact(4)
                .map(|c| f32::from_le_bytes(c.try_into().expect("chunk of 4")))
                .collect()
        };
        Ok((values, shape))
    }

    /// Pulls `'key': value` out of the python-dict header literal.
    fn dict_field<'h>(header: &'h str, key: &str) -> Option<&'h str> {
        let needle = format!("'{key}':");
        let at = header.find(&needle)? + needle.len();
        let rest = header[at..].trim_start();
        let end = if rest.starts_with('(') {
            rest.find(')')? + 1
        } else {
            rest.find([',', '}'])?
        };
        Some(rest[..end].trim())
    }
}

/// Insertion-ordered JSON metadata written next to the grid data.
///
/// Key order is preserved exactly as inserted so the artifact stays
/// readable; nothing is alphabetized.
#[derive(Debug, Clone, Default)]
pub struct GridMetadata {
    fields: IndexMap<String, Value>,
}

impl GridMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn as_map(&self) -> &IndexMap<String, Value> {
        &self.fields
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        let mut w = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut w, &self.fields)?;
        w.flush()?;
        info!(path = %path.display(), "wrote grid metadata");
        Ok(())
    }

    pub fn read(path: &Path) -> Result<GridMetadata> {
        let file = File::open(path)?;
        let fields = serde_json::from_reader(BufReader::new(file))?;
        Ok(GridMetadata { fields })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct MatPropsDoc {
    matprops: Vec<MatPropsRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct MatPropsRecord {
    vp: f64,
    vs: f64,
    density: f64,
}

/// Material-property triples as JSON, `{"matprops": [{vp, vs, density}..]}`.
pub fn write_matprops(path: &Path, samples: &[crate::material::MaterialSample]) -> Result<()> {
    let doc = MatPropsDoc {
        matprops: samples
            .iter()
            .map(|s| MatPropsRecord {
                vp: s.vp,
                vs: s.vs,
                density: s.density,
            })
            .collect(),
    };
    let file = File::create(path)?;
    let mut w = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut w, &doc)?;
    w.flush()?;
    Ok(())
}

pub fn read_matprops(path: &Path) -> Result<Vec<crate::material::MaterialSample>> {
    let file = File::open(path)?;
    let doc: MatPropsDoc = serde_json::from_reader(BufReader::new(file))?;
    Ok(doc
        .matprops
        .into_iter()
        .map(|r| crate::material::MaterialSample::new(r.vp, r.vs, r.density))
        .collect())
}

#[derive(Debug, Serialize)]
struct VelocityDoc<'a> {
    vs: &'a [f64],
    vp: &'a [f64],
    rho: &'a [f64],
}

/// Velocity triple lists as JSON, `{"vs": [...], "vp": [...], "rho": [...]}`.
pub fn write_velocity(path: &Path, vs: &[f64], vp: &[f64], rho: &[f64]) -> Result<()> {
    let file = File::create(path)?;
    let mut w = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut w, &VelocityDoc { vs, vp, rho })?;
    w.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_naming_replaces_png_suffix() {
        assert_eq!(
            data_path("slice.png", DataFormat::Npy),
            PathBuf::from("slice_data.bin")
        );
        assert_eq!(meta_path("slice.png"), PathBuf::from("slice_meta.json"));
        assert_eq!(
            data_path("slice.png", DataFormat::RawAscii),
            PathBuf::from("slice_data.raw")
        );
    }

    #[test]
    fn artifact_naming_appends_without_png() {
        assert_eq!(
            data_path("cross_section_a", DataFormat::Npy),
            PathBuf::from("cross_section_a_data.bin")
        );
        assert_eq!(
            meta_path("cross_section_a"),
            PathBuf::from("cross_section_a_meta.json")
        );
    }

    #[test]
    fn format_is_selected_from_the_filename_once() {
        assert_eq!(
            DataFormat::from_name("x_data.binary"),
            DataFormat::LegacyFloat32
        );
        assert_eq!(DataFormat::from_name("x_data.raw"), DataFormat::RawAscii);
        assert_eq!(DataFormat::from_name("x_data.bin"), DataFormat::Npy);
    }

    #[test]
    fn npy_round_trip() {
        let grid = ScalarGrid::from_values(vec![1.5, -2.0, 3.25, 0.0, 7.0, 8.5], 3, 2).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid_data.bin");
        write_grid(&path, &grid).unwrap();

        let values = read_grid_data(&path, DataFormat::Npy, 3, 2).unwrap();
        assert_eq!(values, grid.values());

        let file = File::open(&path).unwrap();
        let (_, shape) = npy::read(&mut BufReader::new(file)).unwrap();
        assert_eq!(shape, vec![2, 3]);
    }

    #[test]
    fn npy_header_is_aligned() {
        let mut buf = Vec::new();
        npy::write(&mut buf, &[0.0f32; 6], 2, 3).unwrap();
        // Data starts on a 64-byte boundary.
        assert_eq!((buf.len() - 6 * 4) % 64, 0);
        assert_eq!(&buf[..6], b"\x93NUMPY");
    }

    #[test]
    fn legacy_float32_and_f64_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x_data.binary");

        let mut bytes = Vec::new();
        for v in [1.0f32, 2.0, 3.0, 4.0] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        std::fs::write(&path, &bytes).unwrap();
        let values = read_grid_data(&path, DataFormat::LegacyFloat32, 2, 2).unwrap();
        assert_eq!(values, vec![1.0, 2.0, 3.0, 4.0]);

        // The same grid written as f64 holds twice the bytes.
        let mut wide = Vec::new();
        for v in [1.0f64, 2.0, 3.0, 4.0] {
            wide.extend_from_slice(&v.to_le_bytes());
        }
        std::fs::write(&path, &wide).unwrap();
        let values = read_grid_data(&path, DataFormat::LegacyFloat32, 2, 2).unwrap();
        assert_eq!(values, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn raw_ascii_one_float_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x_data.raw");
        std::fs::write(&path, "1.5\n2.5\n3.5\n4.5\n").unwrap();
        let values = read_grid_data(&path, DataFormat::RawAscii, 2, 2).unwrap();
        assert_eq!(values, vec![1.5, 2.5, 3.5, 4.5]);
    }

    #[test]
    fn count_mismatch_is_fatal_never_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x_data.raw");
        std::fs::write(&path, "1.0\n2.0\n3.0\n").unwrap();
        let err = read_grid_data(&path, DataFormat::RawAscii, 2, 2).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn metadata_preserves_insertion_order() {
        let mut meta = GridMetadata::new();
        meta.insert("title", "test slice");
        meta.insert("cvm", "cvms5");
        meta.insert("num_x", 3);
        meta.insert("num_y", 2);
        let text = serde_json::to_string(meta.as_map()).unwrap();
        let title_at = text.find("title").unwrap();
        let cvm_at = text.find("cvm").unwrap();
        let num_x_at = text.find("num_x").unwrap();
        assert!(title_at < cvm_at && cvm_at < num_x_at);
    }

    #[test]
    fn metadata_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slice_meta.json");
        let mut meta = GridMetadata::new();
        meta.insert("num_x", 3);
        meta.insert("lon_list", vec![-118.0, -117.5, -117.0]);
        meta.write(&path).unwrap();

        let back = GridMetadata::read(&path).unwrap();
        assert_eq!(back.get("num_x"), Some(&Value::from(3)));
        assert_eq!(
            back.get("lon_list"),
            Some(&Value::from(vec![-118.0, -117.5, -117.0]))
        );
    }

    #[test]
    fn matprops_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x_matprops.json");
        let samples = vec![
            crate::material::MaterialSample::new(1500.0, 800.0, 2.25),
            crate::material::MaterialSample::new(1600.0, 900.0, 2.5),
        ];
        write_matprops(&path, &samples).unwrap();
        let back = read_matprops(&path).unwrap();
        assert_eq!(back, samples);
    }
}
