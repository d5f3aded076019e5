use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Per-property floor values passed to the query tool with `-L`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Floors {
    pub vs: f64,
    pub vp: f64,
    pub density: f64,
}

impl Floors {
    pub(crate) fn flag_value(&self) -> String {
        format!("{},{},{}", self.vs, self.vp, self.density)
    }
}

/// Where the velocity-model toolkit is installed and how to invoke it.
///
/// Constructed once at startup (the CLI resolves `UCVM_INSTALL_PATH` there
/// if no explicit directory is given) and passed by reference into every
/// query. Library code never consults the environment.
#[derive(Debug, Clone)]
pub struct ToolkitConfig {
    install_dir: PathBuf,
    config_file: PathBuf,
    z_range: Option<(f64, f64)>,
    floors: Option<Floors>,
}

impl ToolkitConfig {
    pub fn new(install_dir: impl Into<PathBuf>) -> Self {
        let install_dir = install_dir.into();
        let config_file = install_dir.join("conf/ucvm.conf");
        Self {
            install_dir,
            config_file,
            z_range: None,
            floors: None,
        }
    }

    pub fn with_config_file(mut self, config_file: impl Into<PathBuf>) -> Self {
        self.config_file = config_file.into();
        self
    }

    /// Custom z-range passed to the query tool as `-z zmin,zmax`.
    pub fn with_z_range(mut self, zmin: f64, zmax: f64) -> Self {
        self.z_range = Some((zmin, zmax));
        self
    }

    pub fn with_floors(mut self, floors: Floors) -> Self {
        self.floors = Some(floors);
        self
    }

    pub fn install_dir(&self) -> &Path {
        &self.install_dir
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.install_dir.join("bin")
    }

    pub fn utility_dir(&self) -> PathBuf {
        self.install_dir.join("utilities")
    }

    pub fn z_range(&self) -> Option<(f64, f64)> {
        self.z_range
    }

    pub fn floors(&self) -> Option<Floors> {
        self.floors
    }

    /// The models installed under `<install>/model`, minus the toolkit's own
    /// support directory.
    pub fn installed_models(&self) -> Result<Vec<String>> {
        let model_dir = self.install_dir.join("model");
        let entries = std::fs::read_dir(&model_dir).map_err(|e| {
            Error::config(format!(
                "cannot list models under {}: {e}",
                model_dir.display()
            ))
        })?;
        let mut models = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if name != "ucvm" {
                models.push(name);
            }
        }
        models.sort();
        Ok(models)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_file_defaults_under_install_dir() {
        let cfg = ToolkitConfig::new("/opt/ucvm");
        assert_eq!(cfg.config_file(), Path::new("/opt/ucvm/conf/ucvm.conf"));
        assert_eq!(cfg.bin_dir(), PathBuf::from("/opt/ucvm/bin"));
        assert_eq!(cfg.utility_dir(), PathBuf::from("/opt/ucvm/utilities"));
    }

    #[test]
    fn floors_flag_value() {
        let floors = Floors {
            vs: 500.0,
            vp: 1700.0,
            density: 1.7,
        };
        assert_eq!(floors.flag_value(), "500,1700,1.7");
    }
}
