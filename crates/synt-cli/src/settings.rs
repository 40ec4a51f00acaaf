//! Settings of the `synt` binary.
//! Read from `<install dir>/synt.toml`, then `<case dir>/synt.toml`.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use synt_io::OutputFormat;

pub const SETTINGS_FILE: &str = "synt.toml";
pub const INSTALL_DIR_VAR: &str = "SYNT_INSTALLDIR";
pub const BASE_DIR_VAR: &str = "SYNT_DIR";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Output directory, relative to the case directory
    #[serde(default = "default_synthesis_dir")]
    pub synthesis_dir: String,
    #[serde(default)]
    pub format: OutputFormat,
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            synthesis_dir: default_synthesis_dir(),
            format: OutputFormat::default(),
            log_level: default_log_level(),
        }
    }
}

fn default_synthesis_dir() -> String {
    "sintese".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// One settings file; absent fields leave the layer below untouched.
#[derive(Debug, Clone, Default, Deserialize)]
struct SettingsLayer {
    synthesis_dir: Option<String>,
    format: Option<OutputFormat>,
    log_level: Option<String>,
}

impl Settings {
    /// Defaults, overridden by the install file, overridden by the case file.
    pub fn load(install_dir: Option<&Path>, base_dir: &Path) -> Result<Settings> {
        let mut settings = Settings::default();
        if let Some(dir) = install_dir {
            settings.apply(read_layer(&dir.join(SETTINGS_FILE))?);
        }
        settings.apply(read_layer(&base_dir.join(SETTINGS_FILE))?);
        Ok(settings)
    }

    fn apply(&mut self, layer: Option<SettingsLayer>) {
        let Some(layer) = layer else {
            return;
        };
        if let Some(dir) = layer.synthesis_dir {
            self.synthesis_dir = dir;
        }
        if let Some(format) = layer.format {
            self.format = format;
        }
        if let Some(level) = layer.log_level {
            self.log_level = level;
        }
    }

    pub fn log_level(&self) -> Result<tracing::Level> {
        self.log_level
            .parse()
            .map_err(|_| anyhow!("invalid log level '{}' in settings", self.log_level))
    }

    /// Output directory for a case in `base_dir`.
    pub fn synthesis_path(&self, base_dir: &Path) -> PathBuf {
        base_dir.join(&self.synthesis_dir)
    }
}

fn read_layer(path: &Path) -> Result<Option<SettingsLayer>> {
    if !path.is_file() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading settings '{}'", path.display()))?;
    let layer = toml::from_str(&contents)
        .with_context(|| format!("parsing settings '{}'", path.display()))?;
    Ok(Some(layer))
}

/// `$SYNT_INSTALLDIR`, else `~/.synt`.
pub fn install_dir() -> Option<PathBuf> {
    env::var_os(INSTALL_DIR_VAR)
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|home| home.join(".synt")))
}

/// `--diretorio`, else `$SYNT_DIR`, else the current directory.
pub fn base_dir(flag: Option<&Path>) -> PathBuf {
    flag.map(Path::to_path_buf)
        .or_else(|| env::var_os(BASE_DIR_VAR).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn missing_files_mean_defaults() {
        let base = tempdir().unwrap();
        let settings = Settings::load(None, base.path()).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.log_level().unwrap(), tracing::Level::INFO);
        assert_eq!(settings.synthesis_path(base.path()), base.path().join("sintese"));
    }

    #[test]
    fn case_file_overrides_install_file_field_by_field() {
        let install = tempdir().unwrap();
        let base = tempdir().unwrap();
        fs::write(
            install.path().join(SETTINGS_FILE),
            "synthesis_dir = \"saida\"\nformat = \"csv\"\n",
        )
        .unwrap();
        fs::write(base.path().join(SETTINGS_FILE), "format = \"parquet\"\nlog_level = \"warn\"\n")
            .unwrap();

        let settings = Settings::load(Some(install.path()), base.path()).unwrap();
        assert_eq!(settings.synthesis_dir, "saida");
        assert_eq!(settings.format, OutputFormat::Parquet);
        assert_eq!(settings.log_level().unwrap(), tracing::Level::WARN);
    }

    #[test]
    fn malformed_files_are_errors() {
        let base = tempdir().unwrap();
        fs::write(base.path().join(SETTINGS_FILE), "format = \"xlsx\"\n").unwrap();
        assert!(Settings::load(None, base.path()).is_err());
    }

    #[test]
    fn flag_wins_over_environment() {
        assert_eq!(base_dir(Some(Path::new("/caso"))), PathBuf::from("/caso"));
    }
}
