//! Output side of a run: named tables written as Parquet or CSV.
//!
//! [`DirectoryExporter`] keeps one file per table under the synthesis
//! directory and can read a table back, which is how later runs merge into
//! earlier ones. [`MemoryExporter`] holds frames in a map.

use anyhow::{anyhow, Context, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Parquet,
    Csv,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Parquet => "parquet",
            OutputFormat::Csv => "csv",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "parquet" => Ok(OutputFormat::Parquet),
            "csv" => Ok(OutputFormat::Csv),
            other => Err(anyhow!("unsupported output format '{other}'")),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Destination of exported syntheses, addressed by name ("CMO_SBM").
pub trait Exporter {
    fn write(&mut self, name: &str, df: &mut DataFrame) -> Result<()>;

    /// Previously written content of `name`, if any.
    fn read(&self, name: &str) -> Result<Option<DataFrame>>;

    /// Removes everything written so far.
    fn clean(&mut self) -> Result<()>;
}

/// Writes one file per synthesis under a directory.
#[derive(Debug, Clone)]
pub struct DirectoryExporter {
    dir: PathBuf,
    format: OutputFormat,
}

impl DirectoryExporter {
    pub fn new(dir: impl Into<PathBuf>, format: OutputFormat) -> Self {
        DirectoryExporter {
            dir: dir.into(),
            format,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{}", self.format.extension()))
    }
}

impl Exporter for DirectoryExporter {
    fn write(&mut self, name: &str, df: &mut DataFrame) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating output directory '{}'", self.dir.display()))?;
        let path = self.path_for(name);
        let mut file = File::create(&path)
            .with_context(|| format!("creating output '{}'", path.display()))?;
        match self.format {
            OutputFormat::Parquet => {
                ParquetWriter::new(&mut file)
                    .finish(df)
                    .context("writing Parquet output")?;
            }
            OutputFormat::Csv => {
                CsvWriter::new(&mut file)
                    .finish(df)
                    .context("writing CSV output")?;
            }
        }
        debug!(path = %path.display(), rows = df.height(), "exported synthesis");
        Ok(())
    }

    fn read(&self, name: &str) -> Result<Option<DataFrame>> {
        let path = self.path_for(name);
        if !path.is_file() {
            return Ok(None);
        }
        let file =
            File::open(&path).with_context(|| format!("opening '{}'", path.display()))?;
        let df = match self.format {
            OutputFormat::Parquet => ParquetReader::new(file).finish(),
            OutputFormat::Csv => CsvReader::new(file).has_header(true).finish(),
        }
        .with_context(|| format!("reading '{}'", path.display()))?;
        Ok(Some(df))
    }

    fn clean(&mut self) -> Result<()> {
        if self.dir.is_dir() {
            fs::remove_dir_all(&self.dir)
                .with_context(|| format!("removing '{}'", self.dir.display()))?;
            info!(dir = %self.dir.display(), "removed synthesis directory");
        }
        Ok(())
    }
}

/// Keeps exported frames in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryExporter {
    frames: BTreeMap<String, DataFrame>,
}

impl MemoryExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&DataFrame> {
        self.frames.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.frames.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl Exporter for MemoryExporter {
    fn write(&mut self, name: &str, df: &mut DataFrame) -> Result<()> {
        self.frames.insert(name.to_string(), df.clone());
        Ok(())
    }

    fn read(&self, name: &str) -> Result<Option<DataFrame>> {
        Ok(self.frames.get(name).cloned())
    }

    fn clean(&mut self) -> Result<()> {
        self.frames.clear();
        Ok(())
    }
}
