//! # synt-io: Deck Files and Exported Syntheses
//!
//! Two boundaries of the synthesis pipeline live here:
//!
//! - [`repository`] - parsed result files of one case, read at most once
//! - [`export`] - where synthesized tables are written and read back
//!
//! [`frame`] holds the column helpers that turn loosely typed parsed tables
//! into plain vectors.

pub mod export;
pub mod frame;
pub mod repository;

pub use export::{DirectoryExporter, Exporter, MemoryExporter, OutputFormat};
pub use repository::{
    DirectoryRepository, FileKind, FileRepository, MemoryRepository, ParsedFile, CASE_FILE,
    MANIFEST_FILE,
};
