//! # synt-algo: Syntheses of Hydrothermal Dispatch Results
//!
//! This crate turns the parsed result files of one case into the normalized
//! tables exported by the `synt` command line.
//!
//! ## Pipeline
//!
//! | Layer | Module | Role |
//! |-------|--------|------|
//! | Deck facade | [`deck`] | Derived datasets, one cache per run |
//! | Classifier | [`infeasibility`] | Violation log to typed records |
//! | Bounds | [`bounds`] | Physical limits of the bounded plant variables |
//! | Engine | [`operation`] | Dependency-aware resolution, statistics, metadata |
//!
//! The subcommands share the [`Synthesizer`] trait:
//!
//! - [`SystemSynthesizer`]: registration tables (`EST`, `PAT`, `SBM`, `REE`, `UTE`, `UHE`)
//! - [`ExecutionSynthesizer`]: program, convergence, timing, costs and violations
//! - [`ScenarioSynthesizer`]: scenario probabilities
//! - [`OperationSynthesizer`]: `VAR_RES` operation syntheses
//!
//! ## Example
//!
//! ```ignore
//! use synt_algo::{Deck, OperationSynthesizer, Synthesizer};
//! use synt_io::{DirectoryExporter, DirectoryRepository, OutputFormat};
//!
//! let mut deck = Deck::new(DirectoryRepository::open(".")?);
//! let mut exporter = DirectoryExporter::new("sintese", OutputFormat::Parquet);
//! let tokens = vec!["EARPF_SIN".to_string()];
//! let report = OperationSynthesizer::new(&mut deck).synthesize(&tokens, &mut exporter)?;
//! ```

pub mod bounds;
pub mod deck;
pub mod execution;
pub mod infeasibility;
pub mod operation;
pub mod scenario;
pub mod synthesizer;
pub mod system;
pub mod test_utils;

pub use bounds::{attach_bounds, Bounds, BoundSources};
pub use deck::{Calendar, Dataset, Deck, FlowConstraint, HydroPlant};
pub use execution::{ExecutionSynthesizer, EXECUTION_SYNTHESES};
pub use infeasibility::{classify, ClassifierContext, ViolationRecord};
pub use operation::{
    OperationSynthesizer, ScenarioWeights, SynthesisCache, SynthesisFrame, SynthesisRow,
};
pub use scenario::{ScenarioSynthesizer, SCENARIO_SYNTHESES};
pub use synthesizer::{SynthesisReport, Synthesizer};
pub use system::{SystemSynthesizer, SYSTEM_SYNTHESES};
