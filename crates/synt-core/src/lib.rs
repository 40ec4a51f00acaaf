//! # synt-core: Synthesis Vocabulary
//!
//! Domain types shared by the deck reader, the synthesis engine and the CLI
//! that post-processes hydrothermal dispatch results.
//!
//! ## Synthesis keys
//!
//! A synthesis is a derived table of one physical quantity at one level of
//! spatial aggregation:
//!
//! ```rust
//! use synt_core::{OperationSynthesis, SpatialResolution, Variable};
//!
//! let key = OperationSynthesis::parse("EARPF_SIN").unwrap();
//! assert_eq!(key.variable, Variable::Earpf);
//! assert_eq!(key.resolution, SpatialResolution::Sin);
//!
//! // System-level percentage storage is recomputed from submarket storage.
//! let expanded = synt_core::dependencies::expand(&[key]);
//! assert_eq!(expanded[0].to_string(), "EARMF_SBM");
//! ```
//!
//! ## Modules
//!
//! - [`synthesis`] - `Variable`, `SpatialResolution` and `OperationSynthesis`
//! - [`dependencies`] - static dependency table and execution ordering
//! - [`units`] - physical unit of each synthesis
//! - [`version`] - schema versions declared by result files
//! - [`infeasibility`] - constraint-violation records and message parsing
//! - [`columns`] - column names of parsed and exported tables
//! - [`error`] - [`SyntError`] and [`SyntResult`]

pub mod columns;
pub mod dependencies;
pub mod error;
pub mod infeasibility;
pub mod synthesis;
pub mod units;
pub mod version;

pub use error::{SyntError, SyntResult};
pub use infeasibility::{
    parse_violation, BoundSide, ClassificationError, Infeasibility, InfeasibilityKind,
    ViolationMessage, FINAL_SIMULATION_ITERATION,
};
pub use synthesis::{OperationSynthesis, SpatialResolution, Variable};
pub use units::{unit, Unit};
pub use version::{SchemaVersion, LEGACY_NODE_NUMBERING};
