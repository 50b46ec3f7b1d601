//! Shared primitives for the PHP taint analyzer: error taxonomy, tunables,
//! verdict codes, findings and per-scan configuration. No AST knowledge
//! lives here — that is `taint-ast`'s job.

pub mod config;
pub mod constants;
pub mod error;
pub mod finding;
pub mod verdict;

pub use config::{RepairFunctions, ScanConfig};
pub use constants::{is_controllable, CONTROLLABLE_SUPERGLOBALS, MAX_ANALYSIS_DEPTH, NOT_FOUND};
pub use error::{AnalysisError, Result};
pub use finding::Finding;
pub use verdict::{Verdict, VerdictCode};
