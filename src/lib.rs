//! A static taint-tracking analyzer for PHP source code.
//!
//! Re-exports the workspace's four crates so a consumer can depend on the
//! root package alone, mirroring the teacher repo's own root crate.

pub use taint_ast as ast;
pub use taint_cli as cli;
pub use taint_core as core;
pub use taint_dataflow as dataflow;

pub use taint_core::{AnalysisError, Finding, RepairFunctions, Result, ScanConfig, Verdict, VerdictCode};
pub use taint_dataflow::{analyse_params, scan_parser};
