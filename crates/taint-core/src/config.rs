//! Per-scan configuration.
//!
//! The repair-function list is explicit, per-invocation configuration —
//! never long-lived process state. A scan that wants a different repair
//! list builds a new [`ScanConfig`]; nothing here is mutated after
//! construction.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Functions whose return value is considered sanitized. Any assignment
/// whose right-hand side is a call to one of these short-circuits the
/// tracer to `REPAIRED`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepairFunctions(Vec<String>);

impl RepairFunctions {
    pub fn new(names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self(names.into_iter().map(Into::into).collect())
    }

    pub fn is_repair(&self, name: &str) -> bool {
        self.0.iter().any(|candidate| candidate == name)
    }
}

impl<S: Into<String>> FromIterator<S> for RepairFunctions {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self::new(iter)
    }
}

/// The inputs to a single `scan_parser` invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    pub sinks: Vec<String>,
    pub sink_line: u32,
    pub file_path: PathBuf,
    pub repair_functions: RepairFunctions,
}

impl ScanConfig {
    pub fn new(
        sinks: impl IntoIterator<Item = impl Into<String>>,
        sink_line: u32,
        file_path: impl Into<PathBuf>,
        repair_functions: RepairFunctions,
    ) -> Self {
        Self {
            sinks: sinks.into_iter().map(Into::into).collect(),
            sink_line,
            file_path: file_path.into(),
            repair_functions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repair_functions_matches_by_name() {
        let repairs = RepairFunctions::new(["htmlspecialchars", "intval"]);
        assert!(repairs.is_repair("htmlspecialchars"));
        assert!(!repairs.is_repair("addslashes"));
    }

    #[test]
    fn empty_repair_list_never_matches() {
        let repairs = RepairFunctions::default();
        assert!(!repairs.is_repair("htmlspecialchars"));
    }
}
