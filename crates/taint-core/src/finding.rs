//! The unit of output returned from a scan.

use crate::verdict::VerdictCode;
use serde::{Deserialize, Serialize};

/// A single reported flow from a source expression to a sink. Only
/// verdicts with `code > 0` ever become a `Finding` — see
/// [`VerdictCode::is_positive`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub code: VerdictCode,
    pub source: String,
    pub source_line: u32,
    pub sink: String,
    pub sink_param: String,
    pub sink_line: u32,
}

impl Finding {
    pub fn new(
        code: VerdictCode,
        source: impl Into<String>,
        source_line: u32,
        sink: impl Into<String>,
        sink_param: impl Into<String>,
        sink_line: u32,
    ) -> Self {
        Self {
            code,
            source: source.into(),
            source_line,
            sink: sink.into(),
            sink_param: sink_param.into(),
            sink_line,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finding_round_trips_through_json() {
        let finding = Finding::new(VerdictCode::Controlled, "$_GET", 1, "eval", "$x", 1);
        let json = serde_json::to_string(&finding).unwrap();
        let back: Finding = serde_json::from_str(&json).unwrap();
        assert_eq!(finding, back);
    }
}
