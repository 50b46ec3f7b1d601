//! Verdict codes and the outcome of a single tracer call.

use serde::{Deserialize, Serialize};

/// Outcome of tracing a single tracked symbol back to its origin.
///
/// Strength order (highest wins when merging branch outcomes) does *not*
/// follow the numeric discriminant: `CONTROLLED > NEW_RULE > REPAIRED >
/// UNKNOWN > UNCONTROLLED`. Use [`VerdictCode::strength`] to compare, never
/// the raw `i8` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i8)]
pub enum VerdictCode {
    Uncontrolled = -1,
    Controlled = 1,
    Repaired = 2,
    Unknown = 3,
    NewRule = 4,
}

impl VerdictCode {
    /// Rank used to merge verdicts from sibling branches (if/elseif/else,
    /// for, the elements of a binary-op or array literal). Higher wins.
    pub fn strength(self) -> u8 {
        match self {
            VerdictCode::Controlled => 4,
            VerdictCode::NewRule => 3,
            VerdictCode::Repaired => 2,
            VerdictCode::Unknown => 1,
            VerdictCode::Uncontrolled => 0,
        }
    }

    /// `code > 0`. Note this is true for `Unknown` (3) too: an unresolved
    /// `$`-variable that the tracer never pins down to a superglobal or a
    /// constant is still reported, matching the conservative original
    /// behavior rather than silently dropping unresolved flows.
    pub fn is_positive(self) -> bool {
        (self as i8) > 0
    }

    pub fn strongest(self, other: Self) -> Self {
        if other.strength() > self.strength() {
            other
        } else {
            self
        }
    }
}

/// The return value of every tracer call: a verdict code plus the origin
/// expression description and its source line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub code: VerdictCode,
    pub origin: String,
    pub origin_line: u32,
}

impl Verdict {
    pub fn new(code: VerdictCode, origin: impl Into<String>, origin_line: u32) -> Self {
        Self {
            code,
            origin: origin.into(),
            origin_line,
        }
    }

    pub fn uncontrolled(origin: impl Into<String>, origin_line: u32) -> Self {
        Self::new(VerdictCode::Uncontrolled, origin, origin_line)
    }

    pub fn controlled(origin: impl Into<String>, origin_line: u32) -> Self {
        Self::new(VerdictCode::Controlled, origin, origin_line)
    }

    pub fn repaired(origin: impl Into<String>, origin_line: u32) -> Self {
        Self::new(VerdictCode::Repaired, origin, origin_line)
    }

    pub fn unknown(origin: impl Into<String>, origin_line: u32) -> Self {
        Self::new(VerdictCode::Unknown, origin, origin_line)
    }

    pub fn new_rule(origin: impl Into<String>, origin_line: u32) -> Self {
        Self::new(VerdictCode::NewRule, origin, origin_line)
    }

    /// Merge with a sibling branch's verdict, keeping the stronger one.
    pub fn merge(self, other: Self) -> Self {
        if other.code.strength() > self.code.strength() {
            other
        } else {
            self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strength_order_matches_spec() {
        assert!(VerdictCode::Controlled.strength() > VerdictCode::NewRule.strength());
        assert!(VerdictCode::NewRule.strength() > VerdictCode::Repaired.strength());
        assert!(VerdictCode::Repaired.strength() > VerdictCode::Unknown.strength());
        assert!(VerdictCode::Unknown.strength() > VerdictCode::Uncontrolled.strength());
    }

    #[test]
    fn merge_keeps_stronger_verdict() {
        let a = Verdict::unknown("$x", 3);
        let b = Verdict::controlled("$_GET", 1);
        let merged = a.merge(b.clone());
        assert_eq!(merged, b);
    }

    #[test]
    fn only_uncontrolled_is_non_positive() {
        assert!(VerdictCode::Controlled.is_positive());
        assert!(VerdictCode::Repaired.is_positive());
        assert!(VerdictCode::NewRule.is_positive());
        assert!(VerdictCode::Unknown.is_positive());
        assert!(!VerdictCode::Uncontrolled.is_positive());
    }
}
