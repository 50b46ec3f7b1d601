//! The controllability oracle (spec §4.1): classifies a single expression
//! without looking at anything around it. `UNKNOWN` is the signal for the
//! caller to keep walking backward; `CONTROLLED` and `UNCONTROLLED`
//! terminate the trace immediately.

use taint_ast::{Node, Symbol};
use taint_core::is_controllable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OracleCode {
    Controlled,
    Unknown,
    Uncontrolled,
}

/// `classify(expr) -> (code, canonical_symbol)`.
pub fn classify(expr: &Node) -> (OracleCode, Symbol) {
    match expr {
        Node::ObjectProperty { .. }
        | Node::New { .. }
        | Node::MethodCall { .. }
        | Node::FunctionCall { .. }
        | Node::ArrayOffset { .. } => {
            let symbol = Symbol::from_node(expr)
                .unwrap_or_else(|| Symbol::Var(taint_ast::describe(expr)));
            (OracleCode::Unknown, symbol)
        }
        Node::Variable { name, .. } => classify_name(name),
        Node::Literal { value, .. } => (OracleCode::Uncontrolled, Symbol::Constant(value.clone())),
        Node::Constant { name, .. } => (OracleCode::Uncontrolled, Symbol::Constant(name.clone())),
        other => (
            OracleCode::Uncontrolled,
            Symbol::Var(taint_ast::describe(other)),
        ),
    }
}

/// Classifies a bare variable name (already normalized).
pub fn classify_name(name: &str) -> (OracleCode, Symbol) {
    let normalized = taint_ast::normalize_var_name(name);
    if is_controllable(&normalized) {
        (OracleCode::Controlled, Symbol::Var(normalized))
    } else if normalized.starts_with('$') {
        (OracleCode::Unknown, Symbol::Var(normalized))
    } else {
        (OracleCode::Uncontrolled, Symbol::Var(normalized))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str) -> Node {
        Node::Variable {
            name: name.into(),
            line: 1,
        }
    }

    #[test]
    fn classify_controlled_iff_superglobal() {
        let (code, _) = classify(&var("$_GET"));
        assert_eq!(code, OracleCode::Controlled);
        let (code, _) = classify(&var("$_SERVER"));
        assert_ne!(code, OracleCode::Controlled);
    }

    #[test]
    fn classify_unknown_variable() {
        let (code, symbol) = classify(&var("$foo"));
        assert_eq!(code, OracleCode::Unknown);
        assert_eq!(symbol, Symbol::Var("$foo".into()));
    }

    #[test]
    fn classify_literal_is_uncontrolled() {
        let node = Node::Literal {
            value: "safe".into(),
            line: 1,
        };
        let (code, _) = classify(&node);
        assert_eq!(code, OracleCode::Uncontrolled);
    }

    #[test]
    fn classify_call_is_unknown_caller_decides() {
        let node = Node::FunctionCall {
            name: "f".into(),
            args: vec![],
            line: 1,
        };
        let (code, _) = classify(&node);
        assert_eq!(code, OracleCode::Unknown);
    }
}
