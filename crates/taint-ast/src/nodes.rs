//! The typed PHP AST. Every variant carries its own 1-based source `line`;
//! dispatchers and tracers key exclusively off that field, never off
//! position in a parent's child list.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    /// A `$`-prefixed variable reference. `name` always includes the `$`
    /// sigil so it can be compared directly against the superglobal set.
    Variable { name: String, line: u32 },

    /// `$base[key]`. `key` is `None` for the append form `$base[]`.
    ArrayOffset {
        base: Box<Node>,
        key: Option<Box<Node>>,
        line: u32,
    },

    FunctionCall {
        name: String,
        args: Vec<Node>,
        line: u32,
    },

    MethodCall {
        target: Box<Node>,
        method: String,
        args: Vec<Node>,
        line: u32,
    },

    BinaryOp {
        op: String,
        left: Box<Node>,
        right: Box<Node>,
        line: u32,
    },

    /// `cond ? then : else`. `then` is `None` for the Elvis form `cond ?:
    /// else`, in which case `cond` itself is also the taken value.
    TernaryOp {
        cond: Box<Node>,
        then: Option<Box<Node>>,
        otherwise: Box<Node>,
        line: u32,
    },

    Assignment {
        lhs: Box<Node>,
        rhs: Box<Node>,
        line: u32,
    },

    If {
        cond: Box<Node>,
        then: Vec<Node>,
        elseifs: Vec<(Node, Vec<Node>)>,
        otherwise: Option<Vec<Node>>,
        line: u32,
    },

    For {
        init: Vec<Node>,
        cond: Vec<Node>,
        step: Vec<Node>,
        body: Vec<Node>,
        line: u32,
    },

    While {
        cond: Box<Node>,
        body: Vec<Node>,
        line: u32,
    },

    Function {
        name: String,
        params: Vec<Node>,
        body: Vec<Node>,
        line: u32,
    },

    Method {
        name: String,
        params: Vec<Node>,
        body: Vec<Node>,
        line: u32,
    },

    Class {
        name: String,
        members: Vec<Node>,
        line: u32,
    },

    Include {
        path: Box<Node>,
        once: bool,
        require: bool,
        line: u32,
    },

    /// `echo a, b, c;` — PHP allows a comma-separated list; each expression
    /// must be traced independently (spec §9).
    Echo { exprs: Vec<Node>, line: u32 },

    Print { expr: Box<Node>, line: u32 },

    Return { expr: Option<Box<Node>>, line: u32 },

    Eval { expr: Box<Node>, line: u32 },

    /// The `@expr` error-suppression operator. Transparent to taint: it
    /// never changes the verdict of the wrapped expression.
    Silence { expr: Box<Node>, line: u32 },

    New {
        class_name: String,
        args: Vec<Node>,
        line: u32,
    },

    ObjectProperty {
        base: Box<Node>,
        prop: String,
        line: u32,
    },

    Cast { kind: String, expr: Box<Node>, line: u32 },

    /// A named constant reference, e.g. `MY_PATH`, as opposed to a literal.
    Constant { name: String, line: u32 },

    /// A string/number/bool/null literal. Not part of spec §2.1's catalog
    /// by name, but required to realize the oracle's `CONST` classification
    /// (§4.1) — without it there is no way to represent `$x = "safe";`.
    Literal { value: String, line: u32 },

    FormalParameter {
        name: String,
        default: Option<Box<Node>>,
        line: u32,
    },

    Block { stmts: Vec<Node>, line: u32 },
}

impl Node {
    pub fn line(&self) -> u32 {
        match self {
            Node::Variable { line, .. }
            | Node::ArrayOffset { line, .. }
            | Node::FunctionCall { line, .. }
            | Node::MethodCall { line, .. }
            | Node::BinaryOp { line, .. }
            | Node::TernaryOp { line, .. }
            | Node::Assignment { line, .. }
            | Node::If { line, .. }
            | Node::For { line, .. }
            | Node::While { line, .. }
            | Node::Function { line, .. }
            | Node::Method { line, .. }
            | Node::Class { line, .. }
            | Node::Include { line, .. }
            | Node::Echo { line, .. }
            | Node::Print { line, .. }
            | Node::Return { line, .. }
            | Node::Eval { line, .. }
            | Node::Silence { line, .. }
            | Node::New { line, .. }
            | Node::ObjectProperty { line, .. }
            | Node::Cast { line, .. }
            | Node::Constant { line, .. }
            | Node::Literal { line, .. }
            | Node::FormalParameter { line, .. }
            | Node::Block { line, .. } => *line,
        }
    }

    /// The variable name this node ultimately names, collapsing nested
    /// `Variable(Variable(x))` wrapping down to the innermost name (spec §9).
    /// Only meaningful for `Variable` nodes; everything else yields `None`.
    pub fn variable_name(&self) -> Option<&str> {
        match self {
            Node::Variable { name, .. } => Some(name.as_str()),
            _ => None,
        }
    }

    pub fn is_formal_parameter_named(&self, name: &str) -> bool {
        matches!(self, Node::FormalParameter { name: p, .. } if p == name)
    }
}

/// Flattens a nested parameter list node (as produced for `Function`/
/// `Method` params) into names only, dropping defaults.
pub fn formal_parameter_names(params: &[Node]) -> Vec<&str> {
    params
        .iter()
        .filter_map(|p| match p {
            Node::FormalParameter { name, .. } => Some(name.as_str()),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_extraction_covers_every_kind() {
        let v = Node::Variable {
            name: "$x".into(),
            line: 4,
        };
        assert_eq!(v.line(), 4);
    }

    #[test]
    fn formal_parameter_names_ignores_defaults() {
        let params = vec![
            Node::FormalParameter {
                name: "$a".into(),
                default: None,
                line: 1,
            },
            Node::FormalParameter {
                name: "$b".into(),
                default: Some(Box::new(Node::Literal {
                    value: "1".into(),
                    line: 1,
                })),
                line: 1,
            },
        ];
        assert_eq!(formal_parameter_names(&params), vec!["$a", "$b"]);
    }
}
