//! The typed record emitted instead of a sub-AST when taint exits through a
//! user-defined function or class parameter (spec §3 code 4, §9).

use taint_ast::Node;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewRuleKind {
    Function,
    Class,
}

/// Directs an orchestrator to synthesize a new scan target for every call
/// site of `node` (a `Function`/`Method` or `Class`), tracking `parameter`.
#[derive(Debug, Clone)]
pub struct NewRule {
    pub kind: NewRuleKind,
    pub node: Node,
    pub parameter: String,
    pub formal_params: Option<Vec<String>>,
}
