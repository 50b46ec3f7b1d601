//! The backward parameter tracer (spec §4.3) and its specialized
//! sub-tracers (§4.4-4.7).

use crate::new_rule::{NewRule, NewRuleKind};
use crate::oracle::{classify, classify_name, OracleCode};
use std::cell::RefCell;
use std::rc::Rc;
use taint_ast::{describe, Node, Symbol};
use taint_core::{RepairFunctions, Verdict, VerdictCode};

fn oracle_to_verdict_code(code: OracleCode) -> VerdictCode {
    match code {
        OracleCode::Controlled => VerdictCode::Controlled,
        OracleCode::Unknown => VerdictCode::Unknown,
        OracleCode::Uncontrolled => VerdictCode::Uncontrolled,
    }
}

/// Threaded through every tracer call. Cheap to clone: the formal parameter
/// list is only ever the handful of parameters of the function scope
/// currently being entered.
#[derive(Clone)]
pub struct TraceCtx {
    pub sink_line: u32,
    pub formal_params: Option<Vec<Node>>,
    pub already_in_function: bool,
    pub repair_functions: RepairFunctions,
    pub new_rules: Rc<RefCell<Vec<NewRule>>>,
}

impl TraceCtx {
    pub fn new(sink_line: u32, repair_functions: RepairFunctions) -> Self {
        Self {
            sink_line,
            formal_params: None,
            already_in_function: false,
            repair_functions,
            new_rules: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub(crate) fn enter_function_scope(&self, params: &[Node]) -> Self {
        let mut next = self.clone();
        next.formal_params = Some(params.to_vec());
        next.already_in_function = true;
        next
    }

    fn record_new_rule(&self, rule: NewRule) {
        self.new_rules.borrow_mut().push(rule);
    }
}

/// Entry point of the backward tracer: `(tracked_symbol, preceding_nodes,
/// ...)` in spec §4.3. Dispatches to a specialized sub-tracer first when
/// the symbol shape demands it; a bare call/array/new symbol arriving here
/// (rather than through [`trace_expr`]) has no original argument nodes
/// available, so call-site argument binding degrades to untracked scope
/// tracing for that one hop.
pub fn trace_symbol(symbol: Symbol, nodes: &[Node], ctx: &TraceCtx) -> Verdict {
    match &symbol {
        Symbol::CallResult(name, _) => trace_function_call(name, &[], nodes, ctx),
        Symbol::ArrayElem(base, key) => trace_array(base, key, nodes, ctx),
        Symbol::NewInstance(class_name, _) => trace_new_class(class_name, nodes, ctx),
        _ => scan_backward(&symbol, nodes, ctx),
    }
}

/// Classifies and, if still `UNKNOWN`, traces a single expression, keeping
/// the real argument nodes available whenever the expression is a call,
/// array access or constructor — the cases where [`trace_symbol`] alone
/// would have to degrade to an empty argument list. `pub(crate)` so the
/// sink dispatcher can trace each sink argument (and, for a ternary sink
/// argument, each branch independently — spec §9).
pub(crate) fn trace_expr(expr: &Node, nodes: &[Node], ctx: &TraceCtx) -> Verdict {
    match expr {
        Node::FunctionCall { name, args, .. } => trace_function_call(name, args, nodes, ctx),
        Node::MethodCall { method, args, .. } => trace_function_call(method, args, nodes, ctx),
        Node::New { class_name, .. } => trace_new_class(class_name, nodes, ctx),
        Node::ArrayOffset { base, key, .. } => {
            let (code, canon) = classify(base);
            if code != OracleCode::Unknown {
                return Verdict::new(oracle_to_verdict_code(code), canon.display(), expr.line());
            }
            let base_name = base.variable_name().unwrap_or_default();
            let key_str = key.as_deref().map(describe).unwrap_or_default();
            trace_array(base_name, &key_str, nodes, ctx)
        }
        Node::BinaryOp { .. } => classify_expr_list(&flatten_binary_operands(expr), nodes, ctx),
        Node::Silence { expr: inner, .. } | Node::Cast { expr: inner, .. } => {
            trace_expr(inner, nodes, ctx)
        }
        Node::TernaryOp {
            cond,
            then,
            otherwise,
            ..
        } => {
            let taken = then.as_deref().unwrap_or(cond.as_ref());
            let a = trace_expr(taken, nodes, ctx);
            if a.code == VerdictCode::Controlled {
                return a;
            }
            a.merge(trace_expr(otherwise, nodes, ctx))
        }
        _ => {
            let (code, canon) = classify(expr);
            if code != OracleCode::Unknown {
                return Verdict::new(oracle_to_verdict_code(code), canon.display(), expr.line());
            }
            match Symbol::from_node(expr) {
                Some(symbol) => trace_symbol(symbol, nodes, ctx),
                None => Verdict::unknown(canon.display(), expr.line()),
            }
        }
    }
}

fn initial_classification(symbol: &Symbol) -> Verdict {
    match symbol {
        Symbol::Var(name) => {
            let (code, canon) = classify_name(name);
            Verdict::new(oracle_to_verdict_code(code), canon.display(), 0)
        }
        other => Verdict::new(VerdictCode::Unknown, other.display(), 0),
    }
}

/// Walks `nodes` from the end backward looking for the statement that last
/// defines `symbol`. Reaching the front of the slice without a match means
/// the symbol came from somewhere outside this scope: a formal parameter of
/// the enclosing function is assumed `REPAIRED` (spec §9 — a parameter that
/// the tracer cannot follow further back is treated as already sanitized by
/// its caller's responsibility, not as freshly unresolved); anything else
/// keeps the oracle's own classification.
fn scan_backward(symbol: &Symbol, nodes: &[Node], ctx: &TraceCtx) -> Verdict {
    let Some((last, rest)) = nodes.split_last() else {
        if let Some(name) = symbol.as_var_name() {
            if let Some(params) = &ctx.formal_params {
                if params.iter().any(|p| p.is_formal_parameter_named(name)) {
                    return Verdict::repaired(name, 0);
                }
            }
        }
        return initial_classification(symbol);
    };

    match last {
        Node::Assignment { lhs, rhs, line } => {
            if Symbol::from_node(lhs).as_ref() == Some(symbol) {
                scan_assignment(symbol, rhs, *line, rest, ctx)
            } else {
                scan_backward(symbol, rest, ctx)
            }
        }
        Node::Class { .. } => trace_class(symbol, last, ctx),
        Node::If {
            then,
            elseifs,
            otherwise,
            ..
        } => scan_branches(symbol, then, elseifs, otherwise.as_deref(), rest, ctx),
        Node::For { body, .. } | Node::While { body, .. } => {
            let verdict = trace_symbol(symbol.clone(), body, ctx);
            if verdict.code == VerdictCode::Controlled {
                return verdict;
            }
            if verdict.code == VerdictCode::Unknown {
                return scan_backward(symbol, rest, ctx);
            }
            verdict
        }
        _ => scan_backward(symbol, rest, ctx),
    }
}

fn scan_assignment(symbol: &Symbol, rhs: &Node, line: u32, rest: &[Node], ctx: &TraceCtx) -> Verdict {
    if let Node::FunctionCall { name, .. } = rhs {
        if ctx.repair_functions.is_repair(name) {
            return Verdict::repaired(symbol.display(), line);
        }
    }
    let verdict = trace_expr(rhs, rest, ctx);
    if verdict.origin_line == 0 && verdict.code != VerdictCode::Controlled {
        Verdict::new(verdict.code, verdict.origin, line)
    } else {
        verdict
    }
}

/// Flattens a `BinaryOp` tree into its leaf operands (spec §4.3's "rhs is a
/// list of expressions").
fn flatten_binary_operands(node: &Node) -> Vec<Node> {
    let mut out = Vec::new();
    flatten_binary_into(node, &mut out);
    out
}

fn flatten_binary_into(node: &Node, out: &mut Vec<Node>) {
    match node {
        Node::BinaryOp { left, right, .. } => {
            flatten_binary_into(left, out);
            flatten_binary_into(right, out);
        }
        other => out.push(other.clone()),
    }
}

/// Classifies each expression in turn; a `CONTROLLED` result short-circuits
/// immediately, otherwise the strongest verdict across all elements wins.
fn classify_expr_list(exprs: &[Node], rest: &[Node], ctx: &TraceCtx) -> Verdict {
    let mut best = Verdict::uncontrolled("", 0);
    for expr in exprs {
        let verdict = trace_expr(expr, rest, ctx);
        if verdict.code == VerdictCode::Controlled {
            return verdict;
        }
        best = best.merge(verdict);
    }
    best
}

fn scan_branches(
    symbol: &Symbol,
    then: &[Node],
    elseifs: &[(Node, Vec<Node>)],
    otherwise: Option<&[Node]>,
    rest: &[Node],
    ctx: &TraceCtx,
) -> Verdict {
    let mut best = Verdict::uncontrolled(symbol.display(), 0);
    let blocks: Vec<&[Node]> = std::iter::once(then)
        .chain(elseifs.iter().map(|(_, body)| body.as_slice()))
        .chain(otherwise)
        .collect();
    for block in blocks {
        let verdict = trace_symbol(symbol.clone(), block, ctx);
        if verdict.code == VerdictCode::Controlled {
            return verdict;
        }
        best = best.merge(verdict);
    }
    if best.code == VerdictCode::Unknown {
        return scan_backward(symbol, rest, ctx);
    }
    best
}

fn trace_class(symbol: &Symbol, class_node: &Node, ctx: &TraceCtx) -> Verdict {
    let Node::Class { members, .. } = class_node else {
        return Verdict::uncontrolled(symbol.display(), 0);
    };
    let back_slice: Vec<Node> = members
        .iter()
        .filter(|m| m.line() < ctx.sink_line)
        .cloned()
        .collect();
    let verdict = trace_symbol(symbol.clone(), &back_slice, ctx);
    if verdict.code != VerdictCode::Unknown {
        return verdict;
    }
    let Some(Node::Method { params, body, .. }) = members
        .iter()
        .find(|m| matches!(m, Node::Method { name, .. } if name == "__construct"))
    else {
        return verdict;
    };
    let inner_ctx = ctx.enter_function_scope(params);
    let verdict2 = trace_symbol(symbol.clone(), body, &inner_ctx);
    if verdict2.code == VerdictCode::Unknown {
        if let Some(name) = symbol.as_var_name() {
            if params.iter().any(|p| p.is_formal_parameter_named(name)) {
                ctx.record_new_rule(NewRule {
                    kind: NewRuleKind::Class,
                    node: class_node.clone(),
                    parameter: name.to_string(),
                    formal_params: Some(
                        taint_ast::formal_parameter_names(params)
                            .into_iter()
                            .map(String::from)
                            .collect(),
                    ),
                });
                return Verdict::new_rule(verdict2.origin.clone(), verdict2.origin_line);
            }
        }
    }
    verdict2
}

/// `trace_function` (spec §4.4): locates the most recent earlier
/// user-defined function with a matching name and traces its `return`
/// expressions, binding the call site's arguments to the callee's formal
/// parameters where a `return` expression is just a parameter passthrough.
/// When the callee is found but a trace through it still bottoms out
/// `UNKNOWN` on one of its own parameters, records a
/// [`NewRule`](crate::new_rule::NewRule) so an orchestrator can re-scan
/// every call site of that function for the parameter in question.
fn trace_function_call(name: &str, call_args: &[Node], nodes: &[Node], ctx: &TraceCtx) -> Verdict {
    let Some(func) = find_function_def(name, nodes) else {
        return Verdict::unknown(format!("{name}(...)"), 0);
    };
    let (params, body) = match func {
        Node::Function { params, body, .. } | Node::Method { params, body, .. } => (params, body),
        _ => unreachable!(),
    };
    let mut best = Verdict::uncontrolled(format!("{name}(...)"), func.line());
    for stmt in body {
        let Node::Return {
            expr: Some(ret_expr),
            line: ret_line,
        } = stmt
        else {
            continue;
        };
        let verdict = if let Some(idx) = matching_param_index(params, ret_expr) {
            match call_args.get(idx) {
                Some(arg) => trace_expr(arg, nodes, ctx),
                None => Verdict::uncontrolled(format!("{name}(...)"), *ret_line),
            }
        } else {
            let body_slice: Vec<Node> = body
                .iter()
                .filter(|n| n.line() < *ret_line)
                .cloned()
                .collect();
            let inner_ctx = ctx.enter_function_scope(params);
            trace_expr(ret_expr, &body_slice, &inner_ctx)
        };
        if verdict.code == VerdictCode::Controlled {
            return verdict;
        }
        if verdict.code == VerdictCode::Unknown
            && params.iter().any(|p| p.is_formal_parameter_named(&verdict.origin))
        {
            ctx.record_new_rule(NewRule {
                kind: NewRuleKind::Function,
                node: func.clone(),
                parameter: verdict.origin.clone(),
                formal_params: Some(
                    taint_ast::formal_parameter_names(params)
                        .into_iter()
                        .map(String::from)
                        .collect(),
                ),
            });
            best = best.merge(Verdict::new_rule(verdict.origin.clone(), verdict.origin_line));
            continue;
        }
        best = best.merge(verdict);
    }
    best
}

fn matching_param_index(params: &[Node], expr: &Node) -> Option<usize> {
    let name = expr.variable_name()?;
    params.iter().position(|p| p.is_formal_parameter_named(name))
}

fn find_function_def<'a>(name: &str, nodes: &'a [Node]) -> Option<&'a Node> {
    nodes.iter().rev().find(|n| {
        matches!(n, Node::Function { name: candidate, .. } if candidate == name)
            || matches!(n, Node::Method { name: candidate, .. } if candidate == name)
    })
}

fn find_class_def<'a>(name: &str, nodes: &'a [Node]) -> Option<&'a Node> {
    nodes
        .iter()
        .rev()
        .find(|n| matches!(n, Node::Class { name: candidate, .. } if candidate == name))
}

/// `trace_array` (spec §4.5).
fn trace_array(base: &str, key: &str, nodes: &[Node], ctx: &TraceCtx) -> Verdict {
    let Some((last, rest)) = nodes.split_last() else {
        return Verdict::uncontrolled(format!("{base}[{key}]"), 0);
    };
    if let Node::Assignment { lhs, rhs, line } = last {
        if matches!(lhs.as_ref(), Node::Variable { name, .. } if name == base) {
            if let Node::FunctionCall {
                name: fn_name,
                args,
                ..
            } = rhs.as_ref()
            {
                if fn_name == "array" {
                    for arg in args {
                        if let Node::BinaryOp {
                            op, left, right, ..
                        } = arg
                        {
                            if op == "=>" && literal_matches_key(left, key) {
                                return trace_expr(right, rest, ctx);
                            }
                        }
                    }
                    return Verdict::uncontrolled(format!("{base}[{key}]"), *line);
                }
            }
            return trace_expr(rhs, rest, ctx);
        }
    }
    trace_array(base, key, rest, ctx)
}

fn literal_matches_key(node: &Node, key: &str) -> bool {
    match node {
        Node::Literal { value, .. } => value == key,
        Node::Variable { name, .. } => name == key,
        Node::Constant { name, .. } => name == key,
        _ => false,
    }
}

/// `trace_new_class` (spec §4.6, SPEC_FULL.md §2 `new_class_back`
/// deviation): find the matching `Class`, trace every `return` in its
/// `__toString` method. A `Class` that doesn't match `class_name`, or a
/// matching one with no `__toString`/no `return` in it, leaves the verdict
/// at `UNKNOWN` rather than `UNCONTROLLED` — preserved literally from the
/// original so the deep tracer still gets a chance to follow an include.
fn trace_new_class(class_name: &str, nodes: &[Node], ctx: &TraceCtx) -> Verdict {
    let Some(class_node) = find_class_def(class_name, nodes) else {
        return Verdict::unknown(format!("new {class_name}()"), 0);
    };
    let Node::Class { members, .. } = class_node else {
        unreachable!()
    };
    let Some(Node::Method { body, .. }) = members
        .iter()
        .find(|m| matches!(m, Node::Method { name, .. } if name == "__toString"))
    else {
        return Verdict::unknown(format!("new {class_name}()"), 0);
    };
    let mut best = Verdict::unknown(format!("new {class_name}()"), class_node.line());
    for stmt in body {
        let Node::Return {
            expr: Some(ret_expr),
            ..
        } = stmt
        else {
            continue;
        };
        let verdict = trace_expr(ret_expr, body, ctx);
        if verdict.code == VerdictCode::Controlled {
            return verdict;
        }
        best = best.merge(verdict);
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(sink_line: u32) -> TraceCtx {
        TraceCtx::new(sink_line, RepairFunctions::default())
    }

    #[test]
    fn direct_chain_of_assignments_is_controlled() {
        let nodes = taint_ast::parse("<?php $a = $_GET['x']; $b = $a; $c = $b; eval($c); ?>")
            .unwrap();
        let back_slice = &nodes[..nodes.len() - 1];
        let verdict = trace_symbol(Symbol::Var("$c".into()), back_slice, &ctx(4));
        assert_eq!(verdict.code, VerdictCode::Controlled);
    }

    #[test]
    fn repair_function_shortcircuits_to_repaired() {
        let repairs = RepairFunctions::new(["htmlspecialchars"]);
        let nodes =
            taint_ast::parse("<?php $x = htmlspecialchars($_GET['id']); eval($x); ?>").unwrap();
        let mut c = ctx(2);
        c.repair_functions = repairs;
        let verdict = trace_symbol(Symbol::Var("$x".into()), &nodes[..1], &c);
        assert_eq!(verdict.code, VerdictCode::Repaired);
    }

    #[test]
    fn constant_literal_is_uncontrolled() {
        let nodes = taint_ast::parse("<?php $x = \"safe\"; eval($x); ?>").unwrap();
        let verdict = trace_symbol(Symbol::Var("$x".into()), &nodes[..1], &ctx(2));
        assert_eq!(verdict.code, VerdictCode::Uncontrolled);
    }

    #[test]
    fn array_element_propagation_is_controlled() {
        let nodes =
            taint_ast::parse("<?php $arr = array('k' => $_COOKIE['c']); eval($arr['k']); ?>")
                .unwrap();
        let verdict = trace_symbol(
            Symbol::ArrayElem("$arr".into(), "k".into()),
            &nodes[..1],
            &ctx(2),
        );
        assert_eq!(verdict.code, VerdictCode::Controlled);
    }

    #[test]
    fn assignment_before_an_untouching_if_is_still_reached() {
        let nodes = taint_ast::parse(
            "<?php $x = $_GET['a']; if ($c) { echo 1; } eval($x); ?>",
        )
        .unwrap();
        let back_slice = &nodes[..nodes.len() - 1];
        let verdict = trace_symbol(Symbol::Var("$x".into()), back_slice, &ctx(3));
        assert_eq!(verdict.code, VerdictCode::Controlled);
        assert_eq!(verdict.origin, "$_GET");
    }

    #[test]
    fn through_user_function_is_controlled() {
        let src = "<?php function wrap($v) { return $v; } $x = wrap($_POST['p']); eval($x); ?>";
        let nodes = taint_ast::parse(src).unwrap();
        let back_slice = &nodes[..nodes.len() - 1];
        let verdict = trace_symbol(Symbol::Var("$x".into()), back_slice, &ctx(3));
        assert_eq!(verdict.code, VerdictCode::Controlled);
    }
}
