//! The sink dispatcher (spec §4.10): locates the sink at a given line
//! within the AST and invokes the backward tracer on each of its
//! argument/operand expressions.
//!
//! The dispatcher walks each statement list as a *scope*: every structured
//! statement (`If`/`For`/`While`/`Function`/`Method`/`Class`/`Block`,
//! `Silence`) is traversed transparently so a sink nested several blocks
//! deep is still found, while the back-slice handed to the tracer for that
//! sink is always the statements immediately preceding it *within its own
//! scope* — mirroring how the tracer itself treats a function body or a
//! class's member list as a self-contained back-slice (spec §4.3-4.7).

use crate::deep::trace_deep_expr;
use std::path::Path;
use taint_ast::{describe, Node};
use taint_core::{Finding, Verdict};

use crate::tracer::TraceCtx;

/// Walks `nodes` looking for statements at `sink_line` matching one of
/// `sink_names`, tracing each argument/operand and appending a [`Finding`]
/// for every verdict with `code > 0` (spec §3's Finding lifecycle).
/// `file_dir` is the directory the scanned source lives in, handed to the
/// deep tracer so a sink argument that bottoms out `UNKNOWN` locally can
/// still be resolved by following an `include`/`require` in scope (spec
/// §4.8).
pub fn dispatch(nodes: &[Node], sink_names: &[String], sink_line: u32, ctx: &TraceCtx, file_dir: &Path) -> Vec<Finding> {
    let mut out = Vec::new();
    walk_scope(nodes, sink_names, sink_line, ctx, file_dir, &mut out);
    out
}

fn is_sink(sink_names: &[String], name: &str) -> bool {
    sink_names.iter().any(|s| s == name)
}

fn include_keyword(once: bool, require: bool) -> &'static str {
    match (require, once) {
        (false, false) => "include",
        (false, true) => "include_once",
        (true, false) => "require",
        (true, true) => "require_once",
    }
}

fn walk_scope(
    nodes: &[Node],
    sink_names: &[String],
    sink_line: u32,
    ctx: &TraceCtx,
    file_dir: &Path,
    out: &mut Vec<Finding>,
) {
    for (i, node) in nodes.iter().enumerate() {
        let preceding = &nodes[..i];
        if node.line() == sink_line {
            match_sink(node, preceding, sink_names, sink_line, ctx, file_dir, out);
        }
        descend(node, sink_names, sink_line, ctx, file_dir, out);
    }
}

/// Recurses into the nested statement lists of structured statements so
/// sinks inside them are still reached. Does not re-check `node` itself —
/// that already happened in [`walk_scope`]'s caller.
fn descend(
    node: &Node,
    sink_names: &[String],
    sink_line: u32,
    ctx: &TraceCtx,
    file_dir: &Path,
    out: &mut Vec<Finding>,
) {
    match node {
        Node::If {
            then,
            elseifs,
            otherwise,
            ..
        } => {
            walk_scope(then, sink_names, sink_line, ctx, file_dir, out);
            for (_, body) in elseifs {
                walk_scope(body, sink_names, sink_line, ctx, file_dir, out);
            }
            if let Some(body) = otherwise {
                walk_scope(body, sink_names, sink_line, ctx, file_dir, out);
            }
        }
        Node::For { body, .. } | Node::While { body, .. } => {
            walk_scope(body, sink_names, sink_line, ctx, file_dir, out);
        }
        Node::Function { params, body, .. } | Node::Method { params, body, .. } => {
            let inner = ctx.enter_function_scope(params);
            walk_scope(body, sink_names, sink_line, &inner, file_dir, out);
        }
        Node::Class { members, .. } => {
            walk_scope(members, sink_names, sink_line, ctx, file_dir, out);
        }
        Node::Block { stmts, .. } => {
            walk_scope(stmts, sink_names, sink_line, ctx, file_dir, out);
        }
        Node::Silence { expr, .. } => {
            descend(expr, sink_names, sink_line, ctx, file_dir, out);
        }
        _ => {}
    }
}

fn match_sink(
    node: &Node,
    preceding: &[Node],
    sink_names: &[String],
    sink_line: u32,
    ctx: &TraceCtx,
    file_dir: &Path,
    out: &mut Vec<Finding>,
) {
    match node {
        // The silence operator is transparent: `@eval($x)` is still a sink
        // call, just one whose errors are suppressed (spec §9).
        Node::Silence { expr, .. } => {
            match_sink(expr, preceding, sink_names, sink_line, ctx, file_dir, out);
        }
        Node::FunctionCall { name, args, .. } if is_sink(sink_names, name) => {
            for arg in args {
                trace_one(arg, preceding, ctx, file_dir, name, sink_line, out);
            }
        }
        Node::MethodCall { method, args, .. } if is_sink(sink_names, method) => {
            for arg in args {
                trace_one(arg, preceding, ctx, file_dir, method, sink_line, out);
            }
        }
        Node::Assignment { rhs, .. } => match rhs.as_ref() {
            Node::FunctionCall { name, args, .. } if is_sink(sink_names, name) => {
                for arg in args {
                    trace_one(arg, preceding, ctx, file_dir, name, sink_line, out);
                }
            }
            Node::MethodCall { method, args, .. } if is_sink(sink_names, method) => {
                for arg in args {
                    trace_one(arg, preceding, ctx, file_dir, method, sink_line, out);
                }
            }
            _ => {}
        },
        Node::Echo { exprs, .. } if is_sink(sink_names, "echo") => {
            for expr in exprs {
                trace_one(expr, preceding, ctx, file_dir, "echo", sink_line, out);
            }
        }
        Node::Print { expr, .. } if is_sink(sink_names, "print") => {
            trace_one(expr, preceding, ctx, file_dir, "print", sink_line, out);
        }
        Node::Eval { expr, .. } if is_sink(sink_names, "eval") => {
            trace_one(expr, preceding, ctx, file_dir, "eval", sink_line, out);
        }
        Node::Include {
            path, once, require, ..
        } => {
            let keyword = include_keyword(*once, *require);
            if is_sink(sink_names, keyword) {
                trace_one(path, preceding, ctx, file_dir, keyword, sink_line, out);
            }
        }
        Node::Return {
            expr: Some(expr), ..
        } if is_sink(sink_names, "return") => {
            trace_one(expr, preceding, ctx, file_dir, "return", sink_line, out);
        }
        _ => {}
    }
}

/// Traces a single sink argument/operand, handling the ternary special case
/// (spec §9/SPEC_FULL.md §2): a `TernaryOp` sink argument is traced branch
/// by branch, emitting a finding per tainted branch rather than one merged
/// verdict, reproducing the original's `analysis_ternaryop_node`. Every
/// other expression shape gets the ordinary single merged verdict. Each
/// branch goes through [`trace_deep_expr`] so a sink argument whose taint
/// only resolves through an `include` still gets followed.
fn trace_one(
    arg: &Node,
    preceding: &[Node],
    ctx: &TraceCtx,
    file_dir: &Path,
    sink_name: &str,
    sink_line: u32,
    out: &mut Vec<Finding>,
) {
    if let Node::TernaryOp {
        cond,
        then,
        otherwise,
        ..
    } = arg
    {
        let taken = then.as_deref().unwrap_or(cond.as_ref());
        for branch in [taken, otherwise.as_ref()] {
            let verdict = trace_deep_expr(branch, preceding, ctx, file_dir);
            push_if_positive(verdict, arg, sink_name, sink_line, out);
        }
        return;
    }
    let verdict = trace_deep_expr(arg, preceding, ctx, file_dir);
    push_if_positive(verdict, arg, sink_name, sink_line, out);
}

fn push_if_positive(verdict: Verdict, arg: &Node, sink_name: &str, sink_line: u32, out: &mut Vec<Finding>) {
    if verdict.code.is_positive() {
        out.push(Finding::new(
            verdict.code,
            verdict.origin,
            verdict.origin_line,
            sink_name,
            describe(arg),
            sink_line,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taint_core::{RepairFunctions, VerdictCode};

    fn ctx(sink_line: u32) -> TraceCtx {
        TraceCtx::new(sink_line, RepairFunctions::default())
    }

    fn here() -> &'static Path {
        Path::new(".")
    }

    #[test]
    fn direct_taint_reaches_eval_sink() {
        let nodes = taint_ast::parse("<?php $x = $_GET['id']; eval($x); ?>").unwrap();
        let findings = dispatch(&nodes, &["eval".to_string()], 1, &ctx(1), here());
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].code, VerdictCode::Controlled);
        assert_eq!(findings[0].sink, "eval");
        assert_eq!(findings[0].sink_line, 1);
    }

    #[test]
    fn repaired_flow_yields_repaired_finding() {
        let src = "<?php\n$x = htmlspecialchars($_GET['id']);\neval($x);\n?>";
        let nodes = taint_ast::parse(src).unwrap();
        let mut c = ctx(3);
        c.repair_functions = RepairFunctions::new(["htmlspecialchars"]);
        let findings = dispatch(&nodes, &["eval".to_string()], 3, &c, here());
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].code, VerdictCode::Repaired);
    }

    #[test]
    fn constant_literal_yields_no_finding() {
        let src = "<?php\n$x = \"safe\";\neval($x);\n?>";
        let nodes = taint_ast::parse(src).unwrap();
        let findings = dispatch(&nodes, &["eval".to_string()], 3, &ctx(3), here());
        assert!(findings.is_empty());
    }

    #[test]
    fn through_user_function_reaches_echo_sink() {
        let src = "<?php\nfunction f($a){ return $a; }\n$y = f($_POST['u']);\necho $y;\n?>";
        let nodes = taint_ast::parse(src).unwrap();
        let findings = dispatch(&nodes, &["echo".to_string()], 4, &ctx(4), here());
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].code, VerdictCode::Controlled);
        assert_eq!(findings[0].sink, "echo");
    }

    #[test]
    fn array_element_propagation_reaches_sink() {
        let src = "<?php\n$arr = array('k' => $_COOKIE['c']);\neval($arr['k']);\n?>";
        let nodes = taint_ast::parse(src).unwrap();
        let findings = dispatch(&nodes, &["eval".to_string()], 3, &ctx(3), here());
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].code, VerdictCode::Controlled);
    }

    #[test]
    fn sink_nested_inside_if_is_still_found() {
        let src = "<?php if ($cond) { eval($_GET['id']); } ?>";
        let nodes = taint_ast::parse(src).unwrap();
        let findings = dispatch(&nodes, &["eval".to_string()], 1, &ctx(1), here());
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].code, VerdictCode::Controlled);
    }

    #[test]
    fn silenced_sink_call_is_still_detected() {
        let src = "<?php\n$x = $_GET['id'];\n@eval($x);\n?>";
        let nodes = taint_ast::parse(src).unwrap();
        let findings = dispatch(&nodes, &["eval".to_string()], 3, &ctx(3), here());
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].code, VerdictCode::Controlled);
    }

    #[test]
    fn ternary_sink_argument_emits_finding_per_tainted_branch() {
        let src = "<?php\n$safe = \"ok\";\necho $cond ? $_GET['a'] : $safe;\n?>";
        let nodes = taint_ast::parse(src).unwrap();
        let findings = dispatch(&nodes, &["echo".to_string()], 3, &ctx(3), here());
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].code, VerdictCode::Controlled);
    }

    #[test]
    fn sink_argument_resolved_through_an_include_is_still_found() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.php"), "<?php $g = $_GET['q']; ?>").unwrap();
        let src = "<?php\ninclude 'a.php';\neval($g);\n?>";
        let nodes = taint_ast::parse(src).unwrap();
        let findings = dispatch(&nodes, &["eval".to_string()], 3, &ctx(3), dir.path());
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].code, VerdictCode::Controlled);
        assert_eq!(findings[0].sink, "eval");
    }
}
