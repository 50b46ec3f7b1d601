//! The two public entry points named in spec §6: [`scan_parser`], the
//! primary sink-to-source scan, and [`analyse_params`], a single-symbol
//! query used recursively by an orchestrator following a `NEW_RULE` verdict
//! into a caller, or re-checking one symbol without re-running dispatch.
//!
//! Both entry points implement spec §7's error policy: nothing propagates
//! out. A parse failure degrades `scan_parser` to an empty finding list and
//! `analyse_params` to an `UNCONTROLLED` verdict, after logging a warning.

use crate::dispatch::dispatch;
use crate::tracer::TraceCtx;
use std::path::Path;
use taint_ast::Symbol;
use taint_core::{Finding, RepairFunctions, Verdict};
use tracing::warn;

/// Primary entry point. Parses `code_text`, locates every statement at
/// `sink_line` whose form matches one of `sink_names`, and returns the
/// findings accumulated across all of them, in source order. Fresh state
/// per call: no finding, new-rule record or repair-function configuration
/// survives between invocations (spec §3's lifecycle invariant, §5's
/// "shared resources" note).
pub fn scan_parser(
    code_text: &str,
    sink_names: &[String],
    sink_line: u32,
    file_path: impl AsRef<Path>,
    repair_functions: RepairFunctions,
) -> Vec<Finding> {
    let file_dir = file_path
        .as_ref()
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let nodes = match taint_ast::parse(code_text) {
        Ok(nodes) => nodes,
        Err(err) => {
            warn!(%err, "scan_parser: parse error, returning no findings");
            return Vec::new();
        }
    };
    let ctx = TraceCtx::new(sink_line, repair_functions);
    dispatch(&nodes, sink_names, sink_line, &ctx, file_dir)
}

/// Single-symbol query: traces one name or expression string back to its
/// origin without re-running the dispatcher. Used recursively when
/// following a call or include from outside this module, and accepts the
/// `"Foo->bar"` object-property shorthand the original `anlysis_params`
/// supports directly (SPEC_FULL.md §2) by splitting it into an
/// `ObjProp(Var(lhs), rhs)` symbol before tracing.
pub fn analyse_params(
    name_or_expr: &str,
    code_text: &str,
    _file_path: impl AsRef<Path>,
    sink_line: u32,
    _vul_function_name: Option<&str>,
    repair_functions: Option<RepairFunctions>,
) -> Verdict {
    let nodes = match taint_ast::parse(code_text) {
        Ok(nodes) => nodes,
        Err(err) => {
            warn!(%err, "analyse_params: parse error, degrading to UNCONTROLLED");
            return Verdict::uncontrolled(name_or_expr, 0);
        }
    };
    let symbol = symbol_from_str(name_or_expr);
    let back_slice: Vec<taint_ast::Node> = nodes
        .into_iter()
        .filter(|n| n.line() <= sink_line)
        .collect();
    let ctx = TraceCtx::new(sink_line, repair_functions.unwrap_or_default());
    crate::tracer::trace_symbol(symbol, &back_slice, &ctx)
}

/// Parses `"Foo->bar"` into `ObjProp("$Foo".into()... )` — actually into
/// `ObjProp(lhs, rhs)` using the literal left-hand text as the base name —
/// and anything else into a plain `Var`, normalizing nested `Var(Var(x))`
/// wrapping per spec §9.
fn symbol_from_str(name_or_expr: &str) -> Symbol {
    if let Some((base, prop)) = name_or_expr.split_once("->") {
        Symbol::ObjProp(base.to_string(), prop.to_string())
    } else {
        Symbol::Var(taint_ast::normalize_var_name(name_or_expr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taint_core::VerdictCode;

    #[test]
    fn scan_parser_finds_direct_taint() {
        let findings = scan_parser(
            "<?php $x = $_GET['id']; eval($x); ?>",
            &["eval".to_string()],
            1,
            "test.php",
            RepairFunctions::default(),
        );
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].code, VerdictCode::Controlled);
        assert_eq!(findings[0].sink, "eval");
        assert_eq!(findings[0].sink_line, 1);
    }

    #[test]
    fn scan_parser_on_malformed_input_returns_empty() {
        let findings = scan_parser(
            "<?php $x = ; ?>",
            &["eval".to_string()],
            1,
            "test.php",
            RepairFunctions::default(),
        );
        assert!(findings.is_empty());
    }

    #[test]
    fn analyse_params_traces_a_bare_variable() {
        let verdict = analyse_params(
            "$x",
            "<?php $x = $_GET['id']; eval($x); ?>",
            "test.php",
            1,
            None,
            None,
        );
        assert_eq!(verdict.code, VerdictCode::Controlled);
    }

    #[test]
    fn analyse_params_splits_object_property_shorthand() {
        let verdict = analyse_params("$obj->prop", "<?php ?>", "test.php", 1, None, None);
        assert_eq!(verdict.code, VerdictCode::Unknown);
    }

    #[test]
    fn scan_parser_follows_an_include_to_a_sibling_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.php"), "<?php $g = $_GET['q']; ?>").unwrap();
        let b_path = dir.path().join("b.php");
        let code = "<?php\ninclude 'a.php';\neval($g);\n?>";
        std::fs::write(&b_path, code).unwrap();

        let findings = scan_parser(code, &["eval".to_string()], 3, &b_path, RepairFunctions::default());
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].code, VerdictCode::Controlled);
        assert_eq!(findings[0].sink, "eval");
    }
}
