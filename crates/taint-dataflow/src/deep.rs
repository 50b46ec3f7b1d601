//! The deep tracer (spec §4.8): a single backward-tracer call guarded by a
//! recursion-depth ceiling, with include-following for verdicts that
//! bottom out `UNKNOWN` at the top of the current file.

use crate::includes::{collect_defines, resolve_include_path};
use crate::tracer::{trace_expr, trace_symbol, TraceCtx};
use std::path::{Path, PathBuf};
use taint_ast::{normalize_var_name, Node, Symbol};
use taint_core::{Verdict, VerdictCode, MAX_ANALYSIS_DEPTH};
use tracing::{debug, warn};

/// Entry point used by the sink dispatcher: traces a full sink-argument
/// *expression* (which may be a `BinaryOp`, `ArrayOffset` or other shape
/// [`Symbol::from_node`] cannot represent directly) through `nodes`, then
/// falls through to [`trace_deep`]'s include-following for the case where
/// that first pass bottoms out `UNKNOWN` — e.g. `eval($shared)` where
/// `$shared` is defined only in a file reached through an earlier
/// `include`. The expression itself cannot be carried across the file
/// boundary, so once include-following kicks in, tracing continues by the
/// origin *name* [`trace_deep`] reports, exactly as a same-file re-entry
/// on an assignment chain would.
pub fn trace_deep_expr(expr: &Node, nodes: &[Node], ctx: &TraceCtx, file_dir: &Path) -> Verdict {
    let verdict = trace_expr(expr, nodes, ctx);
    if verdict.code != VerdictCode::Unknown {
        return verdict;
    }
    let symbol = Symbol::from_node(expr)
        .unwrap_or_else(|| Symbol::Var(normalize_var_name(&verdict.origin)));
    trace_deep(symbol, nodes, ctx, file_dir, 1)
}

/// Traces `symbol` through `nodes`, then — if the result is still
/// `UNKNOWN` and the scope contains an `include`/`require` — re-parses the
/// included file and continues the trace there. `depth` counts include
/// hops; exceeding [`MAX_ANALYSIS_DEPTH`] degrades to `UNCONTROLLED` rather
/// than recursing further (spec §2.8, §7 `DepthExceeded`).
pub fn trace_deep(symbol: Symbol, nodes: &[Node], ctx: &TraceCtx, file_dir: &Path, depth: usize) -> Verdict {
    if depth > MAX_ANALYSIS_DEPTH {
        warn!(depth, limit = MAX_ANALYSIS_DEPTH, "analysis depth exceeded");
        return Verdict::uncontrolled(symbol.display(), 0);
    }

    let verdict = trace_symbol(symbol.clone(), nodes, ctx);
    if verdict.code != VerdictCode::Unknown {
        return verdict;
    }

    let Some(Node::Include { path, .. }) = nodes.iter().rev().find(|n| matches!(n, Node::Include { .. })) else {
        return verdict;
    };

    let defines = collect_defines(nodes);
    let resolved = match resolve_include_path(path, &defines, file_dir) {
        Ok(p) => p,
        Err(err) => {
            warn!(%err, "include path could not be resolved");
            return verdict;
        }
    };

    let source = match read_lenient(&resolved) {
        Ok(text) => text,
        Err(err) => {
            warn!(path = %resolved.display(), %err, "could not open include target");
            return verdict;
        }
    };

    let included_nodes = match taint_ast::parse(&source) {
        Ok(nodes) => nodes,
        Err(err) => {
            warn!(%err, path = %resolved.display(), "include target failed to parse");
            return verdict;
        }
    };

    debug!(path = %resolved.display(), depth, "following include");
    let included_dir = resolved.parent().map(Path::to_path_buf).unwrap_or_else(|| file_dir.to_path_buf());
    trace_deep(symbol, &included_nodes, ctx, &included_dir, depth + 1)
}

/// Reads a PHP source file tolerating non-UTF-8 bytes, since a sanitizer
/// scan should not abort just because one included file has a stray byte
/// in a comment or string literal.
fn read_lenient(path: &Path) -> std::io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use taint_core::RepairFunctions;

    #[test]
    fn depth_ceiling_degrades_to_uncontrolled() {
        let ctx = TraceCtx::new(1, RepairFunctions::default());
        let verdict = trace_deep(Symbol::Var("$x".into()), &[], &ctx, Path::new("."), MAX_ANALYSIS_DEPTH + 1);
        assert_eq!(verdict.code, VerdictCode::Uncontrolled);
    }

    #[test]
    fn follows_include_into_another_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("lib.php"), "<?php $shared = $_GET['q']; ?>").unwrap();
        let main_src = "<?php include 'lib.php'; eval($shared); ?>";
        let nodes = taint_ast::parse(main_src).unwrap();
        let ctx = TraceCtx::new(2, RepairFunctions::default());
        let back_slice = &nodes[..1];
        let verdict = trace_deep(Symbol::Var("$shared".into()), back_slice, &ctx, dir.path(), 0);
        assert_eq!(verdict.code, VerdictCode::Controlled);
    }

    #[test]
    fn trace_deep_expr_follows_include_for_a_plain_variable_argument() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("lib.php"), "<?php $shared = $_GET['q']; ?>").unwrap();
        let main_src = "<?php include 'lib.php'; eval($shared); ?>";
        let nodes = taint_ast::parse(main_src).unwrap();
        let ctx = TraceCtx::new(2, RepairFunctions::default());
        let back_slice = &nodes[..1];
        let arg = Node::Variable {
            name: "$shared".into(),
            line: 2,
        };
        let verdict = trace_deep_expr(&arg, back_slice, &ctx, dir.path());
        assert_eq!(verdict.code, VerdictCode::Controlled);
    }

    #[test]
    fn unknown_without_include_stays_unknown() {
        let nodes = taint_ast::parse("<?php $x = $y; eval($x); ?>").unwrap();
        let ctx = TraceCtx::new(2, RepairFunctions::default());
        let verdict = trace_deep(Symbol::Var("$x".into()), &nodes[..1], &ctx, Path::new("."), 0);
        assert_eq!(verdict.code, VerdictCode::Unknown);
    }
}
