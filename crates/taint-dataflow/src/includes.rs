//! Include path resolution and the constant resolver (spec §4.9).
//!
//! Constants are resolved by re-parsing the including file's own source for
//! `define()` calls on every include, rather than consulting a cached,
//! process-wide symbol table — mirroring the original's `get_filename`,
//! which always re-derives the table from `file_content` fresh.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use taint_ast::Node;
use taint_core::{AnalysisError, Result};

/// Walks `nodes` (and every nested block) collecting `define('NAME',
/// 'value')` calls into a name → value table.
pub fn collect_defines(nodes: &[Node]) -> HashMap<String, String> {
    let mut table = HashMap::new();
    collect_defines_into(nodes, &mut table);
    table
}

fn collect_defines_into(nodes: &[Node], table: &mut HashMap<String, String>) {
    for node in nodes {
        match node {
            Node::FunctionCall { name, args, .. } if name == "define" => {
                if let [key_node, value_node] = args.as_slice() {
                    if let (Node::Literal { value: key, .. }, Some(value)) =
                        (key_node, literal_string(value_node))
                    {
                        table.insert(key.clone(), value);
                    }
                }
            }
            Node::If {
                then,
                elseifs,
                otherwise,
                ..
            } => {
                collect_defines_into(then, table);
                for (_, body) in elseifs {
                    collect_defines_into(body, table);
                }
                if let Some(body) = otherwise {
                    collect_defines_into(body, table);
                }
            }
            Node::For { body, .. } | Node::While { body, .. } => collect_defines_into(body, table),
            Node::Function { body, .. } | Node::Method { body, .. } => {
                collect_defines_into(body, table)
            }
            _ => {}
        }
    }
}

fn literal_string(node: &Node) -> Option<String> {
    match node {
        Node::Literal { value, .. } => Some(value.clone()),
        _ => None,
    }
}

/// Resolves an `include`/`require` path expression to a concrete filesystem
/// path, substituting any named constants via `defines` and resolving the
/// result relative to `base_dir` (the directory of the including file).
pub fn resolve_include_path(
    path_expr: &Node,
    defines: &HashMap<String, String>,
    base_dir: &Path,
) -> Result<PathBuf> {
    let text = resolve_path_text(path_expr, defines)?;
    Ok(base_dir.join(text))
}

fn resolve_path_text(node: &Node, defines: &HashMap<String, String>) -> Result<String> {
    match node {
        Node::Literal { value, .. } => Ok(value.clone()),
        Node::Constant { name, .. } => defines
            .get(name)
            .cloned()
            .ok_or_else(|| AnalysisError::include_resolution_miss(name.clone())),
        Node::BinaryOp {
            op, left, right, ..
        } if op == "." => {
            let l = resolve_path_text(left, defines)?;
            let r = resolve_path_text(right, defines)?;
            Ok(format!("{l}{r}"))
        }
        other => Err(AnalysisError::attribute_mismatch(format!(
            "unsupported include path expression at line {}",
            other.line()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_defines_across_top_level() {
        let nodes = taint_ast::parse("<?php define('BASE', 'inc/'); ?>").unwrap();
        let table = collect_defines(&nodes);
        assert_eq!(table.get("BASE"), Some(&"inc/".to_string()));
    }

    #[test]
    fn resolves_literal_path() {
        let nodes = taint_ast::parse("<?php include 'lib.php'; ?>").unwrap();
        let Node::Include { path, .. } = &nodes[0] else {
            panic!("expected include");
        };
        let resolved = resolve_include_path(path, &HashMap::new(), Path::new("/var/www")).unwrap();
        assert_eq!(resolved, PathBuf::from("/var/www/lib.php"));
    }

    #[test]
    fn missing_constant_is_a_resolution_miss() {
        let nodes = taint_ast::parse("<?php include BASE_PATH; ?>").unwrap();
        let Node::Include { path, .. } = &nodes[0] else {
            panic!("expected include");
        };
        let err = resolve_include_path(path, &HashMap::new(), Path::new("/var/www")).unwrap_err();
        assert!(matches!(err, AnalysisError::IncludeResolutionMiss { .. }));
    }
}
