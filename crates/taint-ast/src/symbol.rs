//! The value tracked through a backward trace.

use crate::nodes::Node;

/// The symbol a tracer call is currently following. Built from (and
/// compared against) AST expressions, but deliberately decoupled from
/// `Node` so the tracer never has to pattern-match a full expression tree
/// just to ask "is this the variable I'm tracking".
///
/// `Var` holds a flat variable name by construction — there is no way to
/// nest a `Symbol` inside another `Symbol::Var`, which is what satisfies
/// the "collapse `Var(Var(x))`" invariant: the collapse happens once, at
/// construction time in [`Symbol::from_node`], rather than being an
/// ongoing concern every time a symbol is classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Symbol {
    Var(String),
    ArrayElem(String, String),
    ObjProp(String, String),
    CallResult(String, Vec<String>),
    NewInstance(String, Vec<String>),
    Constant(String),
}

impl Symbol {
    /// Build a tracked symbol from an expression node. Returns `None` for
    /// node kinds that cannot be the target of a backward trace on their
    /// own (e.g. `If`, `Function`).
    pub fn from_node(node: &Node) -> Option<Symbol> {
        match node {
            Node::Variable { name, .. } => Some(Symbol::Var(normalize_var_name(name))),
            Node::ArrayOffset { base, key, .. } => {
                let base_name = variable_base_name(base)?;
                let key_repr = key
                    .as_ref()
                    .map(|k| describe(k))
                    .unwrap_or_else(|| "[]".to_string());
                Some(Symbol::ArrayElem(base_name, key_repr))
            }
            Node::ObjectProperty { base, prop, .. } => {
                let base_name = variable_base_name(base)?;
                Some(Symbol::ObjProp(base_name, prop.clone()))
            }
            Node::FunctionCall { name, args, .. } => Some(Symbol::CallResult(
                name.clone(),
                args.iter().map(describe).collect(),
            )),
            Node::MethodCall { method, args, .. } => Some(Symbol::CallResult(
                method.clone(),
                args.iter().map(describe).collect(),
            )),
            Node::New {
                class_name, args, ..
            } => Some(Symbol::NewInstance(
                class_name.clone(),
                args.iter().map(describe).collect(),
            )),
            Node::Constant { name, .. } => Some(Symbol::Constant(name.clone())),
            _ => None,
        }
    }

    pub fn as_var_name(&self) -> Option<&str> {
        match self {
            Symbol::Var(name) => Some(name.as_str()),
            _ => None,
        }
    }

    /// Human-readable rendering used as a `Finding`'s `source` field.
    pub fn display(&self) -> String {
        match self {
            Symbol::Var(name) => name.clone(),
            Symbol::ArrayElem(base, key) => format!("{base}[{key}]"),
            Symbol::ObjProp(base, prop) => format!("{base}->{prop}"),
            Symbol::CallResult(name, _) => format!("{name}(...)"),
            Symbol::NewInstance(class_name, _) => format!("new {class_name}(...)"),
            Symbol::Constant(name) => name.clone(),
        }
    }
}

/// Collapses any accidental `Var(Var(x))`-shaped textual wrapping. Names
/// coming out of the parser are already flat, but callers that build a
/// `Symbol::Var` from a formatted string (e.g. when re-entering the tracer
/// recursively with a previous symbol's display form) go through here so
/// the invariant holds regardless of where the name originated.
pub fn normalize_var_name(name: &str) -> String {
    let mut current = name;
    while let Some(inner) = current
        .strip_prefix("Var(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        current = inner;
    }
    current.to_string()
}

fn variable_base_name(node: &Node) -> Option<String> {
    match node {
        Node::Variable { name, .. } => Some(normalize_var_name(name)),
        Node::ArrayOffset { base, .. } => variable_base_name(base),
        Node::ObjectProperty { base, .. } => variable_base_name(base),
        _ => None,
    }
}

/// A short textual description of an expression, used only for diagnostic
/// display (call-site argument lists) — never reparsed.
pub fn describe(node: &Node) -> String {
    match node {
        Node::Variable { name, .. } => name.clone(),
        Node::Literal { value, .. } => value.clone(),
        Node::Constant { name, .. } => name.clone(),
        other => format!("<{:?}>", std::mem::discriminant(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_nested_var_wrapping() {
        assert_eq!(normalize_var_name("Var(Var($x))"), "$x");
        assert_eq!(normalize_var_name("$x"), "$x");
    }

    #[test]
    fn array_elem_symbol_from_node() {
        let node = Node::ArrayOffset {
            base: Box::new(Node::Variable {
                name: "$arr".into(),
                line: 1,
            }),
            key: Some(Box::new(Node::Literal {
                value: "k".into(),
                line: 1,
            })),
            line: 1,
        };
        let symbol = Symbol::from_node(&node).unwrap();
        assert_eq!(symbol, Symbol::ArrayElem("$arr".into(), "k".into()));
    }

    #[test]
    fn obj_prop_symbol_from_node() {
        let node = Node::ObjectProperty {
            base: Box::new(Node::Variable {
                name: "$obj".into(),
                line: 2,
            }),
            prop: "name".into(),
            line: 2,
        };
        assert_eq!(
            Symbol::from_node(&node).unwrap(),
            Symbol::ObjProp("$obj".into(), "name".into())
        );
    }
}
