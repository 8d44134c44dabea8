//! Sibling ordering.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::SiteError;
use crate::rules::{PatternRules, children_key};
use crate::tree::{NodeId, SiteTree};

/// Caller-supplied ordering: receives the current children, returns a
/// permutation of them.
pub type OrderFn = dyn Fn(&SiteTree, &[NodeId]) -> Vec<NodeId> + Send + Sync;

/// How the children of a node are ordered.
#[derive(Clone)]
pub enum OrderingDirective {
    /// Lexicographic by name.
    Alphabetical,
    /// Listed names first, in list order; the rest after them, in input order.
    Explicit(Vec<String>),
    /// Arbitrary function. Its output is not validated.
    Custom(Arc<OrderFn>),
}

impl fmt::Debug for OrderingDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alphabetical => f.write_str("Alphabetical"),
            Self::Explicit(names) => f.debug_tuple("Explicit").field(names).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl OrderingDirective {
    /// Interpret a configuration value.
    ///
    /// Accepts the string `"alphabetically"` or an array of strings.
    ///
    /// # Errors
    ///
    /// Returns [`SiteError::UnknownOrdering`] for any other shape.
    pub fn from_value(pattern: &str, value: &Value) -> Result<Self, SiteError> {
        let unknown = || SiteError::UnknownOrdering {
            pattern: pattern.to_owned(),
            found: value.to_string(),
        };
        match value {
            Value::String(s) if s == "alphabetically" => Ok(Self::Alphabetical),
            Value::Array(items) => items
                .iter()
                .map(|item| item.as_str().map(str::to_owned))
                .collect::<Option<Vec<_>>>()
                .map(Self::Explicit)
                .ok_or_else(unknown),
            _ => Err(unknown()),
        }
    }

    /// Wrap a closure as a [`OrderingDirective::Custom`].
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&SiteTree, &[NodeId]) -> Vec<NodeId> + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }

    fn apply(&self, tree: &SiteTree, children: Vec<NodeId>) -> Vec<NodeId> {
        match self {
            Self::Alphabetical => {
                let mut sorted = children;
                sorted.sort_by(|&a, &b| tree.name(a).cmp(tree.name(b)));
                sorted
            }
            Self::Explicit(names) => {
                let mut sorted = children;
                sorted.sort_by_key(|&id| {
                    names
                        .iter()
                        .position(|name| name == tree.name(id))
                        .unwrap_or(names.len())
                });
                sorted
            }
            Self::Custom(f) => f(tree, &children),
        }
    }
}

/// Reorder the children of every node according to `rules`.
///
/// Each node is looked up by [`children_key`] of its own path. Nodes without
/// a matching rule keep their current order.
pub fn sort_tree(tree: &mut SiteTree, rules: &PatternRules<OrderingDirective>) {
    let mut stack = vec![tree.root()];
    while let Some(id) = stack.pop() {
        if let Some(directive) = rules.find(&children_key(&tree.path(id))) {
            let children = tree.take_children(id);
            let sorted = directive.apply(tree, children);
            tree.set_children(id, sorted);
        }
        stack.extend(tree.children(id).iter().rev().copied());
    }
}
