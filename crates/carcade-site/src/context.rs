//! Per-node render context.
//!
//! Filling runs post-order and stores each node's own mapping: its content
//! fragments plus [`NAME`], [`PATH`] and [`LANGUAGE`]. The relational keys
//! ([`CHILDREN`], [`PARENT`], [`SIBLINGS`], [`PREV_SIBLING`],
//! [`NEXT_SIBLING`]) are not copied into the mapping. [`ContextRef`] answers
//! them from the arena, so a parent and its children reference each other
//! without an ownership cycle.

use serde_json::{Map, Value};

use crate::error::SiteError;
use crate::fragments::FragmentSource;
use crate::tree::{NodeId, SiteTree};

/// Key/value data of one node.
pub type Context = Map<String, Value>;

pub const NAME: &str = "NAME";
pub const PATH: &str = "PATH";
pub const LANGUAGE: &str = "LANGUAGE";
pub const CHILDREN: &str = "CHILDREN";
pub const PARENT: &str = "PARENT";
pub const SIBLINGS: &str = "SIBLINGS";
pub const PREV_SIBLING: &str = "PREV_SIBLING";
pub const NEXT_SIBLING: &str = "NEXT_SIBLING";
/// Root context, added by the renderer to every render call.
pub const ROOT: &str = "ROOT";

/// Keys resolved from the tree structure rather than stored per node.
pub const RELATIONAL_KEYS: [&str; 5] = [CHILDREN, PARENT, SIBLINGS, PREV_SIBLING, NEXT_SIBLING];

/// Compose the context of every node, children before parents.
///
/// Reserved keys override fragment keys of the same name.
///
/// # Errors
///
/// Returns an error if a fragment cannot be read, or if the tree was
/// already filled.
pub fn fill_tree<S>(tree: &mut SiteTree, source: &S, language: Option<&str>) -> Result<(), SiteError>
where
    S: FragmentSource + ?Sized,
{
    let language_value = language.map_or(Value::Null, |l| Value::String(l.to_owned()));
    for id in tree.post_order() {
        let mut context = source.read(tree.node(id).source_dir(), language)?;
        context.insert(NAME.to_owned(), Value::String(tree.name(id).to_owned()));
        context.insert(PATH.to_owned(), Value::String(tree.path(id)));
        context.insert(LANGUAGE.to_owned(), language_value.clone());
        for key in RELATIONAL_KEYS {
            context.remove(key);
        }
        tree.set_context(id, context)?;
    }
    Ok(())
}

/// Value found under a context key.
#[derive(Debug, Clone)]
pub enum ContextEntry<'a> {
    /// Plain data from fragments or reserved scalar keys.
    Value(&'a Value),
    /// Another node's context.
    Node(ContextRef<'a>),
    /// An ordered list of node contexts.
    Nodes(Vec<ContextRef<'a>>),
    /// Sentinel for a missing neighbour at the ends of a sibling list.
    None,
}

/// Borrowed view of one node's full context.
#[derive(Debug, Clone, Copy)]
pub struct ContextRef<'a> {
    tree: &'a SiteTree,
    id: NodeId,
}

impl<'a> ContextRef<'a> {
    #[must_use]
    pub fn new(tree: &'a SiteTree, id: NodeId) -> Self {
        Self { tree, id }
    }

    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Look up a key, relational keys included.
    ///
    /// The root has no [`PARENT`], [`SIBLINGS`] or neighbour keys.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<ContextEntry<'a>> {
        match key {
            CHILDREN => Some(ContextEntry::Nodes(self.children())),
            PARENT => self.parent().map(ContextEntry::Node),
            SIBLINGS => self.siblings().map(ContextEntry::Nodes),
            PREV_SIBLING => self.neighbour(-1),
            NEXT_SIBLING => self.neighbour(1),
            _ => self.own()?.get(key).map(ContextEntry::Value),
        }
    }

    /// The node's stored mapping, without relational keys.
    #[must_use]
    pub fn own(&self) -> Option<&'a Context> {
        self.tree.node(self.id).context()
    }

    /// Every key [`Self::get`] answers for this node.
    #[must_use]
    pub fn keys(&self) -> Vec<&'a str> {
        let mut keys: Vec<&str> = self
            .own()
            .map(|c| c.keys().map(String::as_str).collect())
            .unwrap_or_default();
        keys.push(CHILDREN);
        if self.tree.parent(self.id).is_some() {
            keys.extend([PARENT, SIBLINGS, PREV_SIBLING, NEXT_SIBLING]);
        }
        keys
    }

    #[must_use]
    pub fn children(&self) -> Vec<ContextRef<'a>> {
        self.refs(self.tree.children(self.id))
    }

    #[must_use]
    pub fn parent(&self) -> Option<ContextRef<'a>> {
        self.tree.parent(self.id).map(|p| Self::new(self.tree, p))
    }

    /// All children of the parent, this node included.
    #[must_use]
    pub fn siblings(&self) -> Option<Vec<ContextRef<'a>>> {
        self.tree
            .parent(self.id)
            .map(|p| self.refs(self.tree.children(p)))
    }

    fn neighbour(&self, offset: isize) -> Option<ContextEntry<'a>> {
        let parent = self.tree.parent(self.id)?;
        let siblings = self.tree.children(parent);
        let position = siblings.iter().position(|&s| s == self.id)?;
        let entry = position
            .checked_add_signed(offset)
            .and_then(|i| siblings.get(i))
            .map_or(ContextEntry::None, |&s| {
                ContextEntry::Node(Self::new(self.tree, s))
            });
        Some(entry)
    }

    fn refs(&self, ids: &[NodeId]) -> Vec<ContextRef<'a>> {
        ids.iter().map(|&id| Self::new(self.tree, id)).collect()
    }

    /// Shortcut for a string-valued key.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&'a str> {
        self.own()?.get(key)?.as_str()
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::tree::NodeKind;

    /// Returns a fixed mapping for every directory.
    struct StaticFragments(Context);

    impl FragmentSource for StaticFragments {
        fn read(&self, _dir: &Path, _language: Option<&str>) -> Result<Context, SiteError> {
            Ok(self.0.clone())
        }
    }

    fn empty() -> StaticFragments {
        StaticFragments(Context::new())
    }

    fn sample_tree() -> (SiteTree, [NodeId; 4]) {
        let mut tree = SiteTree::new("/pages");
        let root = tree.root();
        let blog = tree.add_child(root, "blog", "/pages/blog", NodeKind::Content);
        let a = tree.add_child(blog, "a", "/pages/blog/a", NodeKind::Content);
        let b = tree.add_child(blog, "b", "/pages/blog/b", NodeKind::Content);
        let c = tree.add_child(blog, "c", "/pages/blog/c", NodeKind::Content);
        (tree, [blog, a, b, c])
    }

    fn name_of(entry: &ContextEntry<'_>) -> Option<String> {
        match entry {
            ContextEntry::Node(node) => node.get_str(NAME).map(str::to_owned),
            _ => None,
        }
    }

    #[test]
    fn test_reserved_keys() {
        let (mut tree, [_, _, b, _]) = sample_tree();
        fill_tree(&mut tree, &empty(), Some("en")).unwrap();

        let context = ContextRef::new(&tree, b);
        assert_eq!(context.get_str(NAME), Some("b"));
        assert_eq!(context.get_str(PATH), Some("blog/b"));
        assert_eq!(context.get_str(LANGUAGE), Some("en"));
    }

    #[test]
    fn test_language_null_without_language() {
        let (mut tree, [blog, ..]) = sample_tree();
        fill_tree(&mut tree, &empty(), None).unwrap();

        let own = ContextRef::new(&tree, blog).own().unwrap();
        assert_eq!(own.get(LANGUAGE), Some(&Value::Null));
    }

    #[test]
    fn test_reserved_keys_win_over_fragments() {
        let (mut tree, [blog, ..]) = sample_tree();
        let mut fragments = Context::new();
        fragments.insert(NAME.to_owned(), json!("spoofed"));
        fragments.insert(CHILDREN.to_owned(), json!([]));
        fragments.insert("title".to_owned(), json!("Blog"));

        fill_tree(&mut tree, &StaticFragments(fragments), None).unwrap();

        let context = ContextRef::new(&tree, blog);
        assert_eq!(context.get_str(NAME), Some("blog"));
        assert_eq!(context.get_str("title"), Some("Blog"));
        match context.get(CHILDREN) {
            Some(ContextEntry::Nodes(children)) => assert_eq!(children.len(), 3),
            other => panic!("unexpected children: {other:?}"),
        }
    }

    #[test]
    fn test_children_in_tree_order() {
        let (mut tree, [blog, ..]) = sample_tree();
        fill_tree(&mut tree, &empty(), None).unwrap();

        let names: Vec<&str> = ContextRef::new(&tree, blog)
            .children()
            .iter()
            .filter_map(|c| c.get_str(NAME))
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_parent_and_siblings() {
        let (mut tree, [blog, a, b, c]) = sample_tree();
        fill_tree(&mut tree, &empty(), None).unwrap();

        let middle = ContextRef::new(&tree, b);
        assert_eq!(middle.parent().map(|p| p.id()), Some(blog));
        let siblings: Vec<NodeId> = middle.siblings().unwrap().iter().map(ContextRef::id).collect();
        assert_eq!(siblings, vec![a, b, c]);
        assert_eq!(name_of(&middle.get(PREV_SIBLING).unwrap()), Some("a".to_owned()));
        assert_eq!(name_of(&middle.get(NEXT_SIBLING).unwrap()), Some("c".to_owned()));
    }

    #[test]
    fn test_sibling_sentinels_at_ends() {
        let (mut tree, [_, a, _, c]) = sample_tree();
        fill_tree(&mut tree, &empty(), None).unwrap();

        let first = ContextRef::new(&tree, a);
        let last = ContextRef::new(&tree, c);
        assert!(matches!(first.get(PREV_SIBLING), Some(ContextEntry::None)));
        assert!(matches!(last.get(NEXT_SIBLING), Some(ContextEntry::None)));
    }

    #[test]
    fn test_root_has_no_parent_keys() {
        let (mut tree, [blog, ..]) = sample_tree();
        fill_tree(&mut tree, &empty(), None).unwrap();

        let root = ContextRef::new(&tree, tree.root());
        assert!(root.get(PARENT).is_none());
        assert!(root.get(SIBLINGS).is_none());
        assert!(root.get(PREV_SIBLING).is_none());
        assert!(!root.keys().contains(&PARENT));

        let child = ContextRef::new(&tree, blog);
        assert_eq!(child.parent().map(|p| p.id()), Some(tree.root()));
        assert!(child.keys().contains(&NEXT_SIBLING));
    }

    #[test]
    fn test_parent_chain_reaches_root() {
        let (mut tree, [_, a, ..]) = sample_tree();
        fill_tree(&mut tree, &empty(), None).unwrap();

        let grandparent = ContextRef::new(&tree, a)
            .parent()
            .and_then(|p| p.parent())
            .unwrap();
        assert_eq!(grandparent.get_str(NAME), Some(crate::tree::ROOT_NAME));
        assert_eq!(grandparent.get_str(PATH), Some(""));
    }

    #[test]
    fn test_fill_twice_fails() {
        let (mut tree, _) = sample_tree();
        fill_tree(&mut tree, &empty(), None).unwrap();
        let err = fill_tree(&mut tree, &empty(), None).unwrap_err();
        assert!(matches!(err, SiteError::ContextAlreadyFilled(_)));
    }
}
