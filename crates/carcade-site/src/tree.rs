//! Site tree mirroring the content directory.
//!
//! # Architecture
//!
//! Nodes are stored in a flat `Vec<Node>` with parent/children relationships
//! tracked by [`NodeId`] indices. The root always lives at index 0 and is
//! named [`ROOT_NAME`]. Pipeline stages rewrite children lists in place; node
//! ids stay valid for the lifetime of the tree.

use std::fs;
use std::path::{Path, PathBuf};

use crate::context::Context;
use crate::error::SiteError;

/// Reserved name of the root node.
pub const ROOT_NAME: &str = "ROOT";

/// Index of a node inside its [`SiteTree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Position of the node in the arena.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// What a node stands for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// A content directory.
    Content,
    /// One page of a paginated listing (1-based).
    Page {
        /// Page number.
        index: usize,
    },
}

/// One entry of the site tree.
#[derive(Debug)]
pub struct Node {
    name: String,
    source_dir: PathBuf,
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    context: Option<Context>,
}

impl Node {
    /// Path segment relative to the parent.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directory holding this node's content fragments.
    #[must_use]
    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Page number if this is a pagination node.
    #[must_use]
    pub fn page_index(&self) -> Option<usize> {
        match self.kind {
            NodeKind::Page { index } => Some(index),
            NodeKind::Content => None,
        }
    }

    #[must_use]
    pub fn is_page(&self) -> bool {
        self.page_index().is_some()
    }

    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Own context, once filled.
    #[must_use]
    pub fn context(&self) -> Option<&Context> {
        self.context.as_ref()
    }
}

/// Rooted, acyclic tree of content nodes.
#[derive(Debug)]
pub struct SiteTree {
    nodes: Vec<Node>,
}

impl SiteTree {
    /// Create a tree holding only the root node.
    #[must_use]
    pub fn new(source_dir: impl Into<PathBuf>) -> Self {
        Self {
            nodes: vec![Node {
                name: ROOT_NAME.to_owned(),
                source_dir: source_dir.into(),
                kind: NodeKind::Content,
                parent: None,
                children: Vec::new(),
                context: None,
            }],
        }
    }

    /// Mirror `content_root` into a tree.
    ///
    /// Every subdirectory becomes one node; files are left for the fragment
    /// reader. Sibling order is filesystem iteration order.
    ///
    /// # Errors
    ///
    /// Returns [`SiteError::Io`] if `content_root` or any subdirectory
    /// cannot be read.
    pub fn build(content_root: &Path) -> Result<Self, SiteError> {
        let mut tree = Self::new(content_root);
        let root = tree.root();
        tree.scan_directory(root, content_root)?;
        tracing::debug!(nodes = tree.len(), root = %content_root.display(), "Built site tree");
        Ok(tree)
    }

    fn scan_directory(&mut self, parent: NodeId, dir: &Path) -> Result<(), SiteError> {
        let entries = fs::read_dir(dir).map_err(|e| SiteError::io(dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| SiteError::io(dir, e))?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let child = self.add_child(parent, name, path.clone(), NodeKind::Content);
            self.scan_directory(child, &path)?;
        }
        Ok(())
    }

    /// Root node id.
    #[must_use]
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Number of nodes, root included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// A tree always holds at least its root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Get a node by id.
    ///
    /// # Panics
    ///
    /// Panics if `id` belongs to another tree.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    #[must_use]
    pub fn name(&self, id: NodeId) -> &str {
        &self.nodes[id.0].name
    }

    /// Find a direct child by exact name.
    #[must_use]
    pub fn child_by_name(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|&child| self.name(child) == name)
    }

    /// Canonical path: `/`-joined names from below the root down to `id`.
    ///
    /// The root's path is the empty string.
    #[must_use]
    pub fn path(&self, id: NodeId) -> String {
        let mut segments = Vec::new();
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            segments.push(self.name(current));
            current = parent;
        }
        segments.reverse();
        segments.join("/")
    }

    /// Path with pagination segments removed.
    ///
    /// A page node maps to the path of the listing it belongs to, and nodes
    /// below a page are addressed as if the page were not there.
    #[must_use]
    pub fn content_path(&self, id: NodeId) -> String {
        let mut segments = Vec::new();
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            if !self.node(current).is_page() {
                segments.push(self.name(current));
            }
            current = parent;
        }
        segments.reverse();
        segments.join("/")
    }

    /// Append a new node under `parent`.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        source_dir: impl Into<PathBuf>,
        kind: NodeKind,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            name: name.into(),
            source_dir: source_dir.into(),
            kind,
            parent: Some(parent),
            children: Vec::new(),
            context: None,
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Replace the children of `id` wholesale and point them back at it.
    pub(crate) fn set_children(&mut self, id: NodeId, children: Vec<NodeId>) {
        for &child in &children {
            self.nodes[child.0].parent = Some(id);
        }
        self.nodes[id.0].children = children;
    }

    pub(crate) fn take_children(&mut self, id: NodeId) -> Vec<NodeId> {
        std::mem::take(&mut self.nodes[id.0].children)
    }

    pub(crate) fn set_context(&mut self, id: NodeId, context: Context) -> Result<(), SiteError> {
        if self.nodes[id.0].context.is_some() {
            return Err(SiteError::ContextAlreadyFilled(self.path(id)));
        }
        self.nodes[id.0].context = Some(context);
        Ok(())
    }

    /// Node ids in post-order (children before their parent), root last.
    #[must_use]
    pub fn post_order(&self) -> Vec<NodeId> {
        fn visit(tree: &SiteTree, id: NodeId, out: &mut Vec<NodeId>) {
            for &child in tree.children(id) {
                visit(tree, child, out);
            }
            out.push(id);
        }

        let mut out = Vec::with_capacity(self.nodes.len());
        visit(self, self.root(), &mut out);
        out
    }

    /// Paths of every reachable node except the root.
    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        self.post_order()
            .into_iter()
            .filter(|&id| id != self.root())
            .map(|id| self.path(id))
            .collect()
    }
}
