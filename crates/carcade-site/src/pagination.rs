//! Pagination node synthesis.

use std::num::NonZeroUsize;

use crate::error::SiteError;
use crate::rules::{PatternRules, children_key};
use crate::tree::{NodeKind, SiteTree};

/// Name template used when none is configured.
pub const DEFAULT_PAGE_NAME: &str = "page{}";

/// Render a page name from its template.
#[must_use]
pub fn page_name(template: &str, index: usize) -> String {
    template.replace("{}", &index.to_string())
}

/// Convert a configured page size, rejecting zero.
///
/// # Errors
///
/// Returns [`SiteError::InvalidPageSize`] when `per_page` is zero.
pub fn page_size(pattern: &str, per_page: usize) -> Result<NonZeroUsize, SiteError> {
    NonZeroUsize::new(per_page).ok_or_else(|| SiteError::InvalidPageSize(pattern.to_owned()))
}

/// Split the children of matching nodes into page nodes.
///
/// Must run after sorting. A matching node with `M` children and page size
/// `N` ends up with `ceil(M / N)` page children, each holding the next chunk
/// of the original children. Traversal continues into the new pages, whose
/// own paths are used for further lookups. The children of a page node are
/// already a chunk and are never paginated again, even when a recursive
/// pattern such as `blog/**` matches them.
pub fn paginate_tree(
    tree: &mut SiteTree,
    rules: &PatternRules<NonZeroUsize>,
    name_template: &str,
) {
    let mut stack = vec![tree.root()];
    while let Some(id) = stack.pop() {
        if !tree.node(id).is_page()
            && let Some(&per_page) = rules.find(&children_key(&tree.path(id)))
        {
            let children = tree.take_children(id);
            let source_dir = tree.node(id).source_dir().to_path_buf();
            for (offset, chunk) in children.chunks(per_page.get()).enumerate() {
                let index = offset + 1;
                let page = tree.add_child(
                    id,
                    page_name(name_template, index),
                    source_dir.clone(),
                    NodeKind::Page { index },
                );
                tree.set_children(page, chunk.to_vec());
            }
            tracing::debug!(
                path = %tree.path(id),
                pages = tree.children(id).len(),
                "Paginated children"
            );
        }
        stack.extend(tree.children(id).iter().rev().copied());
    }
}
