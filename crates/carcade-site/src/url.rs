//! Node path to URL resolution.
//!
//! Pagination nodes are routing hops: a path may skip over them to reach
//! one of their children, and they contribute no URL segment unless they are
//! the target themselves. Page 1 shares its parent's URL.

use crate::error::SiteError;
use crate::tree::{NodeId, SiteTree};

/// Resolves node paths to site URLs.
#[derive(Debug, Clone, Default)]
pub struct UrlResolver {
    default_language: Option<String>,
    home: Option<String>,
}

impl UrlResolver {
    /// Create a resolver.
    ///
    /// URLs for `default_language` carry no language prefix. The node at
    /// `home` contributes an empty segment.
    #[must_use]
    pub fn new(default_language: Option<String>, home: Option<String>) -> Self {
        Self {
            default_language,
            home: home.map(|h| h.trim_matches('/').to_owned()),
        }
    }

    /// Walk `path` from the root, returning the nodes visited after the
    /// root, page hops included.
    ///
    /// # Errors
    ///
    /// Returns [`SiteError::UnknownPath`] if any segment cannot be found.
    pub fn resolve(&self, tree: &SiteTree, path: &str) -> Result<Vec<NodeId>, SiteError> {
        let mut chain = Vec::new();
        let mut current = tree.root();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            if let Some(child) = tree.child_by_name(current, segment) {
                chain.push(child);
                current = child;
            } else if let Some(hops) = find_through_pages(tree, current, segment) {
                current = *hops.last().ok_or_else(|| SiteError::UnknownPath(path.to_owned()))?;
                chain.extend(hops);
            } else {
                return Err(SiteError::UnknownPath(path.to_owned()));
            }
        }
        Ok(chain)
    }

    /// URL of the node at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SiteError::UnknownPath`] if `path` does not name a node.
    pub fn url_for(
        &self,
        tree: &SiteTree,
        path: &str,
        language: Option<&str>,
    ) -> Result<String, SiteError> {
        let chain = self.resolve(tree, path)?;
        let last = chain.len().checked_sub(1);
        let slugs: Vec<&str> = chain
            .iter()
            .enumerate()
            .map(|(position, &id)| self.slug(tree, id, Some(position) == last))
            .filter(|slug| !slug.is_empty())
            .collect();

        let mut url = String::from("/");
        if let Some(language) = language
            && self.default_language.as_deref() != Some(language)
        {
            url.push_str(language);
            url.push('/');
        }
        if !slugs.is_empty() {
            url.push_str(&slugs.join("/"));
            url.push('/');
        }
        Ok(url)
    }

    fn slug<'t>(&self, tree: &'t SiteTree, id: NodeId, is_target: bool) -> &'t str {
        let node = tree.node(id);
        match node.page_index() {
            Some(1) => "",
            Some(_) if !is_target => "",
            Some(_) => node.name(),
            None if self.home.as_deref() == Some(tree.path(id).as_str()) => "",
            None => node.name(),
        }
    }
}

/// Search below the page children of `from` for a node named `name`.
///
/// Returns the page hops followed by the match.
fn find_through_pages(tree: &SiteTree, from: NodeId, name: &str) -> Option<Vec<NodeId>> {
    for &page in tree.children(from) {
        if !tree.node(page).is_page() {
            continue;
        }
        if let Some(found) = tree.child_by_name(page, name) {
            return Some(vec![page, found]);
        }
        if let Some(mut hops) = find_through_pages(tree, page, name) {
            hops.insert(0, page);
            return Some(hops);
        }
    }
    None
}
