//! Site tree pipeline for Carcade.
//!
//! This crate turns a content directory into a fully composed [`SiteTree`]:
//!
//! 1. [`SiteTree::build`] mirrors the directory structure.
//! 2. [`sort_tree`] applies ordering rules to every sibling list.
//! 3. [`paginate_tree`] splits matching sibling lists into page nodes.
//! 4. [`fill_tree`] composes each node's context from its fragments.
//!
//! [`UrlResolver`] maps node paths to URLs afterwards.
//!
//! # Quick Start
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use std::path::Path;
//! use carcade_site::{FsFragments, SiteRules, UrlResolver, build_site_tree};
//!
//! let rules = SiteRules::default();
//! let tree = build_site_tree(Path::new("pages"), &rules, &FsFragments, None)?;
//! let url = UrlResolver::default().url_for(&tree, "blog", None)?;
//! # Ok(())
//! # }
//! ```

pub mod context;
mod error;
mod fragments;
mod ordering;
mod pagination;
mod rules;
mod tree;
mod url;

use std::num::NonZeroUsize;
use std::path::Path;

pub use context::{Context, ContextEntry, ContextRef, fill_tree};
pub use error::SiteError;
pub use fragments::{FragmentSource, FsFragments, render_markdown};
pub use ordering::{OrderFn, OrderingDirective, sort_tree};
pub use pagination::{DEFAULT_PAGE_NAME, page_name, page_size, paginate_tree};
pub use rules::{PatternRules, children_key};
pub use tree::{Node, NodeId, NodeKind, ROOT_NAME, SiteTree};
pub use url::UrlResolver;

/// Ordering and pagination rules for one pipeline run.
#[derive(Debug, Clone)]
pub struct SiteRules {
    /// Sibling ordering, keyed by [`children_key`].
    pub ordering: PatternRules<OrderingDirective>,
    /// Page sizes, keyed by [`children_key`].
    pub pagination: PatternRules<NonZeroUsize>,
    /// Page name template; `{}` is replaced by the page index.
    pub page_name: String,
}

impl Default for SiteRules {
    fn default() -> Self {
        Self {
            ordering: PatternRules::new(),
            pagination: PatternRules::new(),
            page_name: DEFAULT_PAGE_NAME.to_owned(),
        }
    }
}

/// Run the whole pipeline for one language.
///
/// # Errors
///
/// Returns an error if the content directory cannot be read or a fragment
/// fails to parse.
pub fn build_site_tree<S>(
    content_root: &Path,
    rules: &SiteRules,
    source: &S,
    language: Option<&str>,
) -> Result<SiteTree, SiteError>
where
    S: FragmentSource + ?Sized,
{
    let mut tree = SiteTree::build(content_root)?;
    sort_tree(&mut tree, &rules.ordering);
    paginate_tree(&mut tree, &rules.pagination, &rules.page_name);
    fill_tree(&mut tree, source, language)?;
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn blog_rules() -> SiteRules {
        SiteRules {
            ordering: PatternRules::new()
                .with(
                    "blog/*",
                    OrderingDirective::from_value("blog/*", &json!("alphabetically")).unwrap(),
                )
                .unwrap(),
            pagination: PatternRules::new()
                .with("blog/*", page_size("blog/*", 2).unwrap())
                .unwrap(),
            ..SiteRules::default()
        }
    }

    #[test]
    fn test_blog_scenario() {
        let temp = tempfile::tempdir().unwrap();
        for name in ["d", "a", "g", "c", "f", "b", "e"] {
            fs::create_dir_all(temp.path().join("blog").join(name)).unwrap();
        }

        let tree = build_site_tree(temp.path(), &blog_rules(), &FsFragments, None).unwrap();

        let blog = tree.child_by_name(tree.root(), "blog").unwrap();
        let pages: Vec<(&str, Vec<&str>)> = tree
            .children(blog)
            .iter()
            .map(|&page| {
                let names = tree.children(page).iter().map(|&c| tree.name(c)).collect();
                (tree.name(page), names)
            })
            .collect();
        assert_eq!(
            pages,
            vec![
                ("page1", vec!["a", "b"]),
                ("page2", vec!["c", "d"]),
                ("page3", vec!["e", "f"]),
                ("page4", vec!["g"]),
            ]
        );

        let resolver = UrlResolver::default();
        assert_eq!(
            resolver.url_for(&tree, "blog", None).unwrap(),
            resolver.url_for(&tree, "blog/page1", None).unwrap()
        );
    }

    #[test]
    fn test_pipeline_fills_context_from_fragments() {
        let temp = tempfile::tempdir().unwrap();
        let post = temp.path().join("blog/post");
        fs::create_dir_all(&post).unwrap();
        fs::write(post.join("body.md"), "Text").unwrap();
        fs::write(post.join("meta.yaml"), "title: Post").unwrap();

        let tree = build_site_tree(temp.path(), &SiteRules::default(), &FsFragments, None).unwrap();

        let blog = tree.child_by_name(tree.root(), "blog").unwrap();
        let post = tree.child_by_name(blog, "post").unwrap();
        let context = ContextRef::new(&tree, post);
        assert_eq!(context.get_str("body"), Some("<p>Text</p>\n"));
        assert_eq!(context.get_str("title"), Some("Post"));
        assert_eq!(context.get_str(context::PATH), Some("blog/post"));
    }

    #[test]
    fn test_pipeline_missing_root() {
        let temp = tempfile::tempdir().unwrap();
        let err = build_site_tree(
            &temp.path().join("missing"),
            &SiteRules::default(),
            &FsFragments,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, SiteError::Io { .. }));
    }
}
