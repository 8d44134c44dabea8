//! Template environment and node contexts exposed to templates.
//!
//! Contexts are lazy `minijinja` objects backed by the shared [`SiteTree`]:
//! `PARENT`, `CHILDREN` and the sibling keys resolve to other node objects on
//! access, so cyclic references never get materialized.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use carcade_site::context::{PATH, ROOT};
use carcade_site::{ContextEntry, ContextRef, NodeId, SiteTree, UrlResolver};
use minijinja::value::{Enumerator, Kwargs, Object, Value};
use minijinja::{AutoEscape, Environment, ErrorKind};

use crate::i18n::Catalog;

/// Everything template functions need for one language pass.
pub(crate) struct TemplateGlobals {
    pub tree: Arc<SiteTree>,
    pub resolver: UrlResolver,
    pub language: Option<String>,
    pub catalog: Arc<Catalog>,
    pub bundles: Arc<BTreeMap<String, String>>,
}

/// Build an environment loading templates from `layouts_dir`.
pub(crate) fn create_environment(
    layouts_dir: &Path,
    globals: TemplateGlobals,
) -> Environment<'static> {
    let mut env = Environment::new();
    env.set_loader(minijinja::path_loader(layouts_dir));
    // Fragments are pre-rendered HTML.
    env.set_auto_escape_callback(|_| AutoEscape::None);

    let TemplateGlobals {
        tree,
        resolver,
        language,
        catalog,
        bundles,
    } = globals;

    env.add_global(
        "LANGUAGE",
        language.clone().map_or(Value::from(()), Value::from),
    );

    env.add_function(
        "url_for",
        move |path: String, kwargs: Kwargs| -> Result<String, minijinja::Error> {
            let requested: Option<String> = kwargs.get("language")?;
            kwargs.assert_all_used()?;
            let language = requested.or_else(|| language.clone());
            resolver
                .url_for(&tree, &path, language.as_deref())
                .map_err(|e| minijinja::Error::new(ErrorKind::InvalidOperation, e.to_string()))
        },
    );

    let c = Arc::clone(&catalog);
    env.add_function("_", move |message: String| c.gettext(&message).to_owned());
    let c = Arc::clone(&catalog);
    env.add_function("gettext", move |message: String| {
        c.gettext(&message).to_owned()
    });
    env.add_function(
        "ngettext",
        move |singular: String, plural: String, n: i64| {
            catalog.ngettext(&singular, &plural, n).to_owned()
        },
    );

    env.add_function(
        "asset_url",
        move |name: String| -> Result<String, minijinja::Error> {
            bundles.get(&name).cloned().ok_or_else(|| {
                minijinja::Error::new(
                    ErrorKind::InvalidOperation,
                    format!("unknown asset bundle '{name}'"),
                )
            })
        },
    );

    env
}

/// Render `template` for the node `id`.
pub(crate) fn render_node(
    env: &Environment<'_>,
    template: &str,
    tree: &Arc<SiteTree>,
    id: NodeId,
) -> Result<String, minijinja::Error> {
    let context = RenderContext {
        node: NodeContext::new(Arc::clone(tree), id),
        root: NodeContext::new(Arc::clone(tree), tree.root()),
    };
    env.get_template(template)?
        .render(Value::from_object(context))
}

/// One node's context as a template value.
pub(crate) struct NodeContext {
    tree: Arc<SiteTree>,
    id: NodeId,
}

impl NodeContext {
    pub(crate) fn new(tree: Arc<SiteTree>, id: NodeId) -> Self {
        Self { tree, id }
    }

    fn view(&self) -> ContextRef<'_> {
        ContextRef::new(&self.tree, self.id)
    }

    fn wrap(&self, id: NodeId) -> Value {
        Value::from_object(Self::new(Arc::clone(&self.tree), id))
    }

    fn lookup(&self, key: &str) -> Option<Value> {
        let value = match self.view().get(key)? {
            ContextEntry::Value(value) => Value::from_serialize(value),
            ContextEntry::Node(node) => self.wrap(node.id()),
            ContextEntry::Nodes(nodes) => {
                Value::from(nodes.iter().map(|n| self.wrap(n.id())).collect::<Vec<_>>())
            }
            ContextEntry::None => Value::from(()),
        };
        Some(value)
    }

    fn key_values(&self) -> Vec<Value> {
        self.view().keys().into_iter().map(Value::from).collect()
    }
}

impl fmt::Debug for NodeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeContext")
            .field("path", &self.tree.path(self.id))
            .finish()
    }
}

impl Object for NodeContext {
    fn get_value(self: &Arc<Self>, key: &Value) -> Option<Value> {
        self.lookup(key.as_str()?)
    }

    fn enumerate(self: &Arc<Self>) -> Enumerator {
        Enumerator::Values(self.key_values())
    }

    fn render(self: &Arc<Self>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = self.view().get_str(PATH).unwrap_or_default();
        write!(f, "<node '{path}'>")
    }
}

/// Top-level render context: the node's keys plus `ROOT`.
#[derive(Debug)]
struct RenderContext {
    node: NodeContext,
    root: NodeContext,
}

impl Object for RenderContext {
    fn get_value(self: &Arc<Self>, key: &Value) -> Option<Value> {
        let key = key.as_str()?;
        if key == ROOT {
            return Some(self.root.wrap(self.root.id));
        }
        self.node.lookup(key)
    }

    fn enumerate(self: &Arc<Self>) -> Enumerator {
        let mut keys = self.node.key_values();
        keys.push(Value::from(ROOT));
        Enumerator::Values(keys)
    }
}
