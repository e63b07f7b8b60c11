//! The plugin registry and path resolution.
//!
//! The registry is the root of the hierarchy: an insertion-ordered map of
//! namespace to plugin root entry, itself exposed as a group entry so
//! consumers traverse it like anything else.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::RwLock;
use regex::Regex;
use tracing::instrument;

use crate::cache::Cache;
use crate::context::Context;
use crate::entry::{Action, ActionSet, Entry, EntryBase, EntryId, Group};
use crate::error::{Error, Result};
use crate::schema::EntrySchema;

fn namespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new("^[0-9a-zA-Z_-]+$").expect("static pattern"))
}

/// Root of the hierarchy: namespace → plugin root.
pub struct Registry {
    base: EntryBase,
    plugins: RwLock<IndexMap<String, Arc<dyn Entry>>>,
}

impl Registry {
    /// Create an empty registry, pre-placed at the hierarchy root.
    pub fn new() -> Arc<Self> {
        let base = EntryBase::new("registry");
        base.set_id(EntryId::root());
        Arc::new(Self {
            base,
            plugins: RwLock::new(IndexMap::new()),
        })
    }

    /// Register a plugin root under `namespace`. The namespace must match
    /// `[0-9a-zA-Z_-]+`, equal the root's c-name (it is the root's sibling
    /// key under the registry), and be unused; the root entry is placed at
    /// `/<namespace>`.
    pub fn register(&self, namespace: &str, root: Arc<dyn Entry>) -> Result<()> {
        if !namespace_re().is_match(namespace) {
            return Err(Error::invariant(
                root.schema().type_id(),
                format!("invalid plugin namespace {namespace:?}"),
            ));
        }
        if root.base().cname() != namespace {
            return Err(Error::invariant(
                root.schema().type_id(),
                format!(
                    "plugin root c-name {:?} does not match namespace {namespace:?}",
                    root.base().cname()
                ),
            ));
        }
        let mut plugins = self.plugins.write();
        if plugins.contains_key(namespace) {
            return Err(Error::invariant(
                root.schema().type_id(),
                format!("plugin namespace {namespace:?} already registered"),
            ));
        }
        root.base().set_id(EntryId::root().join(namespace));
        plugins.insert(namespace.to_string(), root);
        Ok(())
    }

    /// Registered namespaces, in registration order.
    pub fn namespaces(&self) -> Vec<String> {
        self.plugins.read().keys().cloned().collect()
    }

    /// Look up a plugin root by namespace.
    pub fn plugin(&self, namespace: &str) -> Option<Arc<dyn Entry>> {
        self.plugins.read().get(namespace).cloned()
    }
}

#[async_trait]
impl Entry for Registry {
    fn base(&self) -> &EntryBase {
        &self.base
    }

    fn schema(&self) -> EntrySchema {
        let children: Vec<EntrySchema> = self
            .plugins
            .read()
            .values()
            .map(|root| root.schema())
            .collect();
        EntrySchema::of::<Registry>("registry")
            .singleton()
            .with_actions(ActionSet::empty().with(Action::List))
            .with_children(move || children.clone())
    }

    fn as_group(&self) -> Option<&dyn Group> {
        Some(self)
    }
}

#[async_trait]
impl Group for Registry {
    async fn list(&self, ctx: &Context) -> Result<Vec<Arc<dyn Entry>>> {
        ctx.check()?;
        Ok(self.plugins.read().values().cloned().collect())
    }
}

/// Resolve a slash-separated path of c-names from `root`, going through
/// the traversal cache at every step. A missing segment is `NotFound`;
/// descending into a non-group is also `NotFound` (the segment cannot
/// exist).
#[instrument(skip(ctx, cache, root), fields(path = path))]
pub async fn find_entry(
    ctx: &Context,
    cache: &Cache,
    root: &Arc<dyn Entry>,
    path: &str,
) -> Result<Arc<dyn Entry>> {
    let mut current = Arc::clone(root);
    let mut walked = String::new();
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        walked.push('/');
        walked.push_str(segment);
        let children = match cache.list(ctx, &current).await {
            Ok(children) => children,
            Err(Error::UnsupportedAction { .. }) => return Err(Error::not_found(&walked)),
            Err(err) => return Err(err),
        };
        current = children
            .iter()
            .find(|child| child.base().cname() == segment)
            .cloned()
            .ok_or_else(|| Error::not_found(&walked))?;
    }
    Ok(current)
}
