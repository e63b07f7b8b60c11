//! The query walker.
//!
//! Walks the hierarchy depth-first through the traversal cache, collecting
//! entries that match a query. Before descending anywhere, the walker
//! consults the schema graph: a subtree none of whose kinds can possibly
//! match is skipped without listing it.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, instrument};

use prism_core::cache::Cache;
use prism_core::context::Context;
use prism_core::entry::{Entry, EntryId};
use prism_core::error::Result;
use prism_core::schema::SchemaGraph;

use crate::predicate::entry::EntryPredicate;
use crate::predicate::schema::KindInfo;
use crate::view::EntryView;

/// Options for a walk.
#[derive(Debug, Clone)]
pub struct WalkOptions {
    /// Maximum depth below the root to descend (the root is depth 0).
    pub max_depth: usize,
    /// Whether the root itself is a match candidate.
    pub include_root: bool,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            max_depth: usize::MAX,
            include_root: false,
        }
    }
}

impl WalkOptions {
    /// Limit the walk depth.
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Make the root a match candidate.
    pub fn with_root(mut self) -> Self {
        self.include_root = true;
        self
    }
}

/// Walk the hierarchy under `root`, returning views of every entry that
/// matches `query`, in depth-first preorder.
#[instrument(skip_all, fields(root = %root_id(root)))]
pub async fn walk(
    ctx: &Context,
    cache: &Cache,
    root: &Arc<dyn Entry>,
    query: &EntryPredicate,
    opts: WalkOptions,
) -> Result<Vec<EntryView>> {
    let graph = cache.schema(ctx, root).await?;
    let possible = subtree_can_match(&graph, query);

    let mut out = Vec::new();
    let mut stack = vec![(Arc::clone(root), 0usize)];
    while let Some((entry, depth)) = stack.pop() {
        ctx.check()?;
        let schema = entry.schema();
        let kind = KindInfo {
            type_id: schema.type_id(),
            label: schema.label(),
            actions: schema.actions(),
        };

        // Prune: no kind in this subtree can match, so neither the entry
        // nor anything below it needs a backend call.
        if possible.get(kind.type_id) == Some(&false) {
            debug!(type_id = kind.type_id, "pruned subtree");
            continue;
        }

        if (depth > 0 || opts.include_root) && query.eval_schema(&kind) {
            let view = EntryView::materialize(ctx, cache, &entry).await?;
            if query.eval_entry(&view) {
                out.push(view);
            }
        }

        if depth < opts.max_depth && entry.as_group().is_some() {
            let children = cache.list(ctx, &entry).await?;
            for child in children.iter().rev() {
                stack.push((Arc::clone(child), depth + 1));
            }
        }
    }
    Ok(out)
}

/// For every kind in the graph: can any entry of this kind, or of a kind
/// reachable below it, possibly match? Computed as a fixpoint so cyclic
/// graphs converge.
fn subtree_can_match(graph: &SchemaGraph, query: &EntryPredicate) -> HashMap<String, bool> {
    let mut possible: HashMap<String, bool> = graph
        .iter()
        .map(|(type_id, node)| {
            let kind = KindInfo::of_node(type_id, node);
            (type_id.clone(), query.eval_schema(&kind))
        })
        .collect();

    loop {
        let mut changed = false;
        for (type_id, node) in graph.iter() {
            if possible.get(type_id) == Some(&true) {
                continue;
            }
            let any_child = node
                .children
                .iter()
                .any(|child| possible.get(child) == Some(&true));
            if any_child {
                possible.insert(type_id.clone(), true);
                changed = true;
            }
        }
        if !changed {
            return possible;
        }
    }
}

fn root_id(root: &Arc<dyn Entry>) -> EntryId {
    root.base().id().cloned().unwrap_or_else(EntryId::root)
}
