//! Materialized entry views.
//!
//! Predicates evaluate synchronously; anything that needs the backend
//! (metadata, attributes) is materialized first, through the traversal
//! cache, into an [`EntryView`].

use std::sync::Arc;

use serde_json::{Map, Value};

use prism_core::cache::Cache;
use prism_core::context::Context;
use prism_core::entry::{supported_actions, ActionSet, Attributes, Entry, EntryId};
use prism_core::error::{Error, Result};

use crate::predicate::schema::KindInfo;

/// A snapshot of one entry, sufficient to evaluate any entry predicate.
#[derive(Debug, Clone)]
pub struct EntryView {
    /// Display name.
    pub name: String,
    /// Canonical name.
    pub cname: String,
    /// Absolute id (path of c-names).
    pub path: EntryId,
    /// Attributes record.
    pub attributes: Attributes,
    /// Supported actions.
    pub actions: ActionSet,
    /// Structured metadata.
    pub metadata: Map<String, Value>,
    /// Schema type-id.
    pub type_id: String,
    /// Schema label.
    pub label: String,
}

impl EntryView {
    /// The view's kind, for schema predicates.
    pub fn kind(&self) -> KindInfo<'_> {
        KindInfo {
            type_id: &self.type_id,
            label: &self.label,
            actions: self.actions,
        }
    }

    /// Materialize a view of `entry`, fetching metadata through `cache`.
    pub async fn materialize(
        ctx: &Context,
        cache: &Cache,
        entry: &Arc<dyn Entry>,
    ) -> Result<EntryView> {
        let path = entry
            .base()
            .id()
            .cloned()
            .ok_or_else(|| Error::invariant(entry.schema().type_id(), "entry has no id"))?;
        let metadata = cache.metadata(ctx, entry).await?;
        let schema = entry.schema();
        Ok(EntryView {
            name: entry.base().name().to_string(),
            cname: entry.base().cname().to_string(),
            path,
            attributes: entry.base().attributes().clone(),
            actions: supported_actions(entry.as_ref()),
            metadata: (*metadata).clone(),
            type_id: schema.type_id().to_string(),
            label: schema.label().to_string(),
        })
    }
}
