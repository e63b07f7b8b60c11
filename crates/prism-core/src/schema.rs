//! Entry schemas and the per-plugin schema graph.
//!
//! Every entry kind is described by an [`EntrySchema`]; a plugin's
//! hierarchy is the graph induced by following child schemas from the
//! root. Graphs may be cyclic (a directory kind containing itself), so
//! child references are resolved by type-id, child schemas are produced
//! lazily, and assembly deduplicates on insertion. Serialization walks
//! the graph in insertion order, root first.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::entry::ActionSet;
use crate::error::{Error, Result};

/// A table of named JSON-Schema fragments shared by a plugin's metadata
/// schemas. Propagated parent-to-child during assembly unless a child
/// declares its own.
pub type WrappedTypes = Map<String, Value>;

type ChildrenFn = Arc<dyn Fn() -> Vec<EntrySchema> + Send + Sync>;

/// Schema of one entry kind. Built by plugins with [`EntrySchema::of`] and
/// the `with_*` builders; consumed by [`SchemaGraph::assemble`].
#[derive(Clone)]
pub struct EntrySchema {
    type_id: String,
    label: String,
    singleton: bool,
    actions: ActionSet,
    meta_attribute_schema: Option<Value>,
    metadata_schema: Option<Value>,
    children: Option<ChildrenFn>,
    wrapped_types: Option<Arc<WrappedTypes>>,
    prebaked: Option<SchemaGraph>,
}

impl std::fmt::Debug for EntrySchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntrySchema")
            .field("type_id", &self.type_id)
            .field("label", &self.label)
            .field("singleton", &self.singleton)
            .field("actions", &self.actions)
            .finish_non_exhaustive()
    }
}

impl EntrySchema {
    /// Create a schema for the entry type `T` with the given label. The
    /// type-id is `T`'s qualified type name (module path plus type name),
    /// the Rust analog of a package-qualified identifier.
    pub fn of<T: 'static>(label: impl Into<String>) -> Self {
        Self::with_type_id(std::any::type_name::<T>(), label)
    }

    /// Create a schema with an explicit type-id. Used by external plugins
    /// whose type identifiers are not Rust types.
    pub fn with_type_id(type_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            type_id: type_id.into(),
            label: label.into(),
            singleton: false,
            actions: ActionSet::empty(),
            meta_attribute_schema: None,
            metadata_schema: None,
            children: None,
            wrapped_types: None,
            prebaked: None,
        }
    }

    /// Wrap a pre-assembled graph from an external plugin. Assembly merges
    /// its nodes verbatim.
    pub fn prebaked(graph: SchemaGraph) -> Result<Self> {
        let root_id = graph
            .root_type_id()
            .ok_or_else(|| Error::invariant("<external>", "pre-baked schema graph is empty"))?
            .to_string();
        let root = graph
            .get(&root_id)
            .expect("root_type_id came from the graph");
        let mut schema = Self::with_type_id(root_id, root.label.clone());
        schema.singleton = root.singleton;
        schema.actions = root.actions;
        schema.prebaked = Some(graph);
        Ok(schema)
    }

    /// Mark the kind as a singleton: exactly one instance exists under its
    /// parent and the label matches the entry's name.
    pub fn singleton(mut self) -> Self {
        self.singleton = true;
        self
    }

    /// Declare the actions entries of this kind support. Must agree with
    /// the concrete type's capability traits.
    pub fn with_actions(mut self, actions: ActionSet) -> Self {
        self.actions = actions;
        self
    }

    /// JSON-Schema for the metadata derived from attributes.
    pub fn with_meta_attribute_schema(mut self, schema: Value) -> Self {
        self.meta_attribute_schema = Some(schema);
        self
    }

    /// JSON-Schema for full metadata. Only for kinds that override
    /// `Entry::metadata`.
    pub fn with_metadata_schema(mut self, schema: Value) -> Self {
        self.metadata_schema = Some(schema);
        self
    }

    /// Declare the child kinds this (group) kind produces. The closure is
    /// invoked during assembly, after cycle checks, so self-referential
    /// kinds terminate.
    pub fn with_children<F>(mut self, children: F) -> Self
    where
        F: Fn() -> Vec<EntrySchema> + Send + Sync + 'static,
    {
        self.children = Some(Arc::new(children));
        self
    }

    /// Declare this plugin's wrapped-type table. Children inherit it during
    /// assembly unless they declare their own.
    pub fn with_wrapped_types(mut self, types: WrappedTypes) -> Self {
        self.wrapped_types = Some(Arc::new(types));
        self
    }

    /// The kind's type-id.
    pub fn type_id(&self) -> &str {
        &self.type_id
    }

    /// The kind's label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The kind's declared actions.
    pub fn actions(&self) -> ActionSet {
        self.actions
    }

    /// Project into the serializable node record (children unresolved).
    fn to_node(&self, wrapped: Option<&Arc<WrappedTypes>>) -> SchemaNode {
        SchemaNode {
            label: self.label.clone(),
            singleton: self.singleton,
            actions: self.actions,
            meta_attribute_schema: apply_wrapped_types(self.meta_attribute_schema.clone(), wrapped),
            metadata_schema: apply_wrapped_types(self.metadata_schema.clone(), wrapped),
            children: Vec::new(),
        }
    }
}

/// Attach the wrapped-type table to a JSON schema that does not carry its
/// own definitions.
fn apply_wrapped_types(schema: Option<Value>, wrapped: Option<&Arc<WrappedTypes>>) -> Option<Value> {
    let mut schema = schema?;
    if let (Some(wrapped), Some(obj)) = (wrapped, schema.as_object_mut()) {
        if !wrapped.is_empty() && !obj.contains_key("definitions") {
            obj.insert("definitions".to_string(), Value::Object((**wrapped).clone()));
        }
    }
    Some(schema)
}

/// The serialized form of one schema-graph node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaNode {
    /// Human label for the kind (`[container]` rendering is the consumer's
    /// concern).
    pub label: String,
    /// True when exactly one instance exists.
    pub singleton: bool,
    /// Actions entries of this kind support.
    pub actions: ActionSet,
    /// JSON-Schema of attribute-derived metadata, if declared.
    pub meta_attribute_schema: Option<Value>,
    /// JSON-Schema of full metadata, if declared.
    pub metadata_schema: Option<Value>,
    /// Child kinds, by type-id.
    pub children: Vec<String>,
}

/// An assembled, insertion-ordered schema graph. The first key is the
/// root's type-id; serialization is a mapping type-id to node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaGraph {
    nodes: IndexMap<String, SchemaNode>,
}

impl SchemaGraph {
    /// Assemble the graph reachable from `root` in a single pass. Each
    /// type-id is inserted at most once; duplicate children are silently
    /// de-duplicated; recursion is resolved by type-id equality.
    pub fn assemble(root: &EntrySchema) -> Result<SchemaGraph> {
        let mut graph = SchemaGraph::default();
        fill(root, &mut graph, root.wrapped_types.clone())?;
        Ok(graph)
    }

    /// The root's type-id (first inserted key).
    pub fn root_type_id(&self) -> Option<&str> {
        self.nodes.keys().next().map(String::as_str)
    }

    /// Look up a node.
    pub fn get(&self, type_id: &str) -> Option<&SchemaNode> {
        self.nodes.get(type_id)
    }

    /// Iterate nodes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &SchemaNode)> {
        self.nodes.iter()
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

fn fill(
    schema: &EntrySchema,
    graph: &mut SchemaGraph,
    inherited: Option<Arc<WrappedTypes>>,
) -> Result<()> {
    if schema.label.is_empty() {
        return Err(Error::invariant(&schema.type_id, "schema has an empty label"));
    }

    // Pre-baked sub-graphs merge verbatim; their wrapped types were applied
    // when the external plugin assembled them.
    if let Some(pre) = &schema.prebaked {
        for (type_id, node) in pre.iter() {
            if !graph.nodes.contains_key(type_id) {
                graph.nodes.insert(type_id.clone(), node.clone());
            }
        }
        return Ok(());
    }

    let wrapped = schema.wrapped_types.clone().or(inherited);
    graph
        .nodes
        .insert(schema.type_id.clone(), schema.to_node(wrapped.as_ref()));

    if !schema.actions.supports(crate::entry::Action::List) {
        return Ok(());
    }
    let children = match &schema.children {
        Some(f) => f(),
        None => {
            return Err(Error::invariant(
                &schema.type_id,
                "group kind declared no child schemas",
            ))
        }
    };
    if children.is_empty() {
        return Err(Error::invariant(
            &schema.type_id,
            "group kind declared no child schemas",
        ));
    }

    let mut child_ids = Vec::new();
    for child in &children {
        if !child_ids.iter().any(|id| id == child.type_id()) {
            child_ids.push(child.type_id().to_string());
        }
    }
    graph
        .nodes
        .get_mut(&schema.type_id)
        .expect("node inserted above")
        .children = child_ids;

    for child in children {
        if graph.nodes.contains_key(child.type_id()) && child.prebaked.is_none() {
            continue;
        }
        fill(&child, graph, wrapped.clone())?;
    }
    Ok(())
}
