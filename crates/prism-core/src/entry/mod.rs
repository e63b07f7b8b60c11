//! The entry model.
//!
//! An [`Entry`] is a named node in the virtual hierarchy. Backends expose
//! resources by implementing `Entry` plus whichever capability traits the
//! resource supports ([`Group`], [`Readable`], [`Pipe`], [`Writable`],
//! [`Execable`], [`Signalable`], [`Deletable`]). Capability detection
//! happens in exactly one place — [`supported_actions`] — by asking each
//! `as_*` accessor; every other path dispatches statically through the
//! trait objects those accessors return.

mod action;
mod attributes;
mod base;
mod content;
mod exec;

pub use action::{Action, ActionSet};
pub use attributes::{epoch_secs, from_epoch_secs, Attributes, DEFAULT_VALID};
pub use base::{cname_of, EntryBase, EntryId};
pub use content::{BytesContent, Content};
pub use exec::{ExecChunk, ExecOptions, ExecOutput, ExecResult, ExecStream};

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::Stream;
use serde_json::{Map, Value};

use crate::context::Context;
use crate::error::Result;
use crate::schema::EntrySchema;

/// A push-style byte stream produced by [`Pipe::stream`]. Dropping the
/// stream (which context cancellation forces) closes the backend side.
pub type ByteStream = Pin<Box<dyn Stream<Item = std::io::Result<Vec<u8>>> + Send>>;

/// A named node in the virtual hierarchy.
#[async_trait]
pub trait Entry: Send + Sync + 'static {
    /// The base record: identity, attributes, cache policy.
    fn base(&self) -> &EntryBase;

    /// The entry's schema node. Label must be non-empty; the type-id is
    /// captured at construction via [`EntrySchema::of`]. Group kinds
    /// declare their child schemas on the node itself
    /// ([`EntrySchema::with_children`]).
    fn schema(&self) -> EntrySchema;

    /// The parent's id. Parent references are relational: an entry does
    /// not own (or even hold) its parent, it names it by path.
    fn parent_id(&self) -> Option<EntryId> {
        self.base().id().and_then(EntryId::parent)
    }

    /// Structured metadata. The default serves metadata prefetched at list
    /// time, falling back to a projection of the attributes record.
    async fn metadata(&self, ctx: &Context) -> Result<Map<String, Value>> {
        ctx.check()?;
        if let Some(partial) = self.base().partial_metadata() {
            return Ok(partial.clone());
        }
        Ok(self.base().attributes().to_json())
    }

    /// Extended attributes. The default flattens `metadata` into one value
    /// per top-level key.
    async fn xattr(&self, ctx: &Context) -> Result<Vec<(String, Vec<u8>)>> {
        let meta = self.metadata(ctx).await?;
        let mut pairs = Vec::with_capacity(meta.len());
        for (key, value) in meta {
            let bytes = serde_json::to_vec(&value)
                .map_err(|e| crate::error::Error::backend(e.to_string()))?;
            pairs.push((key, bytes));
        }
        Ok(pairs)
    }

    /// Capability accessor: group (listable) entries return `Some`.
    fn as_group(&self) -> Option<&dyn Group> {
        None
    }

    /// Capability accessor: readable entries return `Some`.
    fn as_readable(&self) -> Option<&dyn Readable> {
        None
    }

    /// Capability accessor: streamable entries return `Some`.
    fn as_pipe(&self) -> Option<&dyn Pipe> {
        None
    }

    /// Capability accessor: writable entries return `Some`.
    fn as_writable(&self) -> Option<&dyn Writable> {
        None
    }

    /// Capability accessor: exec-capable entries return `Some`.
    fn as_execable(&self) -> Option<&dyn Execable> {
        None
    }

    /// Capability accessor: signalable entries return `Some`.
    fn as_signalable(&self) -> Option<&dyn Signalable> {
        None
    }

    /// Capability accessor: deletable entries return `Some`.
    fn as_deletable(&self) -> Option<&dyn Deletable> {
        None
    }
}

/// An entry that contains other entries.
#[async_trait]
pub trait Group: Send + Sync {
    /// Enumerate the children, in backend order. Sibling c-names must be
    /// unique; `cached_list` enforces this.
    async fn list(&self, ctx: &Context) -> Result<Vec<Arc<dyn Entry>>>;
}

/// An entry whose content can be read at random offsets.
#[async_trait]
pub trait Readable: Send + Sync {
    /// Open the content, yielding a sized random-access reader.
    async fn open(&self, ctx: &Context) -> Result<Arc<dyn Content>>;
}

/// An entry whose content arrives as a push stream (log tails and the like).
#[async_trait]
pub trait Pipe: Send + Sync {
    /// Start streaming. The stream ends at backend EOF and closes when
    /// dropped.
    async fn stream(&self, ctx: &Context) -> Result<ByteStream>;
}

/// An entry that accepts whole-content writes.
#[async_trait]
pub trait Writable: Send + Sync {
    /// Write `data` to the backend object.
    async fn write(&self, ctx: &Context, data: &[u8]) -> Result<()>;
}

/// An entry on which commands can be executed.
#[async_trait]
pub trait Execable: Send + Sync {
    /// Execute `cmd` with `args`, returning channels of output.
    async fn exec(
        &self,
        ctx: &Context,
        cmd: &str,
        args: &[String],
        opts: ExecOptions,
    ) -> Result<ExecResult>;

    /// True when stdout and stderr are reported as distinct streams, i.e.
    /// the entry also supports the `execerr` action.
    fn separate_stderr(&self) -> bool {
        true
    }
}

/// An entry that accepts named signals (start, stop, ...).
#[async_trait]
pub trait Signalable: Send + Sync {
    /// Send the named signal.
    async fn signal(&self, ctx: &Context, signal: &str) -> Result<()>;
}

/// An entry whose backend object can be deleted.
#[async_trait]
pub trait Deletable: Send + Sync {
    /// Delete the backend object. Returns `false` when deletion was
    /// initiated but has not completed yet.
    async fn delete(&self, ctx: &Context) -> Result<bool>;
}

/// Discover the actions an entry supports from its capability accessors.
/// This is the single point of runtime capability detection.
pub fn supported_actions(entry: &dyn Entry) -> ActionSet {
    let mut actions = ActionSet::empty();
    if entry.as_group().is_some() {
        actions.insert(Action::List);
    }
    if entry.as_readable().is_some() {
        actions.insert(Action::Read);
    }
    if entry.as_pipe().is_some() {
        actions.insert(Action::Stream);
    }
    if entry.as_writable().is_some() {
        actions.insert(Action::Write);
    }
    if let Some(exec) = entry.as_execable() {
        actions.insert(Action::Exec);
        if exec.separate_stderr() {
            actions.insert(Action::Execerr);
        }
    }
    if entry.as_signalable().is_some() {
        actions.insert(Action::Signal);
    }
    if entry.as_deletable().is_some() {
        actions.insert(Action::Delete);
    }
    actions
}
