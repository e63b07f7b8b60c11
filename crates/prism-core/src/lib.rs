//! # prism-core
//!
//! Core runtime of the prism virtual filesystem: heterogeneous backends
//! (cloud providers, container runtimes, remote hosts) are projected into
//! one hierarchical namespace that consumers browse, read, and query.
//!
//! Plugins implement the [`Entry`] trait plus capability traits for the
//! operations their resources support; the core provides:
//!
//! - the entry model and per-plugin [schema graph](crate::schema),
//! - the plugin [registry](crate::registry) and path resolution,
//! - the TTL'd, single-flight [traversal cache](crate::cache),
//! - the [streaming buffer](crate::stream) that adapts push streams to
//!   random-access reads with tail follow.

pub mod cache;
pub mod config;
pub mod context;
pub mod entry;
pub mod error;
pub mod registry;
pub mod schema;
pub mod stream;

pub use cache::{Cache, CacheOp};
pub use config::{CacheConfig, CoreConfig, StreamConfig};
pub use context::Context;
pub use entry::{
    supported_actions, Action, ActionSet, Attributes, ByteStream, BytesContent, Content,
    Deletable, Entry, EntryBase, EntryId, ExecChunk, ExecOptions, ExecOutput, ExecResult,
    ExecStream, Execable, Group, Pipe, Readable, Signalable, Writable,
};
pub use error::{Error, Result};
pub use registry::{find_entry, Registry};
pub use schema::{EntrySchema, SchemaGraph, SchemaNode};
pub use stream::{BufferMap, StreamBuffer, StreamPhase};
