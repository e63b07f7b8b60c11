//! The streaming content buffer.
//!
//! Backends like log tails push bytes; consumers want pull-style random
//! access. A [`StreamBuffer`] bridges the two: one source task appends to
//! an append-only slab, many readers snapshot the size and read the
//! prefix, and reads past the end block until the slab grows or the
//! source reaches a terminal state.
//!
//! ```text
//!  Idle ──launch──▶ Priming ──first byte──▶ Streaming ──EOF/ctx──▶ Closed
//!                      │                        │
//!                      └──error──▶ Errored ◀────┘
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;
use futures::StreamExt;
use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::{debug, trace};

use crate::cache::Cache;
use crate::context::Context;
use crate::entry::{Action, ByteStream, Content, Entry, EntryId};
use crate::error::{Error, Result};

/// Lifecycle of a buffer's source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    /// No source task launched yet.
    Idle,
    /// Source launched; no byte has arrived.
    Priming,
    /// Bytes are arriving.
    Streaming,
    /// Source reached EOF (or its context was cancelled).
    Closed,
    /// Source failed. Buffered bytes stay readable up to `size`.
    Errored,
}

#[derive(Debug)]
struct Shared {
    slab: Vec<u8>,
    phase: StreamPhase,
    error: Option<Error>,
    last_update: Option<SystemTime>,
    last_touch: Instant,
}

/// Append-only, multi-reader stream buffer. Created through
/// [`BufferMap::open`]; shared by every reader of the same
/// (entry, stream-name) pair.
#[derive(Debug)]
pub struct StreamBuffer {
    name: String,
    shared: RwLock<Shared>,
    signal: watch::Sender<u64>,
}

impl StreamBuffer {
    fn new(name: impl Into<String>) -> Arc<Self> {
        let (signal, _) = watch::channel(0);
        Arc::new(Self {
            name: name.into(),
            shared: RwLock::new(Shared {
                slab: Vec::new(),
                phase: StreamPhase::Idle,
                error: None,
                last_update: None,
                last_touch: Instant::now(),
            }),
            signal,
        })
    }

    /// The stream name this buffer serves.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bytes buffered so far.
    pub fn size(&self) -> u64 {
        self.shared.read().slab.len() as u64
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> StreamPhase {
        self.shared.read().phase
    }

    /// When the source last appended, for attribute queries.
    pub fn last_update(&self) -> Option<SystemTime> {
        self.shared.read().last_update
    }

    /// Launch the source task: consume `source`, appending into the slab.
    /// Fire-and-forget; the task lives as long as the stream does and
    /// honors `ctx` by dropping the backend stream.
    fn launch(self: Arc<Self>, ctx: &Context, source: ByteStream) {
        {
            let mut shared = self.shared.write();
            shared.phase = StreamPhase::Priming;
            shared.last_touch = Instant::now();
        }
        self.wake();
        let buffer = self;
        let ctx = ctx.child();
        tokio::spawn(async move {
            let mut source = source;
            loop {
                tokio::select! {
                    _ = ctx.cancelled() => {
                        trace!(stream = %buffer.name, "source cancelled");
                        buffer.finish(StreamPhase::Closed, None);
                        return;
                    }
                    chunk = source.next() => match chunk {
                        Some(Ok(bytes)) => buffer.append(&bytes),
                        Some(Err(e)) => {
                            buffer.finish(StreamPhase::Errored, Some(Error::stream(e.to_string())));
                            return;
                        }
                        None => {
                            buffer.finish(StreamPhase::Closed, None);
                            return;
                        }
                    }
                }
            }
        });
    }

    fn append(&self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        {
            let mut shared = self.shared.write();
            shared.slab.extend_from_slice(bytes);
            if shared.phase == StreamPhase::Priming {
                shared.phase = StreamPhase::Streaming;
            }
            shared.last_update = Some(SystemTime::now());
            shared.last_touch = Instant::now();
        }
        self.wake();
    }

    fn finish(&self, phase: StreamPhase, error: Option<Error>) {
        {
            let mut shared = self.shared.write();
            shared.phase = phase;
            shared.error = error;
            shared.last_touch = Instant::now();
        }
        self.wake();
    }

    fn wake(&self) {
        self.signal.send_modify(|gen| *gen += 1);
    }

    /// Block until the primed signal: the first byte, EOF, or an error.
    /// A source that fails before producing anything surfaces its error
    /// here.
    async fn wait_primed(&self, ctx: &Context) -> Result<()> {
        let mut rx = self.signal.subscribe();
        loop {
            {
                let shared = self.shared.read();
                match shared.phase {
                    StreamPhase::Streaming | StreamPhase::Closed => return Ok(()),
                    StreamPhase::Errored => {
                        if shared.slab.is_empty() {
                            return Err(shared
                                .error
                                .clone()
                                .unwrap_or_else(|| Error::stream("source failed")));
                        }
                        return Ok(());
                    }
                    StreamPhase::Idle | StreamPhase::Priming => {}
                }
            }
            ctx.run(rx.changed())
                .await?
                .map_err(|_| Error::stream("source task dropped"))?;
        }
    }

    /// Read up to `len` bytes at `offset`. Data already in the slab
    /// returns immediately; a request past the current size blocks until
    /// the slab grows or the source terminates. Past-EOF reads return an
    /// empty vector; reads past the size of an errored stream propagate
    /// the source error.
    pub async fn read_at(&self, ctx: &Context, offset: u64, len: usize) -> Result<Vec<u8>> {
        let mut rx = self.signal.subscribe();
        loop {
            {
                let shared = self.shared.read();
                let size = shared.slab.len() as u64;
                if offset < size {
                    let start = offset as usize;
                    let end = start.saturating_add(len).min(shared.slab.len());
                    return Ok(shared.slab[start..end].to_vec());
                }
                match shared.phase {
                    StreamPhase::Closed => return Ok(Vec::new()),
                    StreamPhase::Errored => {
                        return Err(shared
                            .error
                            .clone()
                            .unwrap_or_else(|| Error::stream("source failed")))
                    }
                    _ => {}
                }
            }
            ctx.run(rx.changed())
                .await?
                .map_err(|_| Error::stream("source task dropped"))?;
        }
    }

    fn age(&self) -> Duration {
        self.shared.read().last_touch.elapsed()
    }
}

#[async_trait::async_trait]
impl Content for StreamBuffer {
    fn size(&self) -> u64 {
        StreamBuffer::size(self)
    }

    async fn read_at(&self, ctx: &Context, offset: u64, len: usize) -> Result<Vec<u8>> {
        StreamBuffer::read_at(self, ctx, offset, len).await
    }
}

/// Per-entry stream buffers, keyed by (entry-id, stream-name).
///
/// The first `open` for a key launches the source; later opens within the
/// freshness window share the buffer. Wire [`BufferMap::attach`] to a
/// [`Cache`] so invalidating an entry also evicts its buffers.
pub struct BufferMap {
    buffers: DashMap<(EntryId, String), Arc<StreamBuffer>>,
    freshness: Duration,
}

impl BufferMap {
    /// Create a buffer table whose terminal buffers stay reusable for
    /// `freshness`.
    pub fn new(freshness: Duration) -> Self {
        Self {
            buffers: DashMap::new(),
            freshness,
        }
    }

    /// Create a buffer table from configuration.
    pub fn with_config(config: &crate::config::StreamConfig) -> Self {
        Self::new(config.freshness())
    }

    /// Open (or join) the stream `name` of `entry`. Launches the source on
    /// first open; blocks until the buffer is primed. Errors that occur
    /// before any byte arrive synchronously from this call.
    pub async fn open(
        &self,
        ctx: &Context,
        entry: &Arc<dyn Entry>,
        name: &str,
    ) -> Result<Arc<StreamBuffer>> {
        let id = entry
            .base()
            .id()
            .cloned()
            .ok_or_else(|| Error::invariant(entry.schema().type_id(), "entry has no id"))?;
        let pipe = entry
            .as_pipe()
            .ok_or_else(|| Error::unsupported(id.as_str(), Action::Stream))?;

        let key = (id, name.to_string());
        // Decide join-vs-launch under the shard lock, but run the backend
        // call after dropping it. A freshly inserted buffer sits in Idle
        // until the source is wired up; joiners wait on the primed signal.
        let (buffer, launch) = {
            match self.buffers.entry(key.clone()) {
                MapEntry::Occupied(mut occupied) => {
                    if self.reusable(occupied.get()) {
                        (Arc::clone(occupied.get()), false)
                    } else {
                        debug!(id = %key.0, stream = name, "relaunching stale stream buffer");
                        let fresh = StreamBuffer::new(name);
                        occupied.insert(Arc::clone(&fresh));
                        (fresh, true)
                    }
                }
                MapEntry::Vacant(vacant) => {
                    let fresh = StreamBuffer::new(name);
                    vacant.insert(Arc::clone(&fresh));
                    (fresh, true)
                }
            }
        };
        if launch {
            match pipe.stream(ctx).await {
                Ok(source) => Arc::clone(&buffer).launch(ctx, source),
                Err(err) => buffer.finish(StreamPhase::Errored, Some(err)),
            }
        }

        match buffer.wait_primed(ctx).await {
            Ok(()) => Ok(buffer),
            Err(err) => {
                // Nothing was buffered; drop the entry so the next open
                // retries the source.
                self.buffers
                    .remove_if(&key, |_, current| Arc::ptr_eq(current, &buffer));
                Err(err)
            }
        }
    }

    /// Drop every buffer whose entry lies under `prefix`.
    pub fn evict(&self, prefix: &EntryId) {
        self.buffers.retain(|(id, _), _| !id.is_within(prefix));
    }

    /// Evict buffers whenever `cache` invalidates their owning entries.
    /// `map` stays alive for as long as the cache holds the hook.
    pub fn attach(map: &Arc<BufferMap>, cache: &Cache) {
        let map = Arc::clone(map);
        cache.on_invalidate(move |prefix| map.evict(prefix));
    }

    fn reusable(&self, buffer: &Arc<StreamBuffer>) -> bool {
        match buffer.phase() {
            StreamPhase::Idle | StreamPhase::Priming | StreamPhase::Streaming => true,
            StreamPhase::Closed => buffer.age() < self.freshness,
            StreamPhase::Errored => false,
        }
    }
}
