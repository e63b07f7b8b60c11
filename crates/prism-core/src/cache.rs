//! The traversal cache.
//!
//! Memoizes per-entry operations keyed by (operation, entry-id) with the
//! entry's declared validity window as TTL. Concurrent callers for the
//! same key join a single in-flight producer; errors are surfaced but
//! never cached; invalidation is by id prefix.
//!
//! Lock discipline: one structural lock over the key map, held only for
//! map mutation. Producers never run under it; per-key completion is
//! signalled over a broadcast channel.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;
use tracing::{debug, trace};

use crate::context::Context;
use crate::entry::{Action, Entry, EntryId};
use crate::error::{Error, Result};
use crate::schema::SchemaGraph;

/// Operations whose results the cache memoizes per entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheOp {
    /// Child enumeration.
    List,
    /// Structured metadata.
    Metadata,
    /// The attributes record.
    Attributes,
    /// Extended attributes.
    Xattr,
    /// Assembled schema graph.
    Schema,
    /// Opened content head.
    OpenHead,
    /// Plugin-supplied JSON payloads (`cached_json`).
    Json,
    /// Plugin-supplied string lists (`cached_strings`).
    Strings,
}

/// Cache key: one operation on one entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    op: CacheOp,
    id: EntryId,
}

/// Type-erased cached value. Typed wrappers downcast on the way out.
pub type Payload = Arc<dyn Any + Send + Sync>;

type FlightResult = std::result::Result<Payload, Error>;

struct Flight {
    tx: broadcast::Sender<FlightResult>,
}

impl Flight {
    fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }
}

enum Slot {
    Ready {
        value: Payload,
        inserted: Instant,
        ttl: Duration,
    },
    Pending(Arc<Flight>),
}

type InvalidationHook = Box<dyn Fn(&EntryId) + Send + Sync>;

/// The traversal cache. See the module docs for semantics.
pub struct Cache {
    slots: Arc<Mutex<HashMap<CacheKey, Slot>>>,
    hooks: Mutex<Vec<InvalidationHook>>,
}

impl Default for Cache {
    fn default() -> Self {
        Self::new()
    }
}

impl Cache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
            hooks: Mutex::new(Vec::new()),
        }
    }

    /// Fetch the value for `(op, id)`, producing it at most once per TTL
    /// window. A zero TTL bypasses the cache entirely: the producer runs
    /// on the caller's context and nothing is stored.
    ///
    /// Waiters abort on context cancellation; a launched producer always
    /// runs to completion so surviving waiters still get its result.
    /// Producer errors release the key without memoizing.
    pub async fn fetch_with<F, Fut>(
        &self,
        op: CacheOp,
        id: &EntryId,
        ttl: Duration,
        ctx: &Context,
        producer: F,
    ) -> Result<Payload>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Payload>> + Send + 'static,
    {
        if ttl.is_zero() {
            trace!(?op, id = %id, "cache bypass (zero ttl)");
            return ctx.run(producer()).await?;
        }

        let key = CacheKey {
            op,
            id: id.clone(),
        };
        let mut producer = Some(producer);
        loop {
            ctx.check()?;
            let mut rx = {
                let mut slots = self.slots.lock();
                match slots.get(&key) {
                    Some(Slot::Ready {
                        value,
                        inserted,
                        ttl,
                    }) if inserted.elapsed() < *ttl => return Ok(value.clone()),
                    Some(Slot::Pending(flight)) => flight.tx.subscribe(),
                    _ => {
                        // Expired or absent: this caller launches the
                        // producer. Subscribe before the task can send.
                        let flight = Arc::new(Flight::new());
                        let rx = flight.tx.subscribe();
                        slots.insert(key.clone(), Slot::Pending(flight.clone()));
                        let launch = producer
                            .take()
                            .expect("a caller launches at most one producer");
                        self.spawn_producer(key.clone(), flight, ttl, launch());
                        rx
                    }
                }
            };

            match ctx.run(rx.recv()).await? {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(err)) => return Err(err),
                Err(_closed) => {
                    // The producer task died without reporting (panic).
                    // Clear the stale record and retry as a plain caller.
                    let mut slots = self.slots.lock();
                    if matches!(slots.get(&key), Some(Slot::Pending(_))) {
                        slots.remove(&key);
                    }
                    if producer.is_none() {
                        return Err(Error::backend("cache producer terminated abnormally"));
                    }
                }
            }
        }
    }

    /// Run the producer to completion on its own task. The result installs
    /// into the cache only if this flight still owns the key; invalidation
    /// in the meantime orphans it (waiters are still served).
    fn spawn_producer<Fut>(&self, key: CacheKey, flight: Arc<Flight>, ttl: Duration, fut: Fut)
    where
        Fut: Future<Output = Result<Payload>> + Send + 'static,
    {
        let slots = Arc::clone(&self.slots);
        tokio::spawn(async move {
            let result = fut.await;
            {
                let mut slots = slots.lock();
                let owns_key = matches!(
                    slots.get(&key),
                    Some(Slot::Pending(current)) if Arc::ptr_eq(current, &flight)
                );
                if owns_key {
                    match &result {
                        Ok(value) => {
                            slots.insert(
                                key.clone(),
                                Slot::Ready {
                                    value: value.clone(),
                                    inserted: Instant::now(),
                                    ttl,
                                },
                            );
                        }
                        Err(_) => {
                            slots.remove(&key);
                        }
                    }
                } else {
                    debug!(?key, "cache fill orphaned by invalidation");
                }
            }
            let _ = flight.tx.send(result);
        });
    }

    /// Invalidate every key whose entry-id is `prefix` or lies underneath
    /// it. In-flight producers are not cancelled; their results are
    /// orphaned. Returns the number of keys removed.
    pub fn delete(&self, prefix: &EntryId) -> usize {
        let removed = {
            let mut slots = self.slots.lock();
            let before = slots.len();
            slots.retain(|key, _| !key.id.is_within(prefix));
            before - slots.len()
        };
        debug!(prefix = %prefix, removed, "cache invalidation");
        for hook in self.hooks.lock().iter() {
            hook(prefix);
        }
        removed
    }

    /// Drop everything. Administrative / test use.
    pub fn clear(&self) {
        self.slots.lock().clear();
    }

    /// Register a hook invoked (with the prefix) on every `delete`. Used by
    /// the streaming-buffer table to evict buffers of invalidated entries.
    pub fn on_invalidate(&self, hook: impl Fn(&EntryId) + Send + Sync + 'static) {
        self.hooks.lock().push(Box::new(hook));
    }

    // ========================================================================
    // Typed operations
    // ========================================================================

    /// List an entry's children through the cache. Assigns child ids and
    /// enforces sibling c-name uniqueness.
    pub async fn list(
        &self,
        ctx: &Context,
        entry: &Arc<dyn Entry>,
    ) -> Result<Arc<Vec<Arc<dyn Entry>>>> {
        let id = require_id(entry.as_ref())?;
        let ttl = entry.base().ttl_for(CacheOp::List);
        let payload = {
            let entry = Arc::clone(entry);
            let parent_id = id.clone();
            self.fetch_with(CacheOp::List, &id, ttl, ctx, move || async move {
                let group = entry
                    .as_group()
                    .ok_or_else(|| Error::unsupported(parent_id.as_str(), Action::List))?;
                let children = group.list(&Context::new()).await?;
                place_children(&parent_id, &entry, &children)?;
                Ok(Arc::new(children) as Payload)
            })
            .await?
        };
        downcast(payload)
    }

    /// An entry's metadata through the cache.
    pub async fn metadata(
        &self,
        ctx: &Context,
        entry: &Arc<dyn Entry>,
    ) -> Result<Arc<serde_json::Map<String, serde_json::Value>>> {
        let id = require_id(entry.as_ref())?;
        let ttl = entry.base().ttl_for(CacheOp::Metadata);
        let entry = Arc::clone(entry);
        let payload = self
            .fetch_with(CacheOp::Metadata, &id, ttl, ctx, move || async move {
                let meta = entry.metadata(&Context::new()).await?;
                Ok(Arc::new(meta) as Payload)
            })
            .await?;
        downcast(payload)
    }

    /// An entry's attributes record through the cache.
    pub async fn attributes(
        &self,
        ctx: &Context,
        entry: &Arc<dyn Entry>,
    ) -> Result<Arc<crate::entry::Attributes>> {
        let id = require_id(entry.as_ref())?;
        let ttl = entry.base().ttl_for(CacheOp::Attributes);
        let entry = Arc::clone(entry);
        let payload = self
            .fetch_with(CacheOp::Attributes, &id, ttl, ctx, move || async move {
                Ok(Arc::new(entry.base().attributes().clone()) as Payload)
            })
            .await?;
        downcast(payload)
    }

    /// An entry's extended attributes through the cache.
    pub async fn xattr(
        &self,
        ctx: &Context,
        entry: &Arc<dyn Entry>,
    ) -> Result<Arc<Vec<(String, Vec<u8>)>>> {
        let id = require_id(entry.as_ref())?;
        let ttl = entry.base().ttl_for(CacheOp::Xattr);
        let entry = Arc::clone(entry);
        let payload = self
            .fetch_with(CacheOp::Xattr, &id, ttl, ctx, move || async move {
                let xattr = entry.xattr(&Context::new()).await?;
                Ok(Arc::new(xattr) as Payload)
            })
            .await?;
        downcast(payload)
    }

    /// The schema graph rooted at an entry, through the cache.
    pub async fn schema(&self, ctx: &Context, entry: &Arc<dyn Entry>) -> Result<Arc<SchemaGraph>> {
        let id = require_id(entry.as_ref())?;
        let ttl = entry.base().ttl_for(CacheOp::Schema);
        let entry = Arc::clone(entry);
        let payload = self
            .fetch_with(CacheOp::Schema, &id, ttl, ctx, move || async move {
                let graph = SchemaGraph::assemble(&entry.schema())?;
                Ok(Arc::new(graph) as Payload)
            })
            .await?;
        downcast(payload)
    }

    /// Open an entry's content through the cache, so repeated opens within
    /// the validity window share one reader.
    pub async fn open(
        &self,
        ctx: &Context,
        entry: &Arc<dyn Entry>,
    ) -> Result<Arc<dyn crate::entry::Content>> {
        let id = require_id(entry.as_ref())?;
        let ttl = entry.base().ttl_for(CacheOp::OpenHead);
        let payload = {
            let entry = Arc::clone(entry);
            let id_for_closure = id.clone();
            self.fetch_with(CacheOp::OpenHead, &id, ttl, ctx, move || async move {
                let id = id_for_closure;
                let readable = entry
                    .as_readable()
                    .ok_or_else(|| Error::unsupported(id.as_str(), Action::Read))?;
                let content = readable.open(&Context::new()).await?;
                Ok(Arc::new(content) as Payload)
            })
            .await?
        };
        let content: Arc<Arc<dyn crate::entry::Content>> = downcast(payload)?;
        Ok((*content).clone())
    }

    /// Memoize a plugin-produced JSON payload under the entry's id.
    pub async fn json<F, Fut>(
        &self,
        ctx: &Context,
        entry: &Arc<dyn Entry>,
        producer: F,
    ) -> Result<Arc<Vec<u8>>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<u8>>> + Send + 'static,
    {
        let id = require_id(entry.as_ref())?;
        let ttl = entry.base().ttl_for(CacheOp::Json);
        let payload = self
            .fetch_with(CacheOp::Json, &id, ttl, ctx, move || {
                let fut = producer();
                async move { Ok(Arc::new(fut.await?) as Payload) }
            })
            .await?;
        downcast(payload)
    }

    /// Memoize a plugin-produced string list under the entry's id.
    pub async fn strings<F, Fut>(
        &self,
        ctx: &Context,
        entry: &Arc<dyn Entry>,
        producer: F,
    ) -> Result<Arc<Vec<String>>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<String>>> + Send + 'static,
    {
        let id = require_id(entry.as_ref())?;
        let ttl = entry.base().ttl_for(CacheOp::Strings);
        let payload = self
            .fetch_with(CacheOp::Strings, &id, ttl, ctx, move || {
                let fut = producer();
                async move { Ok(Arc::new(fut.await?) as Payload) }
            })
            .await?;
        downcast(payload)
    }
}

/// Assign ids to freshly listed children and enforce the sibling-c-name
/// invariants.
fn place_children(
    parent_id: &EntryId,
    parent: &Arc<dyn Entry>,
    children: &[Arc<dyn Entry>],
) -> Result<()> {
    let mut seen = std::collections::HashSet::new();
    for child in children {
        let cname = child.base().cname().to_string();
        if cname.is_empty() {
            return Err(Error::invariant(
                parent.schema().type_id(),
                format!("child of {parent_id} has an empty c-name"),
            ));
        }
        if !seen.insert(cname.clone()) {
            return Err(Error::invariant(
                parent.schema().type_id(),
                format!("duplicate sibling c-name {cname:?} under {parent_id}"),
            ));
        }
        child.base().set_id(parent_id.join(&cname));
    }
    Ok(())
}

fn require_id(entry: &dyn Entry) -> Result<EntryId> {
    entry.base().id().cloned().ok_or_else(|| {
        Error::invariant(
            entry.schema().type_id(),
            format!("entry {:?} has not been placed in the hierarchy", entry.base().name()),
        )
    })
}

fn downcast<T: Send + Sync + 'static>(payload: Payload) -> Result<Arc<T>> {
    payload
        .downcast::<T>()
        .map_err(|_| Error::backend("cached value has an unexpected type"))
}

// ============================================================================
// Process-wide cache
// ============================================================================

static GLOBAL: OnceLock<RwLock<Arc<Cache>>> = OnceLock::new();

fn global_slot() -> &'static RwLock<Arc<Cache>> {
    GLOBAL.get_or_init(|| RwLock::new(Arc::new(Cache::new())))
}

/// The process-wide traversal cache.
pub fn global() -> Arc<Cache> {
    Arc::clone(&global_slot().read())
}

/// Swap the process-wide cache, returning the previous one. Tests use this
/// to substitute a fresh instance for determinism.
pub fn set_global(cache: Arc<Cache>) -> Arc<Cache> {
    std::mem::replace(&mut *global_slot().write(), cache)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn payload(n: usize) -> Payload {
        Arc::new(n) as Payload
    }

    #[tokio::test]
    async fn test_single_flight_coalesces() {
        let cache = Arc::new(Cache::new());
        let ctx = Context::new();
        let id = EntryId::new("/fs");
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..10 {
            let cache = Arc::clone(&cache);
            let ctx = ctx.clone();
            let id = id.clone();
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                cache
                    .fetch_with(CacheOp::List, &id, Duration::from_secs(60), &ctx, move || {
                        async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(50)).await;
                            Ok(payload(7))
                        }
                    })
                    .await
            }));
        }

        for handle in handles {
            let value = handle.await.unwrap().unwrap();
            assert_eq!(*value.downcast::<usize>().unwrap(), 7);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_ttl_bypasses() {
        let cache = Cache::new();
        let ctx = Context::new();
        let id = EntryId::new("/fs");
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let calls = Arc::clone(&calls);
            cache
                .fetch_with(CacheOp::List, &id, Duration::ZERO, &ctx, move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(payload(1))
                })
                .await
                .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_errors_not_cached() {
        let cache = Cache::new();
        let ctx = Context::new();
        let id = EntryId::new("/fs");
        let calls = Arc::new(AtomicUsize::new(0));

        for attempt in 0..2 {
            let calls = Arc::clone(&calls);
            let res = cache
                .fetch_with(
                    CacheOp::Metadata,
                    &id,
                    Duration::from_secs(60),
                    &ctx,
                    move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Err::<Payload, _>(Error::backend("boom"))
                    },
                )
                .await;
            assert!(res.is_err(), "attempt {attempt} should fail");
        }
        // The producer ran twice: the first failure was not memoized.
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_ttl_expiry_refetches() {
        let cache = Cache::new();
        let ctx = Context::new();
        let id = EntryId::new("/fs");
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let calls = Arc::clone(&calls);
            cache
                .fetch_with(
                    CacheOp::List,
                    &id,
                    Duration::from_millis(10),
                    &ctx,
                    move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok(payload(1))
                    },
                )
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_millis(30)).await;
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_delete_prefix_scoping() {
        let cache = Cache::new();
        let ctx = Context::new();
        for path in ["/fs", "/fs/path1", "/fs/path1/a file", "/fsx", "/docker"] {
            cache
                .fetch_with(
                    CacheOp::List,
                    &EntryId::new(path),
                    Duration::from_secs(60),
                    &ctx,
                    || async { Ok(payload(1)) },
                )
                .await
                .unwrap();
        }

        let removed = cache.delete(&EntryId::new("/fs"));
        assert_eq!(removed, 3);

        // /fsx and /docker survive: still served from cache.
        let calls = Arc::new(AtomicUsize::new(0));
        for path in ["/fsx", "/docker"] {
            let calls = Arc::clone(&calls);
            cache
                .fetch_with(
                    CacheOp::List,
                    &EntryId::new(path),
                    Duration::from_secs(60),
                    &ctx,
                    move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok(payload(2))
                    },
                )
                .await
                .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalidation_orphans_in_flight_fill() {
        let cache = Arc::new(Cache::new());
        let ctx = Context::new();
        let id = EntryId::new("/fs");
        let calls = Arc::new(AtomicUsize::new(0));

        let first = {
            let cache = Arc::clone(&cache);
            let ctx = ctx.clone();
            let id = id.clone();
            let calls = Arc::clone(&calls);
            tokio::spawn(async move {
                cache
                    .fetch_with(CacheOp::List, &id, Duration::from_secs(60), &ctx, move || {
                        async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(50)).await;
                            Ok(payload(1))
                        }
                    })
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        cache.delete(&id);

        // The orphaned producer still serves its waiter.
        assert!(first.await.unwrap().is_ok());

        // But its result was not installed: the next caller re-fetches.
        let calls2 = Arc::clone(&calls);
        cache
            .fetch_with(CacheOp::List, &id, Duration::from_secs(60), &ctx, move || {
                async move {
                    calls2.fetch_add(1, Ordering::SeqCst);
                    Ok(payload(2))
                }
            })
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_waiter_cancellation_leaves_producer_running() {
        let cache = Arc::new(Cache::new());
        let id = EntryId::new("/fs");
        let calls = Arc::new(AtomicUsize::new(0));

        let waiter_ctx = Context::new();
        let fetch = {
            let cache = Arc::clone(&cache);
            let ctx = waiter_ctx.clone();
            let id = id.clone();
            let calls = Arc::clone(&calls);
            tokio::spawn(async move {
                cache
                    .fetch_with(CacheOp::List, &id, Duration::from_secs(60), &ctx, move || {
                        async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(50)).await;
                            Ok(payload(3))
                        }
                    })
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        waiter_ctx.cancel();
        let res = fetch.await.unwrap();
        assert!(matches!(res, Err(Error::Cancelled)));

        // The producer completed and installed; a later caller hits cache.
        tokio::time::sleep(Duration::from_millis(100)).await;
        let ctx = Context::new();
        let value = cache
            .fetch_with(CacheOp::List, &id, Duration::from_secs(60), &ctx, || async {
                Ok(payload(99))
            })
            .await
            .unwrap();
        assert_eq!(*value.downcast::<usize>().unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    struct CountingFile {
        base: crate::entry::EntryBase,
        opens: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl Entry for CountingFile {
        fn base(&self) -> &crate::entry::EntryBase {
            &self.base
        }

        fn schema(&self) -> crate::schema::EntrySchema {
            crate::schema::EntrySchema::of::<Self>("file")
        }

        fn as_readable(&self) -> Option<&dyn crate::entry::Readable> {
            Some(self)
        }
    }

    #[async_trait::async_trait]
    impl crate::entry::Readable for CountingFile {
        async fn open(&self, _ctx: &Context) -> Result<Arc<dyn crate::entry::Content>> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(crate::entry::BytesContent::new(b"hello".to_vec())))
        }
    }

    #[tokio::test]
    async fn test_open_shares_reader_within_ttl() {
        let cache = Cache::new();
        let ctx = Context::new();
        let opens = Arc::new(AtomicUsize::new(0));
        let file: Arc<dyn Entry> = Arc::new(CountingFile {
            base: crate::entry::EntryBase::new("file"),
            opens: Arc::clone(&opens),
        });
        file.base().set_test_id("/fs/file");

        let first = cache.open(&ctx, &file).await.unwrap();
        let second = cache.open(&ctx, &file).await.unwrap();
        assert_eq!(first.size(), 5);
        assert_eq!(second.read_at(&ctx, 0, 5).await.unwrap(), b"hello");
        assert_eq!(opens.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_open_unsupported() {
        let cache = Cache::new();
        let ctx = Context::new();
        // A group-less, read-less entry: reuse CountingFile but ask for a
        // listing instead.
        let file: Arc<dyn Entry> = Arc::new(CountingFile {
            base: crate::entry::EntryBase::new("file"),
            opens: Arc::new(AtomicUsize::new(0)),
        });
        file.base().set_test_id("/fs/other-file");
        let err = match cache.list(&ctx, &file).await {
            Err(e) => e,
            Ok(_) => panic!("expected error"),
        };
        assert!(matches!(err, Error::UnsupportedAction { .. }));
    }

    #[test]
    fn test_global_cache_hook() {
        let replacement = Arc::new(Cache::new());
        let previous = set_global(Arc::clone(&replacement));
        assert!(Arc::ptr_eq(&global(), &replacement));
        set_global(previous);
    }

    #[tokio::test]
    async fn test_invalidation_hook_fires() {
        let cache = Cache::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        {
            let seen = Arc::clone(&seen);
            cache.on_invalidate(move |prefix| seen.lock().push(prefix.clone()));
        }
        cache.delete(&EntryId::new("/fs"));
        assert_eq!(&*seen.lock(), &vec![EntryId::new("/fs")]);
    }
}
