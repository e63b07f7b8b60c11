//! Entry identity and the base record embedded by every plugin entry.

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;
use std::time::Duration;

use serde_json::{Map, Value};

use crate::cache::CacheOp;
use crate::entry::attributes::Attributes;

/// Stable identifier of an entry: the absolute path of c-names from the
/// registry root, e.g. `/docker/containers/web`.
///
/// Ids double as cache-key components and as the relational parent
/// back-reference (a parent is the id minus its last segment).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(String);

impl EntryId {
    /// The registry root id.
    pub fn root() -> Self {
        Self("/".to_string())
    }

    /// Build an id from an absolute path string. A missing leading slash is
    /// added; a trailing slash is stripped.
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let trimmed = path.trim_end_matches('/');
        if trimmed.is_empty() {
            Self::root()
        } else if trimmed.starts_with('/') {
            Self(trimmed.to_string())
        } else {
            Self(format!("/{trimmed}"))
        }
    }

    /// Append a child c-name.
    pub fn join(&self, cname: &str) -> Self {
        if self.0 == "/" {
            Self(format!("/{cname}"))
        } else {
            Self(format!("{}/{cname}", self.0))
        }
    }

    /// The id as a path string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The parent id, or `None` at the root.
    pub fn parent(&self) -> Option<EntryId> {
        if self.0 == "/" {
            return None;
        }
        match self.0.rfind('/') {
            Some(0) => Some(Self::root()),
            Some(idx) => Some(Self(self.0[..idx].to_string())),
            None => None,
        }
    }

    /// Path segments, root excluded.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    /// True if `self` is `prefix` or lies underneath it. Matching is
    /// segment-aware: `/fsx` is not under `/fs`.
    pub fn is_within(&self, prefix: &EntryId) -> bool {
        if prefix.0 == "/" {
            return true;
        }
        self.0 == prefix.0 || self.0.starts_with(&format!("{}/", prefix.0))
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Clean a display name into a path-safe c-name: `/` becomes `-`, other
/// separator-hostile bytes become `_`.
pub fn cname_of(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' => '-',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// Base record embedded by every plugin entry: identity, attributes, and
/// cache policy. Plugins construct one per entry and hand out references
/// through [`Entry::base`](crate::entry::Entry::base).
#[derive(Debug)]
pub struct EntryBase {
    name: String,
    cname: String,
    attributes: Attributes,
    /// Assigned once, by the registry for roots and by `cached_list` for
    /// children. Plugin code never sets it directly outside tests.
    id: OnceLock<EntryId>,
    ttl_overrides: HashMap<CacheOp, Duration>,
    partial_metadata: Option<Map<String, Value>>,
    prefetched: bool,
}

impl EntryBase {
    /// Create a base record. The c-name is derived from `name`; use
    /// [`EntryBase::with_cname`] to override it.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let cname = cname_of(&name);
        Self {
            name,
            cname,
            attributes: Attributes::new(),
            id: OnceLock::new(),
            ttl_overrides: HashMap::new(),
            partial_metadata: None,
            prefetched: false,
        }
    }

    /// Override the derived c-name.
    pub fn with_cname(mut self, cname: impl Into<String>) -> Self {
        self.cname = cname.into();
        self
    }

    /// Set the attributes record.
    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// Attach metadata discovered while listing the parent, so that
    /// `metadata` does not have to re-contact the backend.
    pub fn with_partial_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.partial_metadata = Some(metadata);
        self.prefetched = true;
        self
    }

    /// Override the cache TTL for one operation. `Duration::ZERO` disables
    /// caching for that (operation, entry) pair.
    pub fn set_ttl(&mut self, op: CacheOp, ttl: Duration) {
        self.ttl_overrides.insert(op, ttl);
    }

    /// Builder-style [`EntryBase::set_ttl`].
    pub fn with_ttl(mut self, op: CacheOp, ttl: Duration) -> Self {
        self.set_ttl(op, ttl);
        self
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Canonical, path-safe name.
    pub fn cname(&self) -> &str {
        &self.cname
    }

    /// The attributes record.
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// The entry's id, if it has been placed in the hierarchy yet.
    pub fn id(&self) -> Option<&EntryId> {
        self.id.get()
    }

    /// Assign the entry's id. The first assignment wins; later calls are
    /// no-ops so re-listing a cached parent is harmless.
    pub fn set_id(&self, id: EntryId) {
        let _ = self.id.set(id);
    }

    /// Test helper mirroring `set_id`, for constructing entries at known
    /// positions without a registry.
    pub fn set_test_id(&self, path: &str) {
        self.set_id(EntryId::new(path));
    }

    /// Effective TTL for an operation: the per-op override if present,
    /// otherwise the attributes' validity window.
    pub fn ttl_for(&self, op: CacheOp) -> Duration {
        self.ttl_overrides
            .get(&op)
            .copied()
            .unwrap_or(self.attributes.valid)
    }

    /// Metadata captured at list time, if any.
    pub fn partial_metadata(&self) -> Option<&Map<String, Value>> {
        self.partial_metadata.as_ref()
    }

    /// True if metadata was prefetched while listing the parent.
    pub fn prefetched(&self) -> bool {
        self.prefetched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_join_and_parent() {
        let root = EntryId::root();
        let fs = root.join("fs");
        let file = fs.join("a file");
        assert_eq!(fs.as_str(), "/fs");
        assert_eq!(file.as_str(), "/fs/a file");
        assert_eq!(file.parent(), Some(fs.clone()));
        assert_eq!(fs.parent(), Some(root.clone()));
        assert_eq!(root.parent(), None);
    }

    #[test]
    fn test_id_is_within() {
        let fs = EntryId::new("/fs");
        assert!(EntryId::new("/fs").is_within(&fs));
        assert!(EntryId::new("/fs/path1").is_within(&fs));
        assert!(EntryId::new("/fs/path1/a file").is_within(&fs));
        assert!(!EntryId::new("/fsx").is_within(&fs));
        assert!(!EntryId::new("/docker").is_within(&fs));
        assert!(EntryId::new("/anything").is_within(&EntryId::root()));
    }

    #[test]
    fn test_cname_cleaning() {
        assert_eq!(cname_of("var/log"), "var-log");
        assert_eq!(cname_of("a file"), "a file");
        assert_eq!(cname_of("tab\there"), "tab_here");
    }

    #[test]
    fn test_base_id_set_once() {
        let base = EntryBase::new("web");
        assert!(base.id().is_none());
        base.set_id(EntryId::new("/docker/containers/web"));
        base.set_id(EntryId::new("/elsewhere"));
        assert_eq!(base.id().unwrap().as_str(), "/docker/containers/web");
    }

    #[test]
    fn test_ttl_override() {
        let mut base =
            EntryBase::new("job").with_attributes(Attributes::new().with_valid(Duration::from_secs(30)));
        assert_eq!(base.ttl_for(CacheOp::List), Duration::from_secs(30));
        base.set_ttl(CacheOp::List, Duration::ZERO);
        assert_eq!(base.ttl_for(CacheOp::List), Duration::ZERO);
        assert_eq!(base.ttl_for(CacheOp::Metadata), Duration::from_secs(30));
    }
}
