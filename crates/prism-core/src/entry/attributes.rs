//! Entry attributes.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Default validity window for cached per-entry results.
pub const DEFAULT_VALID: Duration = Duration::from_secs(5);

/// Attributes of an entry. All fields are optional; backends fill what they
/// know. `valid` drives the traversal cache's TTL for the entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attributes {
    /// Last access time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub atime: Option<SystemTime>,
    /// Last modification time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mtime: Option<SystemTime>,
    /// Last status-change time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ctime: Option<SystemTime>,
    /// Creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crtime: Option<SystemTime>,
    /// Size in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Unix mode bits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<u32>,
    /// How long cached results derived from this entry stay valid.
    /// `Duration::ZERO` disables caching for the entry.
    #[serde(default = "default_valid")]
    pub valid: Duration,
}

fn default_valid() -> Duration {
    DEFAULT_VALID
}

impl Default for Attributes {
    fn default() -> Self {
        Self {
            atime: None,
            mtime: None,
            ctime: None,
            crtime: None,
            size: None,
            mode: None,
            valid: DEFAULT_VALID,
        }
    }
}

impl Attributes {
    /// Create an empty attributes record with the default validity window.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the modification time.
    pub fn with_mtime(mut self, mtime: SystemTime) -> Self {
        self.mtime = Some(mtime);
        self
    }

    /// Set the access time.
    pub fn with_atime(mut self, atime: SystemTime) -> Self {
        self.atime = Some(atime);
        self
    }

    /// Set the status-change time.
    pub fn with_ctime(mut self, ctime: SystemTime) -> Self {
        self.ctime = Some(ctime);
        self
    }

    /// Set the creation time.
    pub fn with_crtime(mut self, crtime: SystemTime) -> Self {
        self.crtime = Some(crtime);
        self
    }

    /// Set the size.
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Set the mode bits.
    pub fn with_mode(mut self, mode: u32) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Set the validity window.
    pub fn with_valid(mut self, valid: Duration) -> Self {
        self.valid = valid;
        self
    }

    /// Project the record into a JSON object, the default metadata for
    /// entries that do not override `Entry::metadata`. Times are exported
    /// as epoch seconds.
    pub fn to_json(&self) -> Map<String, Value> {
        let mut map = Map::new();
        let mut put_time = |key: &str, t: Option<SystemTime>| {
            if let Some(t) = t {
                map.insert(key.to_string(), json!(epoch_secs(t)));
            }
        };
        put_time("atime", self.atime);
        put_time("mtime", self.mtime);
        put_time("ctime", self.ctime);
        put_time("crtime", self.crtime);
        if let Some(size) = self.size {
            map.insert("size".to_string(), json!(size));
        }
        if let Some(mode) = self.mode {
            map.insert("mode".to_string(), json!(mode));
        }
        map
    }
}

/// Seconds since the Unix epoch, clamped to zero for pre-epoch times.
pub fn epoch_secs(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Build a SystemTime from epoch seconds.
pub fn from_epoch_secs(secs: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let attr = Attributes::new()
            .with_size(64)
            .with_mode(0o644)
            .with_mtime(from_epoch_secs(1_550_611_448));
        assert_eq!(attr.size, Some(64));
        assert_eq!(attr.mode, Some(0o644));
        assert_eq!(attr.valid, DEFAULT_VALID);
    }

    #[test]
    fn test_to_json() {
        let attr = Attributes::new()
            .with_size(5)
            .with_mtime(from_epoch_secs(100));
        let map = attr.to_json();
        assert_eq!(map["size"], json!(5));
        assert_eq!(map["mtime"], json!(100));
        assert!(!map.contains_key("atime"));
    }

    #[test]
    fn test_epoch_round_trip() {
        let t = from_epoch_secs(1_550_611_510);
        assert_eq!(epoch_secs(t), 1_550_611_510);
    }
}
