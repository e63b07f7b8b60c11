//! # prism-volume
//!
//! An exec-backed filesystem plugin: projects the directory tree under a
//! remote path into the hierarchy by running stat/cat commands through
//! any exec-capable entry. One enumeration pass covers the whole tree;
//! everything below it lists from the memoized result.

use std::time::Duration;

mod fs;
mod stat;

pub use fs::{VolumeDir, VolumeFile, VolumeFs};
pub use stat::{parse_stat_output, stat_cmd, DirMap, StatEntry, MAX_DEPTH};

/// How long enumerated trees and their entries stay valid.
pub const VALID: Duration = Duration::from_secs(30);
