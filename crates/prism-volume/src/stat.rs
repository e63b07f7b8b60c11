//! Stat-output plumbing: the command that enumerates a remote tree in one
//! shot, and the parser for its output.

use std::collections::{BTreeMap, HashMap};

use prism_core::entry::{from_epoch_secs, Attributes};
use prism_core::error::{Error, Result};
use tracing::warn;

use crate::VALID;

/// How deep a single enumeration descends.
pub const MAX_DEPTH: usize = 30;

const MODE_TYPE_MASK: u32 = 0xF000;
const MODE_DIR: u32 = 0x4000;

/// The command that stats everything under `path` down to `max_depth`,
/// one `<size> <atime> <mtime> <ctime> <raw-mode-hex> <path>` line per
/// object.
pub fn stat_cmd(path: &str, max_depth: usize) -> Vec<String> {
    [
        "find",
        path,
        "-mindepth",
        "1",
        "-maxdepth",
        &max_depth.to_string(),
        "-exec",
        "stat",
        "-c",
        "%s %X %Y %Z %f %n",
        "{}",
        "+",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

/// One stat'd object.
#[derive(Debug, Clone)]
pub struct StatEntry {
    /// Attributes parsed from the stat line.
    pub attributes: Attributes,
    /// True when the raw mode marks a directory.
    pub is_dir: bool,
}

/// Directory path → child name → stat record. Directories without
/// children of their own simply have no key.
pub type DirMap = HashMap<String, BTreeMap<String, StatEntry>>;

/// Parse stat output into a directory map rooted at `base`. Lines that
/// fall outside `base` or do not parse are skipped with a warning; an
/// output with no usable line at all is a backend failure.
pub fn parse_stat_output(base: &str, lines: &[String]) -> Result<DirMap> {
    let base = base.trim_end_matches('/');
    let mut map = DirMap::new();
    let mut parsed_any = false;
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_stat_line(base, line) {
            Some((dir, name, entry)) => {
                parsed_any = true;
                map.entry(dir).or_default().insert(name, entry);
            }
            None => warn!(line, "skipping unparsable stat line"),
        }
    }
    if !parsed_any && !lines.iter().all(|l| l.trim().is_empty()) {
        return Err(Error::backend(format!(
            "stat output for {base} contained no parsable line"
        )));
    }
    Ok(map)
}

/// Split one line into (parent dir, entry name, record). The path is the
/// line's tail and may contain spaces.
fn parse_stat_line(base: &str, line: &str) -> Option<(String, String, StatEntry)> {
    let mut fields = line.splitn(6, ' ');
    let size: u64 = fields.next()?.parse().ok()?;
    let atime: u64 = fields.next()?.parse().ok()?;
    let mtime: u64 = fields.next()?.parse().ok()?;
    let ctime: u64 = fields.next()?.parse().ok()?;
    let mode = u32::from_str_radix(fields.next()?, 16).ok()?;
    let path = fields.next()?;

    let rel = path.strip_prefix(base)?.trim_start_matches('/');
    if rel.is_empty() {
        return None;
    }
    let (dir, name) = match rel.rfind('/') {
        Some(idx) => (format!("{base}/{}", &rel[..idx]), rel[idx + 1..].to_string()),
        None => (base.to_string(), rel.to_string()),
    };
    let entry = StatEntry {
        attributes: Attributes::new()
            .with_size(size)
            .with_atime(from_epoch_secs(atime))
            .with_mtime(from_epoch_secs(mtime))
            .with_ctime(from_epoch_secs(ctime))
            .with_mode(mode)
            .with_valid(VALID),
        is_dir: mode & MODE_TYPE_MASK == MODE_DIR,
    };
    Some((dir, name, entry))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &str) -> Vec<String> {
        raw.lines().map(str::to_string).collect()
    }

    const FIXTURE: &str = "\
96 1550611510 1550611448 1550611448 41ed /var/log/path
96 1550611510 1550611448 1550611448 41ed /var/log/path/has
0 1550611458 1550611458 1550611458 81a4 /var/log/path/has/legs
96 1550611510 1550611453 1550611453 41ed /var/log/path1
0 1550611453 1550611453 1550611453 81a4 /var/log/path1/a file
96 1550611510 1550611441 1550611441 41ed /var/log/path2
64 1550611510 1550611441 1550611441 41ed /var/log/path2/dir
";

    #[test]
    fn test_parse_fixture() {
        let map = parse_stat_output("/var/log", &lines(FIXTURE)).unwrap();
        let top = &map["/var/log"];
        assert_eq!(
            top.keys().collect::<Vec<_>>(),
            vec!["path", "path1", "path2"]
        );
        assert!(top["path"].is_dir);
        assert!(top["path1"].is_dir);

        // Names keep their spaces.
        let path1 = &map["/var/log/path1"];
        assert!(path1.contains_key("a file"));
        assert!(!path1["a file"].is_dir);
        assert_eq!(path1["a file"].attributes.size, Some(0));

        // A childless directory has no key of its own.
        assert!(!map.contains_key("/var/log/path2/dir"));
        assert!(map["/var/log/path2"]["dir"].is_dir);
    }

    #[test]
    fn test_parse_attributes() {
        let map = parse_stat_output("/var/log", &lines(FIXTURE)).unwrap();
        let legs = &map["/var/log/path/has"]["legs"];
        assert_eq!(legs.attributes.mode, Some(0x81a4));
        assert_eq!(
            legs.attributes.mtime,
            Some(from_epoch_secs(1_550_611_458))
        );
        assert_eq!(legs.attributes.valid, VALID);
    }

    #[test]
    fn test_garbage_lines_skipped() {
        let mixed = "garbage\n96 1550611510 1550611448 1550611448 41ed /var/log/ok\n";
        let map = parse_stat_output("/var/log", &lines(mixed)).unwrap();
        assert!(map["/var/log"].contains_key("ok"));
    }

    #[test]
    fn test_all_garbage_is_backend_failure() {
        let err = parse_stat_output("/var/log", &lines("not stat output\n")).unwrap_err();
        assert!(matches!(err, Error::Backend(_)));
    }

    #[test]
    fn test_stat_cmd_shape() {
        let cmd = stat_cmd("/var/log", 30);
        assert_eq!(cmd[0], "find");
        assert_eq!(cmd[1], "/var/log");
        assert!(cmd.contains(&"-maxdepth".to_string()));
        assert!(cmd.contains(&"%s %X %Y %Z %f %n".to_string()));
    }
}
