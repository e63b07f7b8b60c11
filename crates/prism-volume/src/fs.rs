//! The exec-backed filesystem entries.
//!
//! A [`VolumeFs`] hangs below any exec-capable entry (a container, a
//! remote host, a cloud instance) and projects a directory tree rooted at
//! a remote path. One `find`-driven stat command enumerates the whole
//! tree; the result is memoized under the fs entry so descending into
//! subdirectories costs nothing. Files read through `cat`.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use prism_core::cache::{self, CacheOp, Payload};
use prism_core::context::Context;
use prism_core::entry::{
    Action, ActionSet, Attributes, BytesContent, Content, Entry, EntryBase, EntryId, ExecOptions,
    Group, Readable,
};
use prism_core::error::{Error, Result};
use prism_core::schema::EntrySchema;

use crate::stat::{parse_stat_output, stat_cmd, DirMap, MAX_DEPTH};
use crate::VALID;

/// Shared plumbing for every entry in one projected tree: the executor to
/// run commands on, and where the tree is rooted.
struct TreeSource {
    executor: Arc<dyn Entry>,
    root_path: String,
    max_depth: usize,
}

impl TreeSource {
    /// Run a command on the executor and collect its stdout. Non-zero exit
    /// codes are backend failures carrying stderr.
    async fn run(&self, ctx: &Context, cmd: &[String]) -> Result<Vec<u8>> {
        let exec = self.executor.as_execable().ok_or_else(|| {
            Error::unsupported(self.executor.base().name(), Action::Exec)
        })?;
        let result = exec
            .exec(ctx, &cmd[0], &cmd[1..], ExecOptions::default())
            .await?;
        let output = result.collect(ctx).await?;
        if output.exit_code != 0 {
            return Err(Error::backend(format!(
                "{} exited with {}: {}",
                cmd[0],
                output.exit_code,
                String::from_utf8_lossy(&output.stderr)
            )));
        }
        Ok(output.stdout)
    }

    /// The stat lines for the whole tree, memoized under the fs entry's id
    /// for [`VALID`](crate::VALID).
    async fn stat_lines(
        tree: &Arc<TreeSource>,
        ctx: &Context,
        fs_id: &EntryId,
    ) -> Result<Arc<Vec<String>>> {
        let source = Arc::clone(tree);
        let payload = cache::global()
            .fetch_with(CacheOp::Strings, fs_id, VALID, ctx, move || async move {
                let cmd = stat_cmd(&source.root_path, source.max_depth);
                debug!(path = %source.root_path, "enumerating volume tree");
                let stdout = source.run(&Context::new(), &cmd).await?;
                let lines: Vec<String> = String::from_utf8_lossy(&stdout)
                    .lines()
                    .map(str::to_string)
                    .collect();
                Ok(Arc::new(lines) as Payload)
            })
            .await?;
        payload
            .downcast::<Vec<String>>()
            .map_err(|_| Error::backend("cached stat lines have an unexpected type"))
    }

    /// The parsed directory map for the tree.
    async fn dir_map(tree: &Arc<TreeSource>, ctx: &Context, fs_id: &EntryId) -> Result<DirMap> {
        let lines = Self::stat_lines(tree, ctx, fs_id).await?;
        parse_stat_output(&tree.root_path, &lines)
    }

    /// Child entries of `dir_path`, per the directory map.
    fn children_of(
        tree: &Arc<TreeSource>,
        map: &DirMap,
        fs_id: &EntryId,
        dir_path: &str,
    ) -> Vec<Arc<dyn Entry>> {
        let Some(children) = map.get(dir_path) else {
            return Vec::new();
        };
        children
            .iter()
            .map(|(name, stat)| {
                let remote_path = format!("{dir_path}/{name}");
                if stat.is_dir {
                    Arc::new(VolumeDir {
                        base: EntryBase::new(name).with_attributes(stat.attributes.clone()),
                        tree: Arc::clone(tree),
                        fs_id: fs_id.clone(),
                        path: remote_path,
                    }) as Arc<dyn Entry>
                } else {
                    Arc::new(VolumeFile {
                        base: EntryBase::new(name)
                            .with_attributes(stat.attributes.clone())
                            .with_partial_metadata(stat.attributes.to_json()),
                        tree: Arc::clone(tree),
                        remote_path,
                    }) as Arc<dyn Entry>
                }
            })
            .collect()
    }
}

fn dir_schema() -> EntrySchema {
    EntrySchema::of::<VolumeDir>("dir")
        .with_actions(ActionSet::empty().with(Action::List))
        .with_children(|| vec![dir_schema(), file_schema()])
}

fn file_schema() -> EntrySchema {
    EntrySchema::of::<VolumeFile>("file").with_actions(ActionSet::empty().with(Action::Read))
}

/// Root of a projected tree. Create with [`VolumeFs::new`] and hand out
/// as a child of the exec-capable entry it reads through.
pub struct VolumeFs {
    base: EntryBase,
    tree: Arc<TreeSource>,
}

impl VolumeFs {
    /// Project the tree under `root_path`, reading through `executor`
    /// (which must support exec).
    pub fn new(
        name: impl Into<String>,
        executor: Arc<dyn Entry>,
        root_path: impl Into<String>,
    ) -> Arc<Self> {
        let root_path = root_path.into();
        Arc::new(Self {
            base: EntryBase::new(name).with_attributes(Attributes::new().with_valid(VALID)),
            tree: Arc::new(TreeSource {
                executor,
                root_path: root_path.trim_end_matches('/').to_string(),
                max_depth: MAX_DEPTH,
            }),
        })
    }
}

#[async_trait]
impl Entry for VolumeFs {
    fn base(&self) -> &EntryBase {
        &self.base
    }

    fn schema(&self) -> EntrySchema {
        EntrySchema::of::<VolumeFs>("fs")
            .singleton()
            .with_actions(ActionSet::empty().with(Action::List))
            .with_children(|| vec![dir_schema(), file_schema()])
    }

    fn as_group(&self) -> Option<&dyn Group> {
        Some(self)
    }
}

#[async_trait]
impl Group for VolumeFs {
    async fn list(&self, ctx: &Context) -> Result<Vec<Arc<dyn Entry>>> {
        let fs_id = self
            .base
            .id()
            .cloned()
            .ok_or_else(|| Error::invariant(self.schema().type_id(), "fs entry has no id"))?;
        let map = TreeSource::dir_map(&self.tree, ctx, &fs_id).await?;
        Ok(TreeSource::children_of(
            &self.tree,
            &map,
            &fs_id,
            &self.tree.root_path,
        ))
    }
}

/// A directory inside a projected tree. Listing reuses the tree-wide
/// directory map; no extra backend call.
pub struct VolumeDir {
    base: EntryBase,
    tree: Arc<TreeSource>,
    fs_id: EntryId,
    path: String,
}

#[async_trait]
impl Entry for VolumeDir {
    fn base(&self) -> &EntryBase {
        &self.base
    }

    fn schema(&self) -> EntrySchema {
        dir_schema()
    }

    fn as_group(&self) -> Option<&dyn Group> {
        Some(self)
    }
}

#[async_trait]
impl Group for VolumeDir {
    async fn list(&self, ctx: &Context) -> Result<Vec<Arc<dyn Entry>>> {
        let map = TreeSource::dir_map(&self.tree, ctx, &self.fs_id).await?;
        Ok(TreeSource::children_of(
            &self.tree,
            &map,
            &self.fs_id,
            &self.path,
        ))
    }
}

/// A file inside a projected tree. Reads run `cat` on the executor and
/// materialize the whole body.
pub struct VolumeFile {
    base: EntryBase,
    tree: Arc<TreeSource>,
    remote_path: String,
}

#[async_trait]
impl Entry for VolumeFile {
    fn base(&self) -> &EntryBase {
        &self.base
    }

    fn schema(&self) -> EntrySchema {
        file_schema()
    }

    fn as_readable(&self) -> Option<&dyn Readable> {
        Some(self)
    }
}

#[async_trait]
impl Readable for VolumeFile {
    async fn open(&self, ctx: &Context) -> Result<Arc<dyn Content>> {
        let cmd = vec!["cat".to_string(), self.remote_path.clone()];
        let body = self.tree.run(ctx, &cmd).await?;
        Ok(Arc::new(BytesContent::new(body)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use prism_core::entry::{ExecChunk, ExecResult, Execable};

    const VAR_LOG_FIXTURE: &str = "
96 1550611510 1550611448 1550611448 41ed /var/log/path
96 1550611510 1550611448 1550611448 41ed /var/log/path/has
96 1550611510 1550611448 1550611448 41ed /var/log/path/has/got
96 1550611510 1550611458 1550611458 41ed /var/log/path/has/got/some
0 1550611458 1550611458 1550611458 81a4 /var/log/path/has/got/some/legs
96 1550611510 1550611453 1550611453 41ed /var/log/path1
0 1550611453 1550611453 1550611453 81a4 /var/log/path1/a file
96 1550611510 1550611441 1550611441 41ed /var/log/path2
64 1550611510 1550611441 1550611441 41ed /var/log/path2/dir
";

    /// Hand-rolled exec-capable entry with canned command output.
    struct MockExecutor {
        base: EntryBase,
        responses: Mutex<HashMap<String, String>>,
        calls: Mutex<Vec<String>>,
    }

    impl MockExecutor {
        fn new(name: &str, test_id: &str) -> Arc<Self> {
            let mock = Arc::new(Self {
                base: EntryBase::new(name),
                responses: Mutex::new(HashMap::new()),
                calls: Mutex::new(Vec::new()),
            });
            mock.base.set_test_id(test_id);
            mock
        }

        fn respond(&self, cmd: &str, args: &[&str], output: &str) {
            let key = command_key(cmd, args);
            self.responses.lock().insert(key, output.to_string());
        }

        fn call_count(&self, cmd_prefix: &str) -> usize {
            self.calls
                .lock()
                .iter()
                .filter(|call| call.starts_with(cmd_prefix))
                .count()
        }
    }

    fn command_key(cmd: &str, args: &[&str]) -> String {
        let mut key = cmd.to_string();
        for arg in args {
            key.push(' ');
            key.push_str(arg);
        }
        key
    }

    #[async_trait]
    impl Entry for MockExecutor {
        fn base(&self) -> &EntryBase {
            &self.base
        }

        fn schema(&self) -> EntrySchema {
            EntrySchema::of::<Self>("instance")
                .with_actions(ActionSet::empty().with(Action::Exec))
        }

        fn as_execable(&self) -> Option<&dyn Execable> {
            Some(self)
        }
    }

    #[async_trait]
    impl Execable for MockExecutor {
        async fn exec(
            &self,
            _ctx: &Context,
            cmd: &str,
            args: &[String],
            _opts: ExecOptions,
        ) -> Result<ExecResult> {
            let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
            let key = command_key(cmd, &arg_refs);
            self.calls.lock().push(key.clone());
            let output = self
                .responses
                .lock()
                .get(&key)
                .cloned()
                .ok_or_else(|| Error::backend(format!("unexpected command: {key}")))?;

            let (tx, exit_tx, result) = ExecResult::channel(1);
            tx.send(ExecChunk::stdout(output.into_bytes()))
                .await
                .map_err(|_| Error::backend("result dropped"))?;
            drop(tx);
            let _ = exit_tx.send(0);
            Ok(result)
        }
    }

    fn fixture_fs(test_root: &str) -> (Arc<MockExecutor>, Arc<dyn Entry>) {
        let exec = MockExecutor::new("instance", &format!("{test_root}/instance"));
        let stat = stat_cmd("/var/log", MAX_DEPTH);
        let stat_args: Vec<&str> = stat[1..].iter().map(String::as_str).collect();
        exec.respond(&stat[0], &stat_args, VAR_LOG_FIXTURE);

        let fs = VolumeFs::new("fs", exec.clone() as Arc<dyn Entry>, "/var/log");
        fs.base().set_test_id(&format!("{test_root}/instance/fs"));
        (exec, fs as Arc<dyn Entry>)
    }

    #[tokio::test]
    async fn test_fs_list() {
        let (exec, fs) = fixture_fs("/t_list");
        let cache = cache::global();
        let ctx = Context::new();

        let entries = cache.list(&ctx, &fs).await.unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].base().name(), "path");
        assert_eq!(entries[1].base().name(), "path1");
        assert_eq!(entries[2].base().name(), "path2");
        for entry in entries.iter() {
            assert!(entry.as_group().is_some(), "top-level entries are groups");
        }

        let entries1 = cache.list(&ctx, &entries[1]).await.unwrap();
        assert_eq!(entries1.len(), 1);
        assert_eq!(entries1[0].base().name(), "a file");
        assert!(entries1[0].as_readable().is_some());

        let entries2 = cache.list(&ctx, &entries[2]).await.unwrap();
        assert_eq!(entries2.len(), 1);
        assert_eq!(entries2[0].base().name(), "dir");
        assert!(entries2[0].as_group().is_some());

        // The whole tree came from one enumeration.
        assert_eq!(exec.call_count("find"), 1);
    }

    #[tokio::test]
    async fn test_fs_read() {
        let (exec, fs) = fixture_fs("/t_read");
        exec.respond("cat", &["/var/log/path1/a file"], "hello");
        let cache = cache::global();
        let ctx = Context::new();

        let entries = cache.list(&ctx, &fs).await.unwrap();
        let entries1 = cache.list(&ctx, &entries[1]).await.unwrap();
        assert_eq!(entries1[0].base().name(), "a file");

        let reader = entries1[0]
            .as_readable()
            .unwrap()
            .open(&ctx)
            .await
            .unwrap();
        assert_eq!(reader.size(), 5);
        assert_eq!(reader.read_at(&ctx, 0, 5).await.unwrap(), b"hello");
        assert_eq!(exec.call_count("cat"), 1);
    }

    #[tokio::test]
    async fn test_nested_dirs_list_without_more_execs() {
        let (exec, fs) = fixture_fs("/t_nested");
        let cache = cache::global();
        let ctx = Context::new();

        let top = cache.list(&ctx, &fs).await.unwrap();
        let has = cache.list(&ctx, &top[0]).await.unwrap();
        assert_eq!(has[0].base().name(), "has");
        let got = cache.list(&ctx, &has[0]).await.unwrap();
        assert_eq!(got[0].base().name(), "got");
        let some = cache.list(&ctx, &got[0]).await.unwrap();
        assert_eq!(some[0].base().name(), "some");
        let legs = cache.list(&ctx, &some[0]).await.unwrap();
        assert_eq!(legs[0].base().name(), "legs");
        assert!(legs[0].as_readable().is_some());

        assert_eq!(exec.call_count("find"), 1);
    }

    #[tokio::test]
    async fn test_exec_failure_surfaces() {
        let exec = MockExecutor::new("instance", "/t_fail/instance");
        // No canned response: the stat command fails.
        let fs = VolumeFs::new("fs", exec as Arc<dyn Entry>, "/var/log");
        fs.base().set_test_id("/t_fail/instance/fs");
        let fs: Arc<dyn Entry> = fs;

        let ctx = Context::new();
        let err = match cache::global().list(&ctx, &fs).await {
            Err(e) => e,
            Ok(_) => panic!("expected error"),
        };
        assert!(matches!(err, Error::Backend(_)), "{err}");
    }

    #[tokio::test]
    async fn test_file_metadata_prefetched() {
        let (_exec, fs) = fixture_fs("/t_meta");
        let cache = cache::global();
        let ctx = Context::new();

        let entries = cache.list(&ctx, &fs).await.unwrap();
        let entries1 = cache.list(&ctx, &entries[1]).await.unwrap();
        let file = &entries1[0];
        assert!(file.base().prefetched());
        // Metadata is served from the stat pass, no further exec.
        let meta = file.metadata(&ctx).await.unwrap();
        assert_eq!(meta["size"], serde_json::json!(0));
        assert_eq!(meta["mtime"], serde_json::json!(1_550_611_453));
    }
}
