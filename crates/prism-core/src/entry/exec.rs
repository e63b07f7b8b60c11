//! Exec plumbing: commands executed on a backend object produce a channel
//! of output chunks plus an exit code.
//!
//! Exec results deliberately do not flow through the streaming buffer:
//! stdout/stderr interleaving and exit codes need more structure than one
//! byte slab.

use std::time::SystemTime;

use tokio::sync::{mpsc, oneshot};

use crate::context::Context;
use crate::error::{Error, Result};

/// Which stream a chunk of exec output belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecStream {
    /// Standard output.
    Stdout,
    /// Standard error.
    Stderr,
}

/// One chunk of exec output.
#[derive(Debug, Clone)]
pub struct ExecChunk {
    /// Source stream.
    pub stream: ExecStream,
    /// When the chunk was produced.
    pub at: SystemTime,
    /// Chunk bytes.
    pub data: Vec<u8>,
}

impl ExecChunk {
    /// A stdout chunk stamped now.
    pub fn stdout(data: impl Into<Vec<u8>>) -> Self {
        Self {
            stream: ExecStream::Stdout,
            at: SystemTime::now(),
            data: data.into(),
        }
    }

    /// A stderr chunk stamped now.
    pub fn stderr(data: impl Into<Vec<u8>>) -> Self {
        Self {
            stream: ExecStream::Stderr,
            at: SystemTime::now(),
            data: data.into(),
        }
    }
}

/// Options for an exec invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOptions {
    /// Bytes to feed the command on stdin.
    pub stdin: Option<Vec<u8>>,
    /// Run through a login shell when the backend distinguishes.
    pub elevate: bool,
}

/// The in-flight result of an exec invocation.
///
/// Output arrives on `output` as the command produces it; `exit_code`
/// resolves once the command finishes. Dropping the result tears both down.
#[derive(Debug)]
pub struct ExecResult {
    /// Channel of output chunks, closed when the command finishes.
    pub output: mpsc::Receiver<ExecChunk>,
    /// Resolves to the command's exit code.
    pub exit_code: oneshot::Receiver<i32>,
}

/// Everything an exec produced, gathered after completion.
#[derive(Debug, Clone, Default)]
pub struct ExecOutput {
    /// Collected stdout bytes.
    pub stdout: Vec<u8>,
    /// Collected stderr bytes.
    pub stderr: Vec<u8>,
    /// The command's exit code.
    pub exit_code: i32,
}

impl ExecResult {
    /// Build a result along with its sending halves; backends keep the
    /// sender side, consumers the `ExecResult`.
    pub fn channel(buffer: usize) -> (mpsc::Sender<ExecChunk>, oneshot::Sender<i32>, ExecResult) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let (exit_tx, exit_rx) = oneshot::channel();
        (
            tx,
            exit_tx,
            ExecResult {
                output: rx,
                exit_code: exit_rx,
            },
        )
    }

    /// Drain all output and wait for the exit code.
    pub async fn collect(mut self, ctx: &Context) -> Result<ExecOutput> {
        let mut out = ExecOutput::default();
        loop {
            let chunk = ctx.run(self.output.recv()).await?;
            match chunk {
                Some(chunk) => match chunk.stream {
                    ExecStream::Stdout => out.stdout.extend_from_slice(&chunk.data),
                    ExecStream::Stderr => out.stderr.extend_from_slice(&chunk.data),
                },
                None => break,
            }
        }
        out.exit_code = ctx
            .run(self.exit_code)
            .await?
            .map_err(|_| Error::backend("exec finished without reporting an exit code"))?;
        Ok(out)
    }
}
