//! Cancellable operation context.
//!
//! Every traversal, content, and query operation takes a [`Context`].
//! Cancellation is cooperative: backend calls, cache waits, and blocked
//! streaming-buffer reads select against the context and abort with
//! [`Error::Cancelled`](crate::Error::Cancelled) when it fires.

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

/// Cancellable context carried by every operation.
///
/// Cloning shares the underlying token; [`Context::child`] derives a token
/// that is cancelled when the parent is, but can also be cancelled on its
/// own (e.g. per-request scoping under a plugin-wide context).
#[derive(Debug, Clone, Default)]
pub struct Context {
    token: CancellationToken,
}

impl Context {
    /// Create a fresh, uncancelled context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive a child context: cancelled when `self` is, or independently.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
        }
    }

    /// Cancel this context and all of its children.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// True if the context has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolve once the context is cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    /// Return early with `Error::Cancelled` if the context has fired.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Run a future, aborting with `Error::Cancelled` if the context fires
    /// first. The future is dropped on cancellation.
    pub async fn run<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = T>,
    {
        tokio::select! {
            _ = self.token.cancelled() => Err(Error::Cancelled),
            out = fut => Ok(out),
        }
    }
}
