//! Random-access content readers.

use async_trait::async_trait;

use crate::context::Context;
use crate::error::Result;

/// Random-access reader of known size, returned by
/// [`Readable::open`](crate::entry::Readable::open).
///
/// `size` may grow for stream-backed content (tail follow); a reader that
/// snapshots it sees a stable prefix.
#[async_trait]
pub trait Content: Send + Sync {
    /// Bytes currently available.
    fn size(&self) -> u64;

    /// Read up to `len` bytes starting at `offset`. Returns fewer bytes at
    /// EOF and an empty vector past it.
    async fn read_at(&self, ctx: &Context, offset: u64, len: usize) -> Result<Vec<u8>>;
}

/// In-memory content, for backends that materialize a whole body up front.
#[derive(Debug, Clone)]
pub struct BytesContent {
    data: Vec<u8>,
}

impl BytesContent {
    /// Wrap a byte buffer.
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }
}

#[async_trait]
impl Content for BytesContent {
    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    async fn read_at(&self, ctx: &Context, offset: u64, len: usize) -> Result<Vec<u8>> {
        ctx.check()?;
        let start = (offset as usize).min(self.data.len());
        let end = start.saturating_add(len).min(self.data.len());
        Ok(self.data[start..end].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bytes_content_reads() {
        let ctx = Context::new();
        let content = BytesContent::new(b"hello".to_vec());
        assert_eq!(content.size(), 5);
        assert_eq!(content.read_at(&ctx, 0, 5).await.unwrap(), b"hello");
        assert_eq!(content.read_at(&ctx, 1, 3).await.unwrap(), b"ell");
        assert_eq!(content.read_at(&ctx, 3, 100).await.unwrap(), b"lo");
        assert!(content.read_at(&ctx, 10, 4).await.unwrap().is_empty());
    }
}
