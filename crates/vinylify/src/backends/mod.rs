//! Enrichment step backends.
//!
//! Both enrichment steps that touch the filesystem (metadata attach and
//! content read) go through one interface with two implementations: a
//! blocking one built on `std::fs` and a deferred one built on `tokio::fs`.
//! The pipeline picks an implementation exactly once at construction from
//! the `async` flag; it is never re-checked per item.

mod blocking;
mod deferred;

pub use blocking::BlockingFs;
pub use deferred::DeferredFs;

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use crate::config::{ReadOptions, StatOptions};
use crate::error::Result;
use crate::record::{FileContents, FileMetadata};

/// UTF-8 byte order mark.
const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Filesystem access interface for the enrichment chain.
#[async_trait]
pub trait FsBackend: Send + Sync {
    /// Get the backend identifier, used in logs.
    fn name(&self) -> &'static str;

    /// Attach filesystem metadata for a path.
    async fn stat(&self, path: &Path, options: &StatOptions) -> Result<FileMetadata>;

    /// Read file contents for a path, honoring buffering and BOM options.
    async fn read(&self, path: &Path, options: &ReadOptions) -> Result<FileContents>;
}

/// Select the backend for the configured execution mode.
pub fn select(async_mode: bool) -> Arc<dyn FsBackend> {
    if async_mode {
        Arc::new(DeferredFs)
    } else {
        Arc::new(BlockingFs)
    }
}

/// Strip a leading UTF-8 BOM, if present.
fn strip_bom(mut bytes: Vec<u8>) -> Vec<u8> {
    if bytes.starts_with(&UTF8_BOM) {
        bytes.drain(..UTF8_BOM.len());
    }
    bytes
}
