//! Deferred (non-blocking) filesystem backend.

use async_trait::async_trait;
use std::path::Path;
use tracing::trace;

use super::{strip_bom, FsBackend};
use crate::config::{ReadOptions, StatOptions};
use crate::error::{Error, Result};
use crate::record::{FileContents, FileMetadata};

/// Backend that defers filesystem work through `tokio::fs`, so one slow
/// item never blocks the driving thread.
pub struct DeferredFs;

#[async_trait]
impl FsBackend for DeferredFs {
    fn name(&self) -> &'static str {
        "deferred"
    }

    async fn stat(&self, path: &Path, options: &StatOptions) -> Result<FileMetadata> {
        trace!(path = %path.display(), follow_symlinks = options.follow_symlinks, "attaching metadata");
        let meta = if options.follow_symlinks {
            tokio::fs::metadata(path).await
        } else {
            tokio::fs::symlink_metadata(path).await
        }
        .map_err(|source| Error::Stat {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(FileMetadata::from_std(&meta))
    }

    async fn read(&self, path: &Path, options: &ReadOptions) -> Result<FileContents> {
        trace!(path = %path.display(), buffer = options.buffer, "reading contents");
        if options.buffer {
            let bytes = tokio::fs::read(path).await.map_err(|source| Error::Read {
                path: path.to_path_buf(),
                source,
            })?;
            let bytes = if options.strip_bom {
                strip_bom(bytes)
            } else {
                bytes
            };
            Ok(FileContents::Buffer(bytes))
        } else {
            let file = tokio::fs::File::open(path)
                .await
                .map_err(|source| Error::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
            Ok(FileContents::Stream(file))
        }
    }
}
