//! Blocking (synchronous) filesystem backend.

use async_trait::async_trait;
use std::path::Path;
use tracing::trace;

use super::{strip_bom, FsBackend};
use crate::config::{ReadOptions, StatOptions};
use crate::error::{Error, Result};
use crate::record::{FileContents, FileMetadata};

/// Backend that performs filesystem work inline with `std::fs`. Each call
/// completes before returning, blocking the driving thread for its duration.
pub struct BlockingFs;

#[async_trait]
impl FsBackend for BlockingFs {
    fn name(&self) -> &'static str {
        "blocking"
    }

    async fn stat(&self, path: &Path, options: &StatOptions) -> Result<FileMetadata> {
        trace!(path = %path.display(), follow_symlinks = options.follow_symlinks, "attaching metadata");
        let meta = if options.follow_symlinks {
            std::fs::metadata(path)
        } else {
            std::fs::symlink_metadata(path)
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
            let bytes = std::fs::read(path).map_err(|source| Error::Read {
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
            let file = std::fs::File::open(path).map_err(|source| Error::Read {
                path: path.to_path_buf(),
                source,
            })?;
            Ok(FileContents::Stream(tokio::fs::File::from_std(file)))
        }
    }
}
