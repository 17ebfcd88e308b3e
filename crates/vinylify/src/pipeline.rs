//! The vinylify pipeline stage.
//!
//! Filter raw watcher events against a whitelist, split them into a
//! stat-less branch (removals) and a stat-needed branch (creations and
//! modifications), enrich the latter, and merge both branches back into one
//! stream of file records.

use chrono::{DateTime, Utc};
use futures::future;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};
use tracing::{debug, trace};

use crate::backends::{self, FsBackend};
use crate::config::{ReadOptions, StatOptions, VinylifyConfig};
use crate::error::Result;
use crate::events::RawEvent;
use crate::record::FileRecord;
use crate::share::SharedSource;

/// Adapt a stream of raw watcher events into a stream of hydrated file
/// records.
///
/// Events whose kind is outside the configured whitelist are dropped.
/// Removal events map directly to bare records; creation and modification
/// events pass through the enrichment chain: metadata attach, optional
/// `since` cutoff, optional content read, in that order. The first
/// enrichment failure is yielded as an `Err` item and ends the stream.
pub fn vinylify<S>(source: S, config: VinylifyConfig) -> VinylStream
where
    S: Stream<Item = RawEvent> + Send + 'static,
{
    let whitelist = config.whitelist();
    let stat_options = config.stat_options();
    let read_options = config.read_options();
    let since = config.since;
    let read = config.read;
    let backend = backends::select(config.async_mode);
    debug!(
        backend = backend.name(),
        allowed = whitelist.len(),
        read,
        since = since.is_some(),
        "building vinylify pipeline"
    );

    let filtered = source.filter(move |event| future::ready(whitelist.allows(event)));
    let shared = SharedSource::new(filtered);

    // Stat-less branch: removals become records without any filesystem
    // access. An event without a kind matches neither branch and vanishes
    // here, having already bypassed the whitelist.
    let plain = shared.subscribe().filter_map(|event| {
        future::ready(match event.kind {
            Some(kind) if kind.is_removal() => Some(Ok(FileRecord::from_removal(event))),
            Some(_) => None,
            None => {
                debug!(path = %event.path.display(), "event without kind matched no branch; dropped");
                None
            }
        })
    });

    // Stat-needed branch: enrich one item at a time, in arrival order.
    let hydrated = shared
        .subscribe()
        .filter_map(|event| {
            future::ready(match event.kind {
                Some(kind) if kind.affects_content() => Some(event),
                _ => None,
            })
        })
        .then(move |event| {
            let backend = Arc::clone(&backend);
            async move { hydrate(event, backend, stat_options, since, read, read_options).await }
        })
        .filter_map(|outcome| future::ready(outcome.transpose()));

    VinylStream {
        inner: stream::select(hydrated, plain).boxed(),
        errored: false,
    }
}

/// Run the enrichment chain for one event.
///
/// Returns `Ok(None)` when the `since` cutoff drops the item.
async fn hydrate(
    event: RawEvent,
    backend: Arc<dyn FsBackend>,
    stat_options: StatOptions,
    since: Option<DateTime<Utc>>,
    read: bool,
    read_options: ReadOptions,
) -> Result<Option<FileRecord>> {
    let metadata = backend.stat(&event.path, &stat_options).await?;

    if let Some(cutoff) = since {
        // keep only items strictly newer than the cutoff; an item with no
        // resolvable mtime cannot prove it is newer and is dropped
        match metadata.mtime {
            Some(mtime) if mtime > cutoff => {}
            _ => {
                trace!(path = %event.path.display(), "item predates since cutoff; dropped");
                return Ok(None);
            }
        }
    }

    // directories carry no contents, even with read enabled
    let contents = if read && !metadata.is_dir {
        Some(backend.read(&event.path, &read_options).await?)
    } else {
        None
    };

    Ok(Some(FileRecord {
        path: event.path,
        metadata: Some(metadata),
        contents,
    }))
}

/// The merged output stream of the pipeline.
///
/// Yields records from both branches in whatever interleaving their
/// processing produces; per-branch order follows event arrival. After the
/// first `Err` item nothing further is yielded.
pub struct VinylStream {
    inner: BoxStream<'static, Result<FileRecord>>,
    errored: bool,
}

impl Stream for VinylStream {
    type Item = Result<FileRecord>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.errored {
            return Poll::Ready(None);
        }
        match ready!(this.inner.as_mut().poll_next(cx)) {
            Some(item) => {
                if item.is_err() {
                    this.errored = true;
                }
                Poll::Ready(Some(item))
            }
            None => Poll::Ready(None),
        }
    }
}

/// Extension trait installing [`vinylify`] as a stream operator.
pub trait VinylifyExt: Stream<Item = RawEvent> + Send + Sized + 'static {
    /// Adapt this event stream into a stream of hydrated file records.
    fn vinylify(self, config: VinylifyConfig) -> VinylStream {
        vinylify(self, config)
    }
}

impl<S> VinylifyExt for S where S: Stream<Item = RawEvent> + Send + 'static {}
