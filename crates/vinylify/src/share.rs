//! Ref-counted multicast sharing of a single upstream stream.
//!
//! One upstream subscription serves every current downstream subscriber:
//! the pump task that drains the source is spawned when the first
//! subscriber demands an item and aborted when the last subscriber drops.
//! Delivery is backpressured per subscriber: a slow consumer stalls the
//! upstream instead of losing events. The connection is one-shot; a
//! subscription taken after teardown completes immediately.

use futures::stream::{BoxStream, Stream, StreamExt};
use parking_lot::Mutex;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Buffered events per subscriber before the pump stalls the upstream.
const CHANNEL_CAPACITY: usize = 1024;

/// A fan-out point over a single upstream stream.
///
/// Subscribers taken from the same `SharedSource` observe the same
/// underlying events exactly once each. Dropping the `SharedSource` itself
/// does not tear anything down; only the subscriber count does.
pub struct SharedSource<T> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    state: Mutex<SourceState<T>>,
    /// Sending halves of the per-subscriber channels. The pump snapshots
    /// this list per event and prunes entries whose receiver has dropped.
    senders: Arc<Mutex<Vec<mpsc::Sender<T>>>>,
    subscribers: AtomicUsize,
}

enum SourceState<T> {
    /// Not yet connected; the source waits for demand.
    Idle { source: BoxStream<'static, T> },
    /// The pump task owns the source.
    Running(JoinHandle<()>),
    /// Torn down.
    Terminated,
}

impl<T: Clone + Send + 'static> SharedSource<T> {
    /// Create a fan-out point over the given stream.
    pub fn new<S>(source: S) -> Self
    where
        S: Stream<Item = T> + Send + 'static,
    {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(SourceState::Idle {
                    source: source.boxed(),
                }),
                senders: Arc::new(Mutex::new(Vec::new())),
                subscribers: AtomicUsize::new(0),
            }),
        }
    }

    /// Register a new subscriber.
    ///
    /// Each subscriber gets its own bounded channel, so every event the
    /// upstream produces while the subscriber is live is delivered to it
    /// exactly once. A subscriber registered while the pump is running
    /// joins live and observes events from that point on; one registered
    /// after the source has drained or been torn down receives an
    /// already-ended stream.
    pub fn subscribe(&self) -> SharedSubscription<T> {
        let rx = {
            let state = self.inner.state.lock();
            match &*state {
                SourceState::Terminated => {
                    debug!("subscription after teardown; returning ended stream");
                    None
                }
                SourceState::Running(handle) if handle.is_finished() => {
                    debug!("subscription after upstream drained; returning ended stream");
                    None
                }
                _ => {
                    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
                    self.inner.senders.lock().push(tx);
                    Some(rx)
                }
            }
        };
        self.inner.subscribers.fetch_add(1, Ordering::SeqCst);
        SharedSubscription {
            rx,
            inner: Arc::clone(&self.inner),
        }
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.load(Ordering::SeqCst)
    }
}

impl<T: Clone + Send + 'static> Inner<T> {
    /// Spawn the pump on first demand. Idempotent.
    fn ensure_connected(&self) {
        let mut state = self.state.lock();
        if matches!(*state, SourceState::Idle { .. }) {
            if let SourceState::Idle { source } =
                std::mem::replace(&mut *state, SourceState::Terminated)
            {
                trace!("first demand; connecting upstream");
                *state = SourceState::Running(tokio::spawn(pump(source, Arc::clone(&self.senders))));
            }
        }
    }
}

/// Drive the upstream into every subscriber channel until the source drains
/// or all subscribers are gone. Sends are awaited, so a full subscriber
/// buffer stalls the upstream rather than dropping the event.
async fn pump<T: Clone + Send + 'static>(
    mut source: BoxStream<'static, T>,
    senders: Arc<Mutex<Vec<mpsc::Sender<T>>>>,
) {
    while let Some(item) = source.next().await {
        let targets: Vec<mpsc::Sender<T>> = senders.lock().clone();
        if targets.is_empty() {
            debug!("all subscribers gone; stopping upstream pump");
            return;
        }
        for tx in targets {
            // a failed send means that subscriber dropped; pruned below
            let _ = tx.send(item.clone()).await;
        }
        senders.lock().retain(|tx| !tx.is_closed());
    }
    trace!("upstream drained");
    // drop the sending halves so subscribers see end-of-stream
    senders.lock().clear();
}

/// A subscription handed out by [`SharedSource`].
///
/// Dropping the last live subscription aborts the pump task, releasing the
/// upstream connection.
pub struct SharedSubscription<T> {
    rx: Option<mpsc::Receiver<T>>,
    inner: Arc<Inner<T>>,
}

impl<T: Clone + Send + 'static> Stream for SharedSubscription<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        let this = self.get_mut();
        this.inner.ensure_connected();
        match this.rx.as_mut() {
            Some(rx) => rx.poll_recv(cx),
            None => Poll::Ready(None),
        }
    }
}

impl<T> Drop for SharedSubscription<T> {
    fn drop(&mut self) {
        if self.inner.subscribers.fetch_sub(1, Ordering::SeqCst) == 1 {
            let mut state = self.inner.state.lock();
            if let SourceState::Running(handle) =
                std::mem::replace(&mut *state, SourceState::Terminated)
            {
                handle.abort();
                debug!("last subscriber dropped; upstream connection released");
            }
            self.inner.senders.lock().clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_stream::wrappers::ReceiverStream;

    #[tokio::test]
    async fn every_subscriber_observes_every_event() {
        let shared = SharedSource::new(futures::stream::iter(vec![1, 2, 3]));
        let a = shared.subscribe();
        let b = shared.subscribe();
        assert_eq!(shared.subscriber_count(), 2);

        assert_eq!(a.collect::<Vec<_>>().await, vec![1, 2, 3]);
        assert_eq!(b.collect::<Vec<_>>().await, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn burst_larger_than_buffer_is_delivered_completely() {
        let shared = SharedSource::new(futures::stream::iter(0..5000u32));
        let sub = shared.subscribe();
        let got: Vec<u32> = sub.collect().await;
        assert_eq!(got, (0..5000).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn dropping_last_subscriber_releases_upstream() {
        let (tx, rx) = tokio::sync::mpsc::channel::<u32>(8);
        let shared = SharedSource::new(ReceiverStream::new(rx));
        let mut a = shared.subscribe();
        let b = shared.subscribe();

        tx.send(7).await.unwrap();
        assert_eq!(a.next().await, Some(7));

        drop(a);
        assert!(!tx.is_closed(), "one subscriber still live");
        drop(b);

        // the aborted pump drops the receiver half
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(tx.is_closed(), "upstream should be released");
    }

    #[tokio::test]
    async fn subscriber_joining_mid_run_observes_later_events() {
        let (tx, rx) = tokio::sync::mpsc::channel::<u32>(8);
        let shared = SharedSource::new(ReceiverStream::new(rx));
        let mut early = shared.subscribe();

        tx.send(1).await.unwrap();
        assert_eq!(early.next().await, Some(1));

        let mut late = shared.subscribe();
        tx.send(2).await.unwrap();
        assert_eq!(early.next().await, Some(2));
        assert_eq!(late.next().await, Some(2));
    }

    #[tokio::test]
    async fn subscription_after_teardown_ends_immediately() {
        let shared = SharedSource::new(futures::stream::iter(vec![1]));
        let a = shared.subscribe();
        assert_eq!(a.collect::<Vec<_>>().await, vec![1]);
        // collect consumed and dropped the only subscription

        let mut late = shared.subscribe();
        assert_eq!(late.next().await, None);
    }

    #[tokio::test]
    async fn connection_is_lazy_until_first_poll() {
        let (tx, rx) = tokio::sync::mpsc::channel::<u32>(8);
        let shared = SharedSource::new(ReceiverStream::new(rx));
        let mut sub = shared.subscribe();

        // nothing polled yet, so the pump has not taken the receiver
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!tx.is_closed());

        tx.send(1).await.unwrap();
        assert_eq!(sub.next().await, Some(1));
    }
}
