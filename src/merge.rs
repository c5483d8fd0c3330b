// Fan-in of several independent async sources into one keyed stream
//
// Each active source has exactly one outstanding read, held in a
// FuturesUnordered. A completed read is yielded and immediately re-armed on
// the same source; an exhausted source is retired. When any read fails, all
// other pending reads are dropped before the error is handed to the consumer,
// so nothing stays in flight once the merger has terminated.

use futures::stream::{FusedStream, FuturesUnordered, Stream, StreamExt, StreamFuture};
use futures::FutureExt;
use std::collections::HashSet;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use tracing::{debug, warn};

use crate::error::MergeError;

/// An outstanding read on one source
struct PendingRead<K, S> {
    key: K,
    read: StreamFuture<S>,
}

impl<K, S> PendingRead<K, S>
where
    S: Stream + Unpin,
{
    fn new(key: K, stream: S) -> Self {
        Self {
            key,
            read: stream.into_future(),
        }
    }
}

impl<K, S> Future for PendingRead<K, S>
where
    K: Clone + Unpin,
    S: Stream + Unpin,
{
    type Output = (K, Option<S::Item>, S);

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let (item, stream) = ready!(this.read.poll_unpin(cx));
        Poll::Ready((this.key.clone(), item, stream))
    }
}

/// Merges keyed `Result` streams, yielding `(key, value)` in completion order
///
/// Items from one source keep their order; there is no ordering between
/// sources. The merger ends once every source is exhausted, or right after
/// yielding the first source error. It imposes no timeouts: a source that
/// never yields stalls the merge.
pub struct StreamMerger<K, S> {
    pending: FuturesUnordered<PendingRead<K, S>>,
    keys: HashSet<K>,
    terminated: bool,
}

impl<K, S> StreamMerger<K, S> {
    pub fn new() -> Self {
        Self {
            pending: FuturesUnordered::new(),
            keys: HashSet::new(),
            terminated: false,
        }
    }

    /// Number of sources with a read outstanding
    pub fn active_sources(&self) -> usize {
        self.pending.len()
    }
}

impl<K, S> Default for StreamMerger<K, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, S, T, E> StreamMerger<K, S>
where
    K: Clone + Eq + Hash + Debug + Unpin,
    S: Stream<Item = Result<T, E>> + Unpin,
{
    /// Build a merger from keyed sources
    pub fn from_sources(
        sources: impl IntoIterator<Item = (K, S)>,
    ) -> Result<Self, MergeError<K, E>> {
        let mut merger = Self::new();
        for (key, stream) in sources {
            merger.add(key, stream)?;
        }
        Ok(merger)
    }

    /// Register a source and issue its first read
    ///
    /// Keys are unique for the lifetime of the merger, including retired sources.
    pub fn add(&mut self, key: K, stream: S) -> Result<(), MergeError<K, E>> {
        if !self.keys.insert(key.clone()) {
            return Err(MergeError::DuplicateSource(key));
        }

        self.pending.push(PendingRead::new(key, stream));
        self.terminated = false;
        Ok(())
    }

    /// Drop every outstanding read
    fn cancel_all(&mut self) -> usize {
        let cancelled = self.pending.len();
        self.pending.clear();
        self.terminated = true;
        cancelled
    }
}

impl<K, S, T, E> Stream for StreamMerger<K, S>
where
    K: Clone + Eq + Hash + Debug + Unpin,
    S: Stream<Item = Result<T, E>> + Unpin,
{
    type Item = Result<(K, T), MergeError<K, E>>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.terminated {
            return Poll::Ready(None);
        }

        loop {
            match ready!(this.pending.poll_next_unpin(cx)) {
                None => {
                    debug!("All merge sources exhausted");
                    this.terminated = true;
                    return Poll::Ready(None);
                }
                Some((key, None, _stream)) => {
                    debug!(source = ?key, remaining = this.pending.len(), "Merge source retired");
                }
                Some((key, Some(Ok(value)), stream)) => {
                    this.pending.push(PendingRead::new(key.clone(), stream));
                    return Poll::Ready(Some(Ok((key, value))));
                }
                Some((key, Some(Err(error)), _stream)) => {
                    let cancelled = this.cancel_all();
                    warn!(source = ?key, cancelled, "Merge source failed, cancelled pending reads");
                    return Poll::Ready(Some(Err(MergeError::Source { key, error })));
                }
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.terminated {
            (0, Some(0))
        } else {
            (0, None)
        }
    }
}

impl<K, S, T, E> FusedStream for StreamMerger<K, S>
where
    K: Clone + Eq + Hash + Debug + Unpin,
    S: Stream<Item = Result<T, E>> + Unpin,
{
    fn is_terminated(&self) -> bool {
        self.terminated
    }
}
