// Integration tests for keyed stream merging
//
// Sources are plain futures streams or channel-backed streams so the tests
// can control exactly when each source produces.

use futures::stream::{self, BoxStream, Stream, StreamExt};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use voice_bridge::{MergeError, StreamMerger};

type Source = BoxStream<'static, Result<u32, String>>;

/// Stream wrapper that records when it is dropped
struct DropFlag<S> {
    inner: S,
    dropped: Arc<AtomicBool>,
}

impl<S: Stream + Unpin> Stream for DropFlag<S> {
    type Item = S::Item;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

impl<S> Drop for DropFlag<S> {
    fn drop(&mut self) {
        self.dropped.store(true, Ordering::SeqCst);
    }
}

fn items(values: Vec<Result<u32, String>>) -> Source {
    stream::iter(values).boxed()
}

fn channel_source() -> (mpsc::Sender<Result<u32, String>>, Source) {
    let (tx, rx) = mpsc::channel(8);
    (tx, ReceiverStream::new(rx).boxed())
}

#[tokio::test]
async fn test_yields_every_item_then_ends() {
    let merger = StreamMerger::from_sources([
        ("a", items(vec![Ok(1), Ok(2)])),
        ("b", items(vec![Ok(10)])),
    ])
    .unwrap();

    let results: Vec<_> = merger.collect().await;
    assert_eq!(results.len(), 3);

    let pairs: Vec<(&str, u32)> = results.into_iter().map(Result::unwrap).collect();
    let from_a: Vec<u32> = pairs.iter().filter(|(k, _)| *k == "a").map(|(_, v)| *v).collect();
    let from_b: Vec<u32> = pairs.iter().filter(|(k, _)| *k == "b").map(|(_, v)| *v).collect();

    assert_eq!(from_a, vec![1, 2], "per-source order is preserved");
    assert_eq!(from_b, vec![10]);
}

#[tokio::test]
async fn test_stays_terminated_after_exhaustion() {
    let mut merger = StreamMerger::from_sources([("a", items(vec![Ok(1)]))]).unwrap();

    assert!(matches!(merger.next().await, Some(Ok(("a", 1)))));
    assert!(merger.next().await.is_none());
    assert!(merger.next().await.is_none());
}

#[tokio::test]
async fn test_items_arrive_in_completion_order() {
    let (tx_a, a) = channel_source();
    let (tx_b, b) = channel_source();
    let mut merger = StreamMerger::from_sources([("a", a), ("b", b)]).unwrap();

    tx_b.send(Ok(20)).await.unwrap();
    assert!(matches!(merger.next().await, Some(Ok(("b", 20)))));

    tx_a.send(Ok(10)).await.unwrap();
    assert!(matches!(merger.next().await, Some(Ok(("a", 10)))));

    tx_b.send(Ok(21)).await.unwrap();
    assert!(matches!(merger.next().await, Some(Ok(("b", 21)))));

    drop(tx_a);
    drop(tx_b);
    assert!(merger.next().await.is_none());
}

#[tokio::test]
async fn test_exhausted_source_does_not_end_the_merge() {
    let (tx, live) = channel_source();
    let mut merger =
        StreamMerger::from_sources([("empty", items(vec![])), ("live", live)]).unwrap();

    tx.send(Ok(5)).await.unwrap();
    assert!(matches!(merger.next().await, Some(Ok(("live", 5)))));
    assert_eq!(merger.active_sources(), 1);

    drop(tx);
    assert!(merger.next().await.is_none());
}

#[tokio::test]
async fn test_error_cancels_pending_reads_before_surfacing() {
    let dropped = Arc::new(AtomicBool::new(false));
    let stalled: Source = DropFlag {
        inner: stream::pending::<Result<u32, String>>(),
        dropped: Arc::clone(&dropped),
    }
    .boxed();

    let mut merger = StreamMerger::from_sources([
        ("a", stalled),
        ("b", items(vec![Ok(1), Err("boom".to_string())])),
    ])
    .unwrap();

    assert!(matches!(merger.next().await, Some(Ok(("b", 1)))));
    assert!(!dropped.load(Ordering::SeqCst), "a's read is still outstanding");

    match merger.next().await {
        Some(Err(MergeError::Source { key, error })) => {
            assert_eq!(key, "b");
            assert_eq!(error, "boom");
        }
        other => panic!("expected source error, got {:?}", other.map(|r| r.is_ok())),
    }

    assert!(dropped.load(Ordering::SeqCst), "a's pending read was cancelled");
    assert_eq!(merger.active_sources(), 0);
    assert!(merger.next().await.is_none(), "nothing follows the error");
}

#[tokio::test]
async fn test_error_releases_channel_backed_sources() {
    let (tx, live) = channel_source();
    let mut merger =
        StreamMerger::from_sources([("live", live), ("bad", items(vec![Err("io".to_string())]))])
            .unwrap();

    assert!(matches!(
        merger.next().await,
        Some(Err(MergeError::Source { key: "bad", .. }))
    ));

    // Receiver side was dropped with the cancelled read
    tokio::time::timeout(Duration::from_secs(1), tx.closed())
        .await
        .expect("channel should be closed after cancellation");
    assert!(tx.send(Ok(1)).await.is_err());
}

#[test]
fn test_duplicate_source_key() {
    let result = StreamMerger::from_sources([("a", items(vec![])), ("a", items(vec![]))]);
    assert!(matches!(result, Err(MergeError::DuplicateSource("a"))));
}
