//! Fan-in of several subscriptions into one.
//!
//! Each child gets a forwarding worker that alternates between taking the
//! child's next item and handing it to the merged stream.  Both waits also
//! watch a shared [`CancellationToken`], so closing the merge reaches every
//! worker at once no matter which phase it is in.
//!
//! Items from one child keep their order; across children the order is
//! whatever the race produces.

use anyhow::Result;
use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::source::FeedItem;
use crate::subscription::{Close, Subscription, Updates};

/// Merge `subscriptions` into a single subscription.
///
/// Closing the result closes every child exactly once and waits for all of
/// them.  When several children report an error only the last one observed
/// is returned; the others are logged and dropped.  Close children one by one
/// if you need each of their errors.
///
/// With no children the merged stream never yields and close returns
/// `Ok(())` immediately.
pub fn merge(subscriptions: impl IntoIterator<Item = Subscription>) -> Subscription {
    let (updates_tx, updates, exhausted) = Updates::channel();
    let quit = CancellationToken::new();

    let children: Vec<Subscription> = subscriptions.into_iter().collect();
    let count = children.len();
    let (errs_tx, errs_rx) = mpsc::channel(count.max(1));

    for (index, child) in children.into_iter().enumerate() {
        tokio::spawn(forward(index, child, updates_tx.clone(), quit.clone(), errs_tx.clone()));
    }

    Subscription::new(
        updates,
        MergeCloser {
            quit,
            errs: errs_rx,
            children: count,
            exhausted,
            _updates: updates_tx,
        },
    )
}

/// Worker for one child: acquire, deliver, repeat; close the child on quit.
async fn forward(
    index: usize,
    child: Subscription,
    out: mpsc::Sender<FeedItem>,
    quit: CancellationToken,
    errs: mpsc::Sender<Option<anyhow::Error>>,
) {
    let (mut updates, closer) = child.into_parts();

    loop {
        let item = tokio::select! {
            item = updates.next() => item,
            _ = quit.cancelled() => break,
        };
        let Some(item) = item else {
            // The child stopped on its own; nothing more to forward.
            debug!(child = index, "child stream ended before merge close");
            quit.cancelled().await;
            break;
        };

        tokio::select! {
            permit = out.reserve() => match permit {
                Ok(permit) => permit.send(item),
                Err(_) => {
                    quit.cancelled().await;
                    break;
                }
            },
            // The held item is dropped: nobody is going to read it.
            _ = quit.cancelled() => break,
        }
    }

    drop(updates);
    let result = closer.close().await;
    if errs.send(result.err()).await.is_err() {
        debug!(child = index, "merge closer went away before collecting");
    }
}

struct MergeCloser {
    quit: CancellationToken,
    errs: mpsc::Receiver<Option<anyhow::Error>>,
    children: usize,
    exhausted: CancellationToken,
    /// Keeps the merged stream open until close, even with no children.
    _updates: mpsc::Sender<FeedItem>,
}

#[async_trait]
impl Close for MergeCloser {
    async fn close(self: Box<Self>) -> Result<()> {
        let MergeCloser {
            quit,
            mut errs,
            children,
            exhausted,
            _updates: updates_tx,
        } = *self;

        quit.cancel();

        let mut last: Option<anyhow::Error> = None;
        for _ in 0..children {
            match errs.recv().await {
                Some(Some(err)) => {
                    if let Some(dropped) = last.replace(err) {
                        warn!(error = %format!("{dropped:#}"), "merge close: discarding earlier child error");
                    }
                }
                Some(None) => {}
                // A worker died without reporting; the rest cannot be waited for.
                None => break,
            }
        }

        exhausted.cancel();
        drop(updates_tx);
        debug!(children, "merge closed");

        match last {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use anyhow::anyhow;
    use tokio::time::{self, Instant};

    use crate::poll::subscribe;
    use crate::source::{Fetched, Fetcher};

    /// Serves the same fixed batch on every fetch.
    struct Finite {
        name: &'static str,
        batch: Vec<FeedItem>,
    }

    impl Finite {
        fn new(name: &'static str, count: usize) -> Self {
            let batch = (0..count).map(|i| FeedItem::new(name, format!("Item {i}"))).collect();
            Self { name, batch }
        }
    }

    impl Fetcher for Finite {
        fn name(&self) -> &str {
            self.name
        }

        fn fetch(&self) -> Result<Fetched> {
            // Re-serving the same batch is harmless: the engine de-duplicates.
            Ok(Fetched::new(self.batch.clone(), Instant::now() + Duration::from_millis(100)))
        }
    }

    struct Failing(&'static str);

    impl Fetcher for Failing {
        fn name(&self) -> &str {
            self.0
        }

        fn fetch(&self) -> Result<Fetched> {
            Err(anyhow!("{} is down", self.0))
        }
    }

    /// A hand-built child whose close is counted and slow.
    fn counted_child(
        closes: Arc<AtomicUsize>,
        acked: Arc<AtomicUsize>,
        delay: Duration,
    ) -> (mpsc::Sender<FeedItem>, Subscription) {
        let (tx, updates, exhausted) = Updates::channel();
        let closer = CountingCloser {
            closes,
            acked,
            delay,
            exhausted,
        };
        (tx, Subscription::new(updates, closer))
    }

    struct CountingCloser {
        closes: Arc<AtomicUsize>,
        acked: Arc<AtomicUsize>,
        delay: Duration,
        exhausted: CancellationToken,
    }

    #[async_trait]
    impl Close for CountingCloser {
        async fn close(self: Box<Self>) -> Result<()> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            time::sleep(self.delay).await;
            self.exhausted.cancel();
            self.acked.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn delivers_every_item_from_every_child() {
        let mut merged = merge([subscribe(Finite::new("a", 2)), subscribe(Finite::new("b", 1))]);

        let mut got = HashSet::new();
        for _ in 0..3 {
            got.insert(merged.updates().next().await.unwrap().id);
        }
        let want: HashSet<String> = ["a/Item 0", "a/Item 1", "b/Item 0"].map(String::from).into();
        assert_eq!(got, want);

        merged.close().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn keeps_per_child_order() {
        let mut merged = merge([subscribe(Finite::new("a", 5)), subscribe(Finite::new("b", 5))]);

        let mut a = Vec::new();
        let mut b = Vec::new();
        for _ in 0..10 {
            let item = merged.updates().next().await.unwrap();
            match item.source_name.as_str() {
                "a" => a.push(item.title),
                _ => b.push(item.title),
            }
        }
        let expected: Vec<String> = (0..5).map(|i| format!("Item {i}")).collect();
        assert_eq!(a, expected);
        assert_eq!(b, expected);

        merged.close().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn close_cascades_to_every_child_once_and_waits() {
        let closes = Arc::new(AtomicUsize::new(0));
        let acked = Arc::new(AtomicUsize::new(0));

        let mut senders = Vec::new();
        let mut children = Vec::new();
        for i in 0..3u64 {
            let delay = Duration::from_millis(100 * (i + 1));
            let (tx, child) = counted_child(Arc::clone(&closes), Arc::clone(&acked), delay);
            senders.push(tx);
            children.push(child);
        }
        // Nobody reads the merged stream, so this item is still in transit at close.
        senders[0].send(FeedItem::new("x", "held")).await.unwrap();
        let merged = merge(children);
        time::sleep(Duration::from_millis(10)).await;

        merged.close().await.unwrap();
        assert_eq!(closes.load(Ordering::SeqCst), 3);
        assert_eq!(acked.load(Ordering::SeqCst), 3, "close returned before all children acked");

        time::sleep(Duration::from_secs(1)).await;
        assert_eq!(closes.load(Ordering::SeqCst), 3, "a child was closed twice");
    }

    #[tokio::test(start_paused = true)]
    async fn updates_end_after_close() {
        let merged = merge([subscribe(Finite::new("a", 3))]);
        let (mut updates, closer) = merged.into_parts();
        assert!(updates.next().await.is_some());

        closer.close().await.unwrap();
        assert!(updates.next().await.is_none());
        assert!(updates.next().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn close_returns_a_child_error() {
        let merged = merge([subscribe(Finite::new("ok", 1)), subscribe(Failing("down"))]);
        time::sleep(Duration::from_secs(1)).await;

        let err = merged.close().await.unwrap_err();
        assert_eq!(err.to_string(), "down is down");
    }

    #[tokio::test(start_paused = true)]
    async fn only_one_of_several_child_errors_survives() {
        let merged = merge([subscribe(Failing("x")), subscribe(Failing("y"))]);
        time::sleep(Duration::from_secs(1)).await;

        // Known loss: both children failed but only the last report is kept.
        let err = merged.close().await.unwrap_err();
        let msg = err.to_string();
        assert!(msg == "x is down" || msg == "y is down", "unexpected error {msg}");
        assert_eq!(err.chain().count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_children_never_yields_and_closes_at_once() {
        let merged = merge(Vec::new());
        let (mut updates, closer) = merged.into_parts();

        assert!(time::timeout(Duration::from_secs(60), updates.next()).await.is_err());

        time::timeout(Duration::from_millis(1), closer.close())
            .await
            .expect("empty merge must close immediately")
            .unwrap();
        assert!(updates.next().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn merges_nest() {
        let inner = merge([subscribe(Finite::new("a", 1)), subscribe(Finite::new("b", 1))]);
        let mut outer = merge([inner, subscribe(Finite::new("c", 1))]);

        let mut got = HashSet::new();
        for _ in 0..3 {
            got.insert(outer.updates().next().await.unwrap().source_name);
        }
        assert_eq!(got.len(), 3);
        outer.close().await.unwrap();
    }
}
