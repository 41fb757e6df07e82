//! The handle shared by engines and merges.
//!
//! A [`Subscription`] pairs a live [`Updates`] stream with a single-shot
//! [`Close`] operation.  The two halves can be split with
//! [`Subscription::into_parts`] so that one task consumes items while another
//! decides when to stop.

use std::pin::Pin;
use std::task::{Context, Poll};

use anyhow::Result;
use async_trait::async_trait;
use futures::Stream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::source::FeedItem;

/// Slots in the hand-off channel between a producer and its consumer.
pub(crate) const UPDATES_CAPACITY: usize = 1;

/// Stops a running producer and reports its outcome.
///
/// `close` consumes the handle, so a subscription can only be closed once.
/// It returns after the producer has acknowledged, with the most recent error
/// the producer observed (or `Ok(())`).
#[async_trait]
pub trait Close: Send {
    async fn close(self: Box<Self>) -> Result<()>;
}

/// The stream of items delivered by a subscription.
///
/// Ends (`None`) only once the producer is closed.  After [`Close::close`]
/// returns, no further item is yielded, even one that was already sitting in
/// the channel.
#[derive(Debug)]
pub struct Updates {
    rx: mpsc::Receiver<FeedItem>,
    exhausted: CancellationToken,
}

impl Updates {
    /// Wrap a receiver.  The producer cancels `exhausted` before it
    /// acknowledges a close.
    pub fn new(rx: mpsc::Receiver<FeedItem>, exhausted: CancellationToken) -> Self {
        Self { rx, exhausted }
    }

    /// A fresh channel plus the token that marks it exhausted.
    pub(crate) fn channel() -> (mpsc::Sender<FeedItem>, Updates, CancellationToken) {
        let (tx, rx) = mpsc::channel(UPDATES_CAPACITY);
        let exhausted = CancellationToken::new();
        (tx, Updates::new(rx, exhausted.clone()), exhausted)
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted.is_cancelled()
    }
}

impl Stream for Updates {
    type Item = FeedItem;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<FeedItem>> {
        if self.exhausted.is_cancelled() {
            return Poll::Ready(None);
        }
        match self.rx.poll_recv(cx) {
            // Raced with a close: the item was buffered before the producer stopped.
            Poll::Ready(Some(_)) if self.exhausted.is_cancelled() => Poll::Ready(None),
            other => other,
        }
    }
}

/// A live item stream bound to one engine or one merge.
pub struct Subscription {
    updates: Updates,
    closer: Box<dyn Close>,
}

impl Subscription {
    pub fn new(updates: Updates, closer: impl Close + 'static) -> Self {
        Self {
            updates,
            closer: Box::new(closer),
        }
    }

    pub fn updates(&mut self) -> &mut Updates {
        &mut self.updates
    }

    pub fn into_parts(self) -> (Updates, Box<dyn Close>) {
        (self.updates, self.closer)
    }

    /// Close the producer and return its last error.
    pub async fn close(self) -> Result<()> {
        self.closer.close().await
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("updates", &self.updates)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    struct NoopCloser;

    #[async_trait]
    impl Close for NoopCloser {
        async fn close(self: Box<Self>) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn yields_items_until_exhausted() {
        let (tx, mut updates, exhausted) = Updates::channel();
        tx.send(FeedItem::new("a", "Item 0")).await.unwrap();
        assert_eq!(updates.next().await.unwrap().id, "a/Item 0");

        exhausted.cancel();
        assert!(updates.is_exhausted());
        assert!(updates.next().await.is_none());
    }

    #[tokio::test]
    async fn buffered_item_is_not_yielded_after_exhaustion() {
        let (tx, mut updates, exhausted) = Updates::channel();
        tx.send(FeedItem::new("a", "Item 0")).await.unwrap();
        exhausted.cancel();
        assert!(updates.next().await.is_none());
        assert!(updates.next().await.is_none());
    }

    #[tokio::test]
    async fn ends_when_producer_goes_away() {
        let (tx, mut updates, _exhausted) = Updates::channel();
        drop(tx);
        assert!(updates.next().await.is_none());
    }

    #[tokio::test]
    async fn split_halves_work_independently() {
        let (_tx, updates, _exhausted) = Updates::channel();
        let sub = Subscription::new(updates, NoopCloser);
        let (updates, closer) = sub.into_parts();
        assert!(!updates.is_exhausted());
        closer.close().await.unwrap();
    }
}
