//! Background feed polling: the per-fetcher subscription engine.
//!
//! [`subscribe`] spawns one task that owns all state for a single fetcher and
//! runs an event loop over four events:
//!
//! ```text
//!            ┌───────────────── schedule fetch ─────────────────┐
//!            │  (nothing in flight, pending < max, next ≤ now)  │
//!            ▼                                                  │
//!   spawn_blocking(fetch) ── fetch completed ──► dedup ──► pending (FIFO)
//!                            (ok: next = hint)                  │
//!                            (err: next = now + backoff)        │
//!                                                               ▼
//!   close request ──► mark exhausted, reply err, exit      deliver head
//! ```
//!
//! Each iteration re-computes which events are eligible and waits on the first
//! ready one.  Nothing is shared with other tasks except through channels, so
//! there are no locks: a slow consumer stalls delivery, pending fills up, and
//! fetching stops on its own.
//!
//! A fetch that is still running when the subscription closes is left to
//! finish; its result is discarded with the dropped [`JoinHandle`].

use std::collections::{HashSet, VecDeque};
use std::future;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span, warn, Instrument};

use crate::config::EngineConfig;
use crate::source::{FeedItem, Fetched, Fetcher};
use crate::subscription::{Close, Subscription, Updates};

type CloseReply = oneshot::Sender<Option<anyhow::Error>>;

/// Subscribe to `fetcher` with the default [`EngineConfig`].
///
/// Must be called from within a tokio runtime; the engine starts immediately.
pub fn subscribe<F: Fetcher>(fetcher: F) -> Subscription {
    subscribe_with(fetcher, EngineConfig::default())
}

/// Subscribe to `fetcher` with an explicit configuration.
pub fn subscribe_with<F: Fetcher>(fetcher: F, config: EngineConfig) -> Subscription {
    let (updates_tx, updates, exhausted) = Updates::channel();
    let (closing_tx, closing_rx) = mpsc::channel(1);

    let span = info_span!("subscription", source = %fetcher.name());
    let engine = Engine {
        fetcher: Arc::new(fetcher),
        config,
        updates: updates_tx,
        consumer_gone: false,
        closing: closing_rx,
        exhausted,
        state: EngineState::new(Instant::now()),
    };
    tokio::spawn(engine.run().instrument(span));

    Subscription::new(updates, EngineCloser { closing: closing_tx })
}

/// Mutable state of one engine.  Owned by the loop task alone.
#[derive(Debug)]
struct EngineState {
    /// De-duplicated items awaiting delivery.
    pending: VecDeque<FeedItem>,
    /// Every id ever admitted into `pending`.
    seen: HashSet<String>,
    /// Outcome of the most recent fetch.
    last_error: Option<anyhow::Error>,
    /// Earliest instant the next fetch may start.
    next_fetch: Instant,
    /// `Some` while a fetch is running.
    in_flight: Option<JoinHandle<Result<Fetched>>>,
}

impl EngineState {
    fn new(now: Instant) -> Self {
        Self {
            pending: VecDeque::new(),
            seen: HashSet::new(),
            last_error: None,
            next_fetch: now,
            in_flight: None,
        }
    }

    /// No fetch is scheduled while `pending.len() >= max_pending`.
    fn can_fetch(&self, max_pending: usize) -> bool {
        self.in_flight.is_none() && self.pending.len() < max_pending
    }

    /// Fold a finished fetch into the state.  Returns how many items were
    /// admitted.
    fn absorb(&mut self, outcome: Result<Fetched>, config: &EngineConfig, now: Instant) -> usize {
        match outcome {
            Ok(fetched) => {
                self.last_error = None;
                self.next_fetch = fetched.next;
                self.admit(fetched.items)
            }
            Err(err) => {
                self.last_error = Some(err);
                self.next_fetch = now + config.error_backoff;
                0
            }
        }
    }

    /// Append unseen items in order.  The whole batch is kept even past the
    /// cap; the cap only stops the next fetch from being scheduled.
    fn admit(&mut self, items: Vec<FeedItem>) -> usize {
        let before = self.pending.len();
        for item in items {
            if self.seen.insert(item.id.clone()) {
                self.pending.push_back(item);
            }
        }
        self.pending.len() - before
    }
}

struct Engine<F> {
    fetcher: Arc<F>,
    config: EngineConfig,
    updates: mpsc::Sender<FeedItem>,
    /// Set once the [`Updates`] receiver has been dropped.
    consumer_gone: bool,
    closing: mpsc::Receiver<CloseReply>,
    exhausted: CancellationToken,
    state: EngineState,
}

impl<F: Fetcher> Engine<F> {
    async fn run(mut self) {
        debug!("subscription started");

        loop {
            let can_fetch = self.state.can_fetch(self.config.max_pending);
            let can_deliver = !self.consumer_gone && !self.state.pending.is_empty();
            let fetching = self.state.in_flight.is_some();

            tokio::select! {
                _ = time::sleep_until(self.state.next_fetch), if can_fetch => {
                    self.state.in_flight = Some(start_fetch(&self.fetcher));
                }
                outcome = join_fetch(&mut self.state.in_flight), if fetching => {
                    self.state.in_flight = None;
                    if let Err(err) = &outcome {
                        warn!(error = %format!("{err:#}"), "fetch failed, backing off");
                    }
                    let admitted = self.state.absorb(outcome, &self.config, Instant::now());
                    debug!(admitted, pending = self.state.pending.len(), "fetch absorbed");
                }
                permit = self.updates.reserve(), if can_deliver => match permit {
                    Ok(permit) => {
                        if let Some(item) = self.state.pending.pop_front() {
                            permit.send(item);
                        }
                    }
                    Err(_) => {
                        debug!("consumer dropped updates, delivery disabled");
                        self.consumer_gone = true;
                    }
                },
                reply = self.closing.recv() => {
                    self.exhausted.cancel();
                    match reply {
                        Some(reply) => {
                            // The closer may have given up waiting; nothing to do then.
                            let _ = reply.send(self.state.last_error.take());
                        }
                        None => debug!("close handle dropped, stopping"),
                    }
                    debug!(discarded = self.state.pending.len(), "subscription closed");
                    return;
                }
            }
        }
    }
}

/// Run one fetch on the blocking pool.
fn start_fetch<F: Fetcher>(fetcher: &Arc<F>) -> JoinHandle<Result<Fetched>> {
    let fetcher = Arc::clone(fetcher);
    tokio::task::spawn_blocking(move || fetcher.fetch())
}

/// Resolves with the running fetch's outcome, or never if none is running.
async fn join_fetch(in_flight: &mut Option<JoinHandle<Result<Fetched>>>) -> Result<Fetched> {
    match in_flight {
        Some(handle) => handle.await.context("fetch task did not complete")?,
        None => future::pending().await,
    }
}

/// Close half of an engine subscription.
struct EngineCloser {
    closing: mpsc::Sender<CloseReply>,
}

#[async_trait]
impl Close for EngineCloser {
    async fn close(self: Box<Self>) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.closing
            .send(reply_tx)
            .await
            .map_err(|_| anyhow!("subscription already closed"))?;
        match reply_rx.await {
            Ok(None) => Ok(()),
            Ok(Some(err)) => Err(err),
            Err(_) => Err(anyhow!("subscription already closed")),
        }
    }
}
