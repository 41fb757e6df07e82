//! Fetcher abstraction layer.
//!
//! This module defines the [`Fetcher`] trait, the [`Fetched`] batch it
//! returns and the common [`FeedItem`] type.  Concrete fetchers live in
//! sub-modules: [`RssSource`] polls a real feed, [`FakeSource`] invents items
//! for demos and tests.
//!
//! ## For contributors — adding a new fetcher
//!
//! 1. Create a new file in this directory (e.g. `atom.rs`).
//! 2. Define a struct (e.g. `AtomSource`) and implement [`Fetcher`] for it.
//! 3. Add `mod atom;` below and re-export your struct in the `pub use` block.
//! 4. Hand an instance to [`crate::subscribe`].
//!
//! Scheduling, de-duplication and buffering are handled by the engine in
//! [`crate::poll`]; a fetcher only has to produce a batch and say when it
//! would like to be asked again.

mod fake;
mod feed_item;
mod rss;

pub use fake::FakeSource;
pub use feed_item::{derive_id, FeedItem};
pub use rss::{RssSource, DEFAULT_POLL_INTERVAL};

use anyhow::Result;
use tokio::time::Instant;

/// One successful fetch: a batch of items plus a hint for the next attempt.
#[derive(Debug, Clone)]
pub struct Fetched {
    /// Items in the order the source reported them.
    pub items: Vec<FeedItem>,
    /// Earliest instant at which the next fetch should start.
    pub next: Instant,
}

impl Fetched {
    pub fn new(items: Vec<FeedItem>, next: Instant) -> Self {
        Self { items, next }
    }
}

/// Trait that every fetcher must implement.
///
/// The engine calls [`fetch()`](Fetcher::fetch) from a fresh blocking task
/// each time, never more than one at a time per subscription, so
/// implementations may block on I/O but must be [`Send`] + [`Sync`].
///
/// ## Implementing a new fetcher
///
/// ```ignore
/// pub struct MySource { /* config fields */ }
///
/// impl Fetcher for MySource {
///     fn name(&self) -> &str { "my-source" }
///
///     fn fetch(&self) -> Result<Fetched> {
///         // Perform HTTP / IO, then convert into FeedItem values.
///         todo!()
///     }
/// }
/// ```
pub trait Fetcher: Send + Sync + 'static {
    /// Human-readable label, used in logs and shown alongside items.
    fn name(&self) -> &str;

    /// Fetch the latest batch of items.
    ///
    /// An error is never surfaced immediately: the engine remembers it, backs
    /// off for a fixed delay and reports the most recent outcome when the
    /// subscription is closed.
    fn fetch(&self) -> Result<Fetched>;
}
