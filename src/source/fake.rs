//! A fetcher that invents items, for demos and tests.
//!
//! Every call produces one new item titled `Item N` for its channel.  In
//! duplicate mode each call also re-serves everything produced so far, which
//! is what a real feed does and what the engine's de-duplication is for.

use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, Result};
use rand::Rng;
use tokio::time::Instant;

use super::{FeedItem, Fetched, Fetcher};

/// Step used for the random next-attempt hint: `0..5` steps of 500ms.
const JITTER_STEP: Duration = Duration::from_millis(500);

pub struct FakeSource {
    channel: String,
    duplicates: bool,
    interval: Option<Duration>,
    produced: Mutex<Vec<FeedItem>>,
}

impl FakeSource {
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            duplicates: false,
            interval: None,
            produced: Mutex::new(Vec::new()),
        }
    }

    /// Return the whole history on every fetch instead of just the new item.
    pub fn with_duplicates(mut self, duplicates: bool) -> Self {
        self.duplicates = duplicates;
        self
    }

    /// Use a fixed next-attempt delay instead of a random one.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    fn next_delay(&self) -> Duration {
        match self.interval {
            Some(interval) => interval,
            None => JITTER_STEP * rand::thread_rng().gen_range(0..5),
        }
    }
}

impl Fetcher for FakeSource {
    fn name(&self) -> &str {
        &self.channel
    }

    fn fetch(&self) -> Result<Fetched> {
        let next = Instant::now() + self.next_delay();
        let mut produced = self
            .produced
            .lock()
            .map_err(|_| anyhow!("{}: item history poisoned", self.channel))?;

        let item = FeedItem::new(&self.channel, format!("Item {}", produced.len()));
        produced.push(item.clone());

        let items = if self.duplicates {
            produced.clone()
        } else {
            vec![item]
        };
        Ok(Fetched::new(items, next))
    }
}
