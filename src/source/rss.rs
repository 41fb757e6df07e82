//! RSS feed fetcher.
//!
//! Polls an RSS 2.0 feed over HTTP and asks to be called again after a fixed
//! interval.  A feed returns its whole item list on every request; the engine
//! drops the ones it has already seen.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tokio::time::Instant;

use super::{derive_id, FeedItem, Fetched, Fetcher};

/// How long to wait between two successful polls unless configured otherwise.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// An RSS feed fetcher.
///
/// Fetches and parses an RSS 2.0 feed over HTTP using the [`rss`] crate.
pub struct RssSource {
    /// The feed URL to poll.
    pub url: String,
    /// A human-readable label shown in the UI next to each item.
    pub label: String,
    /// Delay between a successful fetch and the next one.
    pub poll_interval: Duration,
}

impl RssSource {
    /// Create a new RSS source.
    ///
    /// # Arguments
    ///
    /// * `url` — full URL of the RSS feed (e.g.
    ///   `https://feeds.bbci.co.uk/news/rss.xml`).
    /// * `label` — short name displayed in the TUI for items from this feed.
    pub fn new(url: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            label: label.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Parse an already-fetched [`rss::Channel`] into [`FeedItem`]s.
    ///
    /// This is a pure function (no I/O) so that tests can exercise the
    /// parsing logic without hitting the network.
    pub fn parse_channel(channel: &rss::Channel, label: &str) -> Vec<FeedItem> {
        channel
            .items()
            .iter()
            .map(|item| {
                let title = item.title().unwrap_or("(untitled)");

                // Prefer <guid>, fall back to <link>, then label/title.
                let id = item
                    .guid()
                    .map(|g| g.value().to_string())
                    .or_else(|| item.link().map(String::from))
                    .unwrap_or_else(|| derive_id(label, title));

                // Parse RFC-2822 date; gracefully degrade to None on failure.
                let published = item
                    .pub_date()
                    .and_then(|d| DateTime::parse_from_rfc2822(d).ok())
                    .map(|dt| dt.with_timezone(&Utc));

                FeedItem {
                    id,
                    title: title.to_string(),
                    description: item.description().map(String::from),
                    link: item.link().map(String::from),
                    published,
                    source_name: label.to_string(),
                }
            })
            .collect()
    }
}

impl Fetcher for RssSource {
    fn name(&self) -> &str {
        &self.label
    }

    fn fetch(&self) -> Result<Fetched> {
        let body = reqwest::blocking::get(&self.url)
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.bytes())
            .with_context(|| format!("requesting {}", self.url))?;
        let channel = rss::Channel::read_from(body.as_ref())
            .with_context(|| format!("parsing feed from {}", self.url))?;
        let items = Self::parse_channel(&channel, &self.label);
        Ok(Fetched::new(items, Instant::now() + self.poll_interval))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// One item per id rule: guid, link only, neither.
    const MIXED_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Test</title>
    <item>
      <title>Has GUID</title>
      <link>https://example.com/1</link>
      <guid>guid-1</guid>
      <pubDate>Mon, 01 Jan 2024 00:00:00 +0000</pubDate>
    </item>
    <item>
      <title>Link only</title>
      <link>https://example.com/2</link>
    </item>
    <item>
      <title>Bare</title>
    </item>
  </channel>
</rss>"#;

    fn mixed_items(label: &str) -> Vec<FeedItem> {
        let channel = rss::Channel::read_from(MIXED_FEED.as_bytes()).unwrap();
        RssSource::parse_channel(&channel, label)
    }

    #[test]
    fn ids_fall_back_from_guid_to_link_to_label_and_title() {
        let ids: Vec<_> = mixed_items("news").into_iter().map(|i| i.id).collect();
        assert_eq!(ids, ["guid-1", "https://example.com/2", "news/Bare"]);
    }

    #[test]
    fn reparsing_the_same_feed_gives_the_same_ids() {
        // The engine relies on this to drop items a feed serves again.
        let first: Vec<_> = mixed_items("news").into_iter().map(|i| i.id).collect();
        let second: Vec<_> = mixed_items("news").into_iter().map(|i| i.id).collect();
        assert_eq!(first, second);
        assert!(mixed_items("news").iter().all(|i| i.source_name == "news"));
    }

    #[test]
    fn poll_interval_defaults_and_can_be_overridden() {
        let src = RssSource::new("http://example.com/feed", "My Feed");
        assert_eq!(src.name(), "My Feed");
        assert_eq!(src.poll_interval, DEFAULT_POLL_INTERVAL);

        let src = src.with_poll_interval(Duration::from_secs(5));
        assert_eq!(src.poll_interval, Duration::from_secs(5));
    }

    #[test]
    fn fetch_reports_unreachable_feed_as_error() {
        let src = RssSource::new("http://127.0.0.1:9/feed.xml", "nowhere");
        let err = src.fetch().unwrap_err();
        assert!(format!("{err:#}").contains("requesting http://127.0.0.1:9/feed.xml"));
    }
}
