//! The item type carried by every subscription.
//!
//! `FeedItem` represents a single entry from any fetcher (RSS, the fake demo
//! source, or anything else implementing [`Fetcher`](super::Fetcher)).  The
//! engine only looks at [`FeedItem::id`]; every other field is payload for the
//! consumer.

use chrono::{DateTime, Utc};

/// A single feed entry, normalised from any fetcher.
///
/// Items are immutable once produced.  Two items with the same `id` are the
/// same item as far as de-duplication is concerned, even if their titles or
/// dates differ.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct FeedItem {
    /// Unique identifier used for de-duplication.
    ///
    /// For RSS this is the `<guid>` element (falling back to `<link>`, then
    /// to `source/title`).  Treat it as an opaque key.
    pub id: String,

    /// Human-readable headline.
    pub title: String,

    /// Optional longer description or summary text.
    pub description: Option<String>,

    /// URL to the full content.
    pub link: Option<String>,

    /// Publication timestamp, when the source provides one.
    pub published: Option<DateTime<Utc>>,

    /// Name of the source or feed this came from (e.g. "BBC News").
    pub source_name: String,
}

impl FeedItem {
    /// Build a bare item whose id is derived from its source and title.
    pub fn new(source_name: impl Into<String>, title: impl Into<String>) -> Self {
        let source_name = source_name.into();
        let title = title.into();
        Self {
            id: derive_id(&source_name, &title),
            title,
            description: None,
            link: None,
            published: None,
            source_name,
        }
    }
}

/// `source/title`, the id used when a source has nothing better to offer.
pub fn derive_id(source_name: &str, title: &str) -> String {
    format!("{source_name}/{title}")
}
