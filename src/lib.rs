//! livescroll — live, de-duplicated subscriptions over polled feeds.
//!
//! ## Architecture overview
//!
//! ```text
//! ┌──────────┐  Fetched  ┌──────────────┐  Updates  ┌─────────┐  Updates
//! │ Fetcher  │ ────────► │ poll engine  │ ────────► │         │ ─────────► consumer
//! └──────────┘           └──────────────┘           │  merge  │
//! ┌──────────┐  Fetched  ┌──────────────┐  Updates  │         │
//! │ Fetcher  │ ────────► │ poll engine  │ ────────► │         │
//! └──────────┘           └──────────────┘           └─────────┘
//! ```
//!
//! * **`source/`** — the [`Fetcher`] trait, the [`FeedItem`] type and the
//!   concrete fetchers ([`RssSource`], [`FakeSource`]).
//! * **`poll`** — [`subscribe`]: one event loop per fetcher that schedules
//!   fetches, drops duplicates, buffers up to a cap and delivers items.
//! * **`merge`** — [`merge`]: fans several subscriptions into one and closes
//!   them all together.
//! * **`subscription`** — the [`Subscription`] handle both of the above
//!   return: an [`Updates`] stream plus a single-shot [`Close`].
//! * **`config`** — [`EngineConfig`] tunables.
//!
//! ```no_run
//! use futures::StreamExt;
//! use livescroll::{merge, subscribe, FakeSource};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let mut merged = merge([
//!     subscribe(FakeSource::new("blog.golang.org")),
//!     subscribe(FakeSource::new("googleblog.blogspot.com")),
//! ]);
//! while let Some(item) = merged.updates().next().await {
//!     println!("{} {}", item.source_name, item.title);
//! #   break;
//! }
//! merged.close().await
//! # }
//! ```

pub mod config;
pub mod merge;
pub mod poll;
pub mod source;
pub mod subscription;

pub use config::EngineConfig;
pub use merge::merge;
pub use poll::{subscribe, subscribe_with};
pub use source::{FakeSource, FeedItem, Fetched, Fetcher, RssSource};
pub use subscription::{Close, Subscription, Updates};
