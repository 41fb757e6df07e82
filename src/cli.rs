//! Command-line arguments for the viewer.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use livescroll::source::DEFAULT_POLL_INTERVAL;
use livescroll::EngineConfig;

/// Feeds used by `--demo`.
pub const DEMO_CHANNELS: [&str; 3] = [
    "blog.golang.org",
    "googleblog.blogspot.com",
    "googledevelopers.blogspot.com",
];

/// Watch one or more RSS feeds as a single live stream.
#[derive(Debug, Parser)]
#[command(name = "livescroll", version, about)]
pub struct Args {
    /// Feed URLs to subscribe to.
    #[arg(default_value = "https://feeds.bbci.co.uk/news/rss.xml")]
    pub urls: Vec<String>,

    /// Seconds between successful polls of each feed.
    #[arg(long, env = "LIVESCROLL_POLL_INTERVAL", default_value_t = DEFAULT_POLL_INTERVAL.as_secs())]
    pub poll_interval: u64,

    /// Items buffered per feed before polling pauses.
    #[arg(long, default_value_t = livescroll::config::DEFAULT_MAX_PENDING)]
    pub max_pending: usize,

    /// Seconds to wait before retrying a feed that failed.
    #[arg(long, default_value_t = livescroll::config::DEFAULT_ERROR_BACKOFF.as_secs())]
    pub error_backoff: u64,

    /// Use invented demo feeds instead of the network.
    #[arg(long)]
    pub demo: bool,

    /// Make demo feeds re-serve every item they have produced.
    #[arg(long, requires = "demo")]
    pub duplicates: bool,

    /// Print `source title` lines instead of running the terminal UI.
    #[arg(long)]
    pub plain: bool,

    /// Close the stream after this many seconds.
    #[arg(long)]
    pub close_after: Option<u64>,

    /// Write logs here (the terminal UI otherwise logs nothing).
    #[arg(long, env = "LIVESCROLL_LOG_FILE")]
    pub log_file: Option<PathBuf>,
}

impl Args {
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::default()
            .with_max_pending(self.max_pending)
            .with_error_backoff(Duration::from_secs(self.error_backoff))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval)
    }

    pub fn close_after(&self) -> Option<Duration> {
        self.close_after.map(Duration::from_secs)
    }
}
