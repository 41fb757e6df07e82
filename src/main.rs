//! livescroll — a live-updating feed viewer for the terminal.
//!
//! ## Architecture overview
//!
//! ```text
//! ┌──────────┐ subscribe ┌──────────┐  Updates  ┌──────────┐  draw()  ┌──────────┐
//! │ Fetchers │ ────────► │  merge   │ ────────► │  app.rs  │ ───────► │  ui.rs   │
//! └──────────┘           └──────────┘           │ (state)  │          │ (render) │
//!                                               └──────────┘          └──────────┘
//!                                                    ▲
//!                                                    │ handle_key_event()
//!                                               ┌──────────┐
//!                                               │ input.rs │
//!                                               └──────────┘
//! ```
//!
//! * **`cli`** — argument parsing.
//! * **`app`** — owns all viewer state (items, scroll position, etc.).
//! * **`ui`** — pure rendering: reads `App` state and draws widgets.
//! * **`input`** — maps key events to `App` mutations.
//! * **`main`** — wires everything together: build the subscriptions, then
//!   either run the terminal UI or print items line by line, and finally close
//!   the stream and report how it ended.
//!
//! A feed request still in flight at exit is not waited for beyond
//! [`SHUTDOWN_GRACE`]; closing a subscription never interrupts a running fetch.

mod app;
mod cli;
mod input;
mod ui;

use std::fs::File;
use std::io;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use livescroll::{merge, subscribe_with, Close, FakeSource, RssSource, Subscription, Updates};

use app::App;
use cli::{Args, DEMO_CHANNELS};

// ---------------------------------------------------------------------------
// RAII terminal guard — idiomatic cleanup even on panic
// ---------------------------------------------------------------------------

/// Manages terminal raw-mode and alternate-screen lifetime via [`Drop`].
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl TerminalGuard {
    fn new() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        Ok(Self { terminal })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

/// Restore the terminal before printing a panic message.
fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(info);
    }));
}

// ---------------------------------------------------------------------------
// Setup
// ---------------------------------------------------------------------------

/// Log to `--log-file` if given, else to stderr in plain mode, else nowhere.
fn init_logging(args: &Args) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match (&args.log_file, args.plain) {
        (Some(path), _) => {
            let file = File::create(path)
                .with_context(|| format!("creating log file {}", path.display()))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        (None, true) => builder.with_writer(io::stderr).init(),
        (None, false) => {}
    }
    Ok(())
}

/// One subscription per feed, merged into a single stream.
fn build_stream(args: &Args) -> Subscription {
    let config = args.engine_config();

    let subs: Vec<Subscription> = if args.demo {
        DEMO_CHANNELS
            .iter()
            .map(|channel| {
                let src = FakeSource::new(*channel).with_duplicates(args.duplicates);
                subscribe_with(src, config)
            })
            .collect()
    } else {
        args.urls
            .iter()
            .map(|url| {
                let src = RssSource::new(url, url).with_poll_interval(args.poll_interval());
                subscribe_with(src, config)
            })
            .collect()
    };

    info!(feeds = subs.len(), "subscribed");
    merge(subs)
}

/// Resolves when `--close-after` elapses or Ctrl-C arrives.
async fn close_signal(close_after: Option<Duration>) {
    let deadline = async {
        match close_after {
            Some(delay) => tokio::time::sleep(delay).await,
            None => std::future::pending().await,
        }
    };
    tokio::select! {
        _ = deadline => {}
        _ = tokio::signal::ctrl_c() => {}
    }
}

// ---------------------------------------------------------------------------
// Consumers
// ---------------------------------------------------------------------------

/// Print items as `source title` lines until the close signal.
async fn run_plain(mut updates: Updates, close_after: Option<Duration>) {
    let stop = close_signal(close_after);
    tokio::pin!(stop);

    loop {
        tokio::select! {
            item = updates.next() => match item {
                Some(item) => println!("{} {}", item.source_name, item.title),
                None => break,
            },
            _ = &mut stop => break,
        }
    }
}

/// Run the terminal UI until the user quits or the close signal fires.
async fn run_tui(mut updates: Updates, close_after: Option<Duration>) -> Result<()> {
    install_panic_hook();
    let mut guard = TerminalGuard::new()?;
    let mut app = App::new();

    let stop = close_signal(close_after);
    tokio::pin!(stop);

    // ~10 fps: wait up to one tick for an item, redraw, then drain keys.
    let tick_rate = Duration::from_millis(100);

    loop {
        tokio::select! {
            item = updates.next() => match item {
                Some(item) => app.push(item),
                None => {
                    app.status = "Stream ended".into();
                    tokio::time::sleep(tick_rate).await;
                }
            },
            _ = tokio::time::sleep(tick_rate) => {}
            _ = &mut stop => app.quit = true,
        }

        guard.terminal.draw(|f| ui::draw(&mut app, f))?;

        while event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()? {
                input::handle_key_event(&mut app, key);
            }
        }

        if app.quit {
            break;
        }
    }

    // `guard` is dropped here, restoring the terminal.
    Ok(())
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// How long runtime shutdown waits for fetches that are still running.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;
    let result = runtime.block_on(run(args));
    shutdown(runtime);
    result
}

/// Drop the runtime without blocking on stray `spawn_blocking` fetches.
fn shutdown(runtime: tokio::runtime::Runtime) {
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
}

async fn run(args: Args) -> Result<()> {
    let (updates, closer) = build_stream(&args).into_parts();

    if args.plain {
        run_plain(updates, args.close_after()).await;
    } else {
        run_tui(updates, args.close_after()).await?;
    }

    let outcome = closer.close().await;
    match &outcome {
        Ok(()) => println!("closed: ok"),
        Err(err) => println!("closed: {err:#}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn shutdown_does_not_wait_for_a_hanging_fetch() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.spawn_blocking(|| std::thread::sleep(Duration::from_secs(30)));

        let started = Instant::now();
        shutdown(runtime);
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
