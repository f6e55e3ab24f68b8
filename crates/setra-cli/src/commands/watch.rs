use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use setra_core::refresh::dashboard::METRICS_KEY;
use setra_core::{DashboardRefresh, Event, RefreshCoordinator, RefreshState};
use tokio::sync::mpsc;

use super::{print_json, CmdResult, Console};

#[derive(Args)]
pub struct WatchArgs {
    /// Refresh interval in milliseconds (defaults to refresh.interval_ms)
    #[arg(long)]
    interval_ms: Option<u64>,
    /// Exit after this many refresh cycles
    #[arg(long)]
    cycles: Option<u64>,
    /// Timeseries window (7d, 30d, 90d)
    #[arg(long, default_value = "30d")]
    period: String,
}

const BAR_WIDTH: usize = 30;

fn progress_bar(progress: f64) -> String {
    let filled = ((progress.clamp(0.0, 1.0)) * BAR_WIDTH as f64).round() as usize;
    format!("[{}{}]", "#".repeat(filled), " ".repeat(BAR_WIDTH - filled))
}

/// Forward stdin lines from a detached thread; the receiver closes at EOF.
///
/// A plain thread never keeps the runtime from shutting down on exit.
fn spawn_key_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

fn announce(event: &Event) {
    match event {
        Event::RefreshPaused { progress, .. } => {
            eprintln!("\nauto-refresh paused at {:.0}%", progress * 100.0);
        }
        Event::RefreshResumed { .. } => eprintln!("\nauto-refresh resumed"),
        _ => {}
    }
}

pub async fn run(args: WatchArgs) -> CmdResult {
    let console = Console::open();
    if !console.config.refresh.enabled {
        return Err("auto-refresh is disabled (refresh.enabled = false)".into());
    }
    let interval = args
        .interval_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| console.config.refresh.interval());
    if RefreshCoordinator::is_driven(console.store.as_ref(), console.clock.now_ms()) {
        return Err("another `setra watch` is already driving auto-refresh".into());
    }

    let session = console.guarded("/").await?;
    let dashboard = Arc::new(
        DashboardRefresh::new(session.authorized_client()?, Arc::clone(&console.clock))
            .with_period(args.period),
    );
    if let Err(e) = dashboard.refetch().await {
        tracing::warn!(error = %e, "initial dashboard load failed");
    }

    let mut refresh = Arc::clone(&dashboard).start(interval, Arc::clone(&console.store))?;
    let mut ticker = tokio::time::interval(Duration::from_millis(250));
    let mut last_shown: Option<u64> = None;
    let mut keys = spawn_key_reader();
    let mut keys_open = true;
    eprintln!("p + Enter pauses or resumes, ctrl-c quits");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let cycles = refresh.cycles_completed();
                let paused = refresh.state() == RefreshState::Paused;
                eprint!(
                    "\r{} {:>3.0}% cycle {}{}",
                    progress_bar(refresh.progress()),
                    refresh.progress() * 100.0,
                    cycles,
                    if paused { " (paused)" } else { "" }
                );
                let _ = std::io::stderr().flush();

                let cached = dashboard
                    .cache()
                    .lock()
                    .map(|c| c.get(METRICS_KEY, console.clock.now_ms()))
                    .ok();
                if let Some(cached) = cached {
                    if cached.last_updated.is_some() && cached.last_updated != last_shown {
                        last_shown = cached.last_updated;
                        if let Some(metrics) = cached.data {
                            eprintln!();
                            print_json(&metrics)?;
                        }
                    }
                }
                if args.cycles.is_some_and(|n| cycles >= n) {
                    refresh.stop();
                    break;
                }
            }
            key = keys.recv(), if keys_open => match key {
                Some(line) if line.trim().eq_ignore_ascii_case("p") => {
                    if let Some(event) = refresh.toggle_pause() {
                        announce(&event);
                    }
                }
                Some(_) => {}
                None => keys_open = false,
            },
            _ = tokio::signal::ctrl_c() => {
                // leave persisted state so the next watch resumes the same cycle
                break;
            }
        }
    }
    eprintln!();
    Ok(())
}
