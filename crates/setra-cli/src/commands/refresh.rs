use std::sync::Arc;

use clap::Subcommand;
use setra_core::{RefreshCoordinator, RefreshState};

use super::{print_json, CmdResult, Console};

#[derive(Subcommand)]
pub enum RefreshAction {
    /// Print persisted auto-refresh state as JSON
    Status,
    /// Pause auto-refresh
    Pause,
    /// Resume auto-refresh (the cycle restarts at 0)
    Resume,
    /// Stop and clear persisted auto-refresh state
    Reset,
}

const OWNED_ELSEWHERE: &str =
    "auto-refresh is owned by a running `setra watch`; press p there to pause or resume";

pub fn run(action: RefreshAction) -> CmdResult {
    let console = Console::open();
    let driven = RefreshCoordinator::is_driven(console.store.as_ref(), console.clock.now_ms());
    if driven && !matches!(action, RefreshAction::Status) {
        return Err(OWNED_ELSEWHERE.into());
    }
    if driven {
        tracing::warn!("a running `setra watch` owns auto-refresh; status may lag");
    }

    let mut coordinator = RefreshCoordinator::new(
        console.config.refresh.interval(),
        Arc::clone(&console.store),
        Arc::clone(&console.clock),
    )?;

    match action {
        RefreshAction::Status => {}
        RefreshAction::Pause => {
            if coordinator.state() == RefreshState::Running {
                coordinator.toggle_pause();
            }
        }
        RefreshAction::Resume => {
            if coordinator.state() == RefreshState::Paused {
                coordinator.toggle_pause();
            }
        }
        RefreshAction::Reset => {
            coordinator.stop();
            println!("auto-refresh state cleared");
            return Ok(());
        }
    }
    print_json(&coordinator.snapshot())
}
