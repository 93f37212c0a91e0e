#![warn(clippy::all, clippy::pedantic)]

mod config;
mod monitoring;
mod validation;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::config::ConfigStore;
use crate::monitoring::checker::HttpProber;
use crate::monitoring::{EngineEvent, EngineHandle, MonitorEngine, StatusSnapshot};

/// Status-bar health monitor: polls configured HTTP(S) endpoints and
/// reflects their up/down state.
#[derive(Parser)]
#[command(name = "pulsebar", version, about)]
struct Args {
    /// Path to the configuration file (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable verbose diagnostic logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logger::init_with_verbosity(args.verbose);

    let store = ConfigStore::new(args.config)?;
    info!(path = %store.path().display(), "using configuration file");

    let prober = Arc::new(HttpProber::new()?);
    let handle = MonitorEngine::new(store, prober).spawn();

    let mut events = handle.subscribe();
    let mut stdin_lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(event) => render_event(&event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "status events dropped, rendering may be stale");
                }
                Err(RecvError::Closed) => break,
            },
            line = stdin_lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => apply_command(&handle, line.trim()).await,
                Ok(None) | Err(_) => stdin_open = false,
            },
        }
    }

    handle.shutdown().await;
    Ok(())
}

/// Line-oriented stand-in for the status-bar menu: each command maps to one
/// engine control operation.
async fn apply_command(handle: &EngineHandle, line: &str) {
    let mut parts = line.split_whitespace();
    match (parts.next(), parts.next()) {
        (None, _) => {}
        (Some("reload"), _) => handle.reload().await,
        (Some("watch"), _) => handle.toggle_startup_watch().await,
        (Some("pause"), _) => handle.set_monitoring(false).await,
        (Some("resume"), _) => handle.set_monitoring(true).await,
        (Some("interval"), Some(value)) => match value.parse() {
            Ok(seconds) => handle.set_interval(seconds).await,
            Err(_) => println!("usage: interval <seconds>"),
        },
        (Some("toggle"), Some(value)) => match value.parse() {
            Ok(index) => handle.toggle_target(index).await,
            Err(_) => println!("usage: toggle <index>"),
        },
        (Some("status"), _) => {
            if let Some(snapshot) = handle.snapshot().await {
                render_snapshot(&snapshot);
            }
        }
        (Some(other), _) => {
            println!(
                "unknown command: {other} (reload, watch, pause, resume, interval <secs>, toggle <index>, status)"
            );
        }
    }
}

/// Terminal stand-in for the status-bar renderer: one line per snapshot,
/// plus notices for the other engine events.
fn render_event(event: &EngineEvent) {
    match event {
        EngineEvent::Targets(snapshot) => render_snapshot(snapshot),
        EngineEvent::ConfigError(Some(message)) => {
            println!("!! configuration error: {message}");
        }
        EngineEvent::ConfigError(None) => {
            println!("configuration error cleared");
        }
        EngineEvent::StartupWatch { active: true, remaining_secs } => {
            if let Some(remaining) = remaining_secs {
                println!("startup watch active ({remaining}s left)");
            }
        }
        EngineEvent::StartupWatch { active: false, .. } => {
            println!("startup watch ended");
        }
        EngineEvent::IntervalChanged(seconds) => {
            println!("polling every {seconds}s");
        }
    }
}

fn render_snapshot(snapshot: &StatusSnapshot) {
    let enabled = snapshot.targets.iter().filter(|t| t.mode.is_enabled()).count();
    println!("{}/{} services up", snapshot.up_count, enabled);

    for target in &snapshot.targets {
        let symbol = if !snapshot.monitoring_enabled || !target.mode.is_enabled() {
            &snapshot.symbol_disabled
        } else if target.is_up {
            &snapshot.symbol_up
        } else {
            &snapshot.symbol_down
        };

        match &target.last_error {
            Some(error) if target.mode.is_enabled() => {
                println!("  {symbol} {} ({error})", target.name);
            }
            _ => println!("  {symbol} {}", target.name),
        }
    }
}
