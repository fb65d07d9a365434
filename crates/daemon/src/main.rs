// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HumanLayer Daemon (hld)
//!
//! Owns the session manager: launches assistant processes, records their
//! conversations and stops them all on SIGINT/SIGTERM.

use hl_daemon::args::{help_text, USAGE, VERSION};
use hl_daemon::{logging, parse_args, startup, Command, Config, LifecycleError};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Info flags are handled before any config or lock work
    let overrides = match parse_args(std::env::args().skip(1)) {
        Ok(Command::Run(overrides)) => overrides,
        Ok(Command::Version) => {
            println!("hld {VERSION}");
            return Ok(());
        }
        Ok(Command::Help) => {
            println!("{}", help_text());
            return Ok(());
        }
        Err(e) => {
            eprintln!("error: {e}");
            eprintln!("{USAGE}");
            std::process::exit(1);
        }
    };

    let config = Config::load(&overrides)?;

    logging::rotate_log_if_needed(&config.log_path);
    logging::write_startup_marker(&config.log_path)?;
    let log_guard = logging::setup_logging(&config.log_path)?;

    info!(state_dir = %config.state_dir.display(), "starting daemon");

    let daemon = match startup(&config).await {
        Ok(daemon) => daemon,
        Err(LifecycleError::LockFailed(_)) => {
            let pid = std::fs::read_to_string(&config.lock_path).unwrap_or_default();
            eprintln!("hld is already running");
            if !pid.trim().is_empty() {
                eprintln!("  pid: {}", pid.trim());
            }
            std::process::exit(1);
        }
        Err(e) => {
            logging::write_startup_error(&config.log_path, &e);
            error!(error = %e, "failed to start daemon");
            drop(log_guard);
            return Err(e.into());
        }
    };

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    info!(database = %config.database_path.display(), "daemon ready");
    // Parent processes wait for this line
    println!("READY");

    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        _ = sigint.recv() => info!("received SIGINT, shutting down"),
    }

    daemon.shutdown().await?;
    info!("daemon stopped");
    Ok(())
}
