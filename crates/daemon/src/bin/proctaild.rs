// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `proctaild`: the ProcTail daemon binary.

use proctail_core::Config;
use proctail_daemon::Orchestrator;
use std::path::PathBuf;

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_env("PROCTAIL_LOG").unwrap_or_else(
            |_| tracing_subscriber::EnvFilter::new("info"),
        ))
        .init();
}

fn parse_config_path() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
    }
    None
}

#[tokio::main]
async fn main() {
    init_logging();

    let config = match Config::load(parse_config_path().as_deref()) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "failed to load configuration");
            std::process::exit(1);
        }
    };

    let orchestrator = Orchestrator::new(config);
    let shutdown_requested = match orchestrator.start() {
        Ok(notify) => notify,
        Err(err) => {
            tracing::error!(error = %err, "daemon failed to start");
            std::process::exit(1);
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received interrupt signal");
        }
        _ = shutdown_requested.notified() => {
            tracing::info!("shutdown requested over ipc");
        }
    }

    orchestrator.stop().await;
}
