// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `proctailctl`: a thin command-line client for the ProcTail daemon.
//! Connects over the named pipe, sends one framed request, prints the
//! response, and exits.

mod client;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use client::DaemonClient;
use proctail_core::Config;
use proctail_wire::{Request, Response};

/// Control client for the ProcTail tracing daemon.
#[derive(Parser)]
#[command(name = "proctailctl", version)]
struct Cli {
    /// Named pipe to connect to (defaults to the daemon's configured name).
    #[arg(long)]
    pipe_name: Option<String>,

    /// Print each request/response as JSON instead of a formatted summary.
    #[arg(long)]
    json: bool,

    /// Log client diagnostics to stderr (the daemon logs unconditionally;
    /// the CLI only does so on request).
    #[arg(long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start tracing a process under a tag.
    Watch {
        /// Process ID to watch.
        process_id: u32,
        /// Tag name events from this process (and its children) are
        /// recorded under.
        tag_name: String,
    },
    /// Stop tracing everything under a tag.
    Unwatch {
        /// Tag name to stop watching.
        tag_name: String,
    },
    /// List every active watch target.
    Targets,
    /// Print the recorded events for a tag.
    Events {
        /// Tag name to fetch events for.
        tag_name: String,
    },
    /// Discard the recorded events for a tag (the watch target stays active).
    Clear {
        /// Tag name to clear.
        tag_name: String,
    },
    /// Print daemon uptime and counters.
    Status,
    /// Ask the daemon to shut down.
    Shutdown,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt().with_env_filter("debug").init();
    }

    let pipe_name = cli.pipe_name.unwrap_or_else(|| Config::default().pipe_name);
    let client = DaemonClient::new(pipe_name, Config::default().response_timeout());

    let request = match &cli.command {
        Command::Watch { process_id, tag_name } => {
            Request::AddWatchTarget { process_id: *process_id, tag_name: tag_name.clone() }
        }
        Command::Unwatch { tag_name } => Request::RemoveWatchTarget { tag_name: tag_name.clone() },
        Command::Targets => Request::GetWatchTargets,
        Command::Events { tag_name } => Request::GetRecordedEvents { tag_name: tag_name.clone() },
        Command::Clear { tag_name } => Request::ClearEvents { tag_name: tag_name.clone() },
        Command::Status => Request::GetStatus,
        Command::Shutdown => Request::Shutdown,
    };

    let response = client.send(&request).await.map_err(|e| anyhow!("{e}"))?;
    print_response(&response, cli.json)?;

    if !response.success {
        std::process::exit(1);
    }
    Ok(())
}

fn print_response(response: &Response, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(response)?);
        return Ok(());
    }

    if !response.success {
        let message = response.error_message.as_deref().unwrap_or("request failed");
        eprintln!("error: {message}");
        return Ok(());
    }

    match &response.payload {
        None => println!("ok"),
        Some(proctail_wire::ResponsePayload::WatchTargets { watch_targets }) => {
            if watch_targets.is_empty() {
                println!("no watch targets");
            }
            for target in watch_targets {
                let child = if target.is_child { " (child)" } else { "" };
                println!("{}\tpid={}{child}", target.tag_name, target.process_id);
            }
        }
        Some(proctail_wire::ResponsePayload::Events { events }) => {
            if events.is_empty() {
                println!("no events recorded");
            }
            for event in events {
                println!(
                    "{}\t{}\tpid={}\t{}",
                    event.timestamp.to_rfc3339(),
                    event.event_name,
                    event.process_id,
                    event.tag_name
                );
            }
        }
        Some(proctail_wire::ResponsePayload::Status(status)) => {
            println!("running: {}", status.running);
            println!("uptime: {}s", status.uptime_seconds);
            println!("watch targets: {}", status.watch_target_count);
            println!("tags: {}", status.tag_count);
            println!("events: {}", status.event_count);
            println!("estimated memory: {} bytes", status.estimated_memory_bytes);
        }
    }
    Ok(())
}
