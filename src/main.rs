//! injest CLI entry point.
//!
//! Plays the host framework: constructs the adapter with its no-argument
//! constructor and delivers CloudEvents to it.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use injest::bindings;
use injest::builtin;
use injest::config::InjestConfig;
use injest::host::{read_events, DispatchOptions, Dispatcher};
use injest::logging::{self, LoggingGuard};
use injest::{CloudEventsFunction, Slot};

/// injest — late-bound CloudEvents function adapter.
#[derive(Parser)]
#[command(name = "injest", version, about)]
struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// Deliver JSON-lines CloudEvents to the adapter.
    Dispatch {
        /// Read events from this file instead of stdin.
        #[arg(long)]
        input: Option<PathBuf>,
        /// Concurrent deliveries (overrides config).
        #[arg(long)]
        workers: Option<usize>,
        /// Attempts per event (overrides config).
        #[arg(long)]
        max_attempts: Option<u32>,
        /// Do not install the built-in handler.
        #[arg(long)]
        unbound: bool,
    },
    /// List every slot and whether it is bound.
    Slots {
        /// Show only this slot (`equals`, `toString`, `hashCode`, `clone`, `accept`).
        #[arg(long)]
        slot: Option<Slot>,
        /// Do not install the built-in handler.
        #[arg(long)]
        unbound: bool,
    },
    /// Print the adapter's object-protocol results.
    Describe,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = InjestConfig::load().context("failed to load configuration")?;
    let _logging_guard = init_logging(&config)?;
    for rejected in config.rejected_overrides() {
        warn!(var = rejected.var, value = %rejected.value, "ignoring invalid env override");
    }

    bindings::set_global_namespace(config.adapter.slot_namespace());

    match cli.command {
        Command::Dispatch {
            input,
            workers,
            max_attempts,
            unbound,
        } => {
            let mut options = DispatchOptions::from(&config.dispatch);
            if let Some(n) = workers {
                options.workers = n;
            }
            if let Some(n) = max_attempts {
                options.max_attempts = n;
            }
            handle_dispatch(input, options, unbound).await
        }
        Command::Slots { slot, unbound } => {
            handle_slots(slot, unbound);
            Ok(())
        }
        Command::Describe => {
            handle_describe();
            Ok(())
        }
    }
}

fn init_logging(config: &InjestConfig) -> anyhow::Result<Option<LoggingGuard>> {
    match &config.logging.dir {
        Some(dir) => {
            let guard = logging::init_production(&PathBuf::from(dir), &config.logging.level)?;
            Ok(Some(guard))
        }
        None => {
            logging::init_cli(&config.logging.level)?;
            Ok(None)
        }
    }
}

/// Construct the adapter the way the host framework does.
fn construct_function(unbound: bool) -> CloudEventsFunction {
    if !unbound {
        bindings::register_initializer(builtin::install);
    }
    CloudEventsFunction::new()
}

async fn handle_dispatch(
    input: Option<PathBuf>,
    options: DispatchOptions,
    unbound: bool,
) -> anyhow::Result<()> {
    let events = match &input {
        Some(path) => {
            let file =
                File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
            read_events(BufReader::new(file))?
        }
        None => read_events(io::stdin().lock())?,
    };
    info!(count = events.len(), "events loaded");

    let dispatcher = Dispatcher::new(construct_function(unbound), options);
    let report = dispatcher.dispatch(events).await;

    println!(
        "run {}: delivered {}, failed {}, attempts {}",
        report.run_id,
        report.delivered,
        report.failed.len(),
        report.attempts
    );
    for failure in &report.failed {
        println!(
            "  {} after {} attempt(s): {}",
            failure.event_id, failure.attempts, failure.error
        );
    }

    if !report.is_success() {
        anyhow::bail!("{} event(s) failed", report.failed.len());
    }
    Ok(())
}

fn handle_slots(only: Option<Slot>, unbound: bool) {
    let function = construct_function(unbound);
    let table = function.bindings();
    let slots = match only {
        Some(slot) => vec![slot],
        None => Slot::ALL.to_vec(),
    };
    for slot in slots {
        let state = if table.is_bound(slot) {
            "bound"
        } else if slot.has_soft_fallback() {
            "unbound (default)"
        } else {
            "unbound (fails)"
        };
        println!(
            "{:<10} {:<45} {}",
            slot.method_name(),
            table.namespace().qualify(slot),
            state
        );
    }
}

fn handle_describe() {
    let function = construct_function(true);
    let other = CloudEventsFunction::new();
    println!("toString: {function}");
    println!("hashCode: {:x}", function.hash_code());
    println!("equals(self): {}", function.equals(&function));
    println!("equals(other): {}", function.equals(&other));
    match function.try_clone() {
        Ok(copy) => println!("clone: {copy}"),
        Err(e) => println!("clone: {e}"),
    }
}
