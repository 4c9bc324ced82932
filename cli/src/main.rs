//! chainfollow CLI: replay recorded chain-sync streams through the follower.
//!
//! Usage:
//! ```bash
//! chainfollow replay events.jsonl --config follower.json
//! chainfollow info
//! ```

use std::env;
use std::process;

use anyhow::{Context, Result};

mod logging;
mod replay;

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    match args[1].as_str() {
        "replay" => {
            if let Err(e) = cmd_replay(&args[2..]) {
                eprintln!("Error: {e:#}");
                process::exit(1);
            }
        }
        "info" => cmd_info(),
        "version" | "--version" | "-V" => {
            println!("chainfollow {}", env!("CARGO_PKG_VERSION"));
        }
        "help" | "--help" | "-h" => print_usage(),
        other => {
            eprintln!("Unknown command: {other}");
            print_usage();
            process::exit(1);
        }
    }
}

fn print_usage() {
    println!("chainfollow {}", env!("CARGO_PKG_VERSION"));
    println!("Rollback-safe follower for newly minted native assets\n");
    println!("USAGE:");
    println!("    chainfollow <COMMAND>\n");
    println!("COMMANDS:");
    println!("    replay <events.json> [--config <file>]");
    println!("             Feed a recorded event stream through the follower and print the result");
    println!("    info     Show ChainFollow configuration info");
    println!("    version  Print version");
    println!("    help     Print this help");
}

fn cmd_replay(args: &[String]) -> Result<()> {
    let args = replay::ReplayArgs::parse(args)?;
    let config = replay::load_config(args.config.as_deref())?;
    logging::init_tracing(&config.log);

    let text = std::fs::read_to_string(&args.events)
        .with_context(|| format!("reading events {}", args.events.display()))?;
    let events = replay::parse_events(&text)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting runtime")?;
    let summary = runtime.block_on(replay::replay(&config, events))?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    if let Some(reason) = &summary.error {
        anyhow::bail!("stream halted: {reason}");
    }
    Ok(())
}

fn cmd_info() {
    let defaults = chainfollow_core::FollowerConfig::default();
    let job = chainfollow_core::JobOptions::METADATA_FETCH;
    println!("ChainFollow v{}", env!("CARGO_PKG_VERSION"));
    println!("  Default node: {}", defaults.connection.url());
    println!("  Database application name: {}", defaults.database.application_name);
    println!(
        "  Metadata job: {} (retry every {}s, up to {} times)",
        chainfollow_core::METADATA_FETCH_JOB,
        job.retry_delay_secs,
        job.retry_limit
    );
    let postgres = if cfg!(feature = "postgres") { "enabled" } else { "disabled" };
    println!("  Storage backends: memory, Postgres when database.url is set (feature: postgres, {postgres})");
    println!("  Eras: Mary and later carry mints; earlier eras are skipped");
}
