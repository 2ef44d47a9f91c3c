//! signbook — demo CLI
//!
//! Runs one or all of the signature-flow scenarios against real signbook
//! components (in-memory store, recording mail sender, system clock).
//!
//! Usage:
//!   cargo run -p demo -- run-all
//!   cargo run -p demo -- verification
//!   cargo run -p demo -- task-signing
//!   cargo run -p demo -- guards

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod scenarios;

// ── CLI definition ────────────────────────────────────────────────────────────

/// signbook — signatory verification and task-signature flow demo.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "signbook request-flow demo",
    long_about = "Runs the signbook flows end to end: identity verification,\n\
                  task signing, and the guard rails (single-use, expiry,\n\
                  precondition, and slot-conflict checks)."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run all three scenarios in sequence.
    RunAll,
    /// Scenario 1: identity verification end to end.
    Verification,
    /// Scenario 2: task-signature request, confirmation, replay rejection.
    TaskSigning,
    /// Scenario 3: precondition, conflict, and bad-token guard rails.
    Guards,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Structured logging; set RUST_LOG=debug for verbose flow output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    print_banner();

    let result = match cli.command {
        Command::RunAll => run_all(),
        Command::Verification => scenarios::run_verification(),
        Command::TaskSigning => scenarios::run_task_signing(),
        Command::Guards => scenarios::run_guards(),
    };

    match result {
        Ok(()) => {
            println!("All selected scenarios completed successfully.");
        }
        Err(e) => {
            eprintln!("Demo error: {}", e);
            std::process::exit(1);
        }
    }
}

fn run_all() -> signbook_contracts::error::SignbookResult<()> {
    scenarios::run_verification()?;
    scenarios::run_task_signing()?;
    scenarios::run_guards()?;
    Ok(())
}

// ── Banner ────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("signbook — signature-request token lifecycle");
    println!("============================================");
    println!();
    println!("Per request the flows enforce:");
    println!("  [1] Raw token minted from OS entropy; only its SHA-256 hash is stored");
    println!("  [2] Link emailed best-effort after the transactional write commits");
    println!("  [3] Confirm: lookup by hash -> not used -> not expired, atomically");
    println!("  [4] Exactly one audit event per state transition, same atomic unit");
    println!();
}
