//! # veil CLI entry point
//!
//! Parses command-line arguments, installs the tracing subscriber and
//! dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use veil_cli::emulate::{run_emulate, EmulateArgs};
use veil_cli::export::{run_export, ExportArgs};
use veil_cli::keys::{run_init, run_keygen, InitArgs, KeygenArgs};
use veil_cli::ledger::{
    run_audit, run_balance, run_cancel, run_notary, run_show, run_transfer, run_validate,
    AuditArgs, BalanceArgs, CancelArgs, NotaryArgs, ShowArgs, TransferArgs, ValidateArgs,
};
use veil_cli::lists::{run_list, ListArgs};
use veil_cli::{error_code, exit_status, CliContext};
use veil_compliance::ListKind;

/// Confidential transaction ledger.
///
/// Pedersen-committed amounts with range proofs, auditor-encrypted values,
/// PSI compliance screening and cancellable notary anchors.
#[derive(Parser, Debug)]
#[command(name = "veil", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    /// Path to the flow configuration file (YAML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the stores and auditor keys.
    #[arg(long, global = true, default_value = ".veil")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the data directory and auditor keys.
    Init(InitArgs),

    /// Generate an Ed25519 party key pair.
    Keygen(KeygenArgs),

    /// Create, screen, store and anchor a confidential transfer.
    Transfer(TransferArgs),

    /// Re-verify a transaction, optionally anchoring it.
    Validate(ValidateArgs),

    /// Print a stored transaction.
    Show(ShowArgs),

    /// Net balance of an address.
    Balance(BalanceArgs),

    /// Decrypted total received by an address (auditor only).
    Audit(AuditArgs),

    /// Cancel an anchor inside its window.
    Cancel(CancelArgs),

    /// Notary record listing and expiry collection.
    Notary(NotaryArgs),

    /// Manage the blacklist.
    Blacklist(ListArgs),

    /// Manage the whitelist.
    Whitelist(ListArgs),

    /// Export a store as CSV.
    Export(ExportArgs),

    /// Run a scripted scenario in memory.
    Emulate(EmulateArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    tracing::debug!(data_dir = %cli.data_dir.display(), "veil CLI starting");

    let ctx = CliContext::new(cli.data_dir, cli.config);
    let result = match cli.command {
        Commands::Init(args) => run_init(&args, &ctx),
        Commands::Keygen(args) => run_keygen(&args),
        Commands::Transfer(args) => run_transfer(&args, &ctx),
        Commands::Validate(args) => run_validate(&args, &ctx),
        Commands::Show(args) => run_show(&args, &ctx),
        Commands::Balance(args) => run_balance(&args, &ctx),
        Commands::Audit(args) => run_audit(&args, &ctx),
        Commands::Cancel(args) => run_cancel(&args, &ctx),
        Commands::Notary(args) => run_notary(&args, &ctx),
        Commands::Blacklist(args) => run_list(&args, &ctx, ListKind::Blacklist),
        Commands::Whitelist(args) => run_list(&args, &ctx, ListKind::Whitelist),
        Commands::Export(args) => run_export(&args, &ctx),
        Commands::Emulate(args) => run_emulate(&args, &ctx),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            match error_code(&e) {
                Some(code) => tracing::error!(code = %code, "{e:#}"),
                None => tracing::error!("{e:#}"),
            }
            ExitCode::from(exit_status(&e))
        }
    }
}
