//! # Export Subcommand
//!
//! `veil export` writes a store's records as CSV (`Key,Data`) to a file or
//! stdout.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use veil_core::{Family, VeilError};
use veil_ledger::export_csv;

use crate::{CliContext, StoreKind};

/// Arguments for `veil export`.
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Store to export.
    #[arg(long, value_enum, default_value = "ledger")]
    pub store: StoreKind,
    /// Only records of this family.
    #[arg(long)]
    pub family: Option<Family>,
    /// Output file; stdout when omitted.
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

/// Execute `veil export`.
pub fn run_export(args: &ExportArgs, ctx: &CliContext) -> Result<u8> {
    let store = ctx.open_store(args.store)?;
    let family = args.family.as_ref();
    let rows = match &args.output {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            let rows = export_csv(store.as_ref(), file, family).map_err(VeilError::from)?;
            eprintln!("OK: {rows} records written to {}", path.display());
            rows
        }
        None => {
            let stdout = std::io::stdout();
            export_csv(store.as_ref(), stdout.lock(), family).map_err(VeilError::from)?
        }
    };
    tracing::debug!(rows, store = args.store.dir_name(), "export finished");
    Ok(0)
}
