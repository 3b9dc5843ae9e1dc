//! # veil-cli — Command-Line Interface
//!
//! Provides the `veil` binary over a data directory holding three `sled`
//! stores (`ledger/`, `notary/`, `compliance/`) and the auditor key pair.
//!
//! ## Subcommands
//!
//! - `veil init`: Create the data directory and auditor keys.
//! - `veil keygen`: Ed25519 party key generation.
//! - `veil transfer` / `validate` / `show`: Create, re-verify and inspect
//!   transactions.
//! - `veil balance` / `audit`: Net balances and auditor totals.
//! - `veil cancel` / `notary`: Anchor cancellation, listing and purging.
//! - `veil blacklist` / `whitelist`: Compliance list management.
//! - `veil export`: CSV export of a store.
//! - `veil emulate`: Scripted scenarios on an in-memory ledger.
//!
//! ```bash
//! veil init
//! veil keygen --prefix alice
//! veil transfer --key alice.key --to 0x5f1c... --amount 100
//! veil cancel <tx-id>
//! ```
//!
//! Failures exit non-zero and report the stable error code.

pub mod emulate;
pub mod export;
pub mod keys;
pub mod ledger;
pub mod lists;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::ValueEnum;

use veil_core::{ErrorCode, SystemClock, VeilError};
use veil_flow::{FlowConfig, FlowStores, TransactionFlow};
use veil_store::SledKv;

/// File name of the auditor public key inside the data directory.
pub const AUDITOR_PUBLIC_FILE: &str = "auditor.pub";

/// File name of the auditor secret key inside the data directory.
pub const AUDITOR_SECRET_FILE: &str = "auditor.key";

/// Which on-disk store a command addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreKind {
    /// Signed transactions.
    Ledger,
    /// Anchors.
    Notary,
    /// Blacklist and whitelist entries.
    Compliance,
}

impl StoreKind {
    /// Directory name under the data directory.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::Ledger => "ledger",
            Self::Notary => "notary",
            Self::Compliance => "compliance",
        }
    }
}

/// Global options shared by every subcommand.
#[derive(Debug, Clone)]
pub struct CliContext {
    /// Root of the stores and auditor keys.
    pub data_dir: PathBuf,
    /// Optional flow configuration file.
    pub config: Option<PathBuf>,
}

impl CliContext {
    /// Bind a data directory and optional config file.
    pub fn new(data_dir: impl Into<PathBuf>, config: Option<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            config,
        }
    }

    /// The configured flow settings, or the defaults without `--config`.
    pub fn load_config(&self) -> Result<FlowConfig> {
        match &self.config {
            Some(path) => Ok(FlowConfig::load(path).map_err(VeilError::from)?),
            None => Ok(FlowConfig::default()),
        }
    }

    /// Path of a store's database directory.
    pub fn store_path(&self, store: StoreKind) -> PathBuf {
        self.data_dir.join(store.dir_name())
    }

    /// Open (creating if needed) one store.
    pub fn open_store(&self, store: StoreKind) -> Result<Arc<SledKv>> {
        let path = self.store_path(store);
        let kv = SledKv::open(&path)
            .map_err(VeilError::from)
            .with_context(|| format!("failed to open {} store at {}", store.dir_name(), path.display()))?;
        Ok(Arc::new(kv))
    }

    /// Path of the auditor public key.
    pub fn auditor_public_path(&self) -> PathBuf {
        self.data_dir.join(AUDITOR_PUBLIC_FILE)
    }

    /// Path of the auditor secret key.
    pub fn auditor_secret_path(&self) -> PathBuf {
        self.data_dir.join(AUDITOR_SECRET_FILE)
    }

    /// A flow over the on-disk stores, the system clock and the data
    /// directory's auditor key.
    pub fn open_flow(&self) -> Result<TransactionFlow> {
        let auditor_path = self.auditor_public_path();
        if !auditor_path.exists() {
            bail!(
                "auditor key {} not found; run `veil init` first",
                auditor_path.display()
            );
        }
        let auditor = keys::load_auditor_public(&auditor_path)?;
        let config = self.load_config()?;
        let stores = FlowStores {
            ledger: self.open_store(StoreKind::Ledger)?,
            notary: self.open_store(StoreKind::Notary)?,
            compliance: self.open_store(StoreKind::Compliance)?,
        };
        Ok(TransactionFlow::new(config, stores, auditor, Arc::new(SystemClock))?)
    }
}

/// The stable code of the ledger error behind `err`, if there is one.
pub fn error_code(err: &anyhow::Error) -> Option<ErrorCode> {
    err.downcast_ref::<VeilError>().map(VeilError::code)
}

/// Process exit status for a failed command: 2 for a rejected transaction
/// or request, 1 for everything else.
pub fn exit_status(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<VeilError>() {
        Some(e) if !e.is_fatal() => 2,
        _ => 1,
    }
}

/// Read a hex key file, trimming surrounding whitespace.
pub(crate) fn read_key_file(path: &Path, what: &str) -> Result<String> {
    if !path.exists() {
        bail!("{what} file not found: {}", path.display());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {what}: {}", path.display()))?;
    Ok(content.trim().to_string())
}

/// Print a value as pretty JSON on stdout.
pub(crate) fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("failed to render JSON output")?
    );
    Ok(())
}
