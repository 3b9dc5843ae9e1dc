//! # Ledger Subcommands
//!
//! Transfers, re-validation, balances, audits and anchor management against
//! the data directory's stores. Each command opens the stores, runs one flow
//! operation and drops them.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde_json::json;

use veil_core::{Address, Family, TxId, VeilError};
use veil_crypto::CommitmentOpening;
use veil_ledger::Transaction;

use crate::{keys, print_json, CliContext};

/// Arguments for `veil transfer`.
#[derive(Args, Debug)]
pub struct TransferArgs {
    /// Sender's private key file.
    #[arg(long)]
    pub key: PathBuf,
    /// Recipient address.
    #[arg(long)]
    pub to: Address,
    /// Amount to transfer.
    #[arg(long)]
    pub amount: u64,
    /// Store without anchoring, overriding `anchor_by_default`.
    #[arg(long)]
    pub no_anchor: bool,
    /// Write the signed transaction JSON here.
    #[arg(long)]
    pub out: Option<PathBuf>,
    /// Write the commitment opening here. It is not kept anywhere else.
    #[arg(long)]
    pub opening_out: Option<PathBuf>,
}

/// Arguments for `veil validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Transaction JSON file.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
    /// Sender's public key file.
    #[arg(long)]
    pub pubkey: PathBuf,
    /// Anchor the transaction once it validates.
    #[arg(long)]
    pub anchor: bool,
    /// Commitment opening to check before anchoring.
    #[arg(long, requires = "anchor")]
    pub opening: Option<PathBuf>,
}

/// Arguments for `veil show`.
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Transaction id.
    pub tx_id: TxId,
    /// Family; the configured one when omitted.
    #[arg(long)]
    pub family: Option<Family>,
}

/// Arguments for `veil balance`.
#[derive(Args, Debug)]
pub struct BalanceArgs {
    /// Address to report.
    pub address: Address,
    /// Family; the configured one when omitted.
    #[arg(long)]
    pub family: Option<Family>,
}

/// Arguments for `veil audit`.
#[derive(Args, Debug)]
pub struct AuditArgs {
    /// Recipient address to total.
    pub address: Address,
    /// Auditor secret key file; the data directory's when omitted.
    #[arg(long)]
    pub auditor_key: Option<PathBuf>,
    /// Family; the configured one when omitted.
    #[arg(long)]
    pub family: Option<Family>,
}

/// Arguments for `veil cancel`.
#[derive(Args, Debug)]
pub struct CancelArgs {
    /// Id of the anchored transaction.
    pub tx_id: TxId,
}

/// Arguments for `veil notary`.
#[derive(Args, Debug)]
pub struct NotaryArgs {
    #[command(subcommand)]
    pub command: NotaryCommand,
}

/// Notary subcommands.
#[derive(Subcommand, Debug)]
pub enum NotaryCommand {
    /// List anchors.
    List {
        /// Include expired anchors not yet collected.
        #[arg(long)]
        include_expired: bool,
    },
    /// Delete every expired anchor.
    Purge,
}

/// Execute `veil transfer`.
pub fn run_transfer(args: &TransferArgs, ctx: &CliContext) -> Result<u8> {
    let sender = keys::load_signing_key(&args.key)?;
    let flow = ctx.open_flow()?;
    let anchor = if args.no_anchor { Some(false) } else { None };
    let receipt = flow
        .process_transaction(&sender, &args.to, args.amount, anchor)
        .context("transfer rejected")?;

    if let Some(path) = &args.out {
        write_json_file(path, &receipt.transaction, "transaction")?;
    }
    if let Some(path) = &args.opening_out {
        write_json_file(path, &receipt.opening, "opening")?;
    }
    print_json(&json!({
        "tx_id": receipt.transaction.tx_id(),
        "key": receipt.transaction.store_key(),
        "anchored": receipt.anchor.is_some(),
        "expires_at": receipt.anchor.as_ref().and_then(|r| r.expires_at),
    }))?;
    Ok(0)
}

/// Execute `veil validate`.
pub fn run_validate(args: &ValidateArgs, ctx: &CliContext) -> Result<u8> {
    let tx = read_transaction(&args.file)?;
    let sender_key = keys::load_public_key(&args.pubkey)?;
    let flow = ctx.open_flow()?;

    if args.anchor {
        let opening = args.opening.as_deref().map(read_opening).transpose()?;
        let record = flow
            .validate_and_anchor(&tx, &sender_key, opening.as_ref())
            .context("validation failed")?;
        println!("OK: transaction {} is valid and anchored", tx.tx_id());
        print_json(&record)?;
    } else {
        let compliance = flow
            .validate_transaction(&tx, &sender_key)
            .context("validation failed")?;
        println!("OK: transaction {} is valid", tx.tx_id());
        print_json(&compliance)?;
    }
    Ok(0)
}

/// Execute `veil show`.
pub fn run_show(args: &ShowArgs, ctx: &CliContext) -> Result<u8> {
    let flow = ctx.open_flow()?;
    let family = args.family.clone().unwrap_or_else(|| flow.config().family.clone());
    match flow.get_transaction(&family, &args.tx_id)? {
        Some(tx) => {
            print_json(&tx)?;
            Ok(0)
        }
        None => Err(VeilError::NotFound(format!("transaction {family}_{}", args.tx_id)).into()),
    }
}

/// Execute `veil balance`.
pub fn run_balance(args: &BalanceArgs, ctx: &CliContext) -> Result<u8> {
    let flow = ctx.open_flow()?;
    let family = args.family.clone().unwrap_or_else(|| flow.config().family.clone());
    let balance = flow.get_balance(&family, &args.address)?;
    println!("{balance}");
    Ok(0)
}

/// Execute `veil audit`.
pub fn run_audit(args: &AuditArgs, ctx: &CliContext) -> Result<u8> {
    let secret_path = args
        .auditor_key
        .clone()
        .unwrap_or_else(|| ctx.auditor_secret_path());
    let auditor = keys::load_auditor_keypair(&secret_path)?;
    let flow = ctx.open_flow()?;
    let family = args.family.clone().unwrap_or_else(|| flow.config().family.clone());
    let total = flow.audit_total(&family, &args.address, &auditor)?;
    println!("{total}");
    Ok(0)
}

/// Execute `veil cancel`.
pub fn run_cancel(args: &CancelArgs, ctx: &CliContext) -> Result<u8> {
    let flow = ctx.open_flow()?;
    let record = flow
        .cancel(&args.tx_id)
        .with_context(|| format!("cannot cancel anchor of {}", args.tx_id))?;
    println!("OK: anchor {} cancelled", record.record_id);
    Ok(0)
}

/// Execute `veil notary`.
pub fn run_notary(args: &NotaryArgs, ctx: &CliContext) -> Result<u8> {
    let flow = ctx.open_flow()?;
    match &args.command {
        NotaryCommand::List { include_expired } => {
            print_json(&flow.list_notary_records(*include_expired)?)?;
        }
        NotaryCommand::Purge => {
            let removed = flow.purge_expired()?;
            println!("OK: {removed} expired anchors purged");
        }
    }
    Ok(0)
}

fn read_transaction(path: &Path) -> Result<Transaction> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read transaction: {}", path.display()))?;
    Transaction::from_json(&bytes)
        .map_err(VeilError::from)
        .with_context(|| format!("invalid transaction: {}", path.display()))
}

fn read_opening(path: &Path) -> Result<CommitmentOpening> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read opening: {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("invalid opening: {}", path.display()))
}

fn write_json_file(path: &Path, value: &impl serde::Serialize, what: &str) -> Result<()> {
    let body = serde_json::to_string_pretty(value)
        .with_context(|| format!("failed to render {what}"))?;
    std::fs::write(path, body)
        .with_context(|| format!("failed to write {what}: {}", path.display()))
}
