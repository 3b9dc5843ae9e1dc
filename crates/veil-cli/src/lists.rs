//! # Compliance List Subcommands
//!
//! `veil blacklist` and `veil whitelist` edit the address lists in the
//! compliance store that screening reads.

use anyhow::Result;
use clap::{Args, Subcommand};

use veil_compliance::{AddressList, ListKind};
use veil_core::{Address, VeilError};

use crate::{print_json, CliContext, StoreKind};

/// Arguments for `veil blacklist` / `veil whitelist`.
#[derive(Args, Debug)]
pub struct ListArgs {
    #[command(subcommand)]
    pub command: ListCommand,
}

/// List subcommands.
#[derive(Subcommand, Debug)]
pub enum ListCommand {
    /// Add an address.
    Add {
        /// The address.
        address: Address,
    },
    /// Remove an address.
    Remove {
        /// The address.
        address: Address,
    },
    /// Print every listed address.
    Show,
}

/// Execute a list subcommand against `kind`.
pub fn run_list(args: &ListArgs, ctx: &CliContext, kind: ListKind) -> Result<u8> {
    match &args.command {
        ListCommand::Add { address } => cmd_list_add(ctx, kind, address),
        ListCommand::Remove { address } => cmd_list_remove(ctx, kind, address),
        ListCommand::Show => cmd_list_show(ctx, kind),
    }
}

fn list_for(kind: ListKind) -> AddressList {
    match kind {
        ListKind::Blacklist => AddressList::blacklist(),
        ListKind::Whitelist => AddressList::whitelist(),
    }
}

pub(crate) fn cmd_list_add(ctx: &CliContext, kind: ListKind, address: &Address) -> Result<u8> {
    let store = ctx.open_store(StoreKind::Compliance)?;
    let added = list_for(kind)
        .insert(store.as_ref(), address)
        .map_err(VeilError::from)?;
    if added {
        println!("OK: {address} added to {kind}");
    } else {
        println!("OK: {address} already on {kind}");
    }
    Ok(0)
}

fn cmd_list_remove(ctx: &CliContext, kind: ListKind, address: &Address) -> Result<u8> {
    let store = ctx.open_store(StoreKind::Compliance)?;
    let removed = list_for(kind)
        .remove(store.as_ref(), address)
        .map_err(VeilError::from)?;
    if removed {
        println!("OK: {address} removed from {kind}");
        Ok(0)
    } else {
        println!("FAIL: {address} is not on {kind}");
        Ok(1)
    }
}

fn cmd_list_show(ctx: &CliContext, kind: ListKind) -> Result<u8> {
    print_json(&load(ctx, kind)?)?;
    Ok(0)
}

fn load(ctx: &CliContext, kind: ListKind) -> Result<Vec<Address>> {
    let store = ctx.open_store(StoreKind::Compliance)?;
    Ok(list_for(kind).load(store.as_ref()).map_err(VeilError::from)?)
}
