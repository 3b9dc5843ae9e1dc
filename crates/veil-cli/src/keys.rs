//! # Key Subcommands
//!
//! `veil init` prepares a data directory and its auditor ElGamal key pair;
//! `veil keygen` writes an Ed25519 party key pair as hex files
//! (`<prefix>.key`, `<prefix>.pub`) and prints the derived address.
//!
//! Secret keys are only ever written to files, never printed.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;

use veil_core::VeilError;
use veil_crypto::{
    Ed25519KeyPair, Ed25519PublicKey, ElGamalKeypair, ElGamalPublicKey, ElGamalSecretKey,
};

use crate::{read_key_file, CliContext, StoreKind};

/// Arguments for `veil init`.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Use an existing auditor public key instead of generating a key pair.
    #[arg(long)]
    pub auditor: Option<PathBuf>,
}

/// Arguments for `veil keygen`.
#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Output directory for the key files.
    #[arg(long, short, default_value = ".")]
    pub output: PathBuf,
    /// Prefix for the key file names.
    #[arg(long, default_value = "veil")]
    pub prefix: String,
}

/// Execute `veil init`.
pub fn run_init(args: &InitArgs, ctx: &CliContext) -> Result<u8> {
    cmd_init(ctx, args.auditor.as_deref())
}

/// Execute `veil keygen`.
pub fn run_keygen(args: &KeygenArgs) -> Result<u8> {
    cmd_keygen(&args.output, &args.prefix)
}

/// Create the store directories and install the auditor key.
pub(crate) fn cmd_init(ctx: &CliContext, auditor: Option<&Path>) -> Result<u8> {
    for store in [StoreKind::Ledger, StoreKind::Notary, StoreKind::Compliance] {
        let path = ctx.store_path(store);
        std::fs::create_dir_all(&path)
            .with_context(|| format!("failed to create store directory: {}", path.display()))?;
    }

    let public_path = ctx.auditor_public_path();
    if public_path.exists() {
        bail!("data directory already initialised: {}", public_path.display());
    }

    match auditor {
        Some(source) => {
            let public = load_auditor_public(source)?;
            std::fs::write(&public_path, public.to_hex())
                .with_context(|| format!("failed to write auditor key: {}", public_path.display()))?;
            println!("OK: initialised {} with auditor {}", ctx.data_dir.display(), public.fingerprint());
        }
        None => {
            let keypair = ElGamalKeypair::generate();
            let secret_path = ctx.auditor_secret_path();
            std::fs::write(&secret_path, keypair.secret_key().to_hex().as_bytes()).with_context(
                || format!("failed to write auditor secret key: {}", secret_path.display()),
            )?;
            std::fs::write(&public_path, keypair.public_key().to_hex())
                .with_context(|| format!("failed to write auditor key: {}", public_path.display()))?;
            println!("OK: initialised {}", ctx.data_dir.display());
            println!("  Auditor secret key: {}", secret_path.display());
            println!("  Auditor public key: {}", public_path.display());
        }
    }
    tracing::info!(data_dir = %ctx.data_dir.display(), "data directory initialised");
    Ok(0)
}

/// Generate an Ed25519 key pair and write it to files.
pub(crate) fn cmd_keygen(output_dir: &Path, prefix: &str) -> Result<u8> {
    std::fs::create_dir_all(output_dir).with_context(|| {
        format!("failed to create output directory: {}", output_dir.display())
    })?;

    let keypair = Ed25519KeyPair::generate();
    let sk_path = output_dir.join(format!("{prefix}.key"));
    let pk_path = output_dir.join(format!("{prefix}.pub"));

    std::fs::write(&sk_path, keypair.to_secret_hex().as_bytes())
        .with_context(|| format!("failed to write private key: {}", sk_path.display()))?;
    std::fs::write(&pk_path, keypair.public_key().to_hex())
        .with_context(|| format!("failed to write public key: {}", pk_path.display()))?;

    println!("OK: generated Ed25519 keypair");
    println!("  Private key: {}", sk_path.display());
    println!("  Public key:  {}", pk_path.display());
    println!("  Address:     {}", keypair.address());
    Ok(0)
}

/// Load an Ed25519 signing key from a hex file.
pub fn load_signing_key(path: &Path) -> Result<Ed25519KeyPair> {
    let hex = read_key_file(path, "private key")?;
    Ed25519KeyPair::from_secret_hex(&hex)
        .map_err(VeilError::from)
        .with_context(|| format!("invalid private key: {}", path.display()))
}

/// Load an Ed25519 public key from a hex file.
pub fn load_public_key(path: &Path) -> Result<Ed25519PublicKey> {
    let hex = read_key_file(path, "public key")?;
    Ed25519PublicKey::from_hex(&hex)
        .map_err(VeilError::from)
        .with_context(|| format!("invalid public key: {}", path.display()))
}

/// Load an auditor public key from a hex file.
pub fn load_auditor_public(path: &Path) -> Result<ElGamalPublicKey> {
    let hex = read_key_file(path, "auditor public key")?;
    ElGamalPublicKey::from_hex(&hex)
        .map_err(VeilError::from)
        .with_context(|| format!("invalid auditor public key: {}", path.display()))
}

/// Load the auditor key pair from its secret key file.
pub fn load_auditor_keypair(path: &Path) -> Result<ElGamalKeypair> {
    let hex = read_key_file(path, "auditor secret key")?;
    let secret = ElGamalSecretKey::from_hex(&hex)
        .map_err(VeilError::from)
        .with_context(|| format!("invalid auditor secret key: {}", path.display()))?;
    Ok(ElGamalKeypair::from_secret(secret))
}
