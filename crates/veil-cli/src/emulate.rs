//! # Emulate Subcommand
//!
//! `veil emulate` runs a YAML scenario (or the built-in demo) against an
//! in-memory ledger on a manual clock and prints one JSON report per step.
//! Nothing touches the data directory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use veil_core::{Timestamp, VeilError};
use veil_flow::{Emulator, Scenario, StepReport};

use crate::{print_json, CliContext};

/// Arguments for `veil emulate`.
#[derive(Args, Debug)]
pub struct EmulateArgs {
    /// Scenario file; the built-in demo when omitted.
    #[arg(long)]
    pub scenario: Option<PathBuf>,
    /// Start time as Unix seconds.
    #[arg(long)]
    pub start: Option<i64>,
    /// Exit non-zero if any step failed.
    #[arg(long)]
    pub strict: bool,
}

/// Execute `veil emulate`.
pub fn run_emulate(args: &EmulateArgs, ctx: &CliContext) -> Result<u8> {
    let scenario = match &args.scenario {
        Some(path) => load_scenario(path)?,
        None => Scenario::demo(),
    };
    let reports = emulate(&scenario, ctx, args.start)?;
    print_json(&reports)?;

    let failed = reports.iter().filter(|r| !r.ok).count();
    if args.strict && failed > 0 {
        println!("FAIL: {failed} of {} steps failed", reports.len());
        return Ok(1);
    }
    Ok(0)
}

fn emulate(scenario: &Scenario, ctx: &CliContext, start: Option<i64>) -> Result<Vec<StepReport>> {
    let config = ctx.load_config()?;
    let emulator = match start {
        Some(secs) => Emulator::starting_at(config, Timestamp::from_epoch_secs(secs)?)?,
        None => Emulator::new(config)?,
    };
    Ok(emulator.run(scenario))
}

fn load_scenario(path: &Path) -> Result<Scenario> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read scenario: {}", path.display()))?;
    serde_yaml::from_str(&content)
        .map_err(|e| VeilError::Validation(e.to_string()))
        .with_context(|| format!("invalid scenario: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use veil_core::ErrorCode;

    fn emulated_ctx(dir: &tempfile::TempDir) -> CliContext {
        let config = dir.path().join("veil.yaml");
        std::fs::write(&config, "range_proof_backend: emulated\n").unwrap();
        CliContext::new(dir.path().join("unused"), Some(config))
    }

    #[test]
    fn demo_reports_every_step() {
        let dir = tempfile::tempdir().unwrap();
        let reports = emulate(&Scenario::demo(), &emulated_ctx(&dir), None).unwrap();
        assert_eq!(reports.len(), Scenario::demo().steps.len());
        assert_eq!(reports[4].code, Some(ErrorCode::WindowExpired));
        assert!(!dir.path().join("unused").exists());
    }

    #[test]
    fn strict_mode_fails_on_rejected_steps() {
        let dir = tempfile::tempdir().unwrap();
        let args = EmulateArgs {
            scenario: None,
            start: Some(1_700_000_000),
            strict: true,
        };
        assert_eq!(run_emulate(&args, &emulated_ctx(&dir)).unwrap(), 1);
    }

    #[test]
    fn scenario_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenario.yaml");
        std::fs::write(
            &path,
            "steps:\n  - op: transfer\n    from: alice\n    to: bob\n    amount: 5\n  - op: balance\n    party: bob\n",
        )
        .unwrap();
        let args = EmulateArgs {
            scenario: Some(path),
            start: None,
            strict: true,
        };
        assert_eq!(run_emulate(&args, &emulated_ctx(&dir)).unwrap(), 0);
    }

    #[test]
    fn malformed_scenario_is_validation_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenario.yaml");
        std::fs::write(&path, "steps:\n  - op: teleport\n").unwrap();
        let err = load_scenario(&path).unwrap_err();
        assert_eq!(crate::error_code(&err), Some(ErrorCode::ValidationError));
    }
}
