//! # Flow Configuration
//!
//! Loaded once from YAML; every field has a default, so an empty file is a
//! valid configuration.
//!
//! ```yaml
//! cancellation_window_secs: 120
//! range_proof_backend: bulletproof   # or: emulated
//! psi_scheme: keyed_dh               # or: elgamal
//! compliance_level: basic            # or: advanced
//! whitelist_mandatory: false
//! min_amount: 0
//! max_amount: 1000000
//! anchor_by_default: true
//! family: financial_tx
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use veil_compliance::{ComplianceConfig, ComplianceLevel, PsiBackend};
use veil_core::{Family, VeilError};
use veil_crypto::{MAX_COMMITTABLE_VALUE, MAX_DECRYPTABLE_VALUE};
use veil_zkp::RangeProofBackend;

/// Largest amount a transaction may carry: it must be both committable and
/// decryptable by the auditor.
pub const MAX_TRANSFER_AMOUNT: u64 = if MAX_DECRYPTABLE_VALUE < MAX_COMMITTABLE_VALUE {
    MAX_DECRYPTABLE_VALUE
} else {
    MAX_COMMITTABLE_VALUE
};

/// Configuration errors.
#[derive(Error, Debug)]
pub enum FlowConfigError {
    /// The file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// The config path.
        path: PathBuf,
        /// The I/O failure.
        source: std::io::Error,
    },

    /// The YAML did not match the schema.
    #[error("failed to parse config {path}: {source}")]
    Parse {
        /// The config path.
        path: PathBuf,
        /// The parse failure.
        source: serde_yaml::Error,
    },

    /// `min_amount > max_amount`.
    #[error("min_amount {min} exceeds max_amount {max}")]
    InvalidBounds {
        /// Configured lower bound.
        min: u64,
        /// Configured upper bound.
        max: u64,
    },

    /// `max_amount` beyond what can be committed and decrypted.
    #[error("max_amount {max} exceeds the transferable bound {limit}")]
    AmountTooLarge {
        /// Configured upper bound.
        max: u64,
        /// The hard limit.
        limit: u64,
    },

    /// The selected range proof backend is not compiled in.
    #[error("range proof backend '{0}' is not available in this build")]
    BackendUnavailable(String),
}

impl From<FlowConfigError> for VeilError {
    fn from(e: FlowConfigError) -> Self {
        match e {
            FlowConfigError::BackendUnavailable(name) => VeilError::BackendUnavailable(name),
            other => VeilError::Configuration(other.to_string()),
        }
    }
}

/// Orchestrator settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FlowConfig {
    /// Seconds after anchoring during which an anchor may be cancelled.
    /// Zero anchors permanently.
    pub cancellation_window_secs: u64,
    /// Range proof backend.
    pub range_proof_backend: RangeProofBackend,
    /// PSI scheme used for compliance screening.
    pub psi_scheme: PsiBackend,
    /// Compliance strictness.
    pub compliance_level: ComplianceLevel,
    /// At the advanced level, require both parties to be whitelisted.
    pub whitelist_mandatory: bool,
    /// Smallest permitted amount, proven in zero knowledge.
    pub min_amount: u64,
    /// Largest permitted amount, proven in zero knowledge.
    pub max_amount: u64,
    /// Whether a processed transaction is anchored unless told otherwise.
    pub anchor_by_default: bool,
    /// Family new transactions are stored under.
    pub family: Family,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            cancellation_window_secs: 120,
            range_proof_backend: RangeProofBackend::default(),
            psi_scheme: PsiBackend::default(),
            compliance_level: ComplianceLevel::default(),
            whitelist_mandatory: false,
            min_amount: 0,
            max_amount: 1_000_000,
            anchor_by_default: true,
            family: Family::financial(),
        }
    }
}

impl FlowConfig {
    /// Read and validate a YAML file.
    pub fn load(path: &Path) -> Result<Self, FlowConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| FlowConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self =
            serde_yaml::from_str(&content).map_err(|source| FlowConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "flow configuration loaded");
        Ok(config)
    }

    /// Check bounds and backend availability.
    pub fn validate(&self) -> Result<(), FlowConfigError> {
        if self.min_amount > self.max_amount {
            return Err(FlowConfigError::InvalidBounds {
                min: self.min_amount,
                max: self.max_amount,
            });
        }
        if self.max_amount > MAX_TRANSFER_AMOUNT {
            return Err(FlowConfigError::AmountTooLarge {
                max: self.max_amount,
                limit: MAX_TRANSFER_AMOUNT,
            });
        }
        if !self.range_proof_backend.is_available() {
            return Err(FlowConfigError::BackendUnavailable(
                self.range_proof_backend.as_str().to_string(),
            ));
        }
        Ok(())
    }

    /// The compliance engine's share of the settings.
    pub fn compliance(&self) -> ComplianceConfig {
        ComplianceConfig {
            level: self.compliance_level,
            psi: self.psi_scheme,
            whitelist_mandatory: self.whitelist_mandatory,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let c = FlowConfig::default();
        c.validate().unwrap();
        assert_eq!(c.cancellation_window_secs, 120);
        assert_eq!(c.max_amount, 1_000_000);
        assert_eq!(c.family, Family::financial());
        assert!(c.anchor_by_default);
    }

    #[test]
    fn empty_yaml_yields_defaults() {
        let c: FlowConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(c, FlowConfig::default());
    }

    #[test]
    fn load_reads_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "cancellation_window_secs: 30\nrange_proof_backend: emulated\npsi_scheme: elgamal\ncompliance_level: advanced\nwhitelist_mandatory: true\nfamily: payroll"
        )
        .unwrap();
        let c = FlowConfig::load(file.path()).unwrap();
        assert_eq!(c.cancellation_window_secs, 30);
        assert_eq!(c.range_proof_backend, RangeProofBackend::Emulated);
        assert_eq!(c.psi_scheme, PsiBackend::ElGamal);
        assert_eq!(c.compliance_level, ComplianceLevel::Advanced);
        assert!(c.compliance().whitelist_mandatory);
        assert_eq!(c.family.as_str(), "payroll");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "cancelation_window: 30").unwrap();
        assert!(matches!(
            FlowConfig::load(file.path()),
            Err(FlowConfigError::Parse { .. })
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = FlowConfig::load(&dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, FlowConfigError::Io { .. }));
        let veil: VeilError = err.into();
        assert!(veil.is_fatal());
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let c = FlowConfig {
            min_amount: 10,
            max_amount: 5,
            ..FlowConfig::default()
        };
        assert!(matches!(c.validate(), Err(FlowConfigError::InvalidBounds { min: 10, max: 5 })));
    }

    #[test]
    fn max_amount_is_capped() {
        let c = FlowConfig {
            max_amount: MAX_TRANSFER_AMOUNT + 1,
            ..FlowConfig::default()
        };
        assert!(matches!(c.validate(), Err(FlowConfigError::AmountTooLarge { .. })));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn ordered_bounds_within_limit_validate(
            a in 0..=MAX_TRANSFER_AMOUNT,
            b in 0..=MAX_TRANSFER_AMOUNT,
        ) {
            let (min, max) = if a <= b { (a, b) } else { (b, a) };
            let c = FlowConfig { min_amount: min, max_amount: max, ..FlowConfig::default() };
            prop_assert!(c.validate().is_ok());
        }

        #[test]
        fn inverted_bounds_never_validate(min in 1..=MAX_TRANSFER_AMOUNT, gap in 1u64..1000) {
            let c = FlowConfig {
                min_amount: min,
                max_amount: min.saturating_sub(gap),
                ..FlowConfig::default()
            };
            prop_assert!(c.validate().is_err());
        }
    }
}
