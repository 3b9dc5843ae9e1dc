//! # Emulator
//!
//! An in-memory [`TransactionFlow`] on a manual clock, driven by a scripted
//! [`Scenario`]. Parties are named; each name maps to a fixed Ed25519 key so
//! a script replays identically.
//!
//! ```yaml
//! steps:
//!   - op: transfer
//!     from: alice
//!     to: bob
//!     amount: 100
//!   - op: advance
//!     secs: 119
//!   - op: cancel
//!     step: 0
//!   - op: balance
//!     party: bob
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use veil_compliance::AddressList;
use veil_core::{
    sha256_digest, Address, CanonicalBytes, ErrorCode, ManualClock, Timestamp, TxId, VeilError,
};
use veil_crypto::{Ed25519KeyPair, ElGamalKeypair};
use veil_store::MemoryKv;

use crate::config::FlowConfig;
use crate::orchestrator::{FlowStores, TransactionFlow};

/// 2024-01-01T00:00:00Z, where emulations start unless told otherwise.
pub const DEFAULT_START_EPOCH: i64 = 1_704_067_200;

/// One scripted action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Create, screen, store and optionally anchor a transfer.
    Transfer {
        /// Sending party.
        from: String,
        /// Receiving party.
        to: String,
        /// Amount.
        amount: u64,
        /// Anchor override; the configured default when absent.
        #[serde(default)]
        anchor: Option<bool>,
    },
    /// Move the clock forward. Time never runs backwards.
    Advance {
        /// Seconds to advance.
        secs: u64,
    },
    /// Cancel the anchor of the transfer made at step `step`.
    Cancel {
        /// Index of an earlier transfer step.
        step: usize,
    },
    /// Blacklist a party.
    Blacklist {
        /// The party.
        party: String,
    },
    /// Whitelist a party.
    Whitelist {
        /// The party.
        party: String,
    },
    /// Report a party's balance.
    Balance {
        /// The party.
        party: String,
    },
    /// Report the audited total received by a party.
    Audit {
        /// The party.
        party: String,
    },
    /// Collect expired anchors.
    Purge,
}

impl Step {
    fn op(&self) -> &'static str {
        match self {
            Self::Transfer { .. } => "transfer",
            Self::Advance { .. } => "advance",
            Self::Cancel { .. } => "cancel",
            Self::Blacklist { .. } => "blacklist",
            Self::Whitelist { .. } => "whitelist",
            Self::Balance { .. } => "balance",
            Self::Audit { .. } => "audit",
            Self::Purge => "purge",
        }
    }
}

/// A script of steps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Actions, run in order.
    pub steps: Vec<Step>,
}

impl Scenario {
    /// Transfer, balances, a late cancel and a blacklisted transfer.
    pub fn demo() -> Self {
        let party = |p: &str| p.to_string();
        Self {
            steps: vec![
                Step::Transfer { from: party("sender"), to: party("recipient"), amount: 100, anchor: Some(true) },
                Step::Balance { party: party("recipient") },
                Step::Balance { party: party("sender") },
                Step::Advance { secs: 121 },
                Step::Cancel { step: 0 },
                Step::Blacklist { party: party("mallory") },
                Step::Transfer { from: party("sender"), to: party("mallory"), amount: 5, anchor: None },
                Step::Audit { party: party("recipient") },
            ],
        }
    }
}

/// What one step did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepReport {
    /// Position in the script.
    pub index: usize,
    /// Step kind.
    pub op: String,
    /// Whether it succeeded.
    pub ok: bool,
    /// Result or error message.
    pub detail: String,
    /// Error code on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
}

/// An in-memory flow with a manual clock.
#[derive(Debug)]
pub struct Emulator {
    flow: TransactionFlow,
    clock: Arc<ManualClock>,
    lists: Arc<MemoryKv>,
    auditor: ElGamalKeypair,
}

impl Emulator {
    /// Start at [`DEFAULT_START_EPOCH`].
    pub fn new(config: FlowConfig) -> Result<Self, VeilError> {
        Self::starting_at(config, Timestamp::from_epoch_secs(DEFAULT_START_EPOCH)?)
    }

    /// Start at `start`.
    pub fn starting_at(config: FlowConfig, start: Timestamp) -> Result<Self, VeilError> {
        let clock = Arc::new(ManualClock::new(start));
        let lists = Arc::new(MemoryKv::new());
        let auditor = ElGamalKeypair::generate();
        let flow = TransactionFlow::new(
            config,
            FlowStores {
                ledger: Arc::new(MemoryKv::new()),
                notary: Arc::new(MemoryKv::new()),
                compliance: lists.clone(),
            },
            *auditor.public_key(),
            clock.clone(),
        )?;
        Ok(Self {
            flow,
            clock,
            lists,
            auditor,
        })
    }

    /// The underlying flow.
    pub fn flow(&self) -> &TransactionFlow {
        &self.flow
    }

    /// Move the clock forward.
    pub fn advance(&self, secs: u64) -> Result<Timestamp, VeilError> {
        self.clock.advance(secs)
    }

    /// The auditor keypair amounts are encrypted to.
    pub fn auditor(&self) -> &ElGamalKeypair {
        &self.auditor
    }

    /// The deterministic key of a named party.
    pub fn party_key(name: &str) -> Result<Ed25519KeyPair, VeilError> {
        let seed = sha256_digest(&CanonicalBytes::new(&("veil/emulator/party", name))?);
        Ok(Ed25519KeyPair::from_seed(seed.as_bytes()))
    }

    /// The address of a named party.
    pub fn party_address(name: &str) -> Result<Address, VeilError> {
        Ok(Self::party_key(name)?.address())
    }

    /// Run every step. A failing step is reported and the script continues.
    pub fn run(&self, scenario: &Scenario) -> Vec<StepReport> {
        let mut transfers: BTreeMap<usize, TxId> = BTreeMap::new();
        scenario
            .steps
            .iter()
            .enumerate()
            .map(|(index, step)| {
                let result = self.apply(index, step, &mut transfers);
                let report = match result {
                    Ok(detail) => StepReport {
                        index,
                        op: step.op().to_string(),
                        ok: true,
                        detail,
                        code: None,
                    },
                    Err(e) => StepReport {
                        index,
                        op: step.op().to_string(),
                        ok: false,
                        detail: e.to_string(),
                        code: Some(e.code()),
                    },
                };
                tracing::debug!(index, op = %report.op, ok = report.ok, "emulator step");
                report
            })
            .collect()
    }

    fn apply(
        &self,
        index: usize,
        step: &Step,
        transfers: &mut BTreeMap<usize, TxId>,
    ) -> Result<String, VeilError> {
        let family = &self.flow.config().family;
        match step {
            Step::Transfer { from, to, amount, anchor } => {
                let sender = Self::party_key(from)?;
                let recipient = Self::party_address(to)?;
                let receipt = self
                    .flow
                    .process_transaction(&sender, &recipient, *amount, *anchor)?;
                let tx_id = *receipt.transaction.tx_id();
                transfers.insert(index, tx_id);
                Ok(match receipt.anchor {
                    Some(record) => match record.expires_at {
                        Some(at) => format!("stored {tx_id}, anchored until {at}"),
                        None => format!("stored {tx_id}, anchored permanently"),
                    },
                    None => format!("stored {tx_id}"),
                })
            }
            Step::Advance { secs } => Ok(format!("now {}", self.advance(*secs)?)),
            Step::Cancel { step } => {
                let tx_id = transfers.get(step).ok_or_else(|| {
                    VeilError::NotFound(format!("no stored transfer at step {step}"))
                })?;
                let record = self.flow.cancel(tx_id)?;
                Ok(format!("cancelled anchor {}", record.record_id))
            }
            Step::Blacklist { party } => {
                AddressList::blacklist().insert(self.lists.as_ref(), &Self::party_address(party)?)?;
                Ok(format!("{party} blacklisted"))
            }
            Step::Whitelist { party } => {
                AddressList::whitelist().insert(self.lists.as_ref(), &Self::party_address(party)?)?;
                Ok(format!("{party} whitelisted"))
            }
            Step::Balance { party } => {
                let balance = self.flow.get_balance(family, &Self::party_address(party)?)?;
                Ok(format!("{party}: {balance:+}"))
            }
            Step::Audit { party } => {
                let total =
                    self.flow
                        .audit_total(family, &Self::party_address(party)?, &self.auditor)?;
                Ok(format!("{party} received {total}"))
            }
            Step::Purge => Ok(format!("{} expired anchors purged", self.flow.purge_expired()?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veil_zkp::RangeProofBackend;

    fn emulator() -> Emulator {
        Emulator::new(FlowConfig {
            range_proof_backend: RangeProofBackend::Emulated,
            ..FlowConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn party_keys_are_deterministic() {
        let a = Emulator::party_key("alice").unwrap();
        let b = Emulator::party_key("alice").unwrap();
        assert_eq!(a.public_key(), b.public_key());
        assert_ne!(
            Emulator::party_address("alice").unwrap(),
            Emulator::party_address("bob").unwrap()
        );
    }

    #[test]
    fn demo_scenario_outcomes() {
        let reports = emulator().run(&Scenario::demo());
        assert_eq!(reports.len(), 8);
        assert!(reports[0].ok);
        assert_eq!(reports[1].detail, "recipient: +100");
        assert_eq!(reports[2].detail, "sender: -100");
        assert!(!reports[4].ok);
        assert_eq!(reports[4].code, Some(ErrorCode::WindowExpired));
        assert!(!reports[6].ok);
        assert_eq!(reports[6].code, Some(ErrorCode::NonCompliant));
        assert_eq!(reports[7].detail, "recipient received 100");
    }

    #[test]
    fn cancel_inside_window_via_script() {
        let script: Scenario = serde_yaml::from_str(
            "steps:\n  - op: transfer\n    from: a\n    to: b\n    amount: 3\n  - op: advance\n    secs: 119\n  - op: cancel\n    step: 0\n  - op: cancel\n    step: 0\n",
        )
        .unwrap();
        let reports = emulator().run(&script);
        assert!(reports[2].ok, "{:?}", reports[2]);
        assert_eq!(reports[3].code, Some(ErrorCode::NotFound));
    }

    #[test]
    fn cancel_of_unknown_step_is_not_found() {
        let reports = emulator().run(&Scenario {
            steps: vec![Step::Cancel { step: 4 }],
        });
        assert_eq!(reports[0].code, Some(ErrorCode::NotFound));
    }

    #[test]
    fn negative_advance_is_rejected_at_load() {
        let parsed: Result<Scenario, _> =
            serde_yaml::from_str("steps:\n  - op: advance\n    secs: -200\n");
        assert!(parsed.is_err());
    }

    #[test]
    fn overflowing_advance_fails_without_moving_the_clock() {
        let emulator = emulator();
        let reports = emulator.run(&Scenario {
            steps: vec![
                Step::Transfer { from: "a".into(), to: "b".into(), amount: 1, anchor: Some(true) },
                Step::Advance { secs: 121 },
                Step::Advance { secs: u64::MAX },
                Step::Cancel { step: 0 },
            ],
        });
        assert!(!reports[2].ok);
        assert_eq!(reports[2].code, Some(ErrorCode::ValidationError));
        assert_eq!(
            emulator.flow().now().epoch_secs(),
            DEFAULT_START_EPOCH + 121
        );
        assert_eq!(reports[3].code, Some(ErrorCode::WindowExpired));
    }

    #[test]
    fn purge_after_expiry() {
        let reports = emulator().run(&Scenario {
            steps: vec![
                Step::Transfer { from: "a".into(), to: "b".into(), amount: 1, anchor: Some(true) },
                Step::Advance { secs: 500 },
                Step::Purge,
            ],
        });
        assert_eq!(reports[2].detail, "1 expired anchors purged");
    }
}
