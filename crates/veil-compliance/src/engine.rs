//! # Compliance Engine
//!
//! Screens a transaction's `{sender, recipient}` against the blacklist and,
//! at the advanced level, the whitelist. Membership is only ever decided
//! through the configured PSI scheme; the engine never tests list
//! containment in the clear.
//!
//! ## Decision
//!
//! | Condition | Status |
//! |---|---|
//! | any candidate on the blacklist | `NonCompliant` |
//! | level `Advanced`, whitelist mandatory, a candidate not whitelisted | `NonCompliant` |
//! | otherwise | `Compliant` |
//!
//! Results are derived on demand and never persisted as ground truth.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use veil_core::Address;
use veil_store::KvStore;

use crate::error::ComplianceError;
use crate::lists::AddressList;
use crate::psi::{psi_scheme, PsiBackend, SetScreen};

/// How strict screening is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceLevel {
    /// Blacklist screening only.
    #[default]
    Basic,
    /// Blacklist screening plus whitelist membership.
    Advanced,
}

impl ComplianceLevel {
    /// Numeric level (`1` basic, `2` advanced).
    pub fn as_u8(&self) -> u8 {
        match self {
            Self::Basic => 1,
            Self::Advanced => 2,
        }
    }
}

impl fmt::Display for ComplianceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Basic => "basic",
            Self::Advanced => "advanced",
        })
    }
}

/// Outcome of a screening.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComplianceStatus {
    /// No rule was violated.
    Compliant,
    /// A blacklist hit or a missing mandatory whitelist membership.
    NonCompliant,
}

/// Full screening report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceResult {
    /// Candidates found on the blacklist.
    pub blacklist_matches: BTreeSet<Address>,
    /// Candidates found on the whitelist.
    pub whitelist_matches: BTreeSet<Address>,
    /// The verdict.
    pub status: ComplianceStatus,
    /// Why the verdict is `NonCompliant`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ComplianceResult {
    /// Whether the verdict is `Compliant`.
    pub fn is_compliant(&self) -> bool {
        self.status == ComplianceStatus::Compliant
    }
}

/// Engine settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ComplianceConfig {
    /// Screening strictness.
    pub level: ComplianceLevel,
    /// PSI scheme.
    pub psi: PsiBackend,
    /// At `Advanced`, require every candidate to be whitelisted.
    pub whitelist_mandatory: bool,
}

/// Screens addresses against lists held in a KV store.
#[derive(Debug, Clone)]
pub struct ComplianceEngine {
    lists: Arc<dyn KvStore>,
    screen: Arc<dyn SetScreen>,
    config: ComplianceConfig,
}

impl ComplianceEngine {
    /// Build an engine over the list store, keying a fresh PSI scheme.
    pub fn new(lists: Arc<dyn KvStore>, config: ComplianceConfig) -> Self {
        Self {
            lists,
            screen: psi_scheme(config.psi),
            config,
        }
    }

    /// The active settings.
    pub fn config(&self) -> &ComplianceConfig {
        &self.config
    }

    /// Screen a transaction's parties.
    pub fn check_transaction(
        &self,
        sender: &Address,
        recipient: &Address,
    ) -> Result<ComplianceResult, ComplianceError> {
        self.check_compliance(&[sender.clone(), recipient.clone()])
    }

    /// Screen `candidates` against the stored lists.
    pub fn check_compliance(
        &self,
        candidates: &[Address],
    ) -> Result<ComplianceResult, ComplianceError> {
        let blacklist = AddressList::blacklist().load(self.lists.as_ref())?;
        let whitelist = if self.config.level == ComplianceLevel::Advanced {
            AddressList::whitelist().load(self.lists.as_ref())?
        } else {
            Vec::new()
        };
        Ok(self.screen_against(candidates, &blacklist, &whitelist))
    }

    /// Screen `candidates` against explicit lists.
    pub fn screen_against(
        &self,
        candidates: &[Address],
        blacklist: &[Address],
        whitelist: &[Address],
    ) -> ComplianceResult {
        let blacklist_matches = self.matches(candidates, blacklist);
        let whitelist_matches = if self.config.level == ComplianceLevel::Advanced {
            self.matches(candidates, whitelist)
        } else {
            BTreeSet::new()
        };

        let reason = if !blacklist_matches.is_empty() {
            Some(format!("{} party(ies) on the blacklist", blacklist_matches.len()))
        } else if self.config.level == ComplianceLevel::Advanced
            && self.config.whitelist_mandatory
            && candidates.iter().any(|c| !whitelist_matches.contains(c))
        {
            Some("party not on the mandatory whitelist".to_string())
        } else {
            None
        };
        let status = if reason.is_some() {
            ComplianceStatus::NonCompliant
        } else {
            ComplianceStatus::Compliant
        };

        if let Some(r) = &reason {
            tracing::warn!(level = %self.config.level, reason = %r, "compliance screening failed");
        } else {
            tracing::debug!(level = %self.config.level, "compliance screening passed");
        }

        ComplianceResult {
            blacklist_matches,
            whitelist_matches,
            status,
            reason,
        }
    }

    fn matches(&self, candidates: &[Address], reference: &[Address]) -> BTreeSet<Address> {
        let a: Vec<&[u8]> = candidates.iter().map(|c| c.as_str().as_bytes()).collect();
        let b: Vec<&[u8]> = reference.iter().map(|r| r.as_str().as_bytes()).collect();
        self.screen
            .screen(&a, &b)
            .into_iter()
            .filter_map(|i| candidates.get(i).cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veil_store::MemoryKv;

    fn addr(s: &str) -> Address {
        Address::new(s).unwrap()
    }

    fn engine(level: ComplianceLevel, whitelist_mandatory: bool, psi: PsiBackend) -> (ComplianceEngine, Arc<MemoryKv>) {
        let kv = Arc::new(MemoryKv::new());
        let engine = ComplianceEngine::new(
            kv.clone(),
            ComplianceConfig {
                level,
                psi,
                whitelist_mandatory,
            },
        );
        (engine, kv)
    }

    #[test]
    fn empty_blacklist_is_compliant() {
        for psi in PsiBackend::ALL {
            let (e, _) = engine(ComplianceLevel::Basic, false, psi);
            let r = e.check_transaction(&addr("0xa11ce"), &addr("0xb0b")).unwrap();
            assert!(r.is_compliant());
            assert!(r.blacklist_matches.is_empty());
            assert_eq!(r.reason, None);
        }
    }

    #[test]
    fn blacklisted_recipient_is_non_compliant() {
        for psi in PsiBackend::ALL {
            let (e, kv) = engine(ComplianceLevel::Basic, false, psi);
            AddressList::blacklist().insert(kv.as_ref(), &addr("0xb0b")).unwrap();
            let r = e.check_transaction(&addr("0xa11ce"), &addr("0xb0b")).unwrap();
            assert_eq!(r.status, ComplianceStatus::NonCompliant);
            assert_eq!(r.blacklist_matches, BTreeSet::from([addr("0xb0b")]));
        }
    }

    #[test]
    fn basic_level_ignores_whitelist() {
        let (e, _) = engine(ComplianceLevel::Basic, true, PsiBackend::KeyedDh);
        let r = e.check_transaction(&addr("0x1"), &addr("0x2")).unwrap();
        assert!(r.is_compliant());
        assert!(r.whitelist_matches.is_empty());
    }

    #[test]
    fn advanced_mandatory_requires_both_parties_whitelisted() {
        let (e, kv) = engine(ComplianceLevel::Advanced, true, PsiBackend::ElGamal);
        AddressList::whitelist().insert(kv.as_ref(), &addr("0x1")).unwrap();
        let r = e.check_transaction(&addr("0x1"), &addr("0x2")).unwrap();
        assert_eq!(r.status, ComplianceStatus::NonCompliant);
        assert_eq!(r.whitelist_matches, BTreeSet::from([addr("0x1")]));

        AddressList::whitelist().insert(kv.as_ref(), &addr("0x2")).unwrap();
        assert!(e.check_transaction(&addr("0x1"), &addr("0x2")).unwrap().is_compliant());
    }

    #[test]
    fn advanced_optional_whitelist_only_reports() {
        let (e, _) = engine(ComplianceLevel::Advanced, false, PsiBackend::KeyedDh);
        assert!(e.check_transaction(&addr("0x1"), &addr("0x2")).unwrap().is_compliant());
    }

    #[test]
    fn blacklist_wins_over_whitelist() {
        let (e, _) = engine(ComplianceLevel::Advanced, true, PsiBackend::KeyedDh);
        let r = e.screen_against(
            &[addr("0x1"), addr("0x2")],
            &[addr("0x2")],
            &[addr("0x1"), addr("0x2")],
        );
        assert_eq!(r.status, ComplianceStatus::NonCompliant);
        assert!(r.reason.unwrap().contains("blacklist"));
    }

    #[test]
    fn levels_are_numbered() {
        assert_eq!(ComplianceLevel::Basic.as_u8(), 1);
        assert_eq!(ComplianceLevel::Advanced.as_u8(), 2);
        assert!(ComplianceLevel::Advanced > ComplianceLevel::Basic);
    }
}
