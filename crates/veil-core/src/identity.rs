//! # Identifier Newtypes
//!
//! - [`Address`]: a ledger participant. Either a derived `0x` address or an
//!   opaque account label. Hex-form addresses are lowercased so that the same
//!   account never appears under two spellings in a balance scan or a
//!   compliance list.
//! - [`TxId`] / [`RecordId`]: 64-char lowercase hex content digests.
//! - [`Family`]: a namespace token that partitions the key space.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::digest::ContentDigest;
use crate::error::IdentifierError;

const MAX_ADDRESS_LEN: usize = 128;
const MAX_FAMILY_LEN: usize = 64;

/// A ledger participant address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(String);

impl Address {
    /// Validate and normalize an address string.
    ///
    /// # Errors
    ///
    /// Rejects empty strings, strings longer than 128 bytes, and strings
    /// containing whitespace or control characters.
    pub fn new(s: impl Into<String>) -> Result<Self, IdentifierError> {
        let s = s.into();
        let reject = |reason: &str| IdentifierError::InvalidAddress {
            value: s.clone(),
            reason: reason.to_string(),
        };
        if s.is_empty() {
            return Err(reject("empty"));
        }
        if s.len() > MAX_ADDRESS_LEN {
            return Err(reject("longer than 128 bytes"));
        }
        if s.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(reject("contains whitespace or control characters"));
        }
        let normalized = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(body) if !body.is_empty() && body.chars().all(|c| c.is_ascii_hexdigit()) => {
                format!("0x{}", body.to_ascii_lowercase())
            }
            _ => s,
        };
        Ok(Self(normalized))
    }

    /// Build a `0x` address from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(format!("0x{}", hex::encode(bytes)))
    }

    /// The normalized address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Address {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(serde::de::Error::custom)
    }
}

/// Transaction identifier: the content digest of a transaction header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxId(ContentDigest);

/// Notary record identifier: the content digest of a record body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(ContentDigest);

macro_rules! digest_id {
    ($name:ident) => {
        impl $name {
            /// Wrap a content digest.
            pub fn from_digest(digest: ContentDigest) -> Self {
                Self(digest)
            }

            /// Parse from 64 hex characters.
            pub fn from_hex(s: &str) -> Result<Self, IdentifierError> {
                ContentDigest::from_hex(s).map(Self)
            }

            /// The underlying digest.
            pub fn digest(&self) -> &ContentDigest {
                &self.0
            }

            /// Lowercase hex form, as used in store keys.
            pub fn to_hex(&self) -> String {
                self.0.to_hex()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0.to_hex())
            }
        }

        impl std::str::FromStr for $name {
            type Err = IdentifierError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_hex(s)
            }
        }
    };
}

digest_id!(TxId);
digest_id!(RecordId);

/// A key-space namespace such as `financial_tx`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Family(String);

impl Family {
    /// Ordinary value transfers.
    pub const FINANCIAL: &'static str = "financial_tx";
    /// Notarized records.
    pub const NOTARY: &'static str = "notary_tx";
    /// Compliance attestations.
    pub const COMPLIANCE: &'static str = "compliance_tx";

    /// Validate a family token: 1–64 characters from `[A-Za-z0-9_-]`.
    pub fn new(s: impl Into<String>) -> Result<Self, IdentifierError> {
        let s = s.into();
        let reason = if s.is_empty() {
            Some("empty")
        } else if s.len() > MAX_FAMILY_LEN {
            Some("longer than 64 characters")
        } else if !s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            Some("only [A-Za-z0-9_-] is allowed")
        } else {
            None
        };
        match reason {
            Some(r) => Err(IdentifierError::InvalidFamily {
                value: s,
                reason: r.to_string(),
            }),
            None => Ok(Self(s)),
        }
    }

    /// The `financial_tx` family.
    pub fn financial() -> Self {
        Self(Self::FINANCIAL.to_string())
    }

    /// The `notary_tx` family.
    pub fn notary() -> Self {
        Self(Self::NOTARY.to_string())
    }

    /// The `compliance_tx` family.
    pub fn compliance() -> Self {
        Self(Self::COMPLIANCE.to_string())
    }

    /// The family token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Family {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Family {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for Family {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Family {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{sha256_digest, CanonicalBytes};

    #[test]
    fn hex_addresses_are_lowercased() {
        let a = Address::new("0xABCdef0123").unwrap();
        assert_eq!(a.as_str(), "0xabcdef0123");
        assert_eq!(a, Address::new("0XabcDEF0123").unwrap());
    }

    #[test]
    fn label_addresses_are_kept_verbatim() {
        let a = Address::new("Recipient_Label").unwrap();
        assert_eq!(a.as_str(), "Recipient_Label");
    }

    #[test]
    fn bad_addresses_rejected() {
        assert!(Address::new("").is_err());
        assert!(Address::new("has space").is_err());
        assert!(Address::new("tab\there").is_err());
        assert!(Address::new("x".repeat(129)).is_err());
    }

    #[test]
    fn address_deserialization_validates() {
        assert!(serde_json::from_str::<Address>("\"\"").is_err());
        let a: Address = serde_json::from_str("\"0xFF\"").unwrap();
        assert_eq!(a.as_str(), "0xff");
    }

    #[test]
    fn family_tokens() {
        assert_eq!(Family::financial().as_str(), "financial_tx");
        assert!(Family::new("financial").is_ok());
        assert!(Family::new("with-dash_and_1").is_ok());
        assert!(Family::new("").is_err());
        assert!(Family::new("a/b").is_err());
        assert!(Family::new("a b").is_err());
        assert!(Family::new("f".repeat(65)).is_err());
    }

    #[test]
    fn tx_id_roundtrips_through_hex() {
        let d = sha256_digest(&CanonicalBytes::new(&"x").unwrap());
        let id = TxId::from_digest(d);
        let parsed: TxId = id.to_hex().parse().unwrap();
        assert_eq!(parsed, id);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.to_hex()));
    }

    #[test]
    fn record_id_rejects_short_hex() {
        assert!(RecordId::from_hex("00ff").is_err());
    }
}
