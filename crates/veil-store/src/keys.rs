//! # Key Format
//!
//! Records live at `<family>_<hexId>`: an ASCII family token, an underscore,
//! and the 64-character lowercase hex content digest.
//!
//! Family tokens may themselves contain `_` (`financial_tx`), so a family
//! partition scan over the prefix `<family>_` also returns keys of any family
//! that extends it (`financial_tx_archive_<id>`). [`record_id_in_family`]
//! accepts a key only when the remainder after the prefix is exactly one
//! digest.

use veil_core::{ContentDigest, Family};

const DIGEST_HEX_LEN: usize = 64;

/// The key for record `id` in `family`.
pub fn record_key(family: &Family, id: &ContentDigest) -> String {
    format!("{}_{}", family.as_str(), id.to_hex())
}

/// The scan prefix covering `family`.
pub fn family_prefix(family: &Family) -> String {
    format!("{}_", family.as_str())
}

fn is_digest_hex(s: &str) -> bool {
    s.len() == DIGEST_HEX_LEN && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// The record id of `key` if it belongs to exactly `family`.
pub fn record_id_in_family<'k>(key: &'k str, family: &Family) -> Option<&'k str> {
    let rest = key.strip_prefix(family.as_str())?.strip_prefix('_')?;
    is_digest_hex(rest).then_some(rest)
}

/// Split any record key into `(family, hexId)`.
pub fn split_record_key(key: &str) -> Option<(&str, &str)> {
    let (family, id) = key.rsplit_once('_')?;
    (!family.is_empty() && is_digest_hex(id)).then_some((family, id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use veil_core::CanonicalBytes;

    fn digest(n: u64) -> ContentDigest {
        veil_core::sha256_digest(&CanonicalBytes::new(&n).unwrap())
    }

    #[test]
    fn key_has_family_underscore_hex() {
        let id = digest(1);
        let key = record_key(&Family::financial(), &id);
        assert_eq!(key, format!("financial_tx_{}", id.to_hex()));
        assert!(key.starts_with(&family_prefix(&Family::financial())));
    }

    #[test]
    fn family_membership_requires_exact_remainder() {
        let id = digest(2);
        let fin = Family::financial();
        let archive: Family = "financial_tx_archive".parse().unwrap();
        let key = record_key(&archive, &id);
        assert!(key.starts_with(&family_prefix(&fin)));
        assert_eq!(record_id_in_family(&key, &fin), None);
        assert_eq!(record_id_in_family(&key, &archive), Some(id.to_hex().as_str()));
    }

    #[test]
    fn rejects_non_digest_suffixes() {
        let fin = Family::financial();
        assert_eq!(record_id_in_family("financial_tx_abc", &fin), None);
        assert_eq!(
            record_id_in_family(&format!("financial_tx_{}", "A".repeat(64)), &fin),
            None
        );
        assert_eq!(split_record_key("blacklist_xyz"), None);
    }

    #[test]
    fn split_recovers_family_with_underscores() {
        let id = digest(3);
        let key = record_key(&Family::notary(), &id);
        let (family, hex) = split_record_key(&key).unwrap();
        assert_eq!(family, "notary_tx");
        assert_eq!(hex, id.to_hex());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn record_key_splits_back(family in "[A-Za-z0-9_-]{1,64}", bytes in any::<[u8; 32]>()) {
            let family: Family = family.parse().unwrap();
            let id = ContentDigest::from_bytes(bytes);
            let key = record_key(&family, &id);
            let id_hex = id.to_hex();
            prop_assert_eq!(record_id_in_family(&key, &family), Some(id_hex.as_str()));
            let (f, hex) = split_record_key(&key).unwrap();
            prop_assert_eq!(f, family.as_str());
            prop_assert_eq!(hex, id.to_hex());
        }
    }
}
