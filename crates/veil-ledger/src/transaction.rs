//! # Transaction Model
//!
//! A transaction is built unsigned, signed once, and never mutated after.
//!
//! ```text
//! header ──canonical JSON──▶ SHA-256 ──▶ tx_id
//! {tx_id, header, family, commitment, range_proof, encrypted_amount}
//!        ──canonical JSON──▶ Ed25519 ──▶ signature
//! ```
//!
//! ## Security Invariant
//!
//! `tx_id` is derived from the header alone and the signature covers every
//! other field, so a change to any part of a stored transaction is caught
//! either by [`Transaction::validate_structure`] (header edits) or by
//! [`Transaction::verify_signature`] (everything else).

use serde::{Deserialize, Serialize};
use veil_core::{sha256_digest, Address, CanonicalBytes, Family, Timestamp, TxId};
use veil_crypto::{
    derive_address, verify, Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature, EncryptedAmount,
    PedersenCommitment,
};
use veil_store::record_key;
use veil_zkp::RangeProof;

use crate::error::LedgerError;

/// Who pays whom, when, and how much.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionHeader {
    /// Paying address.
    pub sender: Address,
    /// Receiving address.
    pub recipient: Address,
    /// Creation time, seconds precision.
    pub timestamp: Timestamp,
    /// Transferred amount.
    pub amount: u64,
}

impl TransactionHeader {
    /// Content digest of the canonical header.
    pub fn tx_id(&self) -> Result<TxId, LedgerError> {
        let canonical = CanonicalBytes::new(self)?;
        Ok(TxId::from_digest(sha256_digest(&canonical)))
    }
}

#[derive(Serialize)]
struct Signable<'a> {
    tx_id: &'a TxId,
    header: &'a TransactionHeader,
    family: &'a Family,
    commitment: &'a PedersenCommitment,
    range_proof: &'a RangeProof,
    encrypted_amount: &'a EncryptedAmount,
}

impl Signable<'_> {
    fn canonical(&self) -> Result<CanonicalBytes, LedgerError> {
        Ok(CanonicalBytes::new(self)?)
    }
}

/// A transaction that carries its cryptographic attachments but no signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransaction {
    tx_id: TxId,
    header: TransactionHeader,
    family: Family,
    commitment: PedersenCommitment,
    range_proof: RangeProof,
    encrypted_amount: EncryptedAmount,
}

impl UnsignedTransaction {
    /// Assemble a transaction, deriving its id from `header`.
    pub fn new(
        header: TransactionHeader,
        family: Family,
        commitment: PedersenCommitment,
        range_proof: RangeProof,
        encrypted_amount: EncryptedAmount,
    ) -> Result<Self, LedgerError> {
        Ok(Self {
            tx_id: header.tx_id()?,
            header,
            family,
            commitment,
            range_proof,
            encrypted_amount,
        })
    }

    /// The derived id.
    pub fn tx_id(&self) -> &TxId {
        &self.tx_id
    }

    /// The header.
    pub fn header(&self) -> &TransactionHeader {
        &self.header
    }

    fn signable(&self) -> Signable<'_> {
        Signable {
            tx_id: &self.tx_id,
            header: &self.header,
            family: &self.family,
            commitment: &self.commitment,
            range_proof: &self.range_proof,
            encrypted_amount: &self.encrypted_amount,
        }
    }

    /// The exact bytes a signature covers.
    pub fn signable_bytes(&self) -> Result<CanonicalBytes, LedgerError> {
        self.signable().canonical()
    }

    /// Sign with `key`, producing the immutable transaction.
    ///
    /// Does not check that `key` belongs to the header's sender; that is the
    /// caller's job.
    pub fn sign(self, key: &Ed25519KeyPair) -> Result<Transaction, LedgerError> {
        let signature = key.sign(&self.signable_bytes()?);
        Ok(Transaction {
            tx_id: self.tx_id,
            header: self.header,
            family: self.family,
            commitment: self.commitment,
            range_proof: self.range_proof,
            encrypted_amount: self.encrypted_amount,
            signature,
        })
    }
}

/// A signed transaction as stored in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    tx_id: TxId,
    header: TransactionHeader,
    family: Family,
    commitment: PedersenCommitment,
    range_proof: RangeProof,
    encrypted_amount: EncryptedAmount,
    signature: Ed25519Signature,
}

impl Transaction {
    /// Content id.
    pub fn tx_id(&self) -> &TxId {
        &self.tx_id
    }

    /// Sender, recipient, timestamp and amount.
    pub fn header(&self) -> &TransactionHeader {
        &self.header
    }

    /// Namespace the transaction is stored under.
    pub fn family(&self) -> &Family {
        &self.family
    }

    /// Pedersen commitment to the amount.
    pub fn commitment(&self) -> &PedersenCommitment {
        &self.commitment
    }

    /// Range proof over the commitment.
    pub fn range_proof(&self) -> &RangeProof {
        &self.range_proof
    }

    /// The amount encrypted to the auditor key.
    pub fn encrypted_amount(&self) -> &EncryptedAmount {
        &self.encrypted_amount
    }

    /// Sender signature over everything else.
    pub fn signature(&self) -> &Ed25519Signature {
        &self.signature
    }

    /// Store key: `<family>_<tx_id>`.
    pub fn store_key(&self) -> String {
        record_key(&self.family, self.tx_id.digest())
    }

    /// The bytes the signature covers.
    pub fn signable_bytes(&self) -> Result<CanonicalBytes, LedgerError> {
        Signable {
            tx_id: &self.tx_id,
            header: &self.header,
            family: &self.family,
            commitment: &self.commitment,
            range_proof: &self.range_proof,
            encrypted_amount: &self.encrypted_amount,
        }
        .canonical()
    }

    /// Whether `public_key` signed this transaction. Never errors.
    pub fn verify_signature(&self, public_key: &Ed25519PublicKey) -> bool {
        match self.signable_bytes() {
            Ok(bytes) => verify(&bytes, public_key, &self.signature),
            Err(_) => false,
        }
    }

    /// Whether `public_key` derives the header's sender address.
    pub fn is_sender_key(&self, public_key: &Ed25519PublicKey) -> bool {
        derive_address(public_key) == self.header.sender
    }

    /// Structural checks that need no keys.
    ///
    /// # Errors
    ///
    /// [`LedgerError::Validation`] when the id does not match the header, or
    /// an attachment is empty.
    pub fn validate_structure(&self) -> Result<(), LedgerError> {
        let expected = self.header.tx_id()?;
        if expected != self.tx_id {
            return Err(LedgerError::Validation(format!(
                "tx_id {} does not match header digest {}",
                self.tx_id, expected
            )));
        }
        if self.range_proof.is_empty() {
            return Err(LedgerError::Validation("range proof is empty".into()));
        }
        if self.encrypted_amount.key_id.is_empty() {
            return Err(LedgerError::Validation(
                "encrypted amount carries no key id".into(),
            ));
        }
        Ok(())
    }

    /// Canonical JSON, the stored form.
    pub fn to_canonical(&self) -> Result<CanonicalBytes, LedgerError> {
        Ok(CanonicalBytes::new(self)?)
    }

    /// Decode from JSON. Missing or mistyped fields are validation errors.
    pub fn from_json(bytes: &[u8]) -> Result<Self, LedgerError> {
        serde_json::from_slice(bytes)
            .map_err(|e| LedgerError::Validation(format!("malformed transaction: {e}")))
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use veil_crypto::{commit, ElGamalKeypair};
    use veil_zkp::{range_proof_system, RangeProofBackend};

    /// A signed transaction from `from` to `to` built with the emulated backend.
    pub(crate) fn signed(
        from: &Ed25519KeyPair,
        to: &Address,
        amount: u64,
        at: i64,
        family: Family,
    ) -> Transaction {
        let header = TransactionHeader {
            sender: from.address(),
            recipient: to.clone(),
            timestamp: Timestamp::from_epoch_secs(at).unwrap(),
            amount,
        };
        let (commitment, blinding) = commit(amount, None).unwrap();
        let proof = range_proof_system(RangeProofBackend::Emulated)
            .unwrap()
            .prove(&commitment, amount, &blinding, 0, 1_000_000)
            .unwrap();
        let auditor = ElGamalKeypair::generate();
        let encrypted = auditor.public_key().encrypt(amount).unwrap();
        UnsignedTransaction::new(header, family, commitment, proof, encrypted)
            .unwrap()
            .sign(from)
            .unwrap()
    }

    pub(crate) fn keypair(seed: u8) -> Ed25519KeyPair {
        Ed25519KeyPair::from_seed(&[seed; 32])
    }
}
