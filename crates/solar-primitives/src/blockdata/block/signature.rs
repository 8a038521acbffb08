//! Block signatures.
//!
//! From [`HeaderVersion::LEGACY_V3`] on, a block carries an ECDSA signature
//! over its identity hash by the owner of one of its reward outputs: the
//! coinstake's first real output for proof-of-stake blocks, or any
//! pay-to-pubkey coinbase output for proof-of-work blocks.

use std::collections::HashMap;

use bitcoin::{
    Script, ScriptBuf,
    opcodes::all::OP_CHECKSIG,
    secp256k1::{self, Message, PublicKey, Secp256k1, SecretKey, ecdsa::Signature},
};
use thiserror::Error;
use tracing::{debug, warn};

use super::{Block, HeaderVersion, WireShape};
use crate::{blockdata::transaction::Amount, hashes::Hash};

const COMPRESSED_KEY_LEN: usize = 33;
const UNCOMPRESSED_KEY_LEN: usize = 65;

/// Errors returned by [`Block::sign`].
#[derive(Debug, Error)]
pub enum SignatureError {
    /// The block version predates block signatures.
    #[error("Block version {0} carries no signature")]
    UnsignedVersion(HeaderVersion),

    /// The block has no transactions to take a signer from.
    #[error("Cannot sign a block without transactions")]
    EmptyBlock,

    /// None of the eligible outputs belongs to a key in the key store.
    #[error("No eligible signing key in the key store")]
    NoEligibleKey,

    /// The coinstake's reward output does not pay to a public key.
    #[error("Coinstake output 1 is not pay-to-pubkey")]
    MissingStakeOutput,

    /// The output script carries bytes that are not a valid public key.
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(#[from] secp256k1::Error),
}

/// Source of secret keys for block signing.
pub trait KeyStore {
    /// The secret key for `public_key`, if the store holds it.
    fn secret_key(&self, public_key: &PublicKey) -> Option<SecretKey>;
}

/// A [`KeyStore`] backed by an in-memory map.
#[derive(Debug, Clone, Default)]
pub struct MemoryKeyStore {
    keys: HashMap<PublicKey, SecretKey>,
}

impl MemoryKeyStore {
    /// Creates an empty key store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `secret_key` and returns its public key.
    pub fn insert(&mut self, secret_key: SecretKey) -> PublicKey {
        let public_key = PublicKey::from_secret_key(&Secp256k1::signing_only(), &secret_key);
        self.keys.insert(public_key, secret_key);
        public_key
    }

    /// Number of keys held.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl KeyStore for MemoryKeyStore {
    fn secret_key(&self, public_key: &PublicKey) -> Option<SecretKey> {
        self.keys.get(public_key).copied()
    }
}

/// The raw key pushed by a `<key> OP_CHECKSIG` script.
fn pay_to_pubkey_bytes(script: &Script) -> Option<&[u8]> {
    match script.as_bytes() {
        [push, key @ .., checksig]
            if *checksig == OP_CHECKSIG.to_u8()
                && usize::from(*push) == key.len()
                && matches!(key.len(), COMPRESSED_KEY_LEN | UNCOMPRESSED_KEY_LEN) =>
        {
            Some(key)
        }
        _ => None,
    }
}

/// The public key paid by a pay-to-pubkey script, or `None` if the script
/// has another shape or the key does not parse.
pub fn pay_to_pubkey_key(script: &Script) -> Option<PublicKey> {
    pay_to_pubkey_bytes(script).and_then(|key| PublicKey::from_slice(key).ok())
}

/// A compressed pay-to-pubkey script for `public_key`.
pub fn pay_to_pubkey_script(public_key: &PublicKey) -> ScriptBuf {
    let key = public_key.serialize();
    let mut bytes = Vec::with_capacity(key.len().saturating_add(2));
    bytes.push(0x21);
    bytes.extend_from_slice(&key);
    bytes.push(OP_CHECKSIG.to_u8());
    ScriptBuf::from_bytes(bytes)
}

impl Block {
    fn signing_message(&self) -> Message {
        Message::from_digest(self.block_hash().to_byte_array())
    }

    /// Signs the block's identity hash with the key owning its reward output.
    ///
    /// Proof-of-stake blocks are signed by the key paid by the coinstake's
    /// second output. Proof-of-work blocks are signed by the first
    /// pay-to-pubkey coinbase output whose key is in `keys`. On error the
    /// existing signature is left untouched. Blocks whose version predates
    /// signatures are refused with [`SignatureError::UnsignedVersion`].
    ///
    /// `fees` is the fee total the reward outputs were built with; it does not
    /// enter the signature.
    pub fn sign(&mut self, keys: &impl KeyStore, fees: Amount) -> Result<(), SignatureError> {
        if self.header.version.wire_shape() == WireShape::PreSignature {
            return Err(SignatureError::UnsignedVersion(self.header.version));
        }
        let coinbase = self.transactions.first().ok_or(SignatureError::EmptyBlock)?;

        let secret_key = if let Some(coinstake) = self.coinstake() {
            let key = coinstake
                .output
                .get(1)
                .and_then(|output| pay_to_pubkey_bytes(&output.script_pubkey))
                .ok_or(SignatureError::MissingStakeOutput)?;
            let public_key = PublicKey::from_slice(key)?;
            keys.secret_key(&public_key)
                .ok_or(SignatureError::NoEligibleKey)?
        } else {
            coinbase
                .output
                .iter()
                .filter_map(|output| pay_to_pubkey_key(&output.script_pubkey))
                .find_map(|public_key| keys.secret_key(&public_key))
                .ok_or(SignatureError::NoEligibleKey)?
        };

        let signature = Secp256k1::signing_only().sign_ecdsa(&self.signing_message(), &secret_key);
        self.signature = signature.serialize_der().to_vec();

        debug!(
            block_hash = %self.block_hash(),
            proof_of_stake = self.is_proof_of_stake(),
            fees = fees.to_sat(),
            "Signed block"
        );
        Ok(())
    }

    /// Checks the block signature against the owner of the reward output
    /// selected by `is_proof_of_stake`.
    ///
    /// Blocks whose version predates signatures are valid only without one.
    /// Any failure, including a malformed signature or key, yields `false`.
    pub fn verify_signature(&self, is_proof_of_stake: bool) -> bool {
        if self.header.version.wire_shape() == WireShape::PreSignature {
            return self.signature.is_empty();
        }

        let mut signature = match Signature::from_der_lax(&self.signature) {
            Ok(signature) => signature,
            Err(e) => {
                debug!(block_hash = %self.block_hash(), "Malformed block signature: {e}");
                return false;
            }
        };
        signature.normalize_s();

        let secp = Secp256k1::verification_only();
        let message = self.signing_message();
        let verifies = |public_key: &PublicKey| {
            secp.verify_ecdsa(&message, &signature, public_key).is_ok()
        };

        let valid = if is_proof_of_stake {
            self.coinstake()
                .and_then(|coinstake| coinstake.output.get(1))
                .and_then(|output| pay_to_pubkey_key(&output.script_pubkey))
                .is_some_and(|public_key| verifies(&public_key))
        } else {
            self.transactions.first().is_some_and(|coinbase| {
                coinbase
                    .output
                    .iter()
                    .filter_map(|output| pay_to_pubkey_key(&output.script_pubkey))
                    .any(|public_key| verifies(&public_key))
            })
        };

        if !valid {
            warn!(
                block_hash = %self.block_hash(),
                proof_of_stake = is_proof_of_stake,
                "Block signature verification failed"
            );
        }
        valid
    }
}
