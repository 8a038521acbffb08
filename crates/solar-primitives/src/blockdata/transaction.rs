//! Transactions as carried inside blocks.
//!
//! Only the parts of a transaction that block primitives rely on are modelled
//! here: the input and output lists, the transaction's own timestamp used by
//! proof-of-stake kernels, and the coinbase/coinstake predicates.

pub use bitcoin::{Amount, OutPoint, ScriptBuf, Sequence, TxIn, TxOut, Txid, Witness};

use crate::{
    consensus::{Decodable, Encodable, EncodeDecodeError, encode_size},
    hashes::Hash,
    io::{Error as IoError, Read, Write},
};

/// The first transaction version that carries a free-form comment.
pub const COMMENT_VERSION: i32 = 2;

/// A ledger transaction.
///
/// Wire layout: `version:i32 time:u32 input:vec output:vec lock_time:u32`,
/// followed by `comment:bytes` when `version >= 2`.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Transaction {
    /// Transaction format version.
    pub version: i32,
    /// The transaction's own timestamp.
    pub time: u32,
    /// Spent outputs.
    pub input: Vec<TxIn>,
    /// Created outputs.
    pub output: Vec<TxOut>,
    /// Earliest time or height at which the transaction may be included.
    pub lock_time: u32,
    /// Free-form comment, only serialized from [`COMMENT_VERSION`] on.
    pub comment: Vec<u8>,
}

impl Transaction {
    /// Whether this is a coinbase: a single input spending the null outpoint.
    pub fn is_coin_base(&self) -> bool {
        matches!(self.input.as_slice(), [only] if only.previous_output.is_null())
    }

    /// Whether this is a coinstake.
    ///
    /// A coinstake spends at least one real output and marks itself with an
    /// empty first output followed by at least one more output.
    pub fn is_coin_stake(&self) -> bool {
        let Some(first) = self.input.first() else {
            return false;
        };
        !first.previous_output.is_null()
            && self.output.len() >= 2
            && self.output.first().is_some_and(is_empty_output)
    }

    /// The outpoint spent by the first input, if there is one.
    pub fn first_prevout(&self) -> Option<OutPoint> {
        self.input.first().map(|txin| txin.previous_output)
    }

    /// Computes the transaction id: double SHA-256 of the serialization.
    pub fn compute_txid(&self) -> Txid {
        Txid::hash(&bitcoin::consensus::encode::serialize(self))
    }

    /// Serialized size in bytes.
    pub fn size(&self) -> usize {
        encode_size(self)
    }

    fn has_comment(&self) -> bool {
        self.version >= COMMENT_VERSION
    }
}

/// An output that carries neither value nor script.
fn is_empty_output(output: &TxOut) -> bool {
    output.value == Amount::ZERO && output.script_pubkey.is_empty()
}

impl Encodable for Transaction {
    fn consensus_encode<W: Write + ?Sized>(&self, writer: &mut W) -> Result<usize, IoError> {
        let mut len: usize = 0;
        len = len.saturating_add(self.version.consensus_encode(writer)?);
        len = len.saturating_add(self.time.consensus_encode(writer)?);
        len = len.saturating_add(self.input.consensus_encode(writer)?);
        len = len.saturating_add(self.output.consensus_encode(writer)?);
        len = len.saturating_add(self.lock_time.consensus_encode(writer)?);
        if self.has_comment() {
            len = len.saturating_add(self.comment.consensus_encode(writer)?);
        }
        Ok(len)
    }
}

impl Decodable for Transaction {
    fn consensus_decode_from_finite_reader<R: Read + ?Sized>(
        reader: &mut R,
    ) -> Result<Self, EncodeDecodeError> {
        let mut tx = Transaction {
            version: Decodable::consensus_decode_from_finite_reader(reader)?,
            time: Decodable::consensus_decode_from_finite_reader(reader)?,
            input: Decodable::consensus_decode_from_finite_reader(reader)?,
            output: Decodable::consensus_decode_from_finite_reader(reader)?,
            lock_time: Decodable::consensus_decode_from_finite_reader(reader)?,
            comment: Vec::new(),
        };
        if tx.has_comment() {
            tx.comment = Decodable::consensus_decode_from_finite_reader(reader)?;
        }
        Ok(tx)
    }
}


#[cfg(test)]
mod tests {
    use super::{test_util::*, *};

    #[test]
    fn test_coinbase_predicate() {
        let tx = coinbase(1_500_000_000, 50, ScriptBuf::new());
        assert!(tx.is_coin_base());
        assert!(!tx.is_coin_stake());
    }

    #[test]
    fn test_coinstake_predicate() {
        let tx = coinstake(1_500_000_000, outpoint(7, 1), ScriptBuf::new());
        assert!(tx.is_coin_stake());
        assert!(!tx.is_coin_base());
        assert_eq!(tx.first_prevout(), Some(outpoint(7, 1)));
    }

    #[test]
    fn test_coinstake_requires_empty_marker_output() {
        let mut tx = coinstake(1_500_000_000, outpoint(7, 1), ScriptBuf::new());
        tx.output[0].value = Amount::from_sat(1);
        assert!(!tx.is_coin_stake());

        let mut tx = coinstake(1_500_000_000, outpoint(7, 1), ScriptBuf::new());
        tx.output.truncate(1);
        assert!(!tx.is_coin_stake());

        let tx = coinstake(1_500_000_000, OutPoint::null(), ScriptBuf::new());
        assert!(!tx.is_coin_stake());
    }

    #[test]
    fn test_payment_is_neither() {
        let tx = payment(1, outpoint(3, 0));
        assert!(!tx.is_coin_base());
        assert!(!tx.is_coin_stake());
        assert!(!Transaction::default().is_coin_stake());
    }

    #[test]
    fn test_comment_only_encoded_from_version_two() -> Result<(), Box<dyn std::error::Error>> {
        let mut tx = payment(1, outpoint(3, 0));
        tx.comment = b"solar".to_vec();

        let v1 = bitcoin::consensus::encode::serialize(&tx);
        tx.version = COMMENT_VERSION;
        let v2 = bitcoin::consensus::encode::serialize(&tx);

        // Comment adds a one-byte length prefix and five bytes.
        assert_eq!(v2.len(), v1.len() + 6);
        assert!(v2.ends_with(b"\x05solar"));

        let decoded: Transaction = bitcoin::consensus::encode::deserialize(&v2)?;
        assert_eq!(decoded, tx);

        let mut legacy = tx.clone();
        legacy.version = 1;
        let decoded: Transaction = bitcoin::consensus::encode::deserialize(&v1)?;
        legacy.comment.clear();
        assert_eq!(decoded, legacy);
        Ok(())
    }

    #[test]
    fn test_txid_changes_with_content() {
        let a = payment(1, outpoint(3, 0));
        let mut b = a.clone();
        b.time = 2;
        assert_eq!(a.compute_txid(), a.clone().compute_txid());
        assert_ne!(a.compute_txid(), b.compute_txid());
        assert_eq!(a.size(), bitcoin::consensus::encode::serialize(&a).len());
    }
}
