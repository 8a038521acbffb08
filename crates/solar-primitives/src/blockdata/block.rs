mod header;
mod merkle;
mod signature;
mod weight;

use std::cell::{Cell, RefCell};

pub use bitcoin::{BlockHash, TxMerkleNode};
pub use header::{BlockHeader, HeaderVersion, WireShape};
pub use merkle::compute_merkle_tree;
pub use signature::{
    KeyStore, MemoryKeyStore, SignatureError, pay_to_pubkey_key, pay_to_pubkey_script,
};
pub use weight::{WITNESS_SCALE_FACTOR, compute_weight, exceeds_max_weight};

use crate::{
    blockdata::transaction::{OutPoint, Transaction},
    consensus::{
        ContextDecodable, ContextEncodable, Decodable, Encodable, EncodeDecodeError, MAX_VEC_SIZE,
        SerializationContext, VarInt,
    },
    hashes::{PowHash, PowHashError},
    io::{Error as IoError, Read, Write},
};

/// Upper bound on transactions preallocated from an untrusted length prefix.
const MAX_PREALLOC_TRANSACTIONS: usize = 1024;

/// What follows the header on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BodyLayout {
    /// Nothing: a legacy header announcement.
    HeaderOnly,
    /// The transaction list.
    Transactions,
    /// The transaction list followed by the block signature.
    TransactionsAndSignature,
}

impl BodyLayout {
    fn select(shape: WireShape, header_only: bool) -> Self {
        match (shape, header_only) {
            (WireShape::PreSignature, true) => BodyLayout::HeaderOnly,
            (WireShape::PreSignature, false) | (WireShape::PostSignature, true) => {
                BodyLayout::Transactions
            }
            (WireShape::PostSignature, false) => BodyLayout::TransactionsAndSignature,
        }
    }
}

/// In-memory bookkeeping attached to a block.
///
/// None of this is part of the block's identity: it is never encoded, never
/// hashed and ignored by equality. It is interior-mutable so validation code
/// holding a shared reference can still record its findings.
#[derive(Clone, Debug, Default)]
struct Bookkeeping {
    merkle_tree: RefCell<Vec<TxMerkleNode>>,
    misbehaviour: Cell<i32>,
    checked: Cell<bool>,
}

impl Bookkeeping {
    fn clear(&self) {
        self.merkle_tree.borrow_mut().clear();
        self.misbehaviour.set(0);
        self.checked.set(false);
    }
}

/// Represents a block in the blockchain.
///
/// A `Block` contains:
/// - The header of the block, which includes metadata like timestamp and
///   previous block hash
/// - A list of transactions; index 0 is the coinbase and, in a
///   proof-of-stake block, index 1 is the coinstake
/// - The block signature, present from [`HeaderVersion::LEGACY_V3`] on
#[derive(Clone, Debug, Default)]
pub struct Block {
    /// The block header
    pub header: BlockHeader,
    /// List of transactions contained in the block
    pub transactions: Vec<Transaction>,
    /// Signature by the owner of the coinbase or coinstake output
    pub signature: Vec<u8>,
    bookkeeping: Bookkeeping,
}

impl Block {
    /// Creates a block from its parts.
    pub fn new(header: BlockHeader, transactions: Vec<Transaction>, signature: Vec<u8>) -> Self {
        Block {
            header,
            transactions,
            signature,
            bookkeeping: Bookkeeping::default(),
        }
    }

    /// Creates an unsigned block with the specified transactions
    pub fn with_transactions(header: BlockHeader, transactions: Vec<Transaction>) -> Self {
        Self::new(header, transactions, Vec::new())
    }

    /// Promotes a header to a block with an empty body.
    pub fn from_header(header: BlockHeader) -> Self {
        Self::new(header, Vec::new(), Vec::new())
    }

    /// Nulls the header and clears the body and all bookkeeping.
    pub fn reset(&mut self) {
        self.header.reset();
        self.transactions.clear();
        self.signature.clear();
        self.bookkeeping.clear();
    }

    /// Whether the block's header is null.
    pub fn is_null(&self) -> bool {
        self.header.is_null()
    }

    /// A copy of the six header fields.
    pub fn header_view(&self) -> BlockHeader {
        self.header
    }

    /// The block version.
    pub fn version(&self) -> HeaderVersion {
        self.header.version
    }

    /// Gets a reference to the block header
    pub fn header(&self) -> &BlockHeader {
        &self.header
    }

    /// The identity hash of the block.
    pub fn block_hash(&self) -> BlockHash {
        self.header.block_hash()
    }

    /// The proof-of-work hash of the block. Distinct from
    /// [`block_hash`](Self::block_hash).
    pub fn pow_hash(&self) -> Result<PowHash, PowHashError> {
        self.header.pow_hash()
    }

    /// Adds a transaction to the block
    pub fn add_transaction(&mut self, tx: Transaction) {
        self.transactions.push(tx);
    }

    /// Gets the number of transactions in the block
    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }

    /// Gets a reference to the transactions
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// The coinstake, if this is a proof-of-stake block.
    pub fn coinstake(&self) -> Option<&Transaction> {
        self.transactions.get(1).filter(|tx| tx.is_coin_stake())
    }

    /// Whether the block is proof-of-stake: its second transaction is a
    /// coinstake. Blocks with fewer than two transactions are proof-of-work.
    pub fn is_proof_of_stake(&self) -> bool {
        self.coinstake().is_some()
    }

    /// Whether the block is proof-of-work.
    pub fn is_proof_of_work(&self) -> bool {
        !self.is_proof_of_stake()
    }

    /// The stake kernel: the outpoint spent by the coinstake's first input
    /// and the coinstake's timestamp.
    ///
    /// Proof-of-work blocks yield the null outpoint paired with zero, which
    /// is not a kernel and must not be treated as one.
    pub fn proof_of_stake_kernel(&self) -> (OutPoint, u32) {
        self.coinstake()
            .and_then(|tx| tx.first_prevout().map(|prevout| (prevout, tx.time)))
            .unwrap_or((OutPoint::null(), 0))
    }

    /// Adds `score` to the block's misbehaviour counter and returns `flag`.
    ///
    /// Lets validation code penalise the sending peer and report the
    /// verdict in one expression: `return block.record_misbehaviour(100, false);`
    pub fn record_misbehaviour(&self, score: i32, flag: bool) -> bool {
        let counter = &self.bookkeeping.misbehaviour;
        counter.set(counter.get().saturating_add(score));
        flag
    }

    /// The accumulated misbehaviour score.
    pub fn misbehaviour(&self) -> i32 {
        self.bookkeeping.misbehaviour.get()
    }

    /// Records that the block passed context-free validation.
    pub fn mark_checked(&self) {
        self.bookkeeping.checked.set(true);
    }

    /// Whether [`mark_checked`](Self::mark_checked) was called since the last reset.
    pub fn is_checked(&self) -> bool {
        self.bookkeeping.checked.get()
    }

    fn encode_transactions<W: Write + ?Sized>(&self, writer: &mut W) -> Result<usize, IoError> {
        let mut len = VarInt(self.transactions.len() as u64).consensus_encode(writer)?;
        for tx in &self.transactions {
            len = len.saturating_add(tx.consensus_encode(writer)?);
        }
        Ok(len)
    }

    fn decode_transactions<R: Read + ?Sized>(
        reader: &mut R,
    ) -> Result<Vec<Transaction>, EncodeDecodeError> {
        let VarInt(count) = VarInt::consensus_decode_from_finite_reader(reader)?;

        let capacity = usize::try_from(count)
            .unwrap_or(usize::MAX)
            .min(MAX_PREALLOC_TRANSACTIONS);
        let mut transactions = Vec::with_capacity(capacity);
        for _ in 0..count {
            transactions.push(Transaction::consensus_decode_from_finite_reader(reader)?);
        }
        Ok(transactions)
    }
}

impl PartialEq for Block {
    fn eq(&self, other: &Self) -> bool {
        self.header == other.header
            && self.transactions == other.transactions
            && self.signature == other.signature
    }
}

impl Eq for Block {}

impl From<BlockHeader> for Block {
    fn from(header: BlockHeader) -> Self {
        Block::from_header(header)
    }
}

impl ContextEncodable for Block {
    fn consensus_encode_with<W: Write + ?Sized>(
        &self,
        writer: &mut W,
        ctx: &SerializationContext,
    ) -> Result<usize, IoError> {
        let mut len = self.header.consensus_encode(writer)?;

        match BodyLayout::select(self.header.version.wire_shape(), ctx.is_header_only()) {
            BodyLayout::HeaderOnly => {}
            BodyLayout::Transactions => {
                len = len.saturating_add(self.encode_transactions(writer)?);
            }
            BodyLayout::TransactionsAndSignature => {
                len = len.saturating_add(self.encode_transactions(writer)?);
                len = len.saturating_add(self.signature.consensus_encode(writer)?);
            }
        }

        Ok(len)
    }
}

/// Decoding reads at most [`MAX_VEC_SIZE`] bytes. Encoding has no such cap, so
/// a block larger than that encodes but is rejected when read back; consensus
/// limits block weight well below it.
impl ContextDecodable for Block {
    fn consensus_decode_with<R: Read + ?Sized>(
        reader: &mut R,
        ctx: &SerializationContext,
    ) -> Result<Self, EncodeDecodeError> {
        let mut reader = reader.take(MAX_VEC_SIZE as u64);
        let header = BlockHeader::consensus_decode_from_finite_reader(&mut reader)?;

        let mut block = Block::from_header(header);
        match BodyLayout::select(header.version.wire_shape(), ctx.is_header_only()) {
            BodyLayout::HeaderOnly => {}
            BodyLayout::Transactions => {
                block.transactions = Self::decode_transactions(&mut reader)?;
            }
            BodyLayout::TransactionsAndSignature => {
                block.transactions = Self::decode_transactions(&mut reader)?;
                block.signature = Decodable::consensus_decode_from_finite_reader(&mut reader)?;
            }
        }

        Ok(block)
    }
}

impl Encodable for Block {
    fn consensus_encode<W: Write + ?Sized>(&self, writer: &mut W) -> Result<usize, IoError> {
        self.consensus_encode_with(writer, &SerializationContext::default())
    }
}

impl Decodable for Block {
    fn consensus_decode_from_finite_reader<R: Read + ?Sized>(
        reader: &mut R,
    ) -> Result<Self, EncodeDecodeError> {
        Self::consensus_decode_with(reader, &SerializationContext::default())
    }
}

#[cfg(test)]
pub(crate) mod test_util {
    use super::*;
    use crate::{
        blockdata::transaction::{ScriptBuf, test_util::*},
        hashes::Hash,
    };

    pub(crate) fn header(version: HeaderVersion) -> BlockHeader {
        BlockHeader {
            version,
            prev_blockhash: BlockHash::from_byte_array([0x11; 32]),
            merkle_root: TxMerkleNode::from_byte_array([0x22; 32]),
            time: 1_600_000_000,
            bits: 0x1e0f_fff0,
            nonce: 42,
        }
    }

    pub(crate) fn pow_block(version: HeaderVersion) -> Block {
        Block::with_transactions(
            header(version),
            vec![
                coinbase(1_600_000_000, 50, ScriptBuf::new()),
                payment(1_600_000_000, outpoint(9, 0)),
            ],
        )
    }

    pub(crate) fn pos_block(version: HeaderVersion) -> Block {
        Block::with_transactions(
            header(version),
            vec![
                coinbase(1_600_000_000, 0, ScriptBuf::new()),
                coinstake(1_599_999_000, outpoint(7, 1), ScriptBuf::new()),
            ],
        )
    }
}
