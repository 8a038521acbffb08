//! The fixed-size block header.
//!
//! The header is the consensus-critical 80-byte prefix of every block. Its
//! double SHA-256 is the block's identity (the value peers use to reference
//! the block and that the next header links to), while its scrypt digest is
//! the proof-of-work hash. The two are computed over identical bytes and must
//! never be used interchangeably.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::{BlockHash, TxMerkleNode};
use crate::{
    chain::BlockIndex,
    consensus::{ConsensusCodec, Decodable, Encodable, EncodeDecodeError},
    hashes::{Hash, PowHash, PowHashError, scrypt_pow_hash},
    io::{Error as IoError, Read, Write},
};

/// The block version field.
///
/// Only three values carry meaning for the encoding: [`HeaderVersion::LEGACY_V2`],
/// the transitional [`HeaderVersion::LEGACY_V3`] and [`HeaderVersion::CURRENT`].
/// Any other value is carried through unchanged and classified by
/// [`HeaderVersion::wire_shape`].
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct HeaderVersion(i32);

impl HeaderVersion {
    /// Pre-signature protocol.
    pub const LEGACY_V2: Self = Self(2);
    /// Transitional protocol; the first version with block signatures.
    pub const LEGACY_V3: Self = Self(3);
    /// Current protocol.
    pub const CURRENT: Self = Self(4);

    /// Wraps a raw version number.
    pub const fn from_consensus(version: i32) -> Self {
        Self(version)
    }

    /// The raw version number.
    pub const fn to_consensus(self) -> i32 {
        self.0
    }

    /// The body layout family this version belongs to.
    pub const fn wire_shape(self) -> WireShape {
        if self.0 >= Self::LEGACY_V3.0 {
            WireShape::PostSignature
        } else {
            WireShape::PreSignature
        }
    }
}

impl fmt::Display for HeaderVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<i32> for HeaderVersion {
    fn from(version: i32) -> Self {
        Self(version)
    }
}

impl Encodable for HeaderVersion {
    fn consensus_encode<W: Write + ?Sized>(&self, writer: &mut W) -> Result<usize, IoError> {
        self.0.consensus_encode(writer)
    }
}

impl Decodable for HeaderVersion {
    fn consensus_decode<R: Read + ?Sized>(reader: &mut R) -> Result<Self, EncodeDecodeError> {
        Ok(Self(Decodable::consensus_decode(reader)?))
    }
}

/// The closed set of block body layouts, selected by header version.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WireShape {
    /// Versions below 3: no block signature exists on the wire.
    PreSignature,
    /// Versions 3 and above: full blocks carry a trailing block signature.
    PostSignature,
}

/// A block header.
///
/// Wire layout (80 bytes, little-endian integers):
/// `version:i32 prev_blockhash:u256 merkle_root:u256 time:u32 bits:u32 nonce:u32`.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ConsensusCodec,
)]
pub struct BlockHeader {
    /// Block version; selects the body layout of the enclosing block.
    pub version: HeaderVersion,
    /// Identity hash of the parent block; all zeros for the genesis block.
    pub prev_blockhash: BlockHash,
    /// Merkle root committing to the ordered transaction list.
    pub merkle_root: TxMerkleNode,
    /// Unix timestamp claimed by the block producer.
    pub time: u32,
    /// Compact encoding of the proof-of-work target. Zero marks a null header.
    pub bits: u32,
    /// Value varied by miners while searching for proof of work.
    pub nonce: u32,
}

impl BlockHeader {
    /// The serialized size of a header in bytes.
    pub const SIZE: usize = 4 + 32 + 32 + 4 + 4 + 4; // 80

    /// Creates a null header.
    pub fn new() -> Self {
        Self {
            version: HeaderVersion::default(),
            prev_blockhash: BlockHash::all_zeros(),
            merkle_root: TxMerkleNode::all_zeros(),
            time: 0,
            bits: 0,
            nonce: 0,
        }
    }

    /// Sets every field to zero. Afterwards [`is_null`](Self::is_null) holds.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// A header is null iff its difficulty bits are zero.
    pub fn is_null(&self) -> bool {
        self.bits == 0
    }

    /// The header's serialized 80 bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        bitcoin::consensus::encode::serialize(self)
    }

    /// Computes the identity hash: double SHA-256 over the serialized header.
    pub fn block_hash(&self) -> BlockHash {
        let mut engine = BlockHash::engine();
        #[allow(clippy::expect_used, reason = "Writing to a hash engine can't fail")]
        self.consensus_encode(&mut engine)
            .expect("Writing to a hash engine can't fail");
        BlockHash::from_engine(engine)
    }

    /// Computes the scrypt proof-of-work hash over the serialized header.
    pub fn pow_hash(&self) -> Result<PowHash, PowHashError> {
        scrypt_pow_hash(&self.to_bytes())
    }

    /// The stake-modifier entropy bit: the lowest bit of the identity hash
    /// read as a little-endian integer.
    ///
    /// `_reference_time` does not take part in the computation. It is kept
    /// so that callers written against the historical signature keep
    /// compiling; pass it to [`trace_stake_entropy_bit`](Self::trace_stake_entropy_bit)
    /// if it should appear in diagnostics.
    pub fn stake_entropy_bit(&self, _reference_time: u32) -> u32 {
        let [low, ..] = self.block_hash().to_byte_array();
        u32::from(low & 1)
    }

    /// Emits a trace event describing the entropy bit of this header.
    pub fn trace_stake_entropy_bit(&self, reference_time: u32) {
        trace!(
            time = reference_time,
            block = %self.block_hash(),
            entropy_bit = self.stake_entropy_bit(reference_time),
            "Stake entropy bit"
        );
    }

    /// The header time widened to a signed 64-bit integer.
    pub fn block_time(&self) -> i64 {
        i64::from(self.time)
    }

    /// Moves the header time forward so that it satisfies the chain's timing
    /// constraints relative to `prev`, using the current wall-clock time.
    ///
    /// Returns the number of seconds the time moved forward.
    pub fn update_time(&mut self, prev: &impl BlockIndex) -> i64 {
        self.update_time_at(prev, chrono::Utc::now().timestamp())
    }

    /// Like [`update_time`](Self::update_time) with an explicit `now`.
    ///
    /// The new time is the largest of the current header time, one second
    /// past the parent's median time past, the parent's own time, and `now`.
    /// Time never moves backwards.
    pub fn update_time_at(&mut self, prev: &impl BlockIndex, now: i64) -> i64 {
        let old = self.block_time();
        let new = old
            .max(prev.median_time_past().saturating_add(1))
            .max(prev.block_time())
            .max(now);

        self.time = u32::try_from(new).unwrap_or(u32::MAX);

        let delta = self.block_time().saturating_sub(old);
        if delta > 0 {
            debug!(old, new = self.time, delta, "Updated block time");
        }
        delta
    }
}

impl Default for BlockHeader {
    fn default() -> Self {
        Self::new()
    }
}
