//! Block weight.

use super::Block;
use crate::consensus::{Params, SerializationContext, serialize_with};

/// Ratio between the weight of non-witness and witness bytes.
pub const WITNESS_SCALE_FACTOR: u64 = 4;

/// Computes the consensus weight of `block`.
///
/// Weight is `stripped_size * (WITNESS_SCALE_FACTOR - 1) + total_size`, with
/// both sizes taken from the full network encoding. Transactions on this chain
/// carry no witness data, so the two sizes are equal and the weight is four
/// times the serialized size.
pub fn compute_weight(block: &Block) -> u64 {
    let ctx = SerializationContext::default();
    let stripped_size = serialize_with(block, &ctx).len() as u64;
    let total_size = stripped_size;

    stripped_size
        .saturating_mul(WITNESS_SCALE_FACTOR.saturating_sub(1))
        .saturating_add(total_size)
}

/// Whether `block` is heavier than the network allows.
pub fn exceeds_max_weight(block: &Block, params: impl AsRef<Params>) -> bool {
    compute_weight(block) > params.as_ref().max_block_weight
}

impl Block {
    /// The consensus weight of the block. See [`compute_weight`].
    pub fn weight(&self) -> u64 {
        compute_weight(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockdata::{
        block::{BlockHeader, HeaderVersion, test_util::*},
        transaction::{ScriptBuf, test_util::*},
    };

    #[test]
    fn test_weight_is_four_times_size() {
        let mut block = pos_block(HeaderVersion::CURRENT);
        block.signature = vec![0xab; 71];

        let size = serialize_with(&block, &SerializationContext::default()).len() as u64;
        assert_eq!(compute_weight(&block), size * 4);
        assert_eq!(block.weight(), compute_weight(&block));
    }

    #[test]
    fn test_weight_is_deterministic() {
        let block = pos_block(HeaderVersion::CURRENT);
        let first = compute_weight(&block);

        block.record_misbehaviour(1, false);
        block.build_merkle_tree();

        assert_eq!(compute_weight(&block), first);
        assert_eq!(compute_weight(&block.clone()), first);
    }

    #[test]
    fn test_empty_block_weight() {
        // Header plus a zero transaction count plus an empty signature.
        let block = Block::from_header(header(HeaderVersion::CURRENT));
        let size = BlockHeader::SIZE as u64 + 2;
        assert_eq!(compute_weight(&block), size * WITNESS_SCALE_FACTOR);
    }

    #[test]
    fn test_exceeds_max_weight() {
        let mut block = pow_block(HeaderVersion::CURRENT);
        assert!(!exceeds_max_weight(&block, Params::MAINNET));

        let big = ScriptBuf::from_bytes(vec![0x6a; 1_000_000]);
        block.add_transaction(coinbase(1, 0, big));
        assert!(block.weight() > 4_000_000);
        assert!(exceeds_max_weight(&block, Params::MAINNET));
        assert!(exceeds_max_weight(&block, &Params::REGTEST));
    }
}
