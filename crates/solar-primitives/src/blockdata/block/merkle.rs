//! Vector-form merkle trees over a block's transaction ids.
//!
//! The tree is stored level by level, leaves first, root last. An odd node at
//! the end of a level is paired with itself.

use super::{Block, TxMerkleNode};
use crate::hashes::{Hash, HashEngine};

/// Builds the full tree over `leaves`. Empty input yields an empty tree.
pub fn compute_merkle_tree(leaves: Vec<TxMerkleNode>) -> Vec<TxMerkleNode> {
    let mut tree = leaves;
    let mut level_start: usize = 0;
    let mut level_len = tree.len();

    while level_len > 1 {
        let level: Vec<TxMerkleNode> = tree
            .get(level_start..level_start.saturating_add(level_len))
            .unwrap_or_default()
            .chunks(2)
            .filter_map(|pair| Some(combine(pair.first()?, pair.last()?)))
            .collect();

        level_start = level_start.saturating_add(level_len);
        level_len = level.len();
        tree.extend(level);
    }

    tree
}

fn combine(left: &TxMerkleNode, right: &TxMerkleNode) -> TxMerkleNode {
    let mut engine = TxMerkleNode::engine();
    engine.input(left.as_byte_array());
    engine.input(right.as_byte_array());
    TxMerkleNode::from_engine(engine)
}

impl Block {
    /// Rebuilds the cached merkle tree from the current transactions and
    /// returns its root, or all zeros for a block without transactions.
    pub fn build_merkle_tree(&self) -> TxMerkleNode {
        let leaves = self
            .transactions
            .iter()
            .map(|tx| TxMerkleNode::from_raw_hash(tx.compute_txid().to_raw_hash()))
            .collect();
        let tree = compute_merkle_tree(leaves);
        let root = tree.last().copied().unwrap_or_else(TxMerkleNode::all_zeros);

        *self.bookkeeping.merkle_tree.borrow_mut() = tree;
        root
    }

    /// The tree cached by the last [`build_merkle_tree`](Self::build_merkle_tree).
    pub fn merkle_tree(&self) -> Vec<TxMerkleNode> {
        self.bookkeeping.merkle_tree.borrow().clone()
    }

    /// Whether the header commits to the block's transactions.
    pub fn check_merkle_root(&self) -> bool {
        self.build_merkle_tree() == self.header.merkle_root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockdata::{
        block::{HeaderVersion, test_util::*},
        transaction::{ScriptBuf, test_util::*},
    };

    fn node(byte: u8) -> TxMerkleNode {
        TxMerkleNode::from_byte_array([byte; 32])
    }

    #[test]
    fn test_single_leaf_is_the_root() {
        assert_eq!(compute_merkle_tree(vec![node(1)]), vec![node(1)]);
        assert!(compute_merkle_tree(Vec::new()).is_empty());
    }

    #[test]
    fn test_odd_level_duplicates_last_node() {
        let tree = compute_merkle_tree(vec![node(1), node(2), node(3)]);

        let left = combine(&node(1), &node(2));
        let right = combine(&node(3), &node(3));
        assert_eq!(tree, vec![node(1), node(2), node(3), left, right, combine(&left, &right)]);
    }

    #[test]
    fn test_single_transaction_root_is_its_txid() {
        let tx = coinbase(1, 50, ScriptBuf::new());
        let mut block = Block::with_transactions(header(HeaderVersion::CURRENT), vec![tx.clone()]);

        let root = block.build_merkle_tree();
        assert_eq!(root.to_byte_array(), tx.compute_txid().to_byte_array());

        block.header.merkle_root = root;
        assert!(block.check_merkle_root());
    }

    #[test]
    fn test_check_merkle_root_detects_tampering() {
        let mut block = pos_block(HeaderVersion::CURRENT);
        block.header.merkle_root = block.build_merkle_tree();
        assert!(block.check_merkle_root());
        assert_eq!(block.merkle_tree().len(), 3);

        block.transactions.swap(0, 1);
        assert!(!block.check_merkle_root());
    }

    #[test]
    fn test_empty_block_root_is_zero() {
        let block = Block::default();
        assert_eq!(block.build_merkle_tree(), TxMerkleNode::all_zeros());
        assert!(block.merkle_tree().is_empty());
    }
}
