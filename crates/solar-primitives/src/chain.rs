//! The slice of the chain index that block primitives depend on.
//!
//! The chain index itself (block tree, heights, persistence) lives outside
//! this crate. Header time adjustment only needs a couple of timestamps from
//! the parent entry, which implementors expose through [`BlockIndex`].

/// A chain-index entry for a previously accepted block.
pub trait BlockIndex {
    /// The recorded timestamp of the block.
    fn block_time(&self) -> i64;

    /// The median timestamp of the block and its recent ancestors.
    fn median_time_past(&self) -> i64;
}
