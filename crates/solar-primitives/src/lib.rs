//! Block primitives for a hybrid proof-of-work/proof-of-stake ledger.
//!
//! This library provides the consensus-critical data model of the chain: block
//! headers and their two identities (the double SHA-256 identity hash and the
//! scrypt proof-of-work hash), full blocks with version-gated signature
//! encoding and proof-of-stake classification, block locators for
//! common-ancestor negotiation, and the block weight metric.

#![cfg_attr(test, allow(clippy::arithmetic_side_effects))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::cast_sign_loss))]
#![cfg_attr(test, allow(clippy::indexing_slicing))]
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::cast_possible_truncation))]

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Block data structures: headers, blocks, transactions and locators.
pub mod blockdata;
/// Chain-index collaborator interface.
pub mod chain;
/// Consensus encoding and decoding functionality.
pub mod consensus;
/// Hash functions and types used by the chain.
pub mod hashes;
/// I/O utilities for reading and writing data.
pub mod io;
/// Network types and constants.
pub mod network;
/// Various utility functions and types.
pub mod util;

pub use network::Network;
