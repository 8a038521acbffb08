//! Serialization contexts for encodings whose shape depends on the purpose of
//! the serialization.
//!
//! Most consensus types have a single wire layout and use the plain
//! [`Encodable`]/[`Decodable`] traits. Blocks and locators additionally vary
//! with two orthogonal flags carried by a [`SerializationContext`]:
//!
//! - *header-only mode*: a lightweight header announcement that omits the
//!   block body where the block version allows it;
//! - *identity-hash mode*: the bytes are being fed to a hash function rather
//!   than sent to a peer, so network-only fields such as the protocol version
//!   are left out.

use thiserror::Error;

use super::{EncodeDecodeError, PROTOCOL_VERSION};
use crate::io::{Cursor, Error as IoError, Read, Write};

/// Flags that select a serialization variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SerializationContext {
    header_only: bool,
    identity_hash: bool,
    protocol_version: i32,
}

impl SerializationContext {
    /// A full network serialization at the given protocol version.
    pub const fn network(protocol_version: i32) -> Self {
        Self {
            header_only: false,
            identity_hash: false,
            protocol_version,
        }
    }

    /// A serialization that feeds a hash function.
    pub const fn identity_hash() -> Self {
        Self {
            header_only: false,
            identity_hash: true,
            protocol_version: PROTOCOL_VERSION,
        }
    }

    /// Returns a copy of this context with header-only mode set as given.
    pub const fn with_header_only(mut self, header_only: bool) -> Self {
        self.header_only = header_only;
        self
    }

    /// Whether header-only mode is requested.
    pub const fn is_header_only(&self) -> bool {
        self.header_only
    }

    /// Whether the serialization is for identity hashing.
    pub const fn is_identity_hash(&self) -> bool {
        self.identity_hash
    }

    /// The protocol version carried by the context.
    pub const fn protocol_version(&self) -> i32 {
        self.protocol_version
    }
}

impl Default for SerializationContext {
    fn default() -> Self {
        Self::network(PROTOCOL_VERSION)
    }
}

/// Encoding whose layout depends on a [`SerializationContext`].
pub trait ContextEncodable {
    /// Encodes `self` under `ctx`, returning the number of bytes written.
    fn consensus_encode_with<W: Write + ?Sized>(
        &self,
        writer: &mut W,
        ctx: &SerializationContext,
    ) -> Result<usize, IoError>;
}

/// Decoding whose layout depends on a [`SerializationContext`].
pub trait ContextDecodable: Sized {
    /// Decodes a value under `ctx`.
    fn consensus_decode_with<R: Read + ?Sized>(
        reader: &mut R,
        ctx: &SerializationContext,
    ) -> Result<Self, EncodeDecodeError>;
}

/// Errors returned when decoding a complete byte buffer.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The bytes do not form a valid encoding.
    #[error("Consensus decoding failed: {0}")]
    Consensus(#[from] EncodeDecodeError),

    /// A value was decoded but bytes were left over.
    #[error("Trailing data: decoded {consumed} of {len} bytes")]
    TrailingData {
        /// Bytes consumed by the decoder.
        consumed: u64,
        /// Total length of the buffer.
        len: usize,
    },
}

/// Encodes `value` under `ctx` into a fresh buffer.
pub fn serialize_with<T: ContextEncodable + ?Sized>(
    value: &T,
    ctx: &SerializationContext,
) -> Vec<u8> {
    let mut buf = Vec::new();
    #[allow(clippy::expect_used, reason = "Writing to a Vec can't fail")]
    value
        .consensus_encode_with(&mut buf, ctx)
        .expect("Writing to a Vec can't fail");
    buf
}

/// Decodes a value under `ctx` from `data`, rejecting trailing bytes.
pub fn deserialize_with<T: ContextDecodable>(
    data: &[u8],
    ctx: &SerializationContext,
) -> Result<T, CodecError> {
    let mut cursor = Cursor::new(data);
    let value = T::consensus_decode_with(&mut cursor, ctx)?;

    let consumed = cursor.position();
    if usize::try_from(consumed).ok() != Some(data.len()) {
        return Err(CodecError::TrailingData {
            consumed,
            len: data.len(),
        });
    }

    Ok(value)
}
