pub use bitcoin::hashes::{Hash, HashEngine, hash_newtype, sha256d, sha256d::Hash as Sha256Hash};
use thiserror::Error;

use crate::{
    consensus::{Decodable, Encodable, EncodeDecodeError},
    io::{Error as IoError, Read, Write},
};

/// log2 of the scrypt cost parameter `N = 1024`.
pub const SCRYPT_LOG_N: u8 = 10;
/// scrypt block size parameter `r`.
pub const SCRYPT_R: u32 = 1;
/// scrypt parallelisation parameter `p`.
pub const SCRYPT_P: u32 = 1;

hash_newtype! {
    /// The proof-of-work digest of a block header.
    ///
    /// Produced by scrypt (N=1024, r=1, p=1) over the 80 header bytes, used
    /// both as password and salt. This is *not* the block identity; see
    /// [`BlockHash`](crate::blockdata::block::BlockHash) for that.
    pub struct PowHash(Sha256Hash);
}

impl Encodable for PowHash {
    fn consensus_encode<W: Write + ?Sized>(&self, writer: &mut W) -> Result<usize, IoError> {
        self.0.consensus_encode(writer)
    }
}

impl Decodable for PowHash {
    fn consensus_decode<R: Read + ?Sized>(reader: &mut R) -> Result<Self, EncodeDecodeError> {
        Ok(Self::from_byte_array(
            <<PowHash as Hash>::Bytes>::consensus_decode(reader)?,
        ))
    }
}

/// Errors raised by the scrypt proof-of-work function.
#[derive(Debug, Error)]
pub enum PowHashError {
    /// The scrypt cost parameters were rejected.
    #[error("invalid scrypt parameters: {0}")]
    Params(#[from] scrypt::errors::InvalidParams),
    /// The requested output length was rejected.
    #[error("invalid scrypt output length: {0}")]
    OutputLen(#[from] scrypt::errors::InvalidOutputLen),
}

/// Computes the scrypt proof-of-work hash of serialized header bytes.
pub fn scrypt_pow_hash(header: &[u8]) -> Result<PowHash, PowHashError> {
    let params = scrypt::Params::new(SCRYPT_LOG_N, SCRYPT_R, SCRYPT_P, PowHash::LEN)?;
    let mut out = [0u8; 32];
    scrypt::scrypt(header, header, &params, &mut out)?;
    Ok(PowHash::from_byte_array(out))
}
