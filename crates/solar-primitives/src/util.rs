use hex::FromHex;

use crate::{blockdata::block::BlockHash, hashes::Hash};

/// Convert a hex string in internal byte order to a 32-byte hash type.
pub fn hex_to_hash<T>(hex: &str) -> Result<T, hex::FromHexError>
where
    T: Hash<Bytes = [u8; 32]>,
{
    let bytes = <[u8; 32]>::from_hex(hex)?;
    Ok(T::from_byte_array(bytes))
}

/// Convert a hex string in internal byte order to a BlockHash.
///
/// Note that the display form of a block hash is byte-reversed, so the
/// string accepted here is not what block explorers print.
pub fn hex_to_blockhash(hex: &str) -> Result<BlockHash, hex::FromHexError> {
    hex_to_hash(hex)
}
