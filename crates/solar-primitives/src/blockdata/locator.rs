//! Block locators.
//!
//! A locator lists block hashes from the tip backwards, densely at first and
//! with exponentially growing gaps further back, ending at genesis. A peer
//! receiving it answers from the first hash it recognises, which is the most
//! recent common ancestor of the two chains.
//!
//! ## Wire format
//!
//! 1. `version` (4 bytes): protocol version, omitted when the locator is
//!    serialized for hashing.
//! 2. `hashes_count` (1-9 bytes, varint): number of hashes.
//! 3. `hashes` (32 bytes each): block hashes, highest height first.

use serde::{Deserialize, Serialize};

use crate::{
    blockdata::block::BlockHash,
    consensus::{
        ContextDecodable, ContextEncodable, Decodable, Encodable, EncodeDecodeError, MAX_VEC_SIZE,
        SerializationContext,
    },
    io::{Error as IoError, Read, Write},
};

/// Number of most recent blocks listed one by one before gaps start doubling.
const DENSE_STEPS: usize = 10;

/// A sparse list of ancestor hashes, most recent first. Empty means null.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockLocator {
    hashes: Vec<BlockHash>,
}

impl BlockLocator {
    /// Creates a locator from hashes ordered highest height first.
    pub fn new(hashes: Vec<BlockHash>) -> Self {
        Self { hashes }
    }

    /// Builds a locator for the chain ending at `tip_height`, resolving each
    /// height in [`locator_heights`] through `lookup`. Heights `lookup` cannot
    /// resolve are skipped.
    pub fn from_chain<F>(tip_height: u32, lookup: F) -> Self
    where
        F: FnMut(u32) -> Option<BlockHash>,
    {
        Self::new(
            locator_heights(tip_height)
                .into_iter()
                .filter_map(lookup)
                .collect(),
        )
    }

    /// Whether the locator carries no hashes.
    pub fn is_null(&self) -> bool {
        self.hashes.is_empty()
    }

    /// Clears all hashes.
    pub fn set_null(&mut self) {
        self.hashes.clear();
    }

    /// The hashes, highest height first.
    pub fn hashes(&self) -> &[BlockHash] {
        &self.hashes
    }

    /// Decodes a locator under `ctx`, also returning the protocol version
    /// prefix when the context carries one.
    pub fn decode_with<R: Read + ?Sized>(
        reader: &mut R,
        ctx: &SerializationContext,
    ) -> Result<(Self, Option<i32>), EncodeDecodeError> {
        let mut reader = reader.take(MAX_VEC_SIZE as u64);

        let version = if ctx.is_identity_hash() {
            None
        } else {
            Some(i32::consensus_decode_from_finite_reader(&mut reader)?)
        };
        let hashes = Vec::<BlockHash>::consensus_decode_from_finite_reader(&mut reader)?;

        Ok((Self { hashes }, version))
    }
}

impl From<Vec<BlockHash>> for BlockLocator {
    fn from(hashes: Vec<BlockHash>) -> Self {
        Self::new(hashes)
    }
}

/// Heights to include in a locator for a chain whose tip is at `tip_height`.
///
/// Entries walk back one block at a time until more than [`DENSE_STEPS`]
/// heights are listed, after which the step doubles with every entry. The
/// sequence always ends at genesis.
pub fn locator_heights(tip_height: u32) -> Vec<u32> {
    let mut heights = Vec::new();
    let mut height = tip_height;
    let mut step: u32 = 1;

    loop {
        heights.push(height);
        if height == 0 {
            break;
        }
        height = height.saturating_sub(step);
        if heights.len() > DENSE_STEPS {
            step = step.saturating_mul(2);
        }
    }

    heights
}

impl ContextEncodable for BlockLocator {
    fn consensus_encode_with<W: Write + ?Sized>(
        &self,
        writer: &mut W,
        ctx: &SerializationContext,
    ) -> Result<usize, IoError> {
        let mut len: usize = 0;
        if !ctx.is_identity_hash() {
            len = len.saturating_add(ctx.protocol_version().consensus_encode(writer)?);
        }
        len = len.saturating_add(self.hashes.consensus_encode(writer)?);
        Ok(len)
    }
}

impl ContextDecodable for BlockLocator {
    fn consensus_decode_with<R: Read + ?Sized>(
        reader: &mut R,
        ctx: &SerializationContext,
    ) -> Result<Self, EncodeDecodeError> {
        Self::decode_with(reader, ctx).map(|(locator, _version)| locator)
    }
}

impl Encodable for BlockLocator {
    fn consensus_encode<W: Write + ?Sized>(&self, writer: &mut W) -> Result<usize, IoError> {
        self.consensus_encode_with(writer, &SerializationContext::default())
    }
}

impl Decodable for BlockLocator {
    fn consensus_decode_from_finite_reader<R: Read + ?Sized>(
        reader: &mut R,
    ) -> Result<Self, EncodeDecodeError> {
        Self::consensus_decode_with(reader, &SerializationContext::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        consensus::{PROTOCOL_VERSION, deserialize_with, serialize_with},
        hashes::Hash,
        util::hex_to_blockhash,
    };

    const HASH1: &str = "d39f608a7775b537729884d4e6633bb2105e55a16a14d31b0000000000000000";
    const HASH2: &str = "5c3e6403d40837110a2e8afb602b1c01714bda7ce23bea0a0000000000000000";

    fn locator() -> Result<BlockLocator, hex::FromHexError> {
        Ok(BlockLocator::new(vec![
            hex_to_blockhash(HASH1)?,
            hex_to_blockhash(HASH2)?,
        ]))
    }

    #[test]
    fn test_null_locator() -> Result<(), Box<dyn std::error::Error>> {
        assert!(BlockLocator::default().is_null());
        assert!(BlockLocator::new(Vec::new()).is_null());

        let mut locator = locator()?;
        assert!(!locator.is_null());
        locator.set_null();
        assert!(locator.is_null());
        assert!(locator.hashes().is_empty());
        Ok(())
    }

    #[test]
    fn test_locator_encode_network() -> Result<(), Box<dyn std::error::Error>> {
        let hex_data = hex::decode(
            "7f110100\
            02\
            d39f608a7775b537729884d4e6633bb2\
            105e55a16a14d31b0000000000000000\
            5c3e6403d40837110a2e8afb602b1c01\
            714bda7ce23bea0a0000000000000000",
        )?;
        let encoded = serialize_with(&locator()?, &SerializationContext::network(70015));
        assert_eq!(hex_data, encoded);
        Ok(())
    }

    #[test]
    fn test_locator_encode_identity_hash() -> Result<(), Box<dyn std::error::Error>> {
        let hex_data = hex::decode(format!("02{HASH1}{HASH2}"))?;
        let encoded = serialize_with(&locator()?, &SerializationContext::identity_hash());
        assert_eq!(hex_data, encoded);
        Ok(())
    }

    #[test]
    fn test_locator_decode_reports_version() -> Result<(), Box<dyn std::error::Error>> {
        let hex_data = hex::decode(format!("7111010002{HASH1}{HASH2}"))?;

        let mut cursor = std::io::Cursor::new(&hex_data);
        let (decoded, version) =
            BlockLocator::decode_with(&mut cursor, &SerializationContext::default())?;
        assert_eq!(version, Some(70001));
        assert_eq!(decoded, locator()?);
        assert_eq!(
            *decoded.hashes().first().ok_or("Getting hash1")?,
            hex_to_blockhash(HASH1)?
        );

        let decoded: BlockLocator = deserialize_with(&hex_data, &SerializationContext::default())?;
        assert_eq!(decoded, locator()?);
        Ok(())
    }

    #[test]
    fn test_identity_hash_decode_has_no_version() -> Result<(), Box<dyn std::error::Error>> {
        let hex_data = hex::decode(format!("02{HASH1}{HASH2}"))?;

        let mut cursor = std::io::Cursor::new(&hex_data);
        let (decoded, version) =
            BlockLocator::decode_with(&mut cursor, &SerializationContext::identity_hash())?;
        assert_eq!(version, None);
        assert_eq!(decoded, locator()?);

        // Read as a network locator, the count and hash bytes are misaligned.
        let network: Result<BlockLocator, _> =
            deserialize_with(&hex_data, &SerializationContext::default());
        assert!(network.is_err());
        Ok(())
    }

    #[test]
    fn test_empty_locator_encoding() {
        let encoded = serialize_with(&BlockLocator::default(), &SerializationContext::default());
        let mut expected = PROTOCOL_VERSION.to_le_bytes().to_vec();
        expected.push(0x00);
        assert_eq!(encoded, expected);
    }

    #[test]
    fn test_locator_heights() {
        let mut expected: Vec<u32> = (9..=20).rev().collect();
        expected.extend([7, 3, 0]);
        assert_eq!(locator_heights(20), expected);

        assert_eq!(locator_heights(0), vec![0]);
        assert_eq!(locator_heights(3), vec![3, 2, 1, 0]);
    }

    #[test]
    fn test_locator_heights_are_logarithmic() {
        let heights = locator_heights(1_000_000);
        assert!(heights.len() < 40);
        assert_eq!(heights.first(), Some(&1_000_000));
        assert_eq!(heights.last(), Some(&0));
        assert!(heights.windows(2).all(|pair| pair[0] > pair[1]));
    }

    #[test]
    fn test_from_chain() {
        let hash_at = |height: u32| {
            let mut bytes = [0u8; 32];
            bytes[..4].copy_from_slice(&height.to_le_bytes());
            BlockHash::from_byte_array(bytes)
        };

        let locator = BlockLocator::from_chain(20, |height| Some(hash_at(height)));
        let expected: Vec<BlockHash> = locator_heights(20).into_iter().map(hash_at).collect();
        assert_eq!(locator.hashes(), expected.as_slice());
        assert_eq!(locator.hashes().last(), Some(&hash_at(0)));

        // Unknown heights are skipped.
        let sparse = BlockLocator::from_chain(20, |height| (height % 2 == 0).then(|| hash_at(height)));
        assert!(sparse.hashes().iter().all(|hash| hash.to_byte_array()[0] % 2 == 0));
        assert_eq!(sparse.hashes().len(), 7);
    }

    #[test]
    fn test_serde_round_trip() -> Result<(), Box<dyn std::error::Error>> {
        let locator = locator()?;
        let json = serde_json::to_string(&locator)?;
        let decoded: BlockLocator = serde_json::from_str(&json)?;
        assert_eq!(decoded, locator);
        Ok(())
    }
}
