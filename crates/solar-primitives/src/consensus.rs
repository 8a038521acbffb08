mod context;
mod params;

pub use bitcoin::consensus::encode::{
    Decodable, Encodable, Error as EncodeDecodeError, MAX_VEC_SIZE, VarInt,
};
pub use context::{
    CodecError, ContextDecodable, ContextEncodable, SerializationContext, deserialize_with,
    serialize_with,
};
pub use params::{PROTOCOL_VERSION, Params};
pub use solar_primitives_derive::ConsensusCodec;

/// Length in bytes of the consensus encoding of `value`.
pub fn encode_size<T: Encodable + ?Sized>(value: &T) -> usize {
    bitcoin::consensus::encode::serialize(value).len()
}
