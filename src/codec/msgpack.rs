//! MsgPack codec using `rmp-serde`.
//!
//! Structs are always written with `to_vec_named` so they travel as maps
//! keyed by field name. Envelopes rely on this: `data` and `error` are
//! optional keys, which a positional array encoding cannot express.

use bytes::Bytes;

use crate::error::Result;

/// MessagePack codec for channel payloads.
pub struct MsgPackCodec;

impl MsgPackCodec {
    /// Encode a value to MsgPack bytes (struct-as-map).
    #[inline]
    pub fn encode<T: serde::Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(value)?)
    }

    /// Encode a value straight into a shareable [`Bytes`] buffer.
    #[inline]
    pub fn encode_bytes<T: serde::Serialize + ?Sized>(value: &T) -> Result<Bytes> {
        Self::encode(value).map(Bytes::from)
    }

    /// Decode MsgPack bytes to a value.
    #[inline]
    pub fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}
