//! Codec module - payload serialization across the host/window channel.
//!
//! Every argument list, envelope and event payload crosses the channel as
//! MessagePack bytes, so the two sides never share Rust values directly.
//!
//! # Example
//!
//! ```
//! use hostbridge::codec::MsgPackCodec;
//!
//! let encoded = MsgPackCodec::encode(&"hello").unwrap();
//! let decoded: String = MsgPackCodec::decode(&encoded).unwrap();
//! assert_eq!(decoded, "hello");
//! ```

mod msgpack;

pub use msgpack::MsgPackCodec;
