//! Built-in channel catalog.
//!
//! Each catalog channel has one request type implementing
//! [`ChannelRequest`], which ties together:
//! - the wire name ([`Channel`])
//! - the typed arguments (the request struct itself)
//! - the typed response
//! - argument validation that runs before the host handler
//!
//! The bridge uses the same types to build calls, so both sides agree on
//! argument and response shapes at compile time.

mod channel;
mod requests;

pub use channel::{events, Channel};
pub use requests::*;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

/// A typed request on a catalog channel.
pub trait ChannelRequest: Serialize + DeserializeOwned + Send + 'static {
    /// Channel this request is routed on.
    const CHANNEL: Channel;

    /// What a successful invocation returns.
    type Response: Serialize + DeserializeOwned + Send + 'static;

    /// Reject malformed arguments before the handler runs.
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}
