//! Messages exchanged between windows and the host.
//!
//! ```text
//! Window 1 ─┐
//! Window 2 ─┼─► mpsc::Sender<HostMessage> ─► Host dispatch loop
//! Window N ─┘
//!
//! Host ─► mpsc::UnboundedSender<WindowEvent> ─► one window's event pump
//! ```
//!
//! Payloads are MsgPack bytes; only ids and channel names travel as plain
//! Rust values.

use bytes::Bytes;
use tokio::sync::oneshot;

/// Window identifier. Assigned by the host from a counter starting at 1.
pub type WindowId = u64;

/// Request/response or fire-and-forget message from a window to the host.
#[derive(Debug)]
pub enum HostMessage {
    /// Request/response: the host answers on `reply`.
    Invoke {
        window: WindowId,
        request_id: u64,
        channel: String,
        payload: Bytes,
        reply: oneshot::Sender<InvokeOutcome>,
    },
    /// Fire-and-forget: nothing is sent back.
    Send {
        window: WindowId,
        channel: String,
        payload: Bytes,
    },
}

impl HostMessage {
    /// Channel name this message is routed by.
    pub fn channel(&self) -> &str {
        match self {
            HostMessage::Invoke { channel, .. } | HostMessage::Send { channel, .. } => channel,
        }
    }

    /// Originating window.
    pub fn window(&self) -> WindowId {
        match self {
            HostMessage::Invoke { window, .. } | HostMessage::Send { window, .. } => *window,
        }
    }
}

/// What the host sends back for an invoke.
#[derive(Debug, Clone)]
pub enum InvokeOutcome {
    /// MsgPack-encoded [`Envelope`](super::Envelope).
    Envelope(Bytes),
    /// Nothing is registered on the channel (transport-level rejection).
    NoHandler,
}

/// Event pushed from the host to a window.
#[derive(Debug, Clone)]
pub struct WindowEvent {
    pub channel: String,
    pub payload: Bytes,
}

impl WindowEvent {
    pub fn new(channel: impl Into<String>, payload: Bytes) -> Self {
        Self {
            channel: channel.into(),
            payload,
        }
    }
}
