//! Invocation context passed to every handler.
//!
//! Carries routing metadata for the current message and, when the message
//! arrived through a running host, a handle back to that host so handlers
//! can reach the window and process tables or push events.
//!
//! # Example
//!
//! ```ignore
//! async fn focus(_: WindowFocus, ctx: InvokeContext) -> Result<()> {
//!     ctx.host()?.focus_window(ctx.window())?;
//!     Ok(())
//! }
//! ```

use serde::Serialize;

use crate::error::{BridgeError, Result};
use crate::host::Host;
use crate::protocol::WindowId;

/// Context passed to handlers and listeners.
///
/// `InvokeContext` is `Clone` and can be moved into spawned tasks (for
/// example a process watcher that keeps emitting after the reply).
#[derive(Clone)]
pub struct InvokeContext {
    /// Channel the message arrived on.
    channel: String,
    /// Request id (0 for fire-and-forget sends).
    request_id: u64,
    /// Window that sent the message.
    window: WindowId,
    /// Owning host, absent in standalone registry use.
    host: Option<Host>,
}

impl InvokeContext {
    /// Create a context without a host (registry used on its own, tests).
    pub fn new(channel: impl Into<String>, request_id: u64, window: WindowId) -> Self {
        Self {
            channel: channel.into(),
            request_id,
            window,
            host: None,
        }
    }

    /// Create a context bound to a running host.
    pub fn with_host(
        channel: impl Into<String>,
        request_id: u64,
        window: WindowId,
        host: Host,
    ) -> Self {
        Self {
            channel: channel.into(),
            request_id,
            window,
            host: Some(host),
        }
    }

    #[inline]
    pub fn channel(&self) -> &str {
        &self.channel
    }

    #[inline]
    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    /// Window that sent the message.
    #[inline]
    pub fn window(&self) -> WindowId {
        self.window
    }

    /// Owning host.
    ///
    /// Fails with [`BridgeError::ChannelClosed`] when the handler runs
    /// outside a host.
    pub fn host(&self) -> Result<&Host> {
        self.host.as_ref().ok_or(BridgeError::ChannelClosed)
    }

    /// Push an event to the calling window.
    ///
    /// Returns `false` when the window is gone or destroyed. Without a host
    /// this is a no-op returning `false`.
    pub fn emit<T: Serialize>(&self, channel: &str, payload: &T) -> Result<bool> {
        match &self.host {
            Some(host) => host.emit_to(self.window, channel, payload),
            None => Ok(false),
        }
    }
}

impl std::fmt::Debug for InvokeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvokeContext")
            .field("channel", &self.channel)
            .field("request_id", &self.request_id)
            .field("window", &self.window)
            .field("has_host", &self.host.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_creation() {
        let ctx = InvokeContext::new("fs:readFile", 42, 7);
        assert_eq!(ctx.channel(), "fs:readFile");
        assert_eq!(ctx.request_id(), 42);
        assert_eq!(ctx.window(), 7);
    }

    #[test]
    fn test_host_missing_without_host() {
        let ctx = InvokeContext::new("window:focus", 1, 1);
        assert!(matches!(ctx.host(), Err(BridgeError::ChannelClosed)));
    }

    #[test]
    fn test_emit_without_host_is_noop() {
        let ctx = InvokeContext::new("process:spawn", 1, 1);
        assert!(!ctx.emit("process:output", &"line").unwrap());
    }

    #[test]
    fn test_context_is_clone() {
        let ctx = InvokeContext::new("ping", 3, 2);
        let ctx2 = ctx.clone();
        assert_eq!(ctx.channel(), ctx2.channel());
        assert_eq!(ctx.request_id(), ctx2.request_id());
        assert_eq!(ctx.window(), ctx2.window());
    }
}
