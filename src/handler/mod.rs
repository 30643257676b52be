//! Handler module - host-side registration and dispatch.
//!
//! Provides:
//! - [`HandlerRegistry`] - maps channel names to handlers and listeners
//! - [`InvokeContext`] - routing metadata and host access for handlers
//! - [`HandlerOptions`] - `once` and error-hook registration options
//!
//! # Example
//!
//! ```
//! use hostbridge::handler::{HandlerOptions, HandlerRegistry};
//!
//! let mut registry = HandlerRegistry::new();
//!
//! // Request/response
//! registry.register_handler("ping", HandlerOptions::new(), |_: (), _ctx| async {
//!     Ok("pong")
//! });
//!
//! // Fire-and-forget
//! registry.register_listener("log:write", HandlerOptions::new(), |line: String, _ctx| async move {
//!     tracing::info!("{line}");
//!     Ok(())
//! });
//!
//! assert!(registry.has_handler("ping"));
//! assert!(registry.has_listener("log:write"));
//! ```

mod context;
mod registry;

pub use context::InvokeContext;
pub use registry::{
    BoxFuture, ErrorHook, Handler, HandlerOptions, HandlerRegistry, Invocation, Listener,
    ListenerCall, RequestHandler, TypedHandler, TypedListener,
};
