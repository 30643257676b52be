//! Handler registry: the single source of truth for what answers a channel.
//!
//! Two independent tables:
//! - **handlers** answer `invoke` with an [`Envelope`]
//! - **listeners** receive `send` and answer nothing
//!
//! Each table holds at most one entry per channel. A second registration on
//! an occupied channel is logged and ignored; the first entry stays active.
//!
//! # Example
//!
//! ```
//! use hostbridge::handler::{HandlerOptions, HandlerRegistry};
//!
//! let mut registry = HandlerRegistry::new();
//! assert!(registry.register_handler("ping", HandlerOptions::new(), |_: (), _ctx| async {
//!     Ok("pong")
//! }));
//! assert!(!registry.register_handler("ping", HandlerOptions::new(), |_: (), _ctx| async {
//!     Ok("again")
//! }));
//! assert_eq!(registry.registered_handlers(), vec!["ping"]);
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::InvokeContext;
use crate::api::ChannelRequest;
use crate::codec::MsgPackCodec;
use crate::error::{BridgeError, Result};
use crate::protocol::Envelope;

/// Boxed future for handler results.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Called with `(channel, error)` when a handler or listener fails.
///
/// Returning `true` means the failure is also reported at the registry
/// boundary (`tracing::error!`); `false` means the hook consumed it. The
/// caller's envelope carries the error either way.
pub type ErrorHook = Arc<dyn Fn(&str, &BridgeError) -> bool + Send + Sync>;

/// Invoke-style handler over raw payload bytes.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, data: &[u8], ctx: InvokeContext) -> BoxFuture<'static, Result<Value>>;
}

/// Fire-and-forget listener over raw payload bytes.
pub trait Listener: Send + Sync + 'static {
    fn call(&self, data: &[u8], ctx: InvokeContext) -> BoxFuture<'static, Result<()>>;
}

fn invalid_arguments(e: BridgeError) -> BridgeError {
    BridgeError::Validation(format!("invalid arguments: {e}"))
}

/// Wrapper that deserializes the payload and serializes the result.
pub struct TypedHandler<F, T, R, Fut> {
    handler: F,
    _phantom: PhantomData<fn(T) -> (R, Fut)>,
}

impl<F, T, R, Fut> TypedHandler<F, T, R, Fut>
where
    F: Fn(T, InvokeContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R>> + Send + 'static,
{
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            _phantom: PhantomData,
        }
    }
}

impl<F, T, R, Fut> Handler for TypedHandler<F, T, R, Fut>
where
    F: Fn(T, InvokeContext) -> Fut + Send + Sync + 'static,
    T: DeserializeOwned + Send + 'static,
    R: Serialize + Send + 'static,
    Fut: Future<Output = Result<R>> + Send + 'static,
{
    fn call(&self, data: &[u8], ctx: InvokeContext) -> BoxFuture<'static, Result<Value>> {
        let parsed: T = match MsgPackCodec::decode(data) {
            Ok(v) => v,
            Err(e) => return Box::pin(async move { Err(invalid_arguments(e)) }),
        };

        let fut = (self.handler)(parsed, ctx);
        Box::pin(async move {
            let out = fut.await?;
            Ok(serde_json::to_value(out)?)
        })
    }
}

/// Catalog handler: decodes the request, runs its validation, then the handler.
pub struct RequestHandler<Req, F, Fut> {
    handler: F,
    _phantom: PhantomData<fn(Req) -> Fut>,
}

impl<Req, F, Fut> RequestHandler<Req, F, Fut>
where
    Req: ChannelRequest,
    F: Fn(Req, InvokeContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Req::Response>> + Send + 'static,
{
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            _phantom: PhantomData,
        }
    }
}

impl<Req, F, Fut> Handler for RequestHandler<Req, F, Fut>
where
    Req: ChannelRequest,
    F: Fn(Req, InvokeContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Req::Response>> + Send + 'static,
{
    fn call(&self, data: &[u8], ctx: InvokeContext) -> BoxFuture<'static, Result<Value>> {
        let request: Req = match MsgPackCodec::decode(data) {
            Ok(v) => v,
            Err(e) => return Box::pin(async move { Err(invalid_arguments(e)) }),
        };
        if let Err(e) = request.validate() {
            return Box::pin(async move { Err(e) });
        }

        let fut = (self.handler)(request, ctx);
        Box::pin(async move {
            let out = fut.await?;
            Ok(serde_json::to_value(out)?)
        })
    }
}

/// Wrapper that deserializes the payload for a listener.
pub struct TypedListener<F, T, Fut> {
    listener: F,
    _phantom: PhantomData<fn(T) -> Fut>,
}

impl<F, T, Fut> TypedListener<F, T, Fut>
where
    F: Fn(T, InvokeContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    pub fn new(listener: F) -> Self {
        Self {
            listener,
            _phantom: PhantomData,
        }
    }
}

impl<F, T, Fut> Listener for TypedListener<F, T, Fut>
where
    F: Fn(T, InvokeContext) -> Fut + Send + Sync + 'static,
    T: DeserializeOwned + Send + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    fn call(&self, data: &[u8], ctx: InvokeContext) -> BoxFuture<'static, Result<()>> {
        let parsed: T = match MsgPackCodec::decode(data) {
            Ok(v) => v,
            Err(e) => return Box::pin(async move { Err(invalid_arguments(e)) }),
        };
        Box::pin((self.listener)(parsed, ctx))
    }
}

/// Registration options.
#[derive(Clone, Default)]
pub struct HandlerOptions {
    once: bool,
    error_hook: Option<ErrorHook>,
}

impl HandlerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard the handler after its first invocation (handlers only).
    pub fn once(mut self) -> Self {
        self.once = true;
        self
    }

    /// Install an error hook, see [`ErrorHook`].
    pub fn on_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str, &BridgeError) -> bool + Send + Sync + 'static,
    {
        self.error_hook = Some(Arc::new(hook));
        self
    }

    pub fn is_once(&self) -> bool {
        self.once
    }
}

impl std::fmt::Debug for HandlerOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerOptions")
            .field("once", &self.once)
            .field("error_hook", &self.error_hook.is_some())
            .finish()
    }
}

/// Entry for a registered invoke handler.
struct HandlerEntry {
    handler: Arc<dyn Handler>,
    once: bool,
    error_hook: Option<ErrorHook>,
}

/// Entry for a registered listener.
struct ListenerEntry {
    listener: Arc<dyn Listener>,
    error_hook: Option<ErrorHook>,
}

/// Route a failure to the hook and, unless consumed, to the log.
fn report_failure(channel: &str, hook: Option<&ErrorHook>, error: &BridgeError) {
    let surface = hook.map_or(true, |h| h(channel, error));
    if surface {
        tracing::error!(channel, error = %error, "handler failed");
    } else {
        tracing::debug!(channel, error = %error, "handler failure consumed by error hook");
    }
}

/// Convert a failed join into the handler error it stands for.
fn join_failure(channel: &str, e: tokio::task::JoinError) -> BridgeError {
    if e.is_panic() {
        BridgeError::HandlerPanicked(channel.to_string())
    } else {
        BridgeError::handler(format!("handler for '{channel}' was cancelled"))
    }
}

/// A handler taken out of the registry for one invocation.
///
/// Holding an `Invocation` does not borrow the registry, so the registry
/// lock can be released before the handler is awaited.
pub struct Invocation {
    channel: String,
    handler: Arc<dyn Handler>,
    error_hook: Option<ErrorHook>,
}

impl Invocation {
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Run the handler and wrap the outcome in an envelope.
    ///
    /// The handler runs in its own task so a panic is contained and reported
    /// as a failed envelope like any other error.
    pub async fn run(self, payload: Bytes, ctx: InvokeContext) -> Envelope {
        let handler = self.handler;
        let outcome = tokio::spawn(async move { handler.call(&payload, ctx).await }).await;

        let result = match outcome {
            Ok(result) => result,
            Err(e) => Err(join_failure(&self.channel, e)),
        };

        match result {
            Ok(data) => Envelope::ok(data),
            Err(e) => {
                report_failure(&self.channel, self.error_hook.as_ref(), &e);
                Envelope::err(e.to_string())
            }
        }
    }
}

/// A listener looked up for one fire-and-forget message.
pub struct ListenerCall {
    channel: String,
    listener: Arc<dyn Listener>,
    error_hook: Option<ErrorHook>,
}

impl ListenerCall {
    /// Run the listener; failures go to the hook or the log, never back.
    pub async fn run(self, payload: Bytes, ctx: InvokeContext) {
        let listener = self.listener;
        let outcome = tokio::spawn(async move { listener.call(&payload, ctx).await }).await;

        let result = match outcome {
            Ok(result) => result,
            Err(e) => Err(join_failure(&self.channel, e)),
        };

        if let Err(e) = result {
            report_failure(&self.channel, self.error_hook.as_ref(), &e);
        }
    }
}

/// Registry mapping channel names to handlers and listeners.
#[derive(Default)]
pub struct HandlerRegistry {
    /// Invoke handlers by channel.
    handlers: HashMap<String, HandlerEntry>,
    /// Listeners by channel.
    listeners: HashMap<String, ListenerEntry>,
}

impl HandlerRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn insert_handler(&mut self, channel: &str, entry: HandlerEntry) -> bool {
        if self.handlers.contains_key(channel) {
            tracing::warn!(channel, "handler already registered; ignoring duplicate");
            return false;
        }
        tracing::debug!(channel, once = entry.once, "handler registered");
        self.handlers.insert(channel.to_string(), entry);
        true
    }

    /// Register an invoke handler.
    ///
    /// Returns `false` (and logs a warning) if `channel` already has one.
    pub fn register_handler<F, T, R, Fut>(
        &mut self,
        channel: &str,
        options: HandlerOptions,
        handler: F,
    ) -> bool
    where
        F: Fn(T, InvokeContext) -> Fut + Send + Sync + 'static,
        T: DeserializeOwned + Send + 'static,
        R: Serialize + Send + 'static,
        Fut: Future<Output = Result<R>> + Send + 'static,
    {
        self.insert_handler(
            channel,
            HandlerEntry {
                handler: Arc::new(TypedHandler::new(handler)),
                once: options.once,
                error_hook: options.error_hook,
            },
        )
    }

    /// Register the handler for a catalog request type.
    pub fn register_request<Req, F, Fut>(&mut self, options: HandlerOptions, handler: F) -> bool
    where
        Req: ChannelRequest,
        F: Fn(Req, InvokeContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Req::Response>> + Send + 'static,
    {
        self.insert_handler(
            Req::CHANNEL.as_str(),
            HandlerEntry {
                handler: Arc::new(RequestHandler::<Req, F, Fut>::new(handler)),
                once: options.once,
                error_hook: options.error_hook,
            },
        )
    }

    /// Register a fire-and-forget listener.
    ///
    /// Returns `false` (and logs a warning) if `channel` already has one.
    /// The `once` option does not apply to listeners.
    pub fn register_listener<F, T, Fut>(
        &mut self,
        channel: &str,
        options: HandlerOptions,
        listener: F,
    ) -> bool
    where
        F: Fn(T, InvokeContext) -> Fut + Send + Sync + 'static,
        T: DeserializeOwned + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        if self.listeners.contains_key(channel) {
            tracing::warn!(channel, "listener already registered; ignoring duplicate");
            return false;
        }
        tracing::debug!(channel, "listener registered");
        self.listeners.insert(
            channel.to_string(),
            ListenerEntry {
                listener: Arc::new(TypedListener::new(listener)),
                error_hook: options.error_hook,
            },
        );
        true
    }

    /// Remove the handler on `channel`. Idempotent.
    pub fn unregister_handler(&mut self, channel: &str) -> bool {
        let removed = self.handlers.remove(channel).is_some();
        if removed {
            tracing::debug!(channel, "handler unregistered");
        }
        removed
    }

    /// Remove the listener on `channel`. Idempotent.
    pub fn unregister_listener(&mut self, channel: &str) -> bool {
        let removed = self.listeners.remove(channel).is_some();
        if removed {
            tracing::debug!(channel, "listener unregistered");
        }
        removed
    }

    pub fn has_handler(&self, channel: &str) -> bool {
        self.handlers.contains_key(channel)
    }

    pub fn has_listener(&self, channel: &str) -> bool {
        self.listeners.contains_key(channel)
    }

    /// Channels with an invoke handler, sorted.
    pub fn registered_handlers(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Channels with a listener, sorted.
    pub fn registered_listeners(&self) -> Vec<String> {
        let mut names: Vec<String> = self.listeners.keys().cloned().collect();
        names.sort();
        names
    }

    /// Take the handler for one invocation.
    ///
    /// A `once` handler is removed here, before it runs, so a concurrent or
    /// later invocation sees no handler.
    pub fn take_invocation(&mut self, channel: &str) -> Option<Invocation> {
        let once = self.handlers.get(channel)?.once;
        let (handler, error_hook) = if once {
            let entry = self.handlers.remove(channel)?;
            tracing::debug!(channel, "once handler consumed");
            (entry.handler, entry.error_hook)
        } else {
            let entry = self.handlers.get(channel)?;
            (entry.handler.clone(), entry.error_hook.clone())
        };

        Some(Invocation {
            channel: channel.to_string(),
            handler,
            error_hook,
        })
    }

    /// Look up the listener for one message.
    pub fn listener_call(&self, channel: &str) -> Option<ListenerCall> {
        self.listeners.get(channel).map(|entry| ListenerCall {
            channel: channel.to_string(),
            listener: entry.listener.clone(),
            error_hook: entry.error_hook.clone(),
        })
    }

    /// Dispatch an invocation directly on this registry.
    ///
    /// Fails with [`BridgeError::NoHandler`] when nothing is registered.
    pub async fn dispatch(
        &mut self,
        channel: &str,
        payload: Bytes,
        ctx: InvokeContext,
    ) -> Result<Envelope> {
        let invocation = self
            .take_invocation(channel)
            .ok_or_else(|| BridgeError::NoHandler(channel.to_string()))?;

        Ok(invocation.run(payload, ctx).await)
    }

    /// Drop every handler and listener.
    pub fn clear(&mut self) {
        self.handlers.clear();
        self.listeners.clear();
    }
}
