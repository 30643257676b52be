//! Host builder and runtime loop.
//!
//! The [`HostBuilder`] provides a fluent API for registering handlers and
//! building the host. The [`Host`] manages the lifecycle:
//! 1. Install built-in services (if requested) after user handlers
//! 2. Spawn the dispatch loop on the inbound message queue
//! 3. Open windows, each getting a [`Bridge`] onto the queue
//! 4. Dispatch each message to its handler or listener in its own task
//!
//! # Example
//!
//! ```
//! use hostbridge::Host;
//!
//! #[tokio::main]
//! async fn main() -> hostbridge::Result<()> {
//!     let host = Host::builder()
//!         .handle("ping", |_: (), _ctx| async { Ok("pong") })
//!         .with_builtin_services()
//!         .start();
//!
//!     let bridge = host.open_window("main");
//!     let pong: String = bridge.invoke("ping", &()).await?;
//!     assert_eq!(pong, "pong");
//!
//!     host.shutdown();
//!     host.wait_for_shutdown().await;
//!     Ok(())
//! }
//! ```

mod processes;
mod windows;

pub use processes::ProcessTable;
pub use windows::{WindowState, WindowTable};

use std::future::Future;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch, Semaphore};

use crate::api::{events, Bounds, ChannelRequest, ProcessInfo, WindowInfo};
use crate::bridge::Bridge;
use crate::codec::MsgPackCodec;
use crate::config::HostConfig;
use crate::error::{BridgeError, Result};
use crate::handler::{HandlerOptions, HandlerRegistry, InvokeContext};
use crate::platform::{HeadlessPlatform, Platform};
use crate::protocol::{Envelope, HostMessage, InvokeOutcome, WindowEvent, WindowId};

/// Builder for configuring and creating a [`Host`].
pub struct HostBuilder {
    registry: HandlerRegistry,
    config: HostConfig,
    platform: Option<Arc<dyn Platform>>,
    builtin_services: bool,
}

impl HostBuilder {
    pub fn new() -> Self {
        Self {
            registry: HandlerRegistry::new(),
            config: HostConfig::default(),
            platform: None,
            builtin_services: false,
        }
    }

    /// Register an invoke handler.
    ///
    /// The handler receives the deserialized arguments and an
    /// [`InvokeContext`]; its `Ok` value becomes the envelope's `data`.
    pub fn handle<F, T, R, Fut>(self, channel: &str, handler: F) -> Self
    where
        F: Fn(T, InvokeContext) -> Fut + Send + Sync + 'static,
        T: DeserializeOwned + Send + 'static,
        R: Serialize + Send + 'static,
        Fut: Future<Output = Result<R>> + Send + 'static,
    {
        self.handle_with(channel, HandlerOptions::new(), handler)
    }

    /// Register an invoke handler that is discarded after its first call.
    pub fn handle_once<F, T, R, Fut>(self, channel: &str, handler: F) -> Self
    where
        F: Fn(T, InvokeContext) -> Fut + Send + Sync + 'static,
        T: DeserializeOwned + Send + 'static,
        R: Serialize + Send + 'static,
        Fut: Future<Output = Result<R>> + Send + 'static,
    {
        self.handle_with(channel, HandlerOptions::new().once(), handler)
    }

    /// Register an invoke handler with explicit options.
    pub fn handle_with<F, T, R, Fut>(mut self, channel: &str, options: HandlerOptions, handler: F) -> Self
    where
        F: Fn(T, InvokeContext) -> Fut + Send + Sync + 'static,
        T: DeserializeOwned + Send + 'static,
        R: Serialize + Send + 'static,
        Fut: Future<Output = Result<R>> + Send + 'static,
    {
        self.registry.register_handler(channel, options, handler);
        self
    }

    /// Register the handler for a catalog request, replacing the built-in.
    pub fn handle_request<Req, F, Fut>(mut self, handler: F) -> Self
    where
        Req: ChannelRequest,
        F: Fn(Req, InvokeContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Req::Response>> + Send + 'static,
    {
        self.registry
            .register_request::<Req, F, Fut>(HandlerOptions::new(), handler);
        self
    }

    /// Register a fire-and-forget listener.
    pub fn listen<F, T, Fut>(mut self, channel: &str, listener: F) -> Self
    where
        F: Fn(T, InvokeContext) -> Fut + Send + Sync + 'static,
        T: DeserializeOwned + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.registry
            .register_listener(channel, HandlerOptions::new(), listener);
        self
    }

    /// Use `platform` for dialogs, clipboard, shell, notifications and menus.
    ///
    /// Default: [`HeadlessPlatform`].
    pub fn platform(mut self, platform: Arc<dyn Platform>) -> Self {
        self.platform = Some(platform);
        self
    }

    pub fn config(mut self, config: HostConfig) -> Self {
        self.config = config;
        self
    }

    /// Install handlers for every catalog channel at start.
    ///
    /// Channels the application already handles keep their handler.
    pub fn with_builtin_services(mut self) -> Self {
        self.builtin_services = true;
        self
    }

    /// Set the maximum number of concurrently running handlers.
    ///
    /// When the limit is reached, invokes are answered with a failed
    /// envelope and sends are dropped with a warning.
    /// Default: 256
    pub fn max_concurrent_handlers(mut self, limit: usize) -> Self {
        self.config.max_concurrent_handlers = limit;
        self
    }

    /// Set the inbound queue capacity shared by all windows.
    ///
    /// Default: 1024
    pub fn inbound_capacity(mut self, capacity: usize) -> Self {
        self.config.inbound_capacity = capacity;
        self
    }

    /// Build the host and spawn its dispatch loop.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn start(mut self) -> Host {
        if self.builtin_services {
            crate::services::install(&mut self.registry);
        }
        let platform = self
            .platform
            .unwrap_or_else(|| Arc::new(HeadlessPlatform::new()));
        Host::start(self.registry, self.config, platform)
    }
}

impl Default for HostBuilder {
    fn default() -> Self {
        Self::new()
    }
}

struct HostInner {
    registry: RwLock<HandlerRegistry>,
    windows: Mutex<WindowTable>,
    processes: Mutex<ProcessTable>,
    config: HostConfig,
    platform: Arc<dyn Platform>,
    /// Queue windows send into; cloned into every bridge.
    inbound: mpsc::Sender<HostMessage>,
    handler_slots: Arc<Semaphore>,
    shutdown_tx: Mutex<Option<oneshot::Sender<()>>>,
    stopped: watch::Receiver<bool>,
}

/// A running host. Cheap to clone; all clones share one state.
#[derive(Clone)]
pub struct Host {
    inner: Arc<HostInner>,
}

impl Host {
    pub fn builder() -> HostBuilder {
        HostBuilder::new()
    }

    fn start(registry: HandlerRegistry, config: HostConfig, platform: Arc<dyn Platform>) -> Self {
        let (inbound, inbound_rx) = mpsc::channel(config.inbound_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let (stopped_tx, stopped) = watch::channel(false);
        let handler_slots = Arc::new(Semaphore::new(config.max_concurrent_handlers.max(1)));

        tracing::info!(
            environment = ?config.environment,
            handlers = registry.registered_handlers().len(),
            listeners = registry.registered_listeners().len(),
            max_concurrent_handlers = config.max_concurrent_handlers,
            "host starting"
        );

        let inner = Arc::new(HostInner {
            registry: RwLock::new(registry),
            windows: Mutex::new(WindowTable::new()),
            processes: Mutex::new(ProcessTable::new()),
            config,
            platform,
            inbound,
            handler_slots,
            shutdown_tx: Mutex::new(Some(shutdown_tx)),
            stopped,
        });

        tokio::spawn(Self::dispatch_loop(
            Arc::downgrade(&inner),
            inbound_rx,
            shutdown_rx,
            stopped_tx,
        ));

        Host { inner }
    }

    /// Receive messages until shutdown, dispatching each one.
    ///
    /// Holds only a weak reference so dropping every `Host` clone also ends
    /// the loop.
    async fn dispatch_loop(
        host: Weak<HostInner>,
        mut inbound: mpsc::Receiver<HostMessage>,
        mut shutdown_rx: oneshot::Receiver<()>,
        stopped: watch::Sender<bool>,
    ) {
        loop {
            let message = tokio::select! {
                _ = &mut shutdown_rx => break,
                message = inbound.recv() => match message {
                    Some(message) => message,
                    None => break,
                },
            };
            let Some(inner) = host.upgrade() else {
                break;
            };
            Host { inner }.dispatch(message);
        }

        // Stop accepting before teardown so late sends fail fast
        inbound.close();
        if let Some(inner) = host.upgrade() {
            Host { inner }.teardown();
        }
        let _ = stopped.send(true);
        tracing::info!("host stopped");
    }

    /// Dispatch a single message to its handler or listener.
    fn dispatch(&self, message: HostMessage) {
        let permit = match self.inner.handler_slots.clone().try_acquire_owned() {
            Ok(p) => p,
            Err(_) => {
                tracing::warn!(
                    channel = message.channel(),
                    window = message.window(),
                    "handler capacity reached, rejecting message"
                );
                if let HostMessage::Invoke { channel, reply, .. } = message {
                    let envelope = Envelope::err(format!(
                        "handler capacity reached; '{channel}' was not run"
                    ));
                    if let Ok(bytes) = MsgPackCodec::encode_bytes(&envelope) {
                        let _ = reply.send(InvokeOutcome::Envelope(bytes));
                    }
                }
                return;
            }
        };

        match message {
            HostMessage::Invoke {
                window,
                request_id,
                channel,
                payload,
                reply,
            } => {
                let invocation = self.inner.registry.write().take_invocation(&channel);
                let Some(invocation) = invocation else {
                    tracing::debug!(channel, window, request_id, "no handler registered");
                    let _ = reply.send(InvokeOutcome::NoHandler);
                    return;
                };

                let ctx = InvokeContext::with_host(&channel, request_id, window, self.clone());
                tokio::spawn(async move {
                    // Permit is held until this task completes
                    let _permit = permit;

                    let envelope = invocation.run(payload, ctx).await;
                    match MsgPackCodec::encode_bytes(&envelope) {
                        Ok(bytes) => {
                            if reply.send(InvokeOutcome::Envelope(bytes)).is_err() {
                                tracing::debug!(channel, request_id, "caller gone before reply");
                            }
                        }
                        Err(e) => {
                            tracing::error!(channel, request_id, error = %e, "failed to encode envelope");
                        }
                    }
                });
            }
            HostMessage::Send {
                window,
                channel,
                payload,
            } => {
                let call = self.inner.registry.read().listener_call(&channel);
                let Some(call) = call else {
                    tracing::debug!(channel, window, "no listener registered, dropping message");
                    return;
                };

                let ctx = InvokeContext::with_host(&channel, 0, window, self.clone());
                tokio::spawn(async move {
                    let _permit = permit;
                    call.run(payload, ctx).await;
                });
            }
        }
    }

    fn teardown(&self) {
        let killed = self.inner.processes.lock().kill_all();
        let mut windows = self.inner.windows.lock();
        tracing::debug!(killed, windows = windows.len(), "tearing down host");
        windows.clear();
        drop(windows);
        self.inner.registry.write().clear();
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Ask the dispatch loop to stop. Idempotent.
    ///
    /// Tracked processes are killed and every window is closed. Handlers
    /// already running finish and still reply.
    pub fn shutdown(&self) {
        if let Some(tx) = self.inner.shutdown_tx.lock().take() {
            tracing::info!("host shutdown requested");
            let _ = tx.send(());
        }
    }

    pub fn is_running(&self) -> bool {
        !*self.inner.stopped.borrow()
    }

    /// Wait until the dispatch loop has stopped.
    pub async fn wait_for_shutdown(&self) {
        let mut stopped = self.inner.stopped.clone();
        let _ = stopped.wait_for(|done| *done).await;
    }

    pub fn config(&self) -> &HostConfig {
        &self.inner.config
    }

    pub fn platform(&self) -> &Arc<dyn Platform> {
        &self.inner.platform
    }

    // ------------------------------------------------------------------
    // Runtime registration
    // ------------------------------------------------------------------

    /// Register an invoke handler on the running host.
    ///
    /// Returns `false` if `channel` already has one.
    pub fn register_handler<F, T, R, Fut>(&self, channel: &str, options: HandlerOptions, handler: F) -> bool
    where
        F: Fn(T, InvokeContext) -> Fut + Send + Sync + 'static,
        T: DeserializeOwned + Send + 'static,
        R: Serialize + Send + 'static,
        Fut: Future<Output = Result<R>> + Send + 'static,
    {
        self.inner
            .registry
            .write()
            .register_handler(channel, options, handler)
    }

    /// Register a fire-and-forget listener on the running host.
    pub fn register_listener<F, T, Fut>(&self, channel: &str, options: HandlerOptions, listener: F) -> bool
    where
        F: Fn(T, InvokeContext) -> Fut + Send + Sync + 'static,
        T: DeserializeOwned + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.inner
            .registry
            .write()
            .register_listener(channel, options, listener)
    }

    pub fn unregister_handler(&self, channel: &str) -> bool {
        self.inner.registry.write().unregister_handler(channel)
    }

    pub fn unregister_listener(&self, channel: &str) -> bool {
        self.inner.registry.write().unregister_listener(channel)
    }

    pub fn has_handler(&self, channel: &str) -> bool {
        self.inner.registry.read().has_handler(channel)
    }

    pub fn has_listener(&self, channel: &str) -> bool {
        self.inner.registry.read().has_listener(channel)
    }

    pub fn registered_handlers(&self) -> Vec<String> {
        self.inner.registry.read().registered_handlers()
    }

    pub fn registered_listeners(&self) -> Vec<String> {
        self.inner.registry.read().registered_listeners()
    }

    // ------------------------------------------------------------------
    // Windows
    // ------------------------------------------------------------------

    /// Open a window and return its bridge.
    ///
    /// New windows are centered on the configured screen and take focus.
    pub fn open_window(&self, name: &str) -> Bridge {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let bounds = centered(Bounds::default(), self.inner.config.screen);
        let window = self.inner.windows.lock().open(name, bounds, events_tx);

        tracing::info!(window, name, devtools = self.inner.config.devtools_enabled(), "window opened");
        Bridge::connect(window, self.inner.inbound.clone(), events_rx)
    }

    /// Remove a window. Its bridge stops receiving events; in-flight
    /// invokes still get their replies.
    pub fn close_window(&self, window: WindowId) -> bool {
        let closed = self.inner.windows.lock().close(window);
        if closed {
            tracing::info!(window, "window closed");
        }
        closed
    }

    /// Mark a window as torn down. Broadcasts and emits skip it from now on.
    pub fn mark_destroyed(&self, window: WindowId) -> bool {
        let marked = self.inner.windows.lock().mark_destroyed(window);
        if marked {
            tracing::debug!(window, "window marked destroyed");
        }
        marked
    }

    pub fn window(&self, window: WindowId) -> Option<WindowInfo> {
        self.inner.windows.lock().get(window)
    }

    pub fn window_ids(&self) -> Vec<WindowId> {
        self.inner.windows.lock().ids()
    }

    /// Apply `f` to a live window's state and notify that window with
    /// `window:stateChanged`.
    pub fn update_window<F>(&self, window: WindowId, f: F) -> Result<WindowInfo>
    where
        F: FnOnce(&mut WindowState),
    {
        let info = self
            .inner
            .windows
            .lock()
            .update(window, f)
            .ok_or(BridgeError::UnknownWindow(window))?;
        self.emit_to(window, events::WINDOW_STATE_CHANGED, &info)?;
        Ok(info)
    }

    /// Focus `window`, unfocusing the others.
    pub fn focus_window(&self, window: WindowId) -> Result<WindowInfo> {
        let info = self
            .inner
            .windows
            .lock()
            .focus(window)
            .ok_or(BridgeError::UnknownWindow(window))?;
        self.emit_to(window, events::WINDOW_STATE_CHANGED, &info)?;
        Ok(info)
    }

    /// Center `window` on the configured screen.
    pub fn center_window(&self, window: WindowId) -> Result<Bounds> {
        let screen = self.inner.config.screen;
        self.update_window(window, |state| state.bounds = centered(state.bounds, screen))
            .map(|info| info.bounds)
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    /// Push an event to one window.
    ///
    /// Returns `false` if the window is unknown, destroyed or no longer
    /// listening.
    pub fn emit_to<T: Serialize + ?Sized>(&self, window: WindowId, channel: &str, payload: &T) -> Result<bool> {
        let event = WindowEvent::new(channel, MsgPackCodec::encode_bytes(payload)?);
        let delivered = self.inner.windows.lock().send_to(window, event);
        if !delivered {
            tracing::debug!(window, channel, "event not delivered");
        }
        Ok(delivered)
    }

    /// Push an event to every live window; returns how many received it.
    pub fn broadcast<T: Serialize + ?Sized>(&self, channel: &str, payload: &T) -> Result<usize> {
        let event = WindowEvent::new(channel, MsgPackCodec::encode_bytes(payload)?);
        let delivered = self.inner.windows.lock().broadcast(&event);
        tracing::trace!(channel, delivered, "broadcast");
        Ok(delivered)
    }

    // ------------------------------------------------------------------
    // Processes
    // ------------------------------------------------------------------

    /// Snapshot of tracked processes.
    pub fn processes(&self) -> Vec<ProcessInfo> {
        self.inner.processes.lock().list()
    }

    pub fn process(&self, id: u64) -> Result<ProcessInfo> {
        self.inner
            .processes
            .lock()
            .get(id)
            .ok_or(BridgeError::UnknownProcess(id))
    }

    /// Signal a tracked process to terminate.
    pub fn kill_process(&self, id: u64) -> bool {
        self.inner.processes.lock().kill(id)
    }

    /// Run `f` with the process table locked. `f` must not block.
    pub(crate) fn with_processes<R>(&self, f: impl FnOnce(&mut ProcessTable) -> R) -> R {
        f(&mut self.inner.processes.lock())
    }
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host")
            .field("environment", &self.inner.config.environment)
            .field("running", &self.is_running())
            .finish()
    }
}

fn centered(bounds: Bounds, screen: crate::config::ScreenSize) -> Bounds {
    let x = (i64::from(screen.width) - i64::from(bounds.width)) / 2;
    let y = (i64::from(screen.height) - i64::from(bounds.height)) / 2;
    Bounds {
        x: i32::try_from(x.max(0)).unwrap_or(i32::MAX),
        y: i32::try_from(y.max(0)).unwrap_or(i32::MAX),
        ..bounds
    }
}
