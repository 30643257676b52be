//! Window-side client of the host.
//!
//! A [`Bridge`] is what UI code holds. It turns typed calls into
//! [`HostMessage`]s on the host's inbound queue and fans host events out to
//! subscribers.
//!
//! ```ignore
//! let bridge = host.open_window("main");
//!
//! // Catalog channels through the typed namespaces
//! let text = bridge.fs().read_file("notes.txt").await?;
//!
//! // Any channel by name
//! let pong: String = bridge.invoke("ping", &()).await?;
//!
//! // Host events
//! let sub = bridge.on("process:output", |out: ProcessOutput| println!("{}", out.line));
//! sub.unsubscribe();
//! ```

mod namespaces;

pub use namespaces::{
    AppApi, ClipboardApi, DialogApi, FsApi, MenuApi, NotificationApi, ProcessApi, ShellApi,
    SystemApi, WindowApi,
};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::api::ChannelRequest;
use crate::codec::MsgPackCodec;
use crate::error::{BridgeError, Result};
use crate::events::{EventEmitter, ListenerId};
use crate::protocol::{Envelope, HostMessage, InvokeOutcome, WindowEvent, WindowId};

struct BridgeInner {
    window: WindowId,
    outbound: mpsc::Sender<HostMessage>,
    next_request_id: AtomicU64,
    events: EventEmitter<Bytes>,
    pump: JoinHandle<()>,
}

impl Drop for BridgeInner {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

/// Typed client bound to one window. Cheap to clone.
#[derive(Clone)]
pub struct Bridge {
    inner: Arc<BridgeInner>,
}

impl Bridge {
    /// Wire a bridge to the host queue and spawn its event pump.
    pub(crate) fn connect(
        window: WindowId,
        outbound: mpsc::Sender<HostMessage>,
        mut events_rx: mpsc::UnboundedReceiver<WindowEvent>,
    ) -> Self {
        let events = EventEmitter::new();
        let pump_events = events.clone();
        let pump = tokio::spawn(async move {
            while let Some(event) = events_rx.recv().await {
                let delivered = pump_events.emit(&event.channel, &event.payload);
                tracing::trace!(window, channel = %event.channel, delivered, "event delivered");
            }
            tracing::debug!(window, "event stream closed");
        });

        Self {
            inner: Arc::new(BridgeInner {
                window,
                outbound,
                next_request_id: AtomicU64::new(1),
                events,
                pump,
            }),
        }
    }

    pub fn window_id(&self) -> WindowId {
        self.inner.window
    }

    /// Call `channel` and wait for the host's envelope.
    ///
    /// Fails with [`BridgeError::NoHandler`] when nothing is registered,
    /// [`BridgeError::Remote`] carrying the handler's message when the
    /// handler failed, and [`BridgeError::ChannelClosed`] once the host has
    /// shut down.
    pub async fn invoke<A, R>(&self, channel: &str, args: &A) -> Result<R>
    where
        A: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let request_id = self.inner.next_request_id.fetch_add(1, Ordering::Relaxed);
        let payload = MsgPackCodec::encode_bytes(args)?;
        let (reply, reply_rx) = oneshot::channel();

        self.inner
            .outbound
            .send(HostMessage::Invoke {
                window: self.inner.window,
                request_id,
                channel: channel.to_string(),
                payload,
                reply,
            })
            .await
            .map_err(|_| BridgeError::ChannelClosed)?;

        match reply_rx.await {
            Ok(InvokeOutcome::Envelope(bytes)) => {
                let envelope: Envelope = MsgPackCodec::decode(&bytes)?;
                envelope.into_result()
            }
            Ok(InvokeOutcome::NoHandler) => Err(BridgeError::NoHandler(channel.to_string())),
            Err(_) => Err(BridgeError::ChannelClosed),
        }
    }

    /// Call a catalog channel with its typed request.
    pub async fn call<Req: ChannelRequest>(&self, request: &Req) -> Result<Req::Response> {
        self.invoke(Req::CHANNEL.as_str(), request).await
    }

    /// Fire-and-forget message to the listener on `channel`.
    ///
    /// Succeeds once the message is queued; whether a listener exists is
    /// not reported back.
    pub async fn send<A: Serialize + ?Sized>(&self, channel: &str, args: &A) -> Result<()> {
        let payload = MsgPackCodec::encode_bytes(args)?;
        self.inner
            .outbound
            .send(HostMessage::Send {
                window: self.inner.window,
                channel: channel.to_string(),
                payload,
            })
            .await
            .map_err(|_| BridgeError::ChannelClosed)
    }

    /// Subscribe to host events on `channel`.
    ///
    /// Payloads that do not decode as `T` are logged and skipped.
    pub fn on<T, F>(&self, channel: &str, f: F) -> Subscription
    where
        T: DeserializeOwned + 'static,
        F: Fn(T) + Send + Sync + 'static,
    {
        let id = self.inner.events.on(channel, decoding(f));
        self.subscription(channel, id)
    }

    /// Subscribe to the next host event on `channel` only.
    pub fn once<T, F>(&self, channel: &str, f: F) -> Subscription
    where
        T: DeserializeOwned + 'static,
        F: Fn(T) + Send + Sync + 'static,
    {
        let id = self.inner.events.once(channel, decoding(f));
        self.subscription(channel, id)
    }

    /// Number of subscribers on `channel`.
    pub fn listener_count(&self, channel: &str) -> usize {
        self.inner.events.listener_count(channel)
    }

    fn subscription(&self, channel: &str, id: ListenerId) -> Subscription {
        Subscription {
            events: self.inner.events.clone(),
            channel: channel.to_string(),
            id,
        }
    }

    pub fn fs(&self) -> FsApi<'_> {
        FsApi::new(self)
    }

    pub fn dialog(&self) -> DialogApi<'_> {
        DialogApi::new(self)
    }

    pub fn window(&self) -> WindowApi<'_> {
        WindowApi::new(self)
    }

    pub fn clipboard(&self) -> ClipboardApi<'_> {
        ClipboardApi::new(self)
    }

    pub fn process(&self) -> ProcessApi<'_> {
        ProcessApi::new(self)
    }

    pub fn shell(&self) -> ShellApi<'_> {
        ShellApi::new(self)
    }

    pub fn notification(&self) -> NotificationApi<'_> {
        NotificationApi::new(self)
    }

    pub fn menu(&self) -> MenuApi<'_> {
        MenuApi::new(self)
    }

    pub fn app(&self) -> AppApi<'_> {
        AppApi::new(self)
    }

    pub fn system(&self) -> SystemApi<'_> {
        SystemApi::new(self)
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("window", &self.inner.window)
            .finish()
    }
}

fn decoding<T, F>(f: F) -> impl Fn(&Bytes) -> std::result::Result<(), crate::events::ListenerError> + Send + Sync + 'static
where
    T: DeserializeOwned + 'static,
    F: Fn(T) + Send + Sync + 'static,
{
    move |payload: &Bytes| {
        let value: T = MsgPackCodec::decode(payload)?;
        f(value);
        Ok(())
    }
}

/// A live event subscription. Dropping it keeps the subscription;
/// call [`Subscription::unsubscribe`] to end it.
#[must_use = "dropping a Subscription keeps the listener registered; call unsubscribe() to remove it"]
pub struct Subscription {
    events: EventEmitter<Bytes>,
    channel: String,
    id: ListenerId,
}

impl Subscription {
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Remove the listener. `false` if it had already gone (a `once`
    /// listener that fired).
    pub fn unsubscribe(self) -> bool {
        self.events.off(&self.channel, self.id)
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("channel", &self.channel)
            .field("id", &self.id)
            .finish()
    }
}
