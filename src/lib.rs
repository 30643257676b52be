//! # hostbridge
//!
//! Request/response message layer between a desktop shell's privileged
//! host and its UI windows.
//!
//! ## Architecture
//!
//! - **Host** ([`Host`]): owns the handler registry, the window and
//!   process tables, and one dispatch loop. Every message runs in its own
//!   task and every invoke is answered with an
//!   [`Envelope`](protocol::Envelope) `{success, data | error}`.
//! - **Bridge** ([`Bridge`]): one per window. Typed `invoke`/`call`/`send`
//!   plus event subscriptions, and namespaces (`fs()`, `window()`, ...)
//!   over the built-in channel catalog ([`api`]).
//! - **Services** ([`services`]): built-in handlers for the catalog,
//!   backed by the filesystem, tokio processes and a [`Platform`].
//!
//! Payloads cross the boundary as MessagePack ([`codec`]).
//!
//! ## Example
//!
//! ```
//! use hostbridge::Host;
//!
//! #[tokio::main]
//! async fn main() -> hostbridge::Result<()> {
//!     hostbridge::logging::init("info", false)?;
//!
//!     let host = Host::builder()
//!         .handle("ping", |_: (), _ctx| async { Ok("pong") })
//!         .with_builtin_services()
//!         .start();
//!
//!     let bridge = host.open_window("main");
//!     let pong: String = bridge.invoke("ping", &()).await?;
//!     let info = bridge.system().info().await?;
//!     assert_eq!(pong, "pong");
//!     assert_eq!(info.arch, std::env::consts::ARCH);
//!
//!     host.shutdown();
//!     host.wait_for_shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! Auxiliary utilities: [`http`] (retrying client), [`cache`] (LRU),
//! [`events`] (emitter), [`storage`] (TTL + encryption), [`timing`].

pub mod api;
pub mod bridge;
pub mod cache;
pub mod codec;
pub mod config;
pub mod error;
pub mod events;
pub mod handler;
pub mod host;
pub mod http;
pub mod logging;
pub mod platform;
pub mod protocol;
pub mod security;
pub mod services;
pub mod storage;
pub mod timing;

pub use bridge::{Bridge, Subscription};
pub use config::{Environment, HostConfig};
pub use error::{BridgeError, Result};
pub use handler::{HandlerOptions, InvokeContext};
pub use host::{Host, HostBuilder};
pub use platform::{HeadlessPlatform, Platform};
