//! Minimal host with one window: ping, a failing handler, and a broadcast.
//!
//! Run with: cargo run --example ping

use hostbridge::{BridgeError, Host, HostConfig};
use tracing::info;

#[tokio::main]
async fn main() -> hostbridge::Result<()> {
    dotenvy::dotenv().ok();
    hostbridge::logging::init("info", false)?;

    let config = HostConfig::from_env()?;
    info!(environment = ?config.environment, devtools = config.devtools_enabled(), "starting host");

    let host = Host::builder()
        .config(config)
        .handle("ping", |_: (), _ctx| async { Ok("pong") })
        .handle("echo", |text: String, ctx| async move {
            info!(window = ctx.window(), request_id = ctx.request_id(), "echo");
            Ok(text)
        })
        .handle("fail", |_: (), _ctx| async {
            Err::<(), _>(BridgeError::handler("this handler always fails"))
        })
        .start();

    let bridge = host.open_window("main");

    let pong: String = bridge.invoke("ping", &()).await?;
    info!(%pong, "ping answered");

    let echoed: String = bridge.invoke("echo", "hello bridge").await?;
    info!(%echoed, "echo answered");

    match bridge.invoke::<_, ()>("fail", &()).await {
        Ok(()) => info!("unexpected success"),
        Err(e) => info!(error = %e, "failure came back in the envelope"),
    }

    match bridge.invoke::<_, ()>("missing", &()).await {
        Err(BridgeError::NoHandler(channel)) => info!(%channel, "no handler"),
        other => info!(?other, "unexpected answer"),
    }

    let sub = bridge.on("theme:changed", |theme: String| {
        info!(%theme, "theme changed");
    });
    let delivered = host.broadcast("theme:changed", "dark")?;
    info!(delivered, "broadcast sent");
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    sub.unsubscribe();

    host.shutdown();
    host.wait_for_shutdown().await;
    info!("host stopped");
    Ok(())
}
