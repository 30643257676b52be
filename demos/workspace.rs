//! Built-in services end to end: files, window state, processes, and the
//! utility modules, driven from one window bridge.
//!
//! Run with: cargo run --example workspace

use std::sync::Arc;
use std::time::Duration;

use hostbridge::api::{events, ProcessExit, ProcessOutput, ProcessSpawn, WindowInfo};
use hostbridge::cache::LruCache;
use hostbridge::storage::{Cipher, Storage};
use hostbridge::{HeadlessPlatform, Host, HostConfig};
use tokio::sync::mpsc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> hostbridge::Result<()> {
    dotenvy::dotenv().ok();
    hostbridge::logging::init("info", false)?;

    let platform = Arc::new(HeadlessPlatform::new());
    let host = Host::builder()
        .config(HostConfig::from_env()?)
        .platform(platform.clone())
        .with_builtin_services()
        .start();
    let bridge = host.open_window("workspace");

    let app = bridge.app().info().await?;
    let system = bridge.system().info().await?;
    info!(app = %app.name, version = %app.version, os = %system.platform, arch = %system.arch, "connected");

    // Files
    let dir = std::env::temp_dir().join(format!("hostbridge-demo-{}", std::process::id()));
    bridge.fs().mkdir(&dir, true).await?;
    let notes = dir.join("notes.md");
    bridge.fs().write_file(&notes, "# Notes\n").await?;
    bridge.fs().append_file(&notes, "- try the bridge\n").await?;
    for entry in bridge.fs().readdir(&dir).await? {
        info!(name = %entry.name, size = entry.size, "dir entry");
    }

    // Window state
    let _state = bridge.on(events::WINDOW_STATE_CHANGED, |w: WindowInfo| {
        info!(window = w.id, minimized = w.minimized, maximized = w.maximized, "window state");
    });
    bridge.window().maximize().await?;
    let bounds = bridge.window().center().await?;
    info!(?bounds, "centered");

    // Processes
    let (exit_tx, mut exit_rx) = mpsc::unbounded_channel();
    let _output = bridge.on(events::PROCESS_OUTPUT, |out: ProcessOutput| {
        info!(process = out.id, stream = ?out.stream, line = %out.line, "process output");
    });
    let _exit = bridge.on(events::PROCESS_EXIT, move |exit: ProcessExit| {
        exit_tx.send(exit).ok();
    });
    let spawned = bridge
        .process()
        .spawn(ProcessSpawn {
            command: if cfg!(windows) { "cmd".into() } else { "sh".into() },
            args: if cfg!(windows) {
                vec!["/C".into(), "echo hello from a child".into()]
            } else {
                vec!["-c".into(), "echo hello from a child".into()]
            },
            name: Some("greeter".into()),
            ..Default::default()
        })
        .await;
    match spawned {
        Ok(process) => {
            info!(process = process.id, pid = ?process.pid, "spawned");
            if let Ok(Some(exit)) = tokio::time::timeout(Duration::from_secs(5), exit_rx.recv()).await {
                info!(process = exit.id, code = ?exit.code, "exited");
            }
        }
        Err(e) => warn!(error = %e, "spawn failed"),
    }

    // Shell and notifications go through the platform
    if let Err(e) = bridge.shell().open_external("file:///etc/passwd").await {
        info!(error = %e, "refused external URL");
    }
    bridge.notification().show("Workspace", "demo finished").await?;
    info!(opened = ?platform.opened(), notifications = platform.notifications().len(), "platform log");

    // Utilities
    let mut recent: LruCache<String, usize> = LruCache::new(2);
    for (i, file) in ["a.md", "b.md", "c.md"].into_iter().enumerate() {
        recent.set(file.to_string(), i);
    }
    info!(recent = ?recent.keys(), "recent files");

    let storage = Storage::local(dir.join("settings.json"))?
        .with_cipher(Cipher::from_passphrase("demo passphrase"));
    storage.set("theme", &"dark")?;
    let theme: Option<String> = storage.get("theme")?;
    info!(?theme, "stored setting");

    bridge.fs().delete(&dir, true).await?;

    host.shutdown();
    host.wait_for_shutdown().await;
    Ok(())
}
