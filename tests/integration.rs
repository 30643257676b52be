//! End-to-end tests: a running host and its window bridges.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use hostbridge::api::{
    events, Bounds, DialogShowMessage, MenuItem, MenuShowContext, OpenDialogResult, WindowInfo,
};
use hostbridge::config::Environment;
use hostbridge::handler::HandlerOptions;
use hostbridge::{BridgeError, HeadlessPlatform, Host, HostConfig};
use serde_json::json;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

fn builtin_host() -> (Host, Arc<HeadlessPlatform>) {
    let platform = Arc::new(HeadlessPlatform::new());
    let host = Host::builder()
        .platform(platform.clone())
        .with_builtin_services()
        .start();
    (host, platform)
}

async fn next<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> T {
    timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

#[tokio::test]
async fn test_ping_pong_and_duplicate_registration() {
    let host = Host::builder()
        .handle("ping", |_: (), _ctx| async { Ok("pong") })
        .start();
    let bridge = host.open_window("main");

    let pong: String = bridge.invoke("ping", &()).await.unwrap();
    assert_eq!(pong, "pong");

    // Re-registering changes nothing
    let accepted = host.register_handler("ping", HandlerOptions::new(), |_: (), _ctx| async {
        Ok("pong2")
    });
    assert!(!accepted);
    let pong: String = bridge.invoke("ping", &()).await.unwrap();
    assert_eq!(pong, "pong");
    assert_eq!(host.registered_handlers(), vec!["ping"]);
}

#[tokio::test]
async fn test_failures_are_confined_to_their_envelope() {
    let host = Host::builder()
        .handle("fail", |_: (), _ctx| async {
            Err::<(), _>(BridgeError::handler("disk on fire"))
        })
        .handle("explode", |_: (), _ctx| async {
            if true {
                panic!("kaboom");
            }
            Ok(())
        })
        .handle("ping", |_: (), _ctx| async { Ok("pong") })
        .start();
    let bridge = host.open_window("main");

    let err = bridge.invoke::<_, ()>("fail", &()).await.unwrap_err();
    assert!(matches!(err, BridgeError::Remote(ref m) if m == "disk on fire"));

    let err = bridge.invoke::<_, ()>("explode", &()).await.unwrap_err();
    assert!(err.to_string().contains("panicked"));

    let pong: String = bridge.invoke("ping", &()).await.unwrap();
    assert_eq!(pong, "pong");
    assert!(host.has_handler("fail"));
}

#[tokio::test]
async fn test_once_and_unregister() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let host = Host::builder()
        .handle_once("init", move |_: (), _ctx| {
            let counter = counter.clone();
            async move { Ok(counter.fetch_add(1, Ordering::SeqCst)) }
        })
        .handle("ping", |_: (), _ctx| async { Ok("pong") })
        .start();
    let bridge = host.open_window("main");

    let first: usize = bridge.invoke("init", &()).await.unwrap();
    assert_eq!(first, 0);
    let second = bridge.invoke::<_, usize>("init", &()).await;
    assert!(matches!(second, Err(BridgeError::NoHandler(ref c)) if c == "init"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    assert!(host.unregister_handler("ping"));
    assert!(!host.has_handler("ping"));
    let gone = bridge.invoke::<_, String>("ping", &()).await;
    assert!(matches!(gone, Err(BridgeError::NoHandler(_))));
}

#[tokio::test]
async fn test_error_hook_sees_failures() {
    let seen = Arc::new(AtomicUsize::new(0));
    let host = Host::builder().start();
    let hook_seen = seen.clone();
    host.register_handler(
        "save",
        HandlerOptions::new().on_error(move |channel, _| {
            assert_eq!(channel, "save");
            hook_seen.fetch_add(1, Ordering::SeqCst);
            false
        }),
        |_: (), _ctx| async { Err::<(), _>(BridgeError::handler("read-only")) },
    );
    let bridge = host.open_window("main");

    let err = bridge.invoke::<_, ()>("save", &()).await.unwrap_err();
    assert_eq!(err.to_string(), "read-only");
    assert_eq!(seen.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_send_reaches_listener() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let host = Host::builder()
        .listen("log:write", move |line: String, ctx| {
            let tx = tx.clone();
            async move {
                tx.send((ctx.window(), line)).ok();
                Ok(())
            }
        })
        .start();
    let bridge = host.open_window("main");

    bridge.send("log:write", "hello").await.unwrap();
    assert_eq!(next(&mut rx).await, (bridge.window_id(), "hello".to_string()));

    // No listener: dropped silently
    bridge.send("nobody:listens", &1).await.unwrap();
}

#[tokio::test]
async fn test_broadcast_skips_destroyed_windows() {
    let host = Host::builder().start();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let bridges: Vec<_> = (0..5).map(|i| host.open_window(&format!("w{i}"))).collect();
    let subs: Vec<_> = bridges
        .iter()
        .map(|bridge| {
            let tx = tx.clone();
            let id = bridge.window_id();
            bridge.on("theme:changed", move |theme: String| {
                tx.send((id, theme)).ok();
            })
        })
        .collect();

    host.mark_destroyed(bridges[1].window_id());
    host.mark_destroyed(bridges[3].window_id());

    let delivered = host.broadcast("theme:changed", "dark").unwrap();
    assert_eq!(delivered, 3);

    let mut got = Vec::new();
    for _ in 0..3 {
        got.push(next(&mut rx).await.0);
    }
    got.sort();
    assert_eq!(
        got,
        vec![bridges[0].window_id(), bridges[2].window_id(), bridges[4].window_id()]
    );

    for sub in subs {
        sub.unsubscribe();
    }
}

#[tokio::test]
async fn test_handler_emits_to_calling_window() {
    let host = Host::builder()
        .handle("job:start", |steps: u32, ctx| async move {
            for step in 1..=steps {
                ctx.emit("job:progress", &step)?;
            }
            Ok(steps)
        })
        .start();
    let main = host.open_window("main");
    let other = host.open_window("other");

    let (tx, mut rx) = mpsc::unbounded_channel();
    let _sub = main.on("job:progress", move |step: u32| {
        tx.send(step).ok();
    });
    let stray = Arc::new(AtomicUsize::new(0));
    let stray_count = stray.clone();
    let _other_sub = other.on("job:progress", move |_: u32| {
        stray_count.fetch_add(1, Ordering::SeqCst);
    });

    let total: u32 = main.invoke("job:start", &3u32).await.unwrap();
    assert_eq!(total, 3);
    for expected in 1..=3 {
        assert_eq!(next(&mut rx).await, expected);
    }
    assert_eq!(stray.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_capacity_limit_rejects_invokes() {
    let (started_tx, started_rx) = oneshot::channel::<()>();
    let (release_tx, release_rx) = oneshot::channel::<()>();
    let started_tx = Arc::new(parking_lot::Mutex::new(Some(started_tx)));
    let release_rx = Arc::new(tokio::sync::Mutex::new(Some(release_rx)));

    let host = Host::builder()
        .max_concurrent_handlers(1)
        .handle("slow", move |_: (), _ctx| {
            let started_tx = started_tx.clone();
            let release_rx = release_rx.clone();
            async move {
                if let Some(tx) = started_tx.lock().take() {
                    tx.send(()).ok();
                }
                if let Some(rx) = release_rx.lock().await.take() {
                    rx.await.ok();
                }
                Ok("done")
            }
        })
        .start();
    let bridge = host.open_window("main");

    let first = {
        let bridge = bridge.clone();
        tokio::spawn(async move { bridge.invoke::<_, String>("slow", &()).await })
    };
    timeout(WAIT, started_rx).await.unwrap().unwrap();

    let err = bridge.invoke::<_, String>("slow", &()).await.unwrap_err();
    assert!(err.to_string().contains("capacity"));

    release_tx.send(()).unwrap();
    assert_eq!(first.await.unwrap().unwrap(), "done");
}

#[tokio::test]
async fn test_shutdown_closes_bridges() {
    let host = Host::builder()
        .handle("ping", |_: (), _ctx| async { Ok("pong") })
        .start();
    let bridge = host.open_window("main");

    host.shutdown();
    timeout(WAIT, host.wait_for_shutdown()).await.unwrap();
    assert!(!host.is_running());
    assert!(host.window_ids().is_empty());
    assert!(!host.has_handler("ping"));
    assert!(host.registered_handlers().is_empty());

    let err = bridge.invoke::<_, String>("ping", &()).await.unwrap_err();
    assert!(matches!(err, BridgeError::ChannelClosed));
}

// ============================================================================
// Built-in services
// ============================================================================

#[tokio::test]
async fn test_builtin_fs_round_trip() {
    let (host, _platform) = builtin_host();
    let bridge = host.open_window("main");
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("notes.txt");

    let fs = bridge.fs();
    fs.write_file(&file, "one\n").await.unwrap();
    fs.append_file(&file, "two\n").await.unwrap();
    assert_eq!(fs.read_file(&file).await.unwrap(), "one\ntwo\n");
    assert!(fs.exists(&file).await.unwrap());

    let entries = fs.readdir(dir.path()).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, "notes.txt");

    fs.delete(&file, false).await.unwrap();
    assert!(!fs.exists(&file).await.unwrap());

    let err = fs.read_file(&file).await.unwrap_err();
    assert!(matches!(err, BridgeError::Remote(ref m) if m.contains("notes.txt")));

    // Empty path fails validation before the handler runs
    let err = fs.read_file("").await.unwrap_err();
    assert!(err.to_string().contains("path must not be empty"));
}

#[tokio::test]
async fn test_builtin_window_state() {
    let (host, _platform) = builtin_host();
    let bridge = host.open_window("main");

    let (tx, mut rx) = mpsc::unbounded_channel();
    let _sub = bridge.on(events::WINDOW_STATE_CHANGED, move |info: WindowInfo| {
        tx.send(info).ok();
    });

    bridge.window().minimize().await.unwrap();
    assert!(next(&mut rx).await.minimized);
    assert!(host.window(bridge.window_id()).unwrap().minimized);

    assert!(bridge.window().maximize().await.unwrap());
    let info = next(&mut rx).await;
    assert!(info.maximized && !info.minimized);
    assert!(!bridge.window().maximize().await.unwrap());
    next(&mut rx).await;

    let bounds = Bounds {
        x: 10,
        y: 20,
        width: 640,
        height: 480,
    };
    assert_eq!(bridge.window().set_bounds(bounds).await.unwrap(), bounds);
    assert_eq!(bridge.window().bounds().await.unwrap(), bounds);
    next(&mut rx).await;

    let centered = bridge.window().center().await.unwrap();
    assert_eq!((centered.x, centered.y), (640, 300));

    let zero = Bounds {
        width: 0,
        ..bounds
    };
    assert!(bridge.window().set_bounds(zero).await.is_err());

    bridge.window().close().await.unwrap();
    assert!(host.window(bridge.window_id()).is_none());
}

#[tokio::test]
async fn test_builtin_platform_services() {
    let (host, platform) = builtin_host();
    let bridge = host.open_window("main");

    platform.queue_open_dialog(OpenDialogResult {
        canceled: false,
        file_paths: vec!["/tmp/a.txt".into()],
    });
    let picked = bridge.dialog().show_open(Default::default()).await.unwrap();
    assert_eq!(picked.file_paths.len(), 1);
    assert!(bridge.dialog().show_open(Default::default()).await.unwrap().canceled);

    platform.queue_message_response(1);
    let answer = bridge
        .dialog()
        .show_message(DialogShowMessage {
            message: "Discard changes?".into(),
            buttons: vec!["Keep".into(), "Discard".into()],
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(answer.response, 1);

    bridge.clipboard().write_text("copied").await.unwrap();
    assert_eq!(bridge.clipboard().read_text().await.unwrap(), "copied");

    bridge.shell().open_external("https://example.com").await.unwrap();
    assert!(bridge.shell().open_external("javascript:alert(1)").await.is_err());
    assert_eq!(platform.opened(), vec!["https://example.com/"]);

    bridge.notification().show("Build", "finished").await.unwrap();
    assert_eq!(platform.notifications()[0].title, "Build");
}

#[tokio::test]
async fn test_builtin_context_menu_emits_click() {
    let (host, platform) = builtin_host();
    let bridge = host.open_window("main");

    let (tx, mut rx) = mpsc::unbounded_channel();
    let _sub = bridge.on(events::MENU_CLICK, move |id: String| {
        tx.send(id).ok();
    });

    platform.queue_context_menu_choice(Some("paste"));
    let choice = bridge
        .menu()
        .show_context(MenuShowContext {
            items: vec![
                MenuItem::new("copy", "Copy"),
                MenuItem::separator(),
                MenuItem::new("paste", "Paste"),
            ],
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(choice.as_deref(), Some("paste"));
    assert_eq!(next(&mut rx).await, "paste");
}

#[tokio::test]
async fn test_builtin_app_info_reflects_config() {
    let platform = Arc::new(HeadlessPlatform::new());
    let host = Host::builder()
        .config(HostConfig {
            environment: Environment::Production,
            app_name: "notes".into(),
            app_version: "2.1.0".into(),
            ..HostConfig::default()
        })
        .platform(platform)
        .with_builtin_services()
        .start();
    let bridge = host.open_window("main");

    let info = bridge.app().info().await.unwrap();
    assert_eq!(info.name, "notes");
    assert_eq!(info.version, "2.1.0");
    assert_eq!(info.environment, Environment::Production);
    assert!(!info.open_devtools);

    let value: serde_json::Value = bridge.invoke("app:getInfo", &json!({})).await.unwrap();
    assert_eq!(value["environment"], json!("production"));
}

#[tokio::test]
async fn test_application_handler_overrides_builtin() {
    let host = Host::builder()
        .handle_request(|_: hostbridge::api::SystemGetInfo, _ctx| async {
            Ok(hostbridge::api::SystemInfo {
                platform: "test".into(),
                arch: "none".into(),
                family: "none".into(),
                cpus: 1,
                pid: 0,
            })
        })
        .with_builtin_services()
        .start();
    let bridge = host.open_window("main");

    assert_eq!(bridge.system().info().await.unwrap().platform, "test");
}

#[cfg(unix)]
#[tokio::test]
async fn test_builtin_process_spawn_streams_output() {
    use hostbridge::api::{OutputStream, ProcessExit, ProcessOutput, ProcessSpawn};

    let (host, _platform) = builtin_host();
    let bridge = host.open_window("main");

    let (out_tx, mut out_rx) = mpsc::unbounded_channel();
    let _out = bridge.on(events::PROCESS_OUTPUT, move |out: ProcessOutput| {
        out_tx.send(out).ok();
    });
    let (exit_tx, mut exit_rx) = mpsc::unbounded_channel();
    let _exit = bridge.on(events::PROCESS_EXIT, move |exit: ProcessExit| {
        exit_tx.send(exit).ok();
    });

    let info = bridge
        .process()
        .spawn(ProcessSpawn {
            command: "sh".into(),
            args: vec!["-c".into(), "echo hello; echo oops >&2; exit 4".into()],
            name: Some("greeter".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(info.name, "greeter");
    assert_eq!(info.window, bridge.window_id());

    let exit = next(&mut exit_rx).await;
    assert_eq!(exit, ProcessExit { id: info.id, code: Some(4), killed: false });

    let mut lines = vec![next(&mut out_rx).await, next(&mut out_rx).await];
    lines.sort_by_key(|o| o.stream == OutputStream::Stderr);
    assert_eq!(lines[0].line, "hello");
    assert_eq!(lines[1].line, "oops");
    assert!(bridge.process().list().await.unwrap().is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn test_builtin_process_kill() {
    use hostbridge::api::{ProcessExit, ProcessSpawn};

    let (host, _platform) = builtin_host();
    let bridge = host.open_window("main");

    let (exit_tx, mut exit_rx) = mpsc::unbounded_channel();
    let _exit = bridge.on(events::PROCESS_EXIT, move |exit: ProcessExit| {
        exit_tx.send(exit).ok();
    });

    let info = bridge
        .process()
        .spawn(ProcessSpawn {
            command: "sleep".into(),
            args: vec!["30".into()],
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(bridge.process().list().await.unwrap().len(), 1);
    assert_eq!(host.process(info.id).unwrap().name, "sleep");

    assert!(bridge.process().kill(info.id).await.unwrap());
    let exit = next(&mut exit_rx).await;
    assert!(exit.killed);
    assert!(!bridge.process().kill(info.id).await.unwrap());
    assert!(matches!(host.process(info.id), Err(BridgeError::UnknownProcess(_))));
}

#[cfg(unix)]
#[tokio::test]
async fn test_shutdown_kills_tracked_processes() {
    use hostbridge::api::ProcessSpawn;

    let (host, _platform) = builtin_host();
    let bridge = host.open_window("main");
    bridge
        .process()
        .spawn(ProcessSpawn {
            command: "sleep".into(),
            args: vec!["30".into()],
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(host.processes().len(), 1);

    host.shutdown();
    host.wait_for_shutdown().await;

    timeout(WAIT, async {
        while !host.processes().is_empty() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap();
}
