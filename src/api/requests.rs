//! Request and response payloads for every catalog channel.
//!
//! Field names are camelCase on the wire to match what UI code expects.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Channel, ChannelRequest};
use crate::config::Environment;
use crate::error::{BridgeError, Result};
use crate::protocol::WindowId;
use crate::security;

macro_rules! request {
    ($ty:ident => $channel:ident, $resp:ty) => {
        impl ChannelRequest for $ty {
            const CHANNEL: Channel = Channel::$channel;
            type Response = $resp;
        }
    };
    ($ty:ident => $channel:ident, $resp:ty, validate($this:ident) $body:block) => {
        impl ChannelRequest for $ty {
            const CHANNEL: Channel = Channel::$channel;
            type Response = $resp;

            fn validate(&self) -> Result<()> {
                let $this = self;
                $body
            }
        }
    };
}

fn require_path(path: &std::path::Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(BridgeError::validation("path must not be empty"));
    }
    Ok(())
}

// ============================================================================
// fs
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FsReadFile {
    pub path: PathBuf,
}
request!(FsReadFile => FsReadFile, String, validate(r) { require_path(&r.path) });

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FsWriteFile {
    pub path: PathBuf,
    pub contents: String,
    #[serde(default)]
    pub append: bool,
}
request!(FsWriteFile => FsWriteFile, (), validate(r) { require_path(&r.path) });

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FsExists {
    pub path: PathBuf,
}
request!(FsExists => FsExists, bool);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FsMkdir {
    pub path: PathBuf,
    #[serde(default)]
    pub recursive: bool,
}
request!(FsMkdir => FsMkdir, (), validate(r) { require_path(&r.path) });

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FsReaddir {
    pub path: PathBuf,
}
request!(FsReaddir => FsReaddir, Vec<DirEntry>, validate(r) { require_path(&r.path) });

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FsDelete {
    pub path: PathBuf,
    #[serde(default)]
    pub recursive: bool,
}
request!(FsDelete => FsDelete, (), validate(r) { require_path(&r.path) });

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirEntry {
    pub name: String,
    pub path: PathBuf,
    pub is_dir: bool,
    pub is_file: bool,
    pub size: u64,
}

// ============================================================================
// dialog
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFilter {
    pub name: String,
    pub extensions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogShowOpen {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub default_path: Option<PathBuf>,
    #[serde(default)]
    pub filters: Vec<FileFilter>,
    #[serde(default)]
    pub multi_selections: bool,
    #[serde(default)]
    pub directory: bool,
}
request!(DialogShowOpen => DialogShowOpen, OpenDialogResult);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenDialogResult {
    pub canceled: bool,
    pub file_paths: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogShowSave {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub default_path: Option<PathBuf>,
    #[serde(default)]
    pub filters: Vec<FileFilter>,
}
request!(DialogShowSave => DialogShowSave, SaveDialogResult);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveDialogResult {
    pub canceled: bool,
    pub file_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    None,
    Info,
    Warning,
    Error,
    Question,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DialogShowMessage {
    #[serde(default)]
    pub kind: MessageKind,
    #[serde(default)]
    pub title: Option<String>,
    pub message: String,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub buttons: Vec<String>,
}
request!(DialogShowMessage => DialogShowMessage, MessageBoxResult, validate(r) {
    if r.message.is_empty() {
        return Err(BridgeError::validation("message must not be empty"));
    }
    Ok(())
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBoxResult {
    /// Index of the clicked button.
    pub response: usize,
}

// ============================================================================
// window
// ============================================================================

/// Window position and size in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            x: 0,
            y: 0,
            width: 1200,
            height: 800,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowMinimize {}
request!(WindowMinimize => WindowMinimize, ());

/// Toggles maximized state; responds with the new state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowMaximize {}
request!(WindowMaximize => WindowMaximize, bool);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowClose {}
request!(WindowClose => WindowClose, ());

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowFocus {}
request!(WindowFocus => WindowFocus, ());

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowCenter {}
request!(WindowCenter => WindowCenter, Bounds);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowGetBounds {}
request!(WindowGetBounds => WindowGetBounds, Bounds);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSetBounds {
    pub bounds: Bounds,
}
request!(WindowSetBounds => WindowSetBounds, Bounds, validate(r) {
    if r.bounds.width == 0 || r.bounds.height == 0 {
        return Err(BridgeError::validation("bounds must have a non-zero size"));
    }
    Ok(())
});

/// Snapshot of a window's state, also the `window:stateChanged` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowInfo {
    pub id: WindowId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub minimized: bool,
    pub maximized: bool,
    pub focused: bool,
    pub destroyed: bool,
    pub bounds: Bounds,
}

// ============================================================================
// clipboard
// ============================================================================

/// Uncompressed RGBA image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipboardImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl ClipboardImage {
    fn check(&self) -> Result<()> {
        let expected = self.width as usize * self.height as usize * 4;
        if self.rgba.len() != expected {
            return Err(BridgeError::validation(format!(
                "image buffer is {} bytes, expected {expected}",
                self.rgba.len()
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipboardReadText {}
request!(ClipboardReadText => ClipboardReadText, String);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipboardWriteText {
    pub text: String,
}
request!(ClipboardWriteText => ClipboardWriteText, ());

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipboardReadImage {}
request!(ClipboardReadImage => ClipboardReadImage, Option<ClipboardImage>);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipboardWriteImage {
    pub image: ClipboardImage,
}
request!(ClipboardWriteImage => ClipboardWriteImage, (), validate(r) { r.image.check() });

// ============================================================================
// process
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessExec {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub cwd: Option<PathBuf>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}
request!(ProcessExec => ProcessExec, ExecOutput, validate(r) {
    if r.command.trim().is_empty() {
        return Err(BridgeError::validation("command must not be empty"));
    }
    Ok(())
});

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code; `None` when terminated by a signal.
    pub code: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessSpawn {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub cwd: Option<PathBuf>,
    /// Display name; defaults to the command.
    #[serde(default)]
    pub name: Option<String>,
}
request!(ProcessSpawn => ProcessSpawn, ProcessInfo, validate(r) {
    if r.command.trim().is_empty() {
        return Err(BridgeError::validation("command must not be empty"));
    }
    Ok(())
});

/// Tracked-process snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessInfo {
    pub id: u64,
    pub pid: Option<u32>,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub window: WindowId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessKill {
    pub id: u64,
}
request!(ProcessKill => ProcessKill, bool);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessList {}
request!(ProcessList => ProcessList, Vec<ProcessInfo>);

/// `process:output` event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessOutput {
    pub id: u64,
    pub stream: OutputStream,
    pub line: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// `process:exit` event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessExit {
    pub id: u64,
    pub code: Option<i32>,
    pub killed: bool,
}

// ============================================================================
// shell
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellOpenExternal {
    pub url: String,
}
request!(ShellOpenExternal => ShellOpenExternal, (), validate(r) {
    security::validate_external_url(&r.url).map(|_| ())
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellOpenPath {
    pub path: PathBuf,
}
request!(ShellOpenPath => ShellOpenPath, (), validate(r) { require_path(&r.path) });

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellShowItemInFolder {
    pub path: PathBuf,
}
request!(ShellShowItemInFolder => ShellShowItemInFolder, (), validate(r) { require_path(&r.path) });

// ============================================================================
// notification
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationShow {
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub silent: bool,
}
request!(NotificationShow => NotificationShow, (), validate(r) {
    if r.title.trim().is_empty() {
        return Err(BridgeError::validation("notification title must not be empty"));
    }
    Ok(())
});

// ============================================================================
// menu
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: String,
    pub label: String,
    #[serde(default = "enabled_default")]
    pub enabled: bool,
    #[serde(default)]
    pub accelerator: Option<String>,
    #[serde(default)]
    pub separator: bool,
    #[serde(default)]
    pub submenu: Vec<MenuItem>,
}

fn enabled_default() -> bool {
    true
}

impl MenuItem {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            enabled: true,
            ..Default::default()
        }
    }

    pub fn separator() -> Self {
        Self {
            separator: true,
            enabled: true,
            ..Default::default()
        }
    }

    /// Finds an item by id in this subtree.
    pub fn find(&self, id: &str) -> Option<&MenuItem> {
        if !self.separator && self.id == id {
            return Some(self);
        }
        self.submenu.iter().find_map(|child| child.find(id))
    }
}

fn check_menu(items: &[MenuItem]) -> Result<()> {
    for item in items {
        if !item.separator && item.id.is_empty() {
            return Err(BridgeError::validation("menu item id must not be empty"));
        }
        check_menu(&item.submenu)?;
    }
    Ok(())
}

/// Responds with the id of the chosen item, or `None` when dismissed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuShowContext {
    pub items: Vec<MenuItem>,
    #[serde(default)]
    pub x: Option<i32>,
    #[serde(default)]
    pub y: Option<i32>,
}
request!(MenuShowContext => MenuShowContext, Option<String>, validate(r) { check_menu(&r.items) });

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuSetApplication {
    pub items: Vec<MenuItem>,
}
request!(MenuSetApplication => MenuSetApplication, (), validate(r) { check_menu(&r.items) });

// ============================================================================
// app / system
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppGetInfo {}
request!(AppGetInfo => AppGetInfo, AppInfo);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppInfo {
    pub name: String,
    pub version: String,
    pub environment: Environment,
    pub dev_server_url: Option<String>,
    pub open_devtools: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemGetInfo {}
request!(SystemGetInfo => SystemGetInfo, SystemInfo);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemInfo {
    pub platform: String,
    pub arch: String,
    pub family: String,
    pub cpus: usize,
    pub pid: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_channels() {
        assert_eq!(FsReadFile::CHANNEL.as_str(), "fs:readFile");
        assert_eq!(ProcessExec::CHANNEL.as_str(), "process:execCommand");
        assert_eq!(DialogShowOpen::CHANNEL.as_str(), "dialog:showOpenDialog");
    }

    #[test]
    fn test_empty_path_rejected() {
        let req = FsReadFile { path: PathBuf::new() };
        assert!(matches!(req.validate(), Err(BridgeError::Validation(_))));
    }

    #[test]
    fn test_blank_command_rejected() {
        let req = ProcessExec {
            command: "  ".into(),
            ..Default::default()
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_image_size_checked() {
        let bad = ClipboardWriteImage {
            image: ClipboardImage {
                width: 2,
                height: 2,
                rgba: vec![0; 15],
            },
        };
        assert!(bad.validate().is_err());

        let good = ClipboardWriteImage {
            image: ClipboardImage {
                width: 2,
                height: 2,
                rgba: vec![0; 16],
            },
        };
        assert!(good.validate().is_ok());
    }

    #[test]
    fn test_open_external_rejects_file_scheme() {
        let req = ShellOpenExternal {
            url: "file:///etc/passwd".into(),
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_menu_item_find_in_submenu() {
        let mut file = MenuItem::new("file", "File");
        file.submenu = vec![MenuItem::new("open", "Open"), MenuItem::separator()];
        assert_eq!(file.find("open").map(|m| m.label.as_str()), Some("Open"));
        assert!(file.find("missing").is_none());
    }

    #[test]
    fn test_menu_item_enabled_defaults_true() {
        let item: MenuItem =
            serde_json::from_value(serde_json::json!({"id": "a", "label": "A"})).unwrap();
        assert!(item.enabled);
    }

    #[test]
    fn test_camel_case_wire_names() {
        let value = serde_json::to_value(DialogShowOpen {
            multi_selections: true,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(value["multiSelections"], true);
    }
}
