//! Typed namespaces over the catalog channels.

use std::path::PathBuf;

use super::Bridge;
use crate::api::*;
use crate::error::Result;

macro_rules! namespace {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        pub struct $name<'a> {
            bridge: &'a Bridge,
        }

        impl<'a> $name<'a> {
            pub(super) fn new(bridge: &'a Bridge) -> Self {
                Self { bridge }
            }
        }
    };
}

namespace!(
    /// `fs:*` channels.
    FsApi
);
namespace!(
    /// `dialog:*` channels.
    DialogApi
);
namespace!(
    /// `window:*` channels, acting on the bridge's own window.
    WindowApi
);
namespace!(
    /// `clipboard:*` channels.
    ClipboardApi
);
namespace!(
    /// `process:*` channels.
    ProcessApi
);
namespace!(
    /// `shell:*` channels.
    ShellApi
);
namespace!(NotificationApi);
namespace!(MenuApi);
namespace!(AppApi);
namespace!(SystemApi);

impl FsApi<'_> {
    pub async fn read_file(&self, path: impl Into<PathBuf>) -> Result<String> {
        self.bridge.call(&FsReadFile { path: path.into() }).await
    }

    pub async fn write_file(&self, path: impl Into<PathBuf>, contents: impl Into<String>) -> Result<()> {
        self.bridge
            .call(&FsWriteFile {
                path: path.into(),
                contents: contents.into(),
                append: false,
            })
            .await
    }

    pub async fn append_file(&self, path: impl Into<PathBuf>, contents: impl Into<String>) -> Result<()> {
        self.bridge
            .call(&FsWriteFile {
                path: path.into(),
                contents: contents.into(),
                append: true,
            })
            .await
    }

    pub async fn exists(&self, path: impl Into<PathBuf>) -> Result<bool> {
        self.bridge.call(&FsExists { path: path.into() }).await
    }

    pub async fn mkdir(&self, path: impl Into<PathBuf>, recursive: bool) -> Result<()> {
        self.bridge
            .call(&FsMkdir {
                path: path.into(),
                recursive,
            })
            .await
    }

    pub async fn readdir(&self, path: impl Into<PathBuf>) -> Result<Vec<DirEntry>> {
        self.bridge.call(&FsReaddir { path: path.into() }).await
    }

    pub async fn delete(&self, path: impl Into<PathBuf>, recursive: bool) -> Result<()> {
        self.bridge
            .call(&FsDelete {
                path: path.into(),
                recursive,
            })
            .await
    }
}

impl DialogApi<'_> {
    pub async fn show_open(&self, options: DialogShowOpen) -> Result<OpenDialogResult> {
        self.bridge.call(&options).await
    }

    pub async fn show_save(&self, options: DialogShowSave) -> Result<SaveDialogResult> {
        self.bridge.call(&options).await
    }

    pub async fn show_message(&self, options: DialogShowMessage) -> Result<MessageBoxResult> {
        self.bridge.call(&options).await
    }
}

impl WindowApi<'_> {
    pub async fn minimize(&self) -> Result<()> {
        self.bridge.call(&WindowMinimize {}).await
    }

    /// Toggle maximized; returns the new state.
    pub async fn maximize(&self) -> Result<bool> {
        self.bridge.call(&WindowMaximize {}).await
    }

    pub async fn close(&self) -> Result<()> {
        self.bridge.call(&WindowClose {}).await
    }

    pub async fn focus(&self) -> Result<()> {
        self.bridge.call(&WindowFocus {}).await
    }

    pub async fn center(&self) -> Result<Bounds> {
        self.bridge.call(&WindowCenter {}).await
    }

    pub async fn bounds(&self) -> Result<Bounds> {
        self.bridge.call(&WindowGetBounds {}).await
    }

    pub async fn set_bounds(&self, bounds: Bounds) -> Result<Bounds> {
        self.bridge.call(&WindowSetBounds { bounds }).await
    }
}

impl ClipboardApi<'_> {
    pub async fn read_text(&self) -> Result<String> {
        self.bridge.call(&ClipboardReadText {}).await
    }

    pub async fn write_text(&self, text: impl Into<String>) -> Result<()> {
        self.bridge
            .call(&ClipboardWriteText { text: text.into() })
            .await
    }

    pub async fn read_image(&self) -> Result<Option<ClipboardImage>> {
        self.bridge.call(&ClipboardReadImage {}).await
    }

    pub async fn write_image(&self, image: ClipboardImage) -> Result<()> {
        self.bridge.call(&ClipboardWriteImage { image }).await
    }
}

impl ProcessApi<'_> {
    /// Run to completion and collect output.
    pub async fn exec(&self, request: ProcessExec) -> Result<ExecOutput> {
        self.bridge.call(&request).await
    }

    /// Start a tracked process. Output and exit arrive as
    /// `process:output` / `process:exit` events.
    pub async fn spawn(&self, request: ProcessSpawn) -> Result<ProcessInfo> {
        self.bridge.call(&request).await
    }

    pub async fn kill(&self, id: u64) -> Result<bool> {
        self.bridge.call(&ProcessKill { id }).await
    }

    pub async fn list(&self) -> Result<Vec<ProcessInfo>> {
        self.bridge.call(&ProcessList {}).await
    }
}

impl ShellApi<'_> {
    pub async fn open_external(&self, url: impl Into<String>) -> Result<()> {
        self.bridge
            .call(&ShellOpenExternal { url: url.into() })
            .await
    }

    pub async fn open_path(&self, path: impl Into<PathBuf>) -> Result<()> {
        self.bridge.call(&ShellOpenPath { path: path.into() }).await
    }

    pub async fn show_item_in_folder(&self, path: impl Into<PathBuf>) -> Result<()> {
        self.bridge
            .call(&ShellShowItemInFolder { path: path.into() })
            .await
    }
}

impl NotificationApi<'_> {
    pub async fn show(&self, title: impl Into<String>, body: impl Into<String>) -> Result<()> {
        self.bridge
            .call(&NotificationShow {
                title: title.into(),
                body: body.into(),
                silent: false,
            })
            .await
    }
}

impl MenuApi<'_> {
    /// Pop up a context menu; returns the chosen item id.
    pub async fn show_context(&self, menu: MenuShowContext) -> Result<Option<String>> {
        self.bridge.call(&menu).await
    }

    pub async fn set_application(&self, items: Vec<MenuItem>) -> Result<()> {
        self.bridge.call(&MenuSetApplication { items }).await
    }
}

impl AppApi<'_> {
    pub async fn info(&self) -> Result<AppInfo> {
        self.bridge.call(&AppGetInfo {}).await
    }
}

impl SystemApi<'_> {
    pub async fn info(&self) -> Result<SystemInfo> {
        self.bridge.call(&SystemGetInfo {}).await
    }
}
