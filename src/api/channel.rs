//! Closed catalog of built-in channel names.

use std::fmt;
use std::str::FromStr;

use crate::error::BridgeError;

macro_rules! channels {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// Every built-in `<namespace>:<verb>` channel.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Channel {
            $($variant),+
        }

        impl Channel {
            /// All catalog channels, in declaration order.
            pub const ALL: &'static [Channel] = &[$(Channel::$variant),+];

            /// Wire name of the channel.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Channel::$variant => $name),+
                }
            }
        }

        impl FromStr for Channel {
            type Err = BridgeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(Channel::$variant),)+
                    other => Err(BridgeError::NoHandler(other.to_string())),
                }
            }
        }
    };
}

channels! {
    FsReadFile => "fs:readFile",
    FsWriteFile => "fs:writeFile",
    FsExists => "fs:exists",
    FsMkdir => "fs:mkdir",
    FsReaddir => "fs:readdir",
    FsDelete => "fs:delete",
    DialogShowOpen => "dialog:showOpenDialog",
    DialogShowSave => "dialog:showSaveDialog",
    DialogShowMessage => "dialog:showMessageBox",
    WindowMinimize => "window:minimize",
    WindowMaximize => "window:maximize",
    WindowClose => "window:close",
    WindowFocus => "window:focus",
    WindowCenter => "window:center",
    WindowGetBounds => "window:getBounds",
    WindowSetBounds => "window:setBounds",
    ClipboardReadText => "clipboard:readText",
    ClipboardWriteText => "clipboard:writeText",
    ClipboardReadImage => "clipboard:readImage",
    ClipboardWriteImage => "clipboard:writeImage",
    ProcessExec => "process:execCommand",
    ProcessSpawn => "process:spawn",
    ProcessKill => "process:kill",
    ProcessList => "process:list",
    ShellOpenExternal => "shell:openExternal",
    ShellOpenPath => "shell:openPath",
    ShellShowItemInFolder => "shell:showItemInFolder",
    NotificationShow => "notification:show",
    MenuShowContext => "menu:showContextMenu",
    MenuSetApplication => "menu:setApplicationMenu",
    AppGetInfo => "app:getInfo",
    SystemGetInfo => "system:getInfo",
}

impl Channel {
    /// Namespace part of the wire name (`fs`, `window`, ...).
    pub fn namespace(self) -> &'static str {
        let name = self.as_str();
        name.split_once(':').map(|(ns, _)| ns).unwrap_or(name)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events the host pushes to windows.
pub mod events {
    /// A tracked process wrote a line to stdout or stderr.
    pub const PROCESS_OUTPUT: &str = "process:output";
    /// A tracked process exited.
    pub const PROCESS_EXIT: &str = "process:exit";
    /// A window's minimize/maximize/focus/bounds state changed.
    pub const WINDOW_STATE_CHANGED: &str = "window:stateChanged";
    /// A menu item was activated.
    pub const MENU_CLICK: &str = "menu:click";
}
