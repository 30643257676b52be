//! Built-in handlers for the channel catalog.
//!
//! [`install`] registers one handler per [`Channel`]. The match is
//! exhaustive, so adding a catalog channel without a service does not
//! compile.

mod fs;
mod info;
mod native;
mod process;
mod window;

use crate::api::Channel;
use crate::handler::{HandlerOptions, HandlerRegistry};

/// Register a handler for every catalog channel not already handled.
///
/// Returns how many built-ins were installed.
pub fn install(registry: &mut HandlerRegistry) -> usize {
    let mut installed = 0;
    for &channel in Channel::ALL {
        if registry.has_handler(channel.as_str()) {
            tracing::debug!(channel = %channel, "application handler overrides built-in");
            continue;
        }

        let options = HandlerOptions::new();
        let accepted = match channel {
            Channel::FsReadFile => registry.register_request(options, fs::read_file),
            Channel::FsWriteFile => registry.register_request(options, fs::write_file),
            Channel::FsExists => registry.register_request(options, fs::exists),
            Channel::FsMkdir => registry.register_request(options, fs::mkdir),
            Channel::FsReaddir => registry.register_request(options, fs::readdir),
            Channel::FsDelete => registry.register_request(options, fs::delete),

            Channel::DialogShowOpen => registry.register_request(options, native::show_open_dialog),
            Channel::DialogShowSave => registry.register_request(options, native::show_save_dialog),
            Channel::DialogShowMessage => registry.register_request(options, native::show_message_box),

            Channel::WindowMinimize => registry.register_request(options, window::minimize),
            Channel::WindowMaximize => registry.register_request(options, window::maximize),
            Channel::WindowClose => registry.register_request(options, window::close),
            Channel::WindowFocus => registry.register_request(options, window::focus),
            Channel::WindowCenter => registry.register_request(options, window::center),
            Channel::WindowGetBounds => registry.register_request(options, window::get_bounds),
            Channel::WindowSetBounds => registry.register_request(options, window::set_bounds),

            Channel::ClipboardReadText => registry.register_request(options, native::read_clipboard_text),
            Channel::ClipboardWriteText => registry.register_request(options, native::write_clipboard_text),
            Channel::ClipboardReadImage => registry.register_request(options, native::read_clipboard_image),
            Channel::ClipboardWriteImage => registry.register_request(options, native::write_clipboard_image),

            Channel::ProcessExec => registry.register_request(options, process::exec),
            Channel::ProcessSpawn => registry.register_request(options, process::spawn),
            Channel::ProcessKill => registry.register_request(options, process::kill),
            Channel::ProcessList => registry.register_request(options, process::list),

            Channel::ShellOpenExternal => registry.register_request(options, native::open_external),
            Channel::ShellOpenPath => registry.register_request(options, native::open_path),
            Channel::ShellShowItemInFolder => registry.register_request(options, native::show_item_in_folder),

            Channel::NotificationShow => registry.register_request(options, native::show_notification),

            Channel::MenuShowContext => registry.register_request(options, native::show_context_menu),
            Channel::MenuSetApplication => registry.register_request(options, native::set_application_menu),

            Channel::AppGetInfo => registry.register_request(options, info::app_info),
            Channel::SystemGetInfo => registry.register_request(options, info::system_info),
        };
        if accepted {
            installed += 1;
        }
    }
    tracing::debug!(installed, "built-in services installed");
    installed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_installs_every_channel() {
        let mut registry = HandlerRegistry::new();
        assert_eq!(install(&mut registry), Channel::ALL.len());
        for channel in Channel::ALL {
            assert!(registry.has_handler(channel.as_str()), "{channel} missing");
        }
    }

    #[test]
    fn test_application_handler_wins() {
        let mut registry = HandlerRegistry::new();
        registry.register_handler("fs:exists", HandlerOptions::new(), |_: (), _ctx| async {
            Ok(false)
        });
        assert_eq!(install(&mut registry), Channel::ALL.len() - 1);
        assert_eq!(install(&mut registry), 0);
    }
}
