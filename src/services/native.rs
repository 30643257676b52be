//! Handlers backed by the host's [`Platform`](crate::platform::Platform):
//! dialogs, clipboard, shell, notifications and menus.

use std::sync::Arc;

use crate::api::*;
use crate::error::Result;
use crate::handler::InvokeContext;
use crate::platform::Platform;
use crate::security;

fn platform(ctx: &InvokeContext) -> Result<Arc<dyn Platform>> {
    Ok(ctx.host()?.platform().clone())
}

pub async fn show_open_dialog(req: DialogShowOpen, ctx: InvokeContext) -> Result<OpenDialogResult> {
    platform(&ctx)?.show_open_dialog(ctx.window(), &req).await
}

pub async fn show_save_dialog(req: DialogShowSave, ctx: InvokeContext) -> Result<SaveDialogResult> {
    platform(&ctx)?.show_save_dialog(ctx.window(), &req).await
}

pub async fn show_message_box(req: DialogShowMessage, ctx: InvokeContext) -> Result<MessageBoxResult> {
    platform(&ctx)?.show_message_box(ctx.window(), &req).await
}

pub async fn read_clipboard_text(_: ClipboardReadText, ctx: InvokeContext) -> Result<String> {
    platform(&ctx)?.read_clipboard_text().await
}

pub async fn write_clipboard_text(req: ClipboardWriteText, ctx: InvokeContext) -> Result<()> {
    platform(&ctx)?.write_clipboard_text(&req.text).await
}

pub async fn read_clipboard_image(
    _: ClipboardReadImage,
    ctx: InvokeContext,
) -> Result<Option<ClipboardImage>> {
    platform(&ctx)?.read_clipboard_image().await
}

pub async fn write_clipboard_image(req: ClipboardWriteImage, ctx: InvokeContext) -> Result<()> {
    platform(&ctx)?.write_clipboard_image(&req.image).await
}

pub async fn open_external(req: ShellOpenExternal, ctx: InvokeContext) -> Result<()> {
    let url = security::validate_external_url(&req.url)?;
    tracing::info!(url = %url, window = ctx.window(), "opening external URL");
    platform(&ctx)?.open_external(&url).await
}

pub async fn open_path(req: ShellOpenPath, ctx: InvokeContext) -> Result<()> {
    platform(&ctx)?.open_path(&req.path).await
}

pub async fn show_item_in_folder(req: ShellShowItemInFolder, ctx: InvokeContext) -> Result<()> {
    platform(&ctx)?.show_item_in_folder(&req.path).await
}

pub async fn show_notification(req: NotificationShow, ctx: InvokeContext) -> Result<()> {
    platform(&ctx)?.show_notification(&req).await
}

/// Also emits `menu:click` with the chosen id to the calling window.
pub async fn show_context_menu(req: MenuShowContext, ctx: InvokeContext) -> Result<Option<String>> {
    let choice = platform(&ctx)?.show_context_menu(ctx.window(), &req).await?;
    if let Some(id) = &choice {
        ctx.emit(events::MENU_CLICK, id)?;
    }
    Ok(choice)
}

pub async fn set_application_menu(req: MenuSetApplication, ctx: InvokeContext) -> Result<()> {
    platform(&ctx)?.set_application_menu(&req.items).await
}
