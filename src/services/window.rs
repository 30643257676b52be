//! `window:*` handlers. Each acts on the calling window.

use crate::api::{
    Bounds, WindowCenter, WindowClose, WindowFocus, WindowGetBounds, WindowMaximize,
    WindowMinimize, WindowSetBounds,
};
use crate::error::{BridgeError, Result};
use crate::handler::InvokeContext;

pub async fn minimize(_: WindowMinimize, ctx: InvokeContext) -> Result<()> {
    ctx.host()?.update_window(ctx.window(), |state| {
        state.minimized = true;
        state.focused = false;
    })?;
    Ok(())
}

pub async fn maximize(_: WindowMaximize, ctx: InvokeContext) -> Result<bool> {
    let info = ctx.host()?.update_window(ctx.window(), |state| {
        state.maximized = !state.maximized;
        state.minimized = false;
    })?;
    Ok(info.maximized)
}

pub async fn close(_: WindowClose, ctx: InvokeContext) -> Result<()> {
    if !ctx.host()?.close_window(ctx.window()) {
        return Err(BridgeError::UnknownWindow(ctx.window()));
    }
    Ok(())
}

pub async fn focus(_: WindowFocus, ctx: InvokeContext) -> Result<()> {
    ctx.host()?.focus_window(ctx.window())?;
    Ok(())
}

pub async fn center(_: WindowCenter, ctx: InvokeContext) -> Result<Bounds> {
    ctx.host()?.center_window(ctx.window())
}

pub async fn get_bounds(_: WindowGetBounds, ctx: InvokeContext) -> Result<Bounds> {
    ctx.host()?
        .window(ctx.window())
        .map(|info| info.bounds)
        .ok_or(BridgeError::UnknownWindow(ctx.window()))
}

pub async fn set_bounds(req: WindowSetBounds, ctx: InvokeContext) -> Result<Bounds> {
    let info = ctx
        .host()?
        .update_window(ctx.window(), |state| state.bounds = req.bounds)?;
    Ok(info.bounds)
}
