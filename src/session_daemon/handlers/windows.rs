//! `window.*` commands.

use super::resolve_optional;
use crate::automation::ElementHandle;
use crate::session_daemon::errors::{HandlerError, HandlerResult};
use crate::session_daemon::protocol::Args;
use crate::session_daemon::session::SessionContext;
use serde_json::json;

pub async fn list(ctx: &mut SessionContext, _args: &Args) -> HandlerResult {
    let target = ctx.require_target()?;
    let windows = ctx.provider().windows(&target.root).await?;
    let descriptors = ctx.describe_all(&windows).await?;
    Ok(json!(descriptors))
}

pub async fn main(ctx: &mut SessionContext, _args: &Args) -> HandlerResult {
    let window = main_window(ctx).await?;
    let descriptor = ctx.describe(&window).await?;
    Ok(json!(descriptor))
}

/// Focuses `id`, or the main window when no id is given.
pub async fn focus(ctx: &mut SessionContext, args: &Args) -> HandlerResult {
    let target = match resolve_optional(ctx, args, "id").await? {
        Some(handle) => handle,
        None => main_window(ctx).await?,
    };
    ctx.provider().focus(&target).await?;
    Ok(json!({ "focused": true }))
}

pub(crate) async fn main_window(ctx: &mut SessionContext) -> Result<ElementHandle, HandlerError> {
    let target = ctx.require_target()?;
    ctx.provider()
        .main_window(&target.root)
        .await?
        .ok_or_else(|| HandlerError::ElementNotFound("main window".to_string()))
}
