//! `get.*` commands, each a single provider property read.

use super::resolve_id;
use crate::automation::Property;
use crate::session_daemon::errors::HandlerResult;
use crate::session_daemon::protocol::Args;
use crate::session_daemon::session::SessionContext;

async fn read(ctx: &mut SessionContext, args: &Args, property: Property) -> HandlerResult {
    let (_, handle) = resolve_id(ctx, args).await?;
    Ok(ctx.provider().read(&handle, property).await?)
}

pub async fn text(ctx: &mut SessionContext, args: &Args) -> HandlerResult {
    read(ctx, args, Property::Text).await
}

pub async fn value(ctx: &mut SessionContext, args: &Args) -> HandlerResult {
    read(ctx, args, Property::Value).await
}

/// `{enabled, offscreen, focused}` plus `toggleState`, `expanded` and
/// `selected` when the element supports them.
pub async fn state(ctx: &mut SessionContext, args: &Args) -> HandlerResult {
    read(ctx, args, Property::State).await
}

pub async fn patterns(ctx: &mut SessionContext, args: &Args) -> HandlerResult {
    read(ctx, args, Property::Patterns).await
}
