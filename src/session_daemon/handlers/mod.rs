//! Command handlers, grouped by namespace.
//!
//! Each handler is an `async fn(&mut SessionContext, &Args) -> HandlerResult`
//! registered in the router's table.

pub mod actions;
pub mod elements;
pub mod properties;
pub mod screenshot;
pub mod session;
pub mod wait;
pub mod windows;

use super::args::required;
use super::errors::HandlerError;
use super::protocol::Args;
use super::session::SessionContext;
use crate::automation::ElementHandle;

/// Resolves the mandatory `id` argument to a live handle.
pub(crate) async fn resolve_id(
    ctx: &mut SessionContext,
    args: &Args,
) -> Result<(String, ElementHandle), HandlerError> {
    let id: String = required(args, "id")?;
    let handle = ctx.resolve(&id).await?;
    Ok((id, handle))
}

/// Resolves an optional element argument, `None` when the key is absent.
pub(crate) async fn resolve_optional(
    ctx: &mut SessionContext,
    args: &Args,
    key: &str,
) -> Result<Option<ElementHandle>, HandlerError> {
    match super::args::maybe::<String>(args, key)? {
        Some(id) => Ok(Some(ctx.resolve(&id).await?)),
        None => Ok(None),
    }
}
