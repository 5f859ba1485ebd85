//! `element.*` commands: tree snapshots, searches and single-element info.

use super::resolve_optional;
use super::windows::main_window;
use crate::automation::FindCriteria;
use crate::session_daemon::args::{maybe, optional, required};
use crate::session_daemon::errors::{HandlerError, HandlerResult};
use crate::session_daemon::protocol::Args;
use crate::session_daemon::session::SessionContext;
use serde_json::json;

const DEFAULT_TREE_DEPTH: i64 = 5;

/// Returns a one-element array holding the subtree under `rootId`, the main
/// window, or the application root, in that order of preference.
pub async fn tree(ctx: &mut SessionContext, args: &Args) -> HandlerResult {
    let depth = optional(args, "depth", DEFAULT_TREE_DEPTH)?.clamp(0, i64::from(u32::MAX));
    let depth = u32::try_from(depth).unwrap_or(u32::MAX);

    let root = match resolve_optional(ctx, args, "rootId").await? {
        Some(handle) => handle,
        None => match main_window(ctx).await {
            Ok(window) => window,
            Err(HandlerError::ElementNotFound(_)) => ctx.require_target()?.root,
            Err(e) => return Err(e),
        },
    };

    let node = ctx.tree(root, depth).await?;
    Ok(json!([node]))
}

pub async fn find(ctx: &mut SessionContext, args: &Args) -> HandlerResult {
    let criteria = criteria_from_args(args)?;
    let first: bool = optional(args, "first", false)?;
    let scope = match resolve_optional(ctx, args, "parent").await? {
        Some(parent) => parent,
        None => ctx.require_target()?.root,
    };

    let found = ctx
        .provider()
        .find_descendants(&scope, &criteria, first)
        .await?;
    let descriptors = ctx.describe_all(&found).await?;
    Ok(json!(descriptors))
}

pub async fn info(ctx: &mut SessionContext, args: &Args) -> HandlerResult {
    let id: String = required(args, "id")?;
    let descriptor = ctx.describe_id(&id).await?;
    Ok(json!(descriptor))
}

/// Reads `aid`, `name`, `type` and `class` into search criteria.
pub(crate) fn criteria_from_args(args: &Args) -> Result<FindCriteria, HandlerError> {
    Ok(FindCriteria {
        automation_id: maybe(args, "aid")?,
        name: maybe(args, "name")?,
        control_type: maybe(args, "type")?,
        class_name: maybe(args, "class")?,
    })
}

