//! Session lifecycle commands.

use crate::automation::AttachTarget;
use crate::session_daemon::args::{maybe, ArgumentError};
use crate::session_daemon::errors::HandlerResult;
use crate::session_daemon::protocol::Args;
use crate::session_daemon::session::SessionContext;
use serde_json::json;

pub async fn ping(_ctx: &mut SessionContext, _args: &Args) -> HandlerResult {
    Ok(json!("pong"))
}

pub async fn status(ctx: &mut SessionContext, _args: &Args) -> HandlerResult {
    ctx.refresh_target().await;
    Ok(match ctx.target() {
        Some(target) => json!({
            "connected": true,
            "processId": target.process_id,
            "processName": target.process_name,
        }),
        None => json!({
            "connected": false,
            "processId": null,
            "processName": null,
        }),
    })
}

pub async fn version(_ctx: &mut SessionContext, _args: &Args) -> HandlerResult {
    Ok(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "gitSha": env!("UIAUTO_GIT_SHA"),
    }))
}

pub async fn process_list(ctx: &mut SessionContext, _args: &Args) -> HandlerResult {
    let processes = ctx.provider().list_processes().await?;
    Ok(json!(processes))
}

pub async fn connect(ctx: &mut SessionContext, args: &Args) -> HandlerResult {
    let pid: Option<u32> = maybe(args, "pid")?;
    let name: Option<String> = maybe(args, "name")?;
    let target = match (pid, name) {
        (Some(pid), None) => AttachTarget::Pid(pid),
        (None, Some(name)) => AttachTarget::Name(name),
        (Some(_), Some(_)) => {
            return Err(ArgumentError::Conflict(
                "Specify either 'pid' or 'name', not both".to_string(),
            )
            .into())
        }
        (None, None) => {
            return Err(
                ArgumentError::Conflict("Either 'pid' or 'name' is required".to_string()).into(),
            )
        }
    };

    let attached = ctx.attach(&target).await?;
    Ok(json!({
        "connected": true,
        "processId": attached.process_id,
        "processName": attached.process_name,
    }))
}

pub async fn disconnect(ctx: &mut SessionContext, _args: &Args) -> HandlerResult {
    ctx.detach();
    Ok(json!({ "disconnected": true }))
}

pub async fn shutdown(ctx: &mut SessionContext, _args: &Args) -> HandlerResult {
    tracing::info!("shutdown requested by client");
    ctx.request_shutdown();
    Ok(json!({ "shutdown": true }))
}
