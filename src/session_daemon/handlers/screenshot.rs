//! Screen capture. Without `elementId` the whole desktop is captured and no
//! attached application is needed.

use super::resolve_optional;
use crate::session_daemon::args::maybe;
use crate::session_daemon::errors::{HandlerError, HandlerResult};
use crate::session_daemon::protocol::Args;
use crate::session_daemon::session::SessionContext;
use base64::Engine;
use serde_json::json;
use std::path::PathBuf;

async fn capture(ctx: &mut SessionContext, args: &Args) -> Result<Vec<u8>, HandlerError> {
    let element = resolve_optional(ctx, args, "elementId").await?;
    Ok(ctx.provider().capture(element.as_ref()).await?)
}

fn default_file_name() -> String {
    format!(
        "screenshot_{}.png",
        chrono::Utc::now().format("%Y%m%d_%H%M%S%3f")
    )
}

/// Writes a PNG to `output`, or to a timestamped file in the screenshot directory.
pub async fn to_file(ctx: &mut SessionContext, args: &Args) -> HandlerResult {
    let output: Option<String> = maybe(args, "output")?;
    let png = capture(ctx, args).await?;

    let path = match output {
        Some(output) => PathBuf::from(output),
        None => ctx.screenshot_dir().join(default_file_name()),
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            HandlerError::io(format!("Failed to create {}", parent.display()), e)
        })?;
    }
    tokio::fs::write(&path, &png)
        .await
        .map_err(|e| HandlerError::io(format!("Failed to write {}", path.display()), e))?;

    tracing::info!(path = %path.display(), bytes = png.len(), "screenshot saved");
    Ok(json!({ "path": path.display().to_string() }))
}

pub async fn to_base64(ctx: &mut SessionContext, args: &Args) -> HandlerResult {
    let png = capture(ctx, args).await?;
    Ok(json!({ "base64": base64::engine::general_purpose::STANDARD.encode(png) }))
}
