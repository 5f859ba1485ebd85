//! `wait.*` commands: poll the provider until a condition holds or the
//! deadline passes.

use super::elements::criteria_from_args;
use crate::automation::{FindCriteria, ProviderError};
use crate::session_daemon::args::{optional, required, ArgumentError};
use crate::session_daemon::errors::{HandlerError, HandlerResult};
use crate::session_daemon::protocol::Args;
use crate::session_daemon::session::SessionContext;
use serde_json::json;
use std::time::Duration;
use tokio::time::Instant;

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Sleeps until the next poll, or returns false once `deadline` has passed.
async fn next_poll(deadline: Instant) -> bool {
    let now = Instant::now();
    if now >= deadline {
        return false;
    }
    tokio::time::sleep(POLL_INTERVAL.min(deadline - now)).await;
    true
}

fn describe_criteria(criteria: &FindCriteria) -> String {
    let mut parts = Vec::new();
    if let Some(aid) = &criteria.automation_id {
        parts.push(format!("aid={}", aid));
    }
    if let Some(name) = &criteria.name {
        parts.push(format!("name={}", name));
    }
    if let Some(ty) = &criteria.control_type {
        parts.push(format!("type={}", ty));
    }
    if let Some(class) = &criteria.class_name {
        parts.push(format!("class={}", class));
    }
    format!("element {}", parts.join(" "))
}

pub async fn element(ctx: &mut SessionContext, args: &Args) -> HandlerResult {
    let criteria = criteria_from_args(args)?;
    if criteria.is_empty() {
        return Err(ArgumentError::Conflict(
            "At least one of 'aid', 'name', 'type' or 'class' is required".to_string(),
        )
        .into());
    }
    let timeout_ms: u64 = optional(args, "timeout", DEFAULT_TIMEOUT_MS)?;
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);
    let root = ctx.require_target()?.root;

    loop {
        let found = ctx.provider().find_descendants(&root, &criteria, true).await?;
        if let Some(handle) = found.first() {
            match ctx.describe(handle).await {
                Ok(descriptor) => return Ok(json!(descriptor)),
                Err(HandlerError::Provider(ProviderError::ElementUnavailable)) => {}
                Err(e) => return Err(e),
            }
        }
        if !next_poll(deadline).await {
            return Err(HandlerError::WaitTimeout {
                what: describe_criteria(&criteria),
                timeout_ms,
            });
        }
    }
}

/// Reports `{gone: true}` once the element no longer resolves or is offscreen.
pub async fn gone(ctx: &mut SessionContext, args: &Args) -> HandlerResult {
    let id: String = required(args, "id")?;
    let timeout_ms: u64 = optional(args, "timeout", DEFAULT_TIMEOUT_MS)?;
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);

    loop {
        let Some(handle) = ctx.probe(&id).await? else {
            return Ok(json!({ "gone": true }));
        };
        match ctx.provider().describe(&handle).await {
            Ok(info) if info.is_offscreen => return Ok(json!({ "gone": true })),
            Ok(_) => {}
            Err(ProviderError::ElementUnavailable) => return Ok(json!({ "gone": true })),
            Err(e) => return Err(e.into()),
        }
        if !next_poll(deadline).await {
            return Ok(json!({ "gone": false }));
        }
    }
}

/// Reports `{enabled: true}` as soon as the element is enabled, and
/// `{enabled: false}` when the deadline passes first.
pub async fn enabled(ctx: &mut SessionContext, args: &Args) -> HandlerResult {
    let id: String = required(args, "id")?;
    let timeout_ms: u64 = optional(args, "timeout", DEFAULT_TIMEOUT_MS)?;
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);

    loop {
        let descriptor = ctx.describe_id(&id).await?;
        if descriptor.info.is_enabled {
            return Ok(json!({ "enabled": true }));
        }
        if !next_poll(deadline).await {
            return Ok(json!({ "enabled": false }));
        }
    }
}
