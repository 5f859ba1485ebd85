//! Command registry and dispatch.
//!
//! Commands are looked up by their lowercased name in a table built once at
//! startup. The router is the only place that turns a `HandlerError` into a
//! response; handlers just return `Result`.

use super::errors::HandlerResult;
use super::handlers::{actions, elements, properties, screenshot, session, wait, windows};
use super::protocol::{Args, ErrorCode, Request, Response};
use super::session::SessionContext;
use crate::automation::ProviderError;
use futures::future::BoxFuture;
use serde_json::Value;
use std::collections::HashMap;

pub type HandlerFn =
    for<'a> fn(&'a mut SessionContext, &'a Args) -> BoxFuture<'a, HandlerResult>;

/// Commands that only observe the service and do not keep it alive.
const PASSIVE_COMMANDS: &[&str] = &["ping", "status"];

/// Adapts an `async fn(&mut SessionContext, &Args) -> HandlerResult` to [`HandlerFn`].
macro_rules! handler {
    ($f:path) => {{
        fn boxed<'a>(
            ctx: &'a mut SessionContext,
            args: &'a Args,
        ) -> BoxFuture<'a, HandlerResult> {
            Box::pin($f(ctx, args))
        }
        boxed as HandlerFn
    }};
}

/// Outcome of dispatching one request.
#[derive(Debug)]
pub struct Dispatch {
    pub response: Response,
    /// Whether the request should reset the idle clock once processed.
    pub activity: bool,
}

pub struct CommandRouter {
    handlers: HashMap<&'static str, HandlerFn>,
}

impl Default for CommandRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRouter {
    pub fn new() -> Self {
        let entries: [(&'static str, HandlerFn); 35] = [
            ("ping", handler!(session::ping)),
            ("status", handler!(session::status)),
            ("process.list", handler!(session::process_list)),
            ("connect", handler!(session::connect)),
            ("disconnect", handler!(session::disconnect)),
            ("shutdown", handler!(session::shutdown)),
            ("window.list", handler!(windows::list)),
            ("window.main", handler!(windows::main)),
            ("window.focus", handler!(windows::focus)),
            ("element.tree", handler!(elements::tree)),
            ("element.find", handler!(elements::find)),
            ("element.info", handler!(elements::info)),
            ("action.click", handler!(actions::click)),
            ("action.rightclick", handler!(actions::right_click)),
            ("action.doubleclick", handler!(actions::double_click)),
            ("action.clear", handler!(actions::clear)),
            ("action.check", handler!(actions::check)),
            ("action.uncheck", handler!(actions::uncheck)),
            ("action.toggle", handler!(actions::toggle)),
            ("action.expand", handler!(actions::expand)),
            ("action.collapse", handler!(actions::collapse)),
            ("action.invoke", handler!(actions::invoke)),
            ("action.type", handler!(actions::type_text)),
            ("action.press", handler!(actions::press)),
            ("action.select", handler!(actions::select)),
            ("get.text", handler!(properties::text)),
            ("get.value", handler!(properties::value)),
            ("get.state", handler!(properties::state)),
            ("get.patterns", handler!(properties::patterns)),
            ("wait.element", handler!(wait::element)),
            ("wait.gone", handler!(wait::gone)),
            ("wait.enabled", handler!(wait::enabled)),
            ("screenshot", handler!(screenshot::to_file)),
            ("screenshot.base64", handler!(screenshot::to_base64)),
            ("version", handler!(session::version)),
        ];
        Self {
            handlers: entries.into_iter().collect(),
        }
    }

    /// Registered command names, sorted.
    #[cfg(test)]
    pub fn commands(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.handlers.keys().copied().collect();
        names.sort_unstable();
        names
    }

    #[cfg(test)]
    pub fn contains(&self, command: &str) -> bool {
        self.handlers.contains_key(command.to_ascii_lowercase().as_str())
    }

    pub async fn dispatch(&self, ctx: &mut SessionContext, request: &Request) -> Dispatch {
        let key = request.command.to_ascii_lowercase();
        let Some(handler) = self.handlers.get(key.as_str()) else {
            tracing::warn!(command = %request.command, "unknown command");
            return Dispatch {
                response: Response::failure(
                    ErrorCode::CommandError,
                    format!("Unknown command: {}", request.command),
                ),
                activity: false,
            };
        };

        let started = tokio::time::Instant::now();
        let result = reject_null(&key, handler(ctx, &request.args).await);
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let response = match result {
            Ok(data) => {
                tracing::debug!(command = %key, elapsed_ms, "command succeeded");
                Response::success(data)
            }
            Err(e) => {
                tracing::info!(command = %key, elapsed_ms, error = %e, "command failed");
                Response::failure(ErrorCode::CommandError, e.to_string())
            }
        };

        Dispatch {
            response,
            activity: !PASSIVE_COMMANDS.contains(&key.as_str()),
        }
    }
}

/// A success envelope always carries data, so a null result is reported as
/// unsupported.
fn reject_null(command: &str, result: HandlerResult) -> HandlerResult {
    match result {
        Ok(Value::Null) => Err(ProviderError::Unsupported(format!(
            "'{}' produced no value for this element",
            command
        ))
        .into()),
        other => other,
    }
}

#[cfg(test)]
#[path = "tests/router_tests.rs"]
mod tests;
