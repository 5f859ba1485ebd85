mod automation;
mod cli;
mod config;
mod logging;
mod paths;
mod session_daemon;
#[cfg(test)]
mod test_support;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::{ClientConfig, ServiceConfig};
use serde_json::Value;
use session_daemon::{Request, Response, SessionClient};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "uiauto")]
#[command(about = "Desktop UI automation through a persistent session service")]
#[command(version)]
#[command(long_version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("UIAUTO_GIT_SHA"), ")"))]
#[command(arg_required_else_help = true)]
struct Cli {
    /// Channel address (socket path or pipe name). Defaults to $UIAUTO_SOCKET
    /// or the per-user location
    #[arg(long, global = true)]
    socket: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the session service in the foreground
    Serve {
        /// Seconds of inactivity before the service exits (0 disables)
        #[arg(long)]
        idle_timeout_secs: Option<u64>,

        /// Serve a fixture desktop described by a YAML or JSON file
        #[arg(long)]
        fixture: Option<PathBuf>,

        /// Default directory for screenshot files
        #[arg(long)]
        screenshot_dir: Option<PathBuf>,

        /// Log to stderr instead of the service log file
        #[arg(long)]
        log_stderr: bool,
    },

    /// Send one command to the service, starting it if needed
    Call {
        /// Command name, e.g. `element.find`
        command: String,

        /// Arguments as key=value; values are parsed as JSON when possible
        #[arg(value_parser = cli::parse_pair)]
        pairs: Vec<(String, Value)>,

        /// Arguments as a JSON object; key=value pairs take precedence
        #[arg(long)]
        args: Option<String>,

        /// Give up waiting for the response after this many milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Fail instead of starting the service when none is running
        #[arg(long)]
        no_spawn: bool,
    },

    /// Check whether a service is running (never starts one)
    Ping,

    /// Stop the running service (never starts one)
    Shutdown,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let address = match cli.socket {
        Some(path) => path,
        None => paths::channel_address()?,
    };

    match cli.command {
        Command::Serve {
            idle_timeout_secs,
            fixture,
            screenshot_dir,
            log_stderr,
        } => {
            if log_stderr {
                logging::init_stderr_logging();
            } else {
                logging::init_service_logging(&paths::service_log_path()?)?;
            }

            let mut config = ServiceConfig::load().context("Failed to load service config")?;
            if let Some(secs) = idle_timeout_secs {
                config.idle_timeout_secs = secs;
            }
            if fixture.is_some() {
                config.fixture = fixture;
            }
            if screenshot_dir.is_some() {
                config.screenshot_dir = screenshot_dir;
            }

            if let Err(e) = session_daemon::run_service(config, &address).await {
                tracing::error!(error = %format!("{:#}", e), "session service failed");
                return Err(e);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Call {
            command,
            pairs,
            args,
            timeout_ms,
            no_spawn,
        } => {
            logging::init_client_logging();
            let mut config = ClientConfig::default();
            if let Some(ms) = timeout_ms {
                config.call_timeout = Duration::from_millis(ms);
            }
            config.auto_spawn = !no_spawn;

            let request = Request {
                command,
                args: cli::build_args(args.as_deref(), pairs)?,
            };
            let response = SessionClient::new(address, config).call(&request).await;
            print_response(&response)
        }
        Command::Ping => {
            logging::init_client_logging();
            let config = ClientConfig::default();
            let timeout = config.ping_timeout;
            let response = SessionClient::new(address, config)
                .send(&Request::new("ping"), timeout)
                .await
                .unwrap_or_else(|e| e.into_response());
            print_response(&response)
        }
        Command::Shutdown => {
            logging::init_client_logging();
            let response = SessionClient::new(address, ClientConfig::default())
                .shutdown()
                .await;
            print_response(&response)
        }
    }
}

/// Prints the envelope as JSON; failures map to a non-zero exit code.
fn print_response(response: &Response) -> Result<ExitCode> {
    println!("{}", serde_json::to_string_pretty(response)?);
    Ok(if response.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
