//! Long-lived session service for UI automation.
//!
//! Short-lived client invocations cannot hold automation handles, so a single
//! background service keeps the attached application and every element the
//! clients have seen, and answers one request per connection over a local
//! channel.
//!
//! ## Architecture
//!
//! - **Server (`server.rs`)**: accept loop that handles one connection at a
//!   time and owns the session for the process lifetime.
//! - **Router (`router.rs`)**: command registry; turns handler results into
//!   response envelopes.
//! - **Handlers (`handlers/`)**: one module per command namespace.
//! - **Session (`session.rs`)**: attached target, provider and identity cache.
//! - **Identity cache (`identity_cache.rs`)**: stable ids for ephemeral handles.
//! - **Idle (`idle.rs`)**: shuts the service down after a quiet period.
//! - **Transport (`transport.rs`)**: newline framing over a Unix socket or
//!   Windows named pipe.
//! - **Client (`client.rs`)**: connect-or-spawn launcher used by the CLI.
//! - **Protocol (`protocol.rs`)**: request and response envelopes.

pub mod args;
pub mod client;
pub mod errors;
pub mod handlers;
pub mod identity_cache;
pub mod idle;
pub mod protocol;
pub mod router;
pub mod server;
pub mod session;
pub mod transport;

pub use client::SessionClient;
pub use protocol::{Request, Response};
pub use server::run_service;
