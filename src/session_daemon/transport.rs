//! Local channel plumbing: newline framing plus the platform listener.
//!
//! Unix uses a domain socket under the service home directory. Windows uses a
//! named pipe; the listener always keeps one spare instance pending so clients
//! can queue while a connection is being handled.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Bidirectional byte stream to one client.
pub trait Connection: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> Connection for T {}

pub type BoxedConnection = Box<dyn Connection>;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Request exceeds the {limit} byte limit")]
    RequestTooLarge { limit: usize },
    #[error("Connection closed before a message was received")]
    Closed,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

const READ_CHUNK: usize = 4096;

/// Reads one newline-terminated message, without the terminator.
///
/// A peer that half-closes after an unterminated message still gets that
/// message delivered. Fails with [`TransportError::RequestTooLarge`] as soon as
/// more than `limit` bytes arrive without a newline.
pub async fn read_message<R>(reader: &mut R, limit: usize) -> Result<Vec<u8>, TransportError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut message = Vec::new();
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            if message.iter().all(u8::is_ascii_whitespace) {
                return Err(TransportError::Closed);
            }
            break;
        }
        let received = &chunk[..n];
        match received.iter().position(|b| *b == b'\n') {
            Some(end) => {
                message.extend_from_slice(&received[..end]);
                if message.len() > limit {
                    return Err(TransportError::RequestTooLarge { limit });
                }
                break;
            }
            None => {
                message.extend_from_slice(received);
                if message.len() > limit {
                    return Err(TransportError::RequestTooLarge { limit });
                }
            }
        }
    }
    if message.last() == Some(&b'\r') {
        message.pop();
    }
    Ok(message)
}

/// Writes `payload` followed by a newline and flushes.
pub async fn write_message<W>(writer: &mut W, payload: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    writer.write_all(payload).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}

/// Listening end of the service channel.
#[cfg(unix)]
pub struct ChannelListener {
    inner: tokio::net::UnixListener,
    path: PathBuf,
}

#[cfg(unix)]
impl ChannelListener {
    /// Binds the socket, refusing when another service answers on it and
    /// clearing a stale socket file otherwise.
    pub async fn bind(address: &Path) -> Result<Self> {
        if address.exists() {
            if tokio::net::UnixStream::connect(address).await.is_ok() {
                anyhow::bail!(
                    "Another session service is already running on {}",
                    address.display()
                );
            }
            std::fs::remove_file(address).context("Failed to remove stale socket")?;
            tracing::info!(socket = %address.display(), "removed stale socket");
        }
        if let Some(parent) = address.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let inner = tokio::net::UnixListener::bind(address)
            .with_context(|| format!("Failed to bind Unix socket {}", address.display()))?;
        Ok(Self {
            inner,
            path: address.to_path_buf(),
        })
    }

    pub async fn accept(&mut self) -> std::io::Result<BoxedConnection> {
        let (stream, _) = self.inner.accept().await?;
        Ok(Box::new(stream))
    }

    pub fn address(&self) -> &Path {
        &self.path
    }
}

#[cfg(unix)]
impl Drop for ChannelListener {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Opens a client connection to the service.
#[cfg(unix)]
pub async fn connect(address: &Path) -> std::io::Result<BoxedConnection> {
    let stream = tokio::net::UnixStream::connect(address).await?;
    Ok(Box::new(stream))
}

#[cfg(windows)]
pub struct ChannelListener {
    pending: tokio::net::windows::named_pipe::NamedPipeServer,
    path: PathBuf,
}

#[cfg(windows)]
impl ChannelListener {
    pub async fn bind(address: &Path) -> Result<Self> {
        use tokio::net::windows::named_pipe::ServerOptions;

        let pending = ServerOptions::new()
            .first_pipe_instance(true)
            .reject_remote_clients(true)
            .create(address)
            .with_context(|| {
                format!(
                    "Another session service is already running on {}",
                    address.display()
                )
            })?;
        Ok(Self {
            pending,
            path: address.to_path_buf(),
        })
    }

    pub async fn accept(&mut self) -> std::io::Result<BoxedConnection> {
        use tokio::net::windows::named_pipe::ServerOptions;

        self.pending.connect().await?;
        let next = ServerOptions::new()
            .reject_remote_clients(true)
            .create(&self.path)?;
        let connected = std::mem::replace(&mut self.pending, next);
        Ok(Box::new(connected))
    }

    pub fn address(&self) -> &Path {
        &self.path
    }
}

#[cfg(windows)]
pub async fn connect(address: &Path) -> std::io::Result<BoxedConnection> {
    use std::time::Duration;
    use tokio::net::windows::named_pipe::ClientOptions;

    const ERROR_PIPE_BUSY: i32 = 231;
    const BUSY_RETRIES: u32 = 20;

    let mut attempt = 0;
    loop {
        match ClientOptions::new().open(address) {
            Ok(client) => return Ok(Box::new(client)),
            Err(e) if e.raw_os_error() == Some(ERROR_PIPE_BUSY) && attempt < BUSY_RETRIES => {
                attempt += 1;
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
