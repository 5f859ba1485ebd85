use super::*;
use tokio::io::AsyncWriteExt;

#[tokio::test]
async fn test_read_message_stops_at_newline() {
    let (mut client, mut server) = tokio::io::duplex(1024);
    client
        .write_all(b"{\"command\":\"ping\"}\r\ntrailing")
        .await
        .unwrap();
    let message = read_message(&mut server, 1024).await.unwrap();
    assert_eq!(message, b"{\"command\":\"ping\"}");
}

#[tokio::test]
async fn test_read_message_across_chunks() {
    let (mut client, mut server) = tokio::io::duplex(64);
    let payload = vec![b'a'; 10_000];
    let writer = tokio::spawn(async move {
        client.write_all(&payload).await.unwrap();
        client.write_all(b"\n").await.unwrap();
    });
    let message = read_message(&mut server, 64 * 1024).await.unwrap();
    assert_eq!(message.len(), 10_000);
    writer.await.unwrap();
}

#[tokio::test]
async fn test_read_message_accepts_unterminated_message_at_eof() {
    let (mut client, mut server) = tokio::io::duplex(1024);
    client.write_all(b"{\"command\":\"status\"}").await.unwrap();
    drop(client);
    let message = read_message(&mut server, 1024).await.unwrap();
    assert_eq!(message, b"{\"command\":\"status\"}");
}

#[tokio::test]
async fn test_read_message_empty_connection_is_closed() {
    let (client, mut server) = tokio::io::duplex(1024);
    drop(client);
    assert!(matches!(
        read_message(&mut server, 1024).await,
        Err(TransportError::Closed)
    ));
}

#[tokio::test]
async fn test_read_message_enforces_limit() {
    let (mut client, mut server) = tokio::io::duplex(64 * 1024);
    let writer = tokio::spawn(async move {
        let _ = client.write_all(&vec![b'x'; 5000]).await;
        client
    });
    let err = read_message(&mut server, 1000).await.unwrap_err();
    assert!(matches!(err, TransportError::RequestTooLarge { limit: 1000 }));
    drop(writer.await.unwrap());
}

#[tokio::test]
async fn test_write_message_appends_newline() {
    let (mut client, mut server) = tokio::io::duplex(1024);
    write_message(&mut client, b"{\"success\":true}").await.unwrap();
    drop(client);
    let mut received = Vec::new();
    tokio::io::AsyncReadExt::read_to_end(&mut server, &mut received)
        .await
        .unwrap();
    assert_eq!(received, b"{\"success\":true}\n");
}

#[cfg(unix)]
mod unix {
    use super::*;

    #[tokio::test]
    async fn test_bind_accept_and_cleanup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("svc.sock");
        let mut listener = ChannelListener::bind(&path).await.unwrap();
        assert!(path.exists());

        let client = tokio::spawn({
            let path = path.clone();
            async move {
                let mut conn = connect(&path).await.unwrap();
                write_message(&mut conn, b"hello").await.unwrap();
            }
        });
        let mut conn = listener.accept().await.unwrap();
        assert_eq!(read_message(&mut conn, 1024).await.unwrap(), b"hello");
        client.await.unwrap();

        drop(listener);
        assert!(!path.exists(), "socket file removed on drop");
    }

    #[tokio::test]
    async fn test_bind_replaces_stale_socket() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("svc.sock");
        // A bound-then-dropped std listener leaves the file behind with nobody listening.
        drop(std::os::unix::net::UnixListener::bind(&path).unwrap());
        assert!(path.exists());

        let listener = ChannelListener::bind(&path).await;
        assert!(listener.is_ok());
    }

    #[tokio::test]
    async fn test_bind_refuses_when_service_running() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("svc.sock");
        let _running = ChannelListener::bind(&path).await.unwrap();

        let err = ChannelListener::bind(&path).await.err().unwrap();
        assert!(err.to_string().contains("already running"));
        assert!(path.exists(), "refused bind must not remove the live socket");
    }

    #[tokio::test]
    async fn test_connect_without_service_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(connect(&dir.path().join("absent.sock")).await.is_err());
    }
}
