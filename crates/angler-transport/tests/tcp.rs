//! Integration tests for the framed TCP transport.
//!
//! These tests spin up a real TCP listener and drive the connector against
//! it, so bytes actually cross a socket.

#[cfg(feature = "tcp")]
mod tcp {
    use std::time::Duration;

    use angler_transport::{Connection, Connector, TcpConnector, TransportError};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Binds a listener on an OS-assigned port and returns it with its port.
    async fn listener() -> (TcpListener, u16) {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let port = listener.local_addr().expect("has addr").port();
        (listener, port)
    }

    #[tokio::test]
    async fn test_open_send_and_recv_frames() {
        let (listener, port) = listener().await;

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");
            // Read the client's frame.
            let len = socket.read_u32().await.expect("len");
            let mut buf = vec![0u8; len as usize];
            socket.read_exact(&mut buf).await.expect("payload");
            // Echo it back, then a second frame.
            socket.write_u32(len).await.unwrap();
            socket.write_all(&buf).await.unwrap();
            socket.write_u32(3).await.unwrap();
            socket.write_all(b"bye").await.unwrap();
            buf
        });

        let conn = TcpConnector::new()
            .open("127.0.0.1", port)
            .await
            .expect("should connect");
        conn.send(b"ping").await.expect("send");

        let first = conn.recv().await.expect("recv").expect("frame");
        let second = conn.recv().await.expect("recv").expect("frame");
        assert_eq!(first, b"ping");
        assert_eq!(second, b"bye");

        let seen_by_server = server.await.expect("server task");
        assert_eq!(seen_by_server, b"ping");

        // Server dropped its socket: clean end of stream.
        let end = conn.recv().await.expect("recv");
        assert!(end.is_none());
    }

    #[tokio::test]
    async fn test_open_refused_port_returns_connect_failed() {
        // Bind then drop to get a port that is (almost certainly) closed.
        let (listener, port) = listener().await;
        drop(listener);

        let result = TcpConnector::with_timeout(Duration::from_secs(2))
            .open("127.0.0.1", port)
            .await;

        assert!(matches!(
            result,
            Err(TransportError::ConnectFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_close_from_other_task_wakes_pending_recv() {
        let (listener, port) = listener().await;
        // Keep the server side open and silent.
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.expect("accept");
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(socket);
        });

        let conn = std::sync::Arc::new(
            TcpConnector::new()
                .open("127.0.0.1", port)
                .await
                .expect("should connect"),
        );

        let reader = {
            let conn = std::sync::Arc::clone(&conn);
            tokio::spawn(async move { conn.recv().await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        conn.close().await;
        // Closing twice is a no-op.
        conn.close().await;

        let result = tokio::time::timeout(Duration::from_secs(1), reader)
            .await
            .expect("recv should wake up")
            .expect("task");
        assert!(matches!(result, Ok(None)));

        // Sending after close is rejected.
        assert!(matches!(
            conn.send(b"late").await,
            Err(TransportError::Closed)
        ));

        server.abort();
    }
}
