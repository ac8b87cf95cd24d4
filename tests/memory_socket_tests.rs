use std::io;
use std::time::Duration;

use rapid_socket::{ClientSocket, MemoryTransport, SocketConfig, SocketError};
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

/// Socket + peer over an in-memory pipe.
fn socket_pair(config: SocketConfig) -> (ClientSocket<MemoryTransport>, DuplexStream) {
    let (transport, peer) = MemoryTransport::pair(4096);
    (ClientSocket::from_transport(transport, config), peer)
}

fn init_logger() {
    rapid_socket::rapid_log::init();
}

/* -------------------------------------------------------------------------- */
/* 1. Lifecycle                                                               */
/* -------------------------------------------------------------------------- */
#[tokio::test]
async fn closed_socket_rejects_every_operation() {
    init_logger();
    let (mut socket, _peer) = socket_pair(SocketConfig::default());
    assert!(!socket.is_closed());

    socket.close();
    assert!(socket.is_closed());
    assert_eq!(socket.file_descriptor(), None);

    assert!(matches!(socket.send(b"x").await, Err(SocketError::Closed)));
    assert!(matches!(socket.send(b"").await, Err(SocketError::Closed)));
    assert!(matches!(socket.flush().await, Err(SocketError::Closed)));
    assert!(matches!(socket.receive(8).await, Err(SocketError::Closed)));
    assert!(matches!(socket.receive_until(8, b"\n").await, Err(SocketError::Closed)));
    assert!(matches!(socket.detach(), Err(SocketError::Closed)));

    // second close is a no-op
    socket.close();
    assert!(socket.is_closed());
}

#[tokio::test]
async fn unopened_socket_starts_closed() {
    let mut socket = ClientSocket::<MemoryTransport>::closed(SocketConfig::default());
    assert!(socket.is_closed());
    assert_eq!(socket.peer_address(), None);
    assert!(socket.receive(1).await.unwrap_err().is_closed());
}

#[tokio::test]
async fn dropping_socket_hangs_up_on_peer() {
    let (socket, mut peer) = socket_pair(SocketConfig::default());
    drop(socket);

    let mut buf = [0u8; 4];
    assert_eq!(peer.read(&mut buf).await.unwrap(), 0);
}

/* -------------------------------------------------------------------------- */
/* 2. Send / Flush                                                            */
/* -------------------------------------------------------------------------- */
#[tokio::test]
async fn empty_send_is_noop() {
    let (mut socket, _peer) = socket_pair(SocketConfig::default());
    socket.send(b"").await.unwrap();
    socket.flush().await.unwrap();
    assert!(!socket.is_closed());
}

#[tokio::test]
async fn output_reaches_peer_after_flush() {
    let (mut socket, mut peer) = socket_pair(SocketConfig::default());

    socket.send(b"ping").await.unwrap();
    socket.flush().await.unwrap();

    let mut buf = [0u8; 4];
    peer.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"ping");
}

#[tokio::test]
async fn reset_mid_send_reports_bytes_written() {
    init_logger();
    let (transport, mut peer) = MemoryTransport::pair(4096);
    let transport = transport.reset_after(400);
    let mut socket = ClientSocket::from_transport(transport, SocketConfig::default());

    let err = socket.send(&[7u8; 1000]).await.unwrap_err();
    match err {
        SocketError::Transfer { bytes_processed, kind, ref description } => {
            assert_eq!(bytes_processed, Some(400));
            assert_eq!(kind, io::ErrorKind::ConnectionReset);
            assert!(description.starts_with("TCP Error: "));
        }
        other => panic!("expected transfer error, got {other:?}"),
    }

    // the socket is still usable for reads and the peer got exactly 400 bytes
    assert!(!socket.is_closed());
    let mut buf = vec![0u8; 400];
    peer.read_exact(&mut buf).await.unwrap();
    assert!(buf.iter().all(|b| *b == 7));
}

#[tokio::test]
async fn buffered_output_fails_on_flush_without_count() {
    let (transport, _peer) = MemoryTransport::pair(4096);
    let cfg = SocketConfig::default().with_write_buffer_size(8 * 1024);
    let mut socket = ClientSocket::from_transport(transport.reset_after(100), cfg);

    socket.send(&[1u8; 500]).await.unwrap();

    let err = socket.flush().await.unwrap_err();
    assert!(matches!(err, SocketError::Transfer { bytes_processed: None, .. }));
}

#[tokio::test]
async fn send_times_out_when_peer_stops_reading() {
    let (transport, peer) = MemoryTransport::pair(16);
    let cfg = SocketConfig::default().with_io_timeout(Duration::from_millis(50));
    let mut socket = ClientSocket::from_transport(transport, cfg);

    let err = socket.send(&[3u8; 100]).await.unwrap_err();
    assert_eq!(err.kind(), Some(io::ErrorKind::TimedOut));
    assert_eq!(err.bytes_processed(), Some(16));
    drop(peer);
}

#[tokio::test]
async fn flush_times_out_without_count() {
    let (transport, peer) = MemoryTransport::pair(16);
    let cfg = SocketConfig::default()
        .with_write_buffer_size(64)
        .with_io_timeout(Duration::from_millis(50));
    let mut socket = ClientSocket::from_transport(transport, cfg);

    socket.send(&[3u8; 40]).await.unwrap();

    let err = socket.flush().await.unwrap_err();
    assert_eq!(err.kind(), Some(io::ErrorKind::TimedOut));
    assert_eq!(err.bytes_processed(), None);
    drop(peer);
}

/* -------------------------------------------------------------------------- */
/* 3. Fixed-size receive                                                      */
/* -------------------------------------------------------------------------- */
#[tokio::test]
async fn short_message_then_end_of_stream() {
    let (mut socket, mut peer) = socket_pair(SocketConfig::default());
    peer.write_all(b"abc").await.unwrap();
    drop(peer);

    assert_eq!(&socket.receive(10).await.unwrap()[..], b"abc");
    // once the peer is gone every receive is empty
    assert!(socket.receive(10).await.unwrap().is_empty());
    assert!(socket.receive_until(10, b"\n").await.unwrap().is_empty());
}

#[tokio::test]
async fn receive_stops_at_buffer_size() {
    let (mut socket, mut peer) = socket_pair(SocketConfig::default());
    peer.write_all(b"0123456789").await.unwrap();

    assert_eq!(&socket.receive(4).await.unwrap()[..], b"0123");
    assert_eq!(&socket.receive(6).await.unwrap()[..], b"456789");
    assert!(socket.receive(0).await.unwrap().is_empty());
}

#[tokio::test]
async fn read_fault_reports_partial_count() {
    let (transport, mut peer) = MemoryTransport::pair(4096);
    let transport = transport.fail_reads_with(io::ErrorKind::ConnectionReset);
    let mut socket = ClientSocket::from_transport(transport, SocketConfig::default());

    peer.write_all(b"abc").await.unwrap();
    drop(peer);

    let err = socket.receive(10).await.unwrap_err();
    assert_eq!(err.bytes_processed(), Some(3));
    assert_eq!(err.kind(), Some(io::ErrorKind::ConnectionReset));
}

#[tokio::test]
async fn receive_times_out_with_partial_count() {
    let cfg = SocketConfig::default().with_io_timeout(Duration::from_millis(50));
    let (mut socket, mut peer) = socket_pair(cfg);
    peer.write_all(b"ab").await.unwrap();

    let err = socket.receive(5).await.unwrap_err();
    assert_eq!(err.kind(), Some(io::ErrorKind::TimedOut));
    assert_eq!(err.bytes_processed(), Some(2));
    drop(peer);
}

/* -------------------------------------------------------------------------- */
/* 4. Delimiter framing                                                       */
/* -------------------------------------------------------------------------- */
#[tokio::test]
async fn receive_until_returns_line_with_delimiter() {
    let (mut socket, mut peer) = socket_pair(SocketConfig::default());
    peer.write_all(b"hello\nworld\n").await.unwrap();

    assert_eq!(&socket.receive_until(64, b"\n").await.unwrap()[..], b"hello\n");
    assert_eq!(&socket.receive_until(6, b"\n").await.unwrap()[..], b"world\n");
}

#[tokio::test]
async fn full_buffer_before_delimiter_is_not_an_error() {
    let (mut socket, mut peer) = socket_pair(SocketConfig::default());
    peer.write_all(b"abcdefghij\n").await.unwrap();

    let head = socket.receive_until(4, b"\n").await.unwrap();
    assert_eq!(&head[..], b"abcd");

    // the rest of the line is still there
    let tail = socket.receive_until(64, b"\n").await.unwrap();
    assert_eq!(&tail[..], b"efghij\n");
}

#[tokio::test]
async fn multi_byte_delimiter_across_buffer_refills() {
    let cfg = SocketConfig::default().with_read_buffer_size(3);
    let (mut socket, mut peer) = socket_pair(cfg);
    peer.write_all(b"GET /\r\n\r\nrest").await.unwrap();

    let head = socket.receive_until(64, b"\r\n\r\n").await.unwrap();
    assert_eq!(&head[..], b"GET /\r\n\r\n");
    assert_eq!(&socket.receive(4).await.unwrap()[..], b"rest");
}

#[tokio::test]
async fn end_of_stream_returns_unterminated_tail() {
    let (mut socket, mut peer) = socket_pair(SocketConfig::default());
    peer.write_all(b"no newline").await.unwrap();
    drop(peer);

    assert_eq!(&socket.receive_until(64, b"\n").await.unwrap()[..], b"no newline");
}

#[tokio::test]
async fn receive_until_times_out_with_partial_count() {
    let cfg = SocketConfig::default().with_io_timeout(Duration::from_millis(50));
    let (mut socket, mut peer) = socket_pair(cfg);
    peer.write_all(b"abc").await.unwrap();

    let err = socket.receive_until(64, b"\n").await.unwrap_err();
    assert_eq!(err.kind(), Some(io::ErrorKind::TimedOut));
    assert_eq!(err.bytes_processed(), Some(3));
    drop(peer);
}

#[tokio::test]
async fn empty_delimiter_is_rejected() {
    let (mut socket, _peer) = socket_pair(SocketConfig::default());

    let err = socket.receive_until(16, b"").await.unwrap_err();
    assert_eq!(err.kind(), Some(io::ErrorKind::InvalidInput));
    assert_eq!(err.bytes_processed(), Some(0));
}

/* -------------------------------------------------------------------------- */
/* 5. Detach without an OS descriptor                                         */
/* -------------------------------------------------------------------------- */
#[tokio::test]
async fn detach_without_descriptor_still_closes() {
    let (mut socket, _peer) = socket_pair(SocketConfig::default());
    assert_eq!(socket.file_descriptor(), Some(-1));

    let err = socket.detach().unwrap_err();
    assert_eq!(err.kind(), Some(io::ErrorKind::Unsupported));
    assert!(socket.is_closed());
}

/* -------------------------------------------------------------------------- */
/* 6. Text helpers                                                            */
/* -------------------------------------------------------------------------- */
#[tokio::test]
async fn text_round_trip_and_invalid_utf8() {
    let (mut socket, mut peer) = socket_pair(SocketConfig::default());

    socket.send_text("hallo\n").await.unwrap();
    socket.flush().await.unwrap();
    let mut buf = [0u8; 6];
    peer.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"hallo\n");

    peer.write_all("grüße\n".as_bytes()).await.unwrap();
    assert_eq!(socket.receive_text_until(64, "\n").await.unwrap().as_deref(), Some("grüße\n"));

    peer.write_all(&[0xFF, 0xFE]).await.unwrap();
    assert_eq!(socket.receive_text(2).await.unwrap(), None);
}
