
use std::sync::atomic::Ordering;
use std::time::Duration;

use harness::{CaptureUpstream, RelayHandle};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Writes `payload`, half-closes, and reports how the relay answered.
async fn send_and_expect_close(
    relay_addr: std::net::SocketAddr,
    payload: &[u8],
) -> Result<(), &'static str> {
    let result = timeout(TEST_TIMEOUT, async {
        let mut stream = TcpStream::connect(relay_addr).await?;
        stream.write_all(payload).await?;
        stream.flush().await?;
        stream.shutdown().await?;

        let mut buf = vec![0u8; 64];
        let n = stream.read(&mut buf).await?;
        Ok::<_, std::io::Error>(n)
    })
    .await;

    match result {
        Ok(Ok(0)) | Ok(Err(_)) => Ok(()),
        Ok(Ok(_)) => Err("relay answered instead of closing"),
        Err(_) => Err("relay never closed the connection"),
    }
}

#[tokio::test]
async fn truncated_record_drops_with_zero_upstream_bytes() {
    let upstream = CaptureUpstream::spawn().await.unwrap();
    let relay = RelayHandle::spawn(&upstream.addr.to_string(), &[])
        .await
        .unwrap();

    // Header announces 100 bytes, only 20 ever arrive.
    let mut payload = vec![0x16, 0x03, 0x01, 0x00, 100];
    payload.extend_from_slice(&[0x01; 20]);

    if let Err(e) = send_and_expect_close(relay.listen_addr, &payload).await {
        panic!("Truncated record: {}", e);
    }

    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(
        upstream.received().await.is_empty(),
        "Truncated handshake must not reach the upstream"
    );
    assert_eq!(relay.stats.malformed_dropped.load(Ordering::Relaxed), 1);
    assert_eq!(relay.stats.non_tls_passthrough.load(Ordering::Relaxed), 0);
}

#[tokio::test]
async fn non_client_hello_first_message_drops() {
    let upstream = CaptureUpstream::spawn().await.unwrap();
    let relay = RelayHandle::spawn(&upstream.addr.to_string(), &[])
        .await
        .unwrap();

    // A complete record whose first handshake message is a ServerHello.
    let mut payload = vec![0x16, 0x03, 0x03, 0x00, 0x08];
    payload.extend_from_slice(&[0x02, 0x00, 0x00, 0x04, 0x03, 0x03, 0x00, 0x00]);

    if let Err(e) = send_and_expect_close(relay.listen_addr, &payload).await {
        panic!("ServerHello-first record: {}", e);
    }

    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(upstream.received().await.is_empty());
    assert_eq!(relay.stats.malformed_dropped.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn unparseable_client_hello_fails_closed() {
    let upstream = CaptureUpstream::spawn().await.unwrap();
    let relay = RelayHandle::spawn(&upstream.addr.to_string(), &[])
        .await
        .unwrap();

    // ClientHello marker, but the handshake length overruns the record.
    let mut payload = vec![0x16, 0x03, 0x01, 0x00, 0x06];
    payload.extend_from_slice(&[0x01, 0x00, 0xff, 0xff, 0x03, 0x03]);

    if let Err(e) = send_and_expect_close(relay.listen_addr, &payload).await {
        panic!("Unparseable hello: {}", e);
    }

    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(upstream.received().await.is_empty());
    assert_eq!(relay.stats.malformed_dropped.load(Ordering::Relaxed), 1);
    assert_eq!(relay.stats.tls_denied.load(Ordering::Relaxed), 0);
}

#[tokio::test]
async fn oversized_record_length_drops() {
    let upstream = CaptureUpstream::spawn().await.unwrap();
    let relay = RelayHandle::spawn(&upstream.addr.to_string(), &[])
        .await
        .unwrap();

    // 0xffff exceeds the TLS plaintext record maximum.
    let payload = vec![0x16, 0x03, 0x01, 0xff, 0xff];

    if let Err(e) = send_and_expect_close(relay.listen_addr, &payload).await {
        panic!("Oversized record: {}", e);
    }

    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(upstream.received().await.is_empty());
    assert_eq!(relay.stats.malformed_dropped.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn unreachable_upstream_drops_client_and_keeps_accepting() {
    // Grab a port that nothing listens on.
    let parked = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead_addr = parked.local_addr().unwrap();
    drop(parked);

    let relay = RelayHandle::spawn(&dead_addr.to_string(), &[])
        .await
        .unwrap();

    for attempt in 0..2 {
        let result = timeout(TEST_TIMEOUT, async {
            let mut stream = TcpStream::connect(relay.listen_addr).await?;
            let mut buf = vec![0u8; 16];
            let n = stream.read(&mut buf).await?;
            Ok::<_, std::io::Error>(n)
        })
        .await;

        match result {
            Ok(Ok(0)) | Ok(Err(_)) => {}
            Ok(Ok(n)) => panic!("Attempt {}: expected close, got {} bytes", attempt, n),
            Err(_) => panic!("Attempt {}: relay never closed the connection", attempt),
        }
    }

    assert_eq!(
        relay.stats.dial_failures.load(Ordering::Relaxed),
        2,
        "Each failed dial should be counted"
    );
    assert_eq!(
        relay.stats.connections_accepted.load(Ordering::Relaxed),
        2,
        "Accept loop must survive dial failures"
    );
}
