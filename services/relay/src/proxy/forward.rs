//! Bidirectional relay between client and upstream.

use std::io;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

const COPY_BUF_SIZE: usize = 8192;

/// Relays bytes in both directions until either direction reaches end of
/// stream or an I/O error.
///
/// `buffered` holds the client bytes captured during detection; they are
/// delivered to the upstream before live forwarding starts, so the
/// upstream sees the stream exactly as the client sent it. Returns
/// (client→upstream, upstream→client) byte counts with the replayed
/// prefix included.
pub async fn relay(
    client: &mut TcpStream,
    upstream: &mut TcpStream,
    buffered: &[u8],
) -> io::Result<(u64, u64)> {
    if !buffered.is_empty() {
        upstream.write_all(buffered).await?;
    }

    let mut to_upstream = buffered.len() as u64;
    let mut to_client = 0u64;

    let (mut client_read, mut client_write) = client.split();
    let (mut upstream_read, mut upstream_write) = upstream.split();

    let client_to_upstream = async {
        let mut buf = vec![0u8; COPY_BUF_SIZE];
        loop {
            match client_read.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    upstream_write.write_all(&buf[..n]).await?;
                    to_upstream += n as u64;
                }
                Err(e) => return Err(e),
            }
        }
        Ok::<(), io::Error>(())
    };

    let upstream_to_client = async {
        let mut buf = vec![0u8; COPY_BUF_SIZE];
        loop {
            match upstream_read.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    client_write.write_all(&buf[..n]).await?;
                    to_client += n as u64;
                }
                Err(e) => return Err(e),
            }
        }
        Ok::<(), io::Error>(())
    };

    // The session ends as soon as either direction finishes; the other
    // future is dropped and both sockets close with the caller.
    let result = tokio::select! {
        r = client_to_upstream => r,
        r = upstream_to_client => r,
    };
    if let Err(e) = result {
        debug!(error = %e, "forwarding ended on I/O error");
    }

    Ok((to_upstream, to_client))
}
