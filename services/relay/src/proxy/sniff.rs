//! First-record TLS detection and ClientHello capture.
//!
//! Inspects the opening bytes of a client stream through a [`Lookahead`]
//! so nothing is consumed. Only the very first TLS record is considered;
//! a ClientHello fragmented across records is treated as malformed rather
//! than reassembled.

use std::io;

use tokio::io::AsyncRead;

use super::lookahead::Lookahead;

pub const TLS_RECORD_HEADER_LEN: usize = 5;
pub const TLS_CONTENT_TYPE_HANDSHAKE: u8 = 0x16;
pub const TLS_HANDSHAKE_CLIENT_HELLO: u8 = 0x01;
/// Maximum TLSPlaintext fragment length; longer declared records are
/// illegal and bound the lookahead buffer.
pub const TLS_MAX_RECORD_LEN: usize = 16384;

/// Outcome of inspecting the first bytes of a client stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SniffResult {
    /// The first record is a complete ClientHello; holds the full record
    /// including the 5-byte header.
    ClientHello(Vec<u8>),
    /// The stream does not begin with a TLS handshake record.
    NotTls,
    /// TLS framing is present but the record cannot be used as-is.
    Malformed { reason: &'static str },
}

/// Classifies the start of the stream and captures the first record.
///
/// The lookahead position never advances: after this returns, the buffered
/// bytes are still the first bytes of the stream. I/O errors from the
/// underlying stream propagate as errors; a clean early end of stream does
/// not.
pub async fn sniff_client_hello<R: AsyncRead + Unpin>(
    lookahead: &mut Lookahead<R>,
) -> io::Result<SniffResult> {
    let have = lookahead.fill_to(TLS_RECORD_HEADER_LEN).await?;
    if have < TLS_RECORD_HEADER_LEN {
        // Closed before a full header: nothing to fingerprint
        return Ok(SniffResult::NotTls);
    }
    let header = lookahead.peeked();
    if header[0] != TLS_CONTENT_TYPE_HANDSHAKE {
        return Ok(SniffResult::NotTls);
    }

    let record_len = u16::from_be_bytes([header[3], header[4]]) as usize;
    if record_len == 0 {
        return Ok(SniffResult::Malformed {
            reason: "empty handshake record",
        });
    }
    if record_len > TLS_MAX_RECORD_LEN {
        return Ok(SniffResult::Malformed {
            reason: "record length exceeds TLS maximum",
        });
    }

    let total = TLS_RECORD_HEADER_LEN + record_len;
    let have = lookahead.fill_to(total).await?;
    if have < total {
        return Ok(SniffResult::Malformed {
            reason: "record truncated by peer",
        });
    }

    let record = lookahead.peeked();
    if record[TLS_RECORD_HEADER_LEN] != TLS_HANDSHAKE_CLIENT_HELLO {
        return Ok(SniffResult::Malformed {
            reason: "first handshake message is not a ClientHello",
        });
    }

    Ok(SniffResult::ClientHello(record[..total].to_vec()))
}
