//! Error types for ClientHello parsing.

use thiserror::Error;

/// Errors that can occur while parsing a ClientHello record.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Ja4Error {
    /// The input is shorter than a TLS record header.
    #[error("record too short for a TLS header")]
    RecordTooShort,

    /// The record content type is not handshake (0x16).
    #[error("not a TLS handshake record: content type {content_type:#04x}")]
    NotHandshakeRecord { content_type: u8 },

    /// The first handshake message is not a ClientHello (0x01).
    #[error("first handshake message is not a ClientHello: type {handshake_type:#04x}")]
    NotClientHello { handshake_type: u8 },

    /// A length field points past the bytes actually present.
    #[error("truncated ClientHello")]
    Truncated,
}
