//! # fingergate-ja4
//!
//! JA4 TLS client fingerprinting from raw ClientHello records.
//!
//! The input is one complete TLS record as it appeared on the wire: the
//! 5-byte record header followed by a ClientHello handshake message. The
//! output is the canonical JA4 string, e.g.
//!
//! ```text
//! t13d1516h2_8daaf6152771_b186095e22b6
//! ```
//!
//! made of three underscore-separated parts:
//!
//! - transport marker, TLS version, SNI marker, cipher count, extension
//!   count, and the first ALPN value's edge characters
//! - truncated SHA-256 of the sorted cipher suite codes
//! - truncated SHA-256 of the sorted extension codes (SNI and ALPN removed)
//!   plus the signature algorithms in wire order
//!
//! GREASE values (RFC 8701) are excluded from every count, hash, and the
//! version selection, so the fingerprint is stable across the random GREASE
//! placement clients use.

mod error;
mod fingerprint;
mod hello;

pub use error::Ja4Error;
pub use fingerprint::{Ja4Fingerprint, Transport};
pub use hello::ClientHello;
