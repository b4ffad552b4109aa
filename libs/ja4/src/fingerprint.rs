//! JA4 fingerprint assembly.

use std::fmt;

use sha2::{Digest, Sha256};

use crate::error::Ja4Error;
use crate::hello::{ClientHello, EXT_ALPN, EXT_SERVER_NAME};

const HASH_TRUNC: usize = 12;
const EMPTY_HASH: &str = "000000000000";

/// Transport the ClientHello arrived over; first character of the
/// fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Tcp,
    Quic,
}

impl Transport {
    pub fn marker(self) -> char {
        match self {
            Transport::Tcp => 't',
            Transport::Quic => 'q',
        }
    }
}

/// A computed JA4 fingerprint.
///
/// Format: `t13d1516h2_8daaf6152771_b186095e22b6`
///   - t = TLS over TCP, q = QUIC
///   - 13 = TLS 1.3
///   - d = SNI offered (i = none, typically an IP connection)
///   - 15 = number of cipher suites
///   - 16 = number of extensions
///   - h2 = first and last characters of the first ALPN value
///   - 8daaf6152771 = truncated SHA-256 of the sorted cipher suites
///   - b186095e22b6 = truncated SHA-256 of the sorted extensions plus
///     signature algorithms
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ja4Fingerprint(String);

impl Ja4Fingerprint {
    /// Parses `record` as a ClientHello and computes its fingerprint.
    pub fn from_record(record: &[u8], transport: Transport) -> Result<Self, Ja4Error> {
        let hello = ClientHello::parse(record)?;
        Ok(Self::from_client_hello(&hello, transport))
    }

    /// Computes the fingerprint of an already-parsed ClientHello.
    pub fn from_client_hello(hello: &ClientHello, transport: Transport) -> Self {
        let version = match effective_version(hello) {
            0x0304 => "13",
            0x0303 => "12",
            0x0302 => "11",
            0x0301 => "10",
            0x0300 => "s3",
            0x0002 => "s2",
            _ => "00",
        };
        let sni_marker = if hello.offers_sni() { 'd' } else { 'i' };

        let a = format!(
            "{}{}{}{:02}{:02}{}",
            transport.marker(),
            version,
            sni_marker,
            hello.cipher_suites.len().min(99),
            hello.extensions.len().min(99),
            alpn_pair(&hello.alpn_protocols),
        );
        let b = cipher_hash(&hello.cipher_suites);
        let c = extension_hash(hello);

        Ja4Fingerprint(format!("{}_{}_{}", a, b, c))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ja4Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Ja4Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Highest offered supported_versions entry, or the legacy version when the
/// extension is absent.
fn effective_version(hello: &ClientHello) -> u16 {
    hello
        .supported_versions
        .iter()
        .copied()
        .max()
        .unwrap_or(hello.legacy_version)
}

/// First and last characters of the first ALPN value, or `00` when absent.
/// Values with non-alphanumeric edge bytes render as the first and last
/// characters of their hex encoding.
fn alpn_pair(protocols: &[Vec<u8>]) -> String {
    let first = match protocols.first() {
        Some(p) if !p.is_empty() => p,
        _ => return "00".to_string(),
    };
    let lead = first[0];
    let tail = first[first.len() - 1];
    if lead.is_ascii_alphanumeric() && tail.is_ascii_alphanumeric() {
        format!("{}{}", lead as char, tail as char)
    } else {
        let hexed = hex::encode(first);
        format!("{}{}", &hexed[..1], &hexed[hexed.len() - 1..])
    }
}

fn cipher_hash(ciphers: &[u16]) -> String {
    if ciphers.is_empty() {
        return EMPTY_HASH.to_string();
    }
    let mut sorted = ciphers.to_vec();
    sorted.sort_unstable();
    truncated_sha256(&join_hex(&sorted))
}

/// Extensions are hashed sorted, with SNI and ALPN removed; the signature
/// algorithms follow in wire order after an underscore.
fn extension_hash(hello: &ClientHello) -> String {
    let mut filtered: Vec<u16> = hello
        .extensions
        .iter()
        .copied()
        .filter(|&e| e != EXT_SERVER_NAME && e != EXT_ALPN)
        .collect();
    if filtered.is_empty() {
        return EMPTY_HASH.to_string();
    }
    filtered.sort_unstable();
    let mut input = join_hex(&filtered);
    if !hello.signature_algorithms.is_empty() {
        input.push('_');
        input.push_str(&join_hex(&hello.signature_algorithms));
    }
    truncated_sha256(&input)
}

fn join_hex(values: &[u16]) -> String {
    values
        .iter()
        .map(|v| format!("{:04x}", v))
        .collect::<Vec<_>>()
        .join(",")
}

fn truncated_sha256(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    hex::encode(digest)[..HASH_TRUNC].to_string()
}
