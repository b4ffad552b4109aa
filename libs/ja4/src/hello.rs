//! ClientHello parsing.
//!
//! Walks one TLS record and pulls out the fields the fingerprint is built
//! from. Every length field is bounds-checked against the bytes actually
//! present; an overrun is a hard error, not a best-effort result.

use crate::error::Ja4Error;

const RECORD_HEADER_LEN: usize = 5;
const CONTENT_TYPE_HANDSHAKE: u8 = 0x16;
const HANDSHAKE_TYPE_CLIENT_HELLO: u8 = 0x01;

pub(crate) const EXT_SERVER_NAME: u16 = 0x0000;
pub(crate) const EXT_SIGNATURE_ALGORITHMS: u16 = 0x000d;
pub(crate) const EXT_ALPN: u16 = 0x0010;
pub(crate) const EXT_SUPPORTED_VERSIONS: u16 = 0x002b;

/// Fields of a parsed ClientHello relevant to fingerprinting.
///
/// All `u16` lists are in wire order with GREASE values already removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientHello {
    /// Version from the ClientHello body (not the record header).
    pub legacy_version: u16,
    /// Offered cipher suites.
    pub cipher_suites: Vec<u16>,
    /// Extension codes, including SNI and ALPN when present.
    pub extensions: Vec<u16>,
    /// Versions offered in the supported_versions extension, if any.
    pub supported_versions: Vec<u16>,
    /// Host name from the server_name extension, if present and well formed.
    pub sni: Option<String>,
    /// ALPN protocol values as raw bytes, in offer order.
    pub alpn_protocols: Vec<Vec<u8>>,
    /// Signature algorithm codes, in offer order.
    pub signature_algorithms: Vec<u16>,
}

impl ClientHello {
    /// Parses one TLS record containing a ClientHello handshake message.
    ///
    /// The record must be complete: the 5-byte header's declared length is
    /// enforced against `record`, and every inner length field is enforced
    /// against its enclosing structure.
    pub fn parse(record: &[u8]) -> Result<Self, Ja4Error> {
        if record.len() < RECORD_HEADER_LEN {
            return Err(Ja4Error::RecordTooShort);
        }
        if record[0] != CONTENT_TYPE_HANDSHAKE {
            return Err(Ja4Error::NotHandshakeRecord {
                content_type: record[0],
            });
        }

        // Record header: type(1) + version(2) + length(2)
        let record_len = u16::from_be_bytes([record[3], record[4]]) as usize;
        let body = &record[RECORD_HEADER_LEN..];
        if body.len() < record_len {
            return Err(Ja4Error::Truncated);
        }
        let body = &body[..record_len];

        // Handshake header: type(1) + length(3)
        if body.len() < 4 {
            return Err(Ja4Error::Truncated);
        }
        if body[0] != HANDSHAKE_TYPE_CLIENT_HELLO {
            return Err(Ja4Error::NotClientHello {
                handshake_type: body[0],
            });
        }
        let hs_len = u32::from_be_bytes([0, body[1], body[2], body[3]]) as usize;
        let hello = &body[4..];
        if hello.len() < hs_len {
            return Err(Ja4Error::Truncated);
        }
        let hello = &hello[..hs_len];

        // Version (2) + random (32)
        if hello.len() < 34 {
            return Err(Ja4Error::Truncated);
        }
        let legacy_version = u16::from_be_bytes([hello[0], hello[1]]);
        let mut offset = 34;

        // Session ID
        if offset >= hello.len() {
            return Err(Ja4Error::Truncated);
        }
        let session_id_len = hello[offset] as usize;
        offset += 1;
        if offset + session_id_len > hello.len() {
            return Err(Ja4Error::Truncated);
        }
        offset += session_id_len;

        // Cipher suites
        if offset + 2 > hello.len() {
            return Err(Ja4Error::Truncated);
        }
        let cipher_suites_len = u16::from_be_bytes([hello[offset], hello[offset + 1]]) as usize;
        offset += 2;
        if offset + cipher_suites_len > hello.len() {
            return Err(Ja4Error::Truncated);
        }
        let mut cipher_suites = Vec::new();
        let mut i = 0;
        while i + 2 <= cipher_suites_len {
            let cipher = u16::from_be_bytes([hello[offset + i], hello[offset + i + 1]]);
            if !is_grease(cipher) {
                cipher_suites.push(cipher);
            }
            i += 2;
        }
        offset += cipher_suites_len;

        // Compression methods
        if offset >= hello.len() {
            return Err(Ja4Error::Truncated);
        }
        let compression_len = hello[offset] as usize;
        offset += 1;
        if offset + compression_len > hello.len() {
            return Err(Ja4Error::Truncated);
        }
        offset += compression_len;

        let mut parsed = ClientHello {
            legacy_version,
            cipher_suites,
            extensions: Vec::new(),
            supported_versions: Vec::new(),
            sni: None,
            alpn_protocols: Vec::new(),
            signature_algorithms: Vec::new(),
        };

        // Extensions block is optional in pre-1.3 hellos
        if offset == hello.len() {
            return Ok(parsed);
        }

        if offset + 2 > hello.len() {
            return Err(Ja4Error::Truncated);
        }
        let extensions_len = u16::from_be_bytes([hello[offset], hello[offset + 1]]) as usize;
        offset += 2;
        let extensions_end = offset + extensions_len;
        if extensions_end > hello.len() {
            return Err(Ja4Error::Truncated);
        }

        while offset + 4 <= extensions_end {
            let ext_type = u16::from_be_bytes([hello[offset], hello[offset + 1]]);
            let ext_len = u16::from_be_bytes([hello[offset + 2], hello[offset + 3]]) as usize;
            offset += 4;
            if offset + ext_len > extensions_end {
                return Err(Ja4Error::Truncated);
            }
            let ext_data = &hello[offset..offset + ext_len];

            if !is_grease(ext_type) {
                parsed.extensions.push(ext_type);
                match ext_type {
                    EXT_SERVER_NAME => parsed.sni = parse_sni(ext_data),
                    EXT_SIGNATURE_ALGORITHMS => {
                        parsed.signature_algorithms = parse_signature_algorithms(ext_data);
                    }
                    EXT_ALPN => parsed.alpn_protocols = parse_alpn(ext_data),
                    EXT_SUPPORTED_VERSIONS => {
                        parsed.supported_versions = parse_supported_versions(ext_data);
                    }
                    _ => {}
                }
            }

            offset += ext_len;
        }
        if offset != extensions_end {
            return Err(Ja4Error::Truncated);
        }

        Ok(parsed)
    }

    /// True when the server_name extension was offered, well formed or not.
    pub fn offers_sni(&self) -> bool {
        self.extensions.contains(&EXT_SERVER_NAME)
    }
}

/// GREASE values follow the 0x?a?a pattern with equal bytes (RFC 8701).
pub(crate) fn is_grease(value: u16) -> bool {
    let hi = (value >> 8) as u8;
    let lo = value as u8;
    hi == lo && (hi & 0x0f) == 0x0a
}

fn parse_sni(data: &[u8]) -> Option<String> {
    // server_name_list length (2) + name type (1) + name length (2)
    if data.len() < 5 {
        return None;
    }
    if data[2] != 0x00 {
        // Only host_name entries carry a domain
        return None;
    }
    let name_len = u16::from_be_bytes([data[3], data[4]]) as usize;
    if data.len() < 5 + name_len {
        return None;
    }
    String::from_utf8(data[5..5 + name_len].to_vec()).ok()
}

fn parse_signature_algorithms(data: &[u8]) -> Vec<u16> {
    let mut algs = Vec::new();
    if data.len() < 2 {
        return algs;
    }
    let list_len = u16::from_be_bytes([data[0], data[1]]) as usize;
    let end = (2 + list_len).min(data.len());
    let mut offset = 2;
    while offset + 2 <= end {
        let alg = u16::from_be_bytes([data[offset], data[offset + 1]]);
        if !is_grease(alg) {
            algs.push(alg);
        }
        offset += 2;
    }
    algs
}

fn parse_alpn(data: &[u8]) -> Vec<Vec<u8>> {
    let mut protocols = Vec::new();
    if data.len() < 2 {
        return protocols;
    }
    let list_len = u16::from_be_bytes([data[0], data[1]]) as usize;
    let end = (2 + list_len).min(data.len());
    let mut offset = 2;
    while offset < end {
        let len = data[offset] as usize;
        offset += 1;
        if offset + len > end {
            break;
        }
        protocols.push(data[offset..offset + len].to_vec());
        offset += len;
    }
    protocols
}

fn parse_supported_versions(data: &[u8]) -> Vec<u16> {
    let mut versions = Vec::new();
    if data.is_empty() {
        return versions;
    }
    let list_len = data[0] as usize;
    let end = (1 + list_len).min(data.len());
    let mut offset = 1;
    while offset + 2 <= end {
        let version = u16::from_be_bytes([data[offset], data[offset + 1]]);
        if !is_grease(version) {
            versions.push(version);
        }
        offset += 2;
    }
    versions
}
