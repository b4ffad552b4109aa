//! Fingerprint admission.
//!
//! The fingerprint itself is opaque here: it is computed from the captured
//! record and compared for exact membership in the allow-set, nothing
//! more. An empty allow-set denies every TLS connection.

use std::collections::HashSet;

use fingergate_ja4::{Ja4Error, Ja4Fingerprint, Transport};

/// Admission decision for one TLS connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Admitted { fingerprint: Ja4Fingerprint },
    Denied { fingerprint: Ja4Fingerprint },
}

/// Fingerprints the ClientHello record and checks the allow-set.
///
/// A fingerprint-computation failure is returned as an error; the caller
/// fails closed on it.
pub fn evaluate(record: &[u8], allow: &HashSet<String>) -> Result<GateDecision, Ja4Error> {
    let fingerprint = Ja4Fingerprint::from_record(record, Transport::Tcp)?;
    if allow.contains(fingerprint.as_str()) {
        Ok(GateDecision::Admitted { fingerprint })
    } else {
        Ok(GateDecision::Denied { fingerprint })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A minimal well-formed ClientHello record.
    fn sample_record() -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&[0x03, 0x03]); // TLS 1.2
        body.extend_from_slice(&[0u8; 32]); // random
        body.push(0x00); // empty session ID
        body.extend_from_slice(&[0x00, 0x04, 0x13, 0x01, 0x13, 0x02]); // ciphers
        body.extend_from_slice(&[0x01, 0x00]); // null compression
        body.extend_from_slice(&[0x00, 0x00]); // no extensions

        let mut record = vec![0x01];
        record.extend_from_slice(&(body.len() as u32).to_be_bytes()[1..]);
        record.extend_from_slice(&body);

        let mut framed = vec![0x16, 0x03, 0x01];
        framed.extend_from_slice(&(record.len() as u16).to_be_bytes());
        framed.extend_from_slice(&record);
        framed
    }

    #[test]
    fn empty_allow_set_denies() {
        let decision = evaluate(&sample_record(), &HashSet::new()).unwrap();
        assert!(matches!(decision, GateDecision::Denied { .. }));
    }

    #[test]
    fn matching_fingerprint_admits() {
        let record = sample_record();
        let fingerprint = Ja4Fingerprint::from_record(&record, Transport::Tcp).unwrap();
        let allow: HashSet<String> = [fingerprint.to_string()].into_iter().collect();

        let decision = evaluate(&record, &allow).unwrap();
        match decision {
            GateDecision::Admitted { fingerprint: fp } => assert_eq!(fp, fingerprint),
            other => panic!("expected admission, got {:?}", other),
        }
    }

    #[test]
    fn non_matching_fingerprint_denies() {
        let allow: HashSet<String> = ["t13d0000aa_000000000000_000000000000".to_string()]
            .into_iter()
            .collect();
        let decision = evaluate(&sample_record(), &allow).unwrap();
        assert!(matches!(decision, GateDecision::Denied { .. }));
    }

    #[test]
    fn malformed_record_is_an_error() {
        let garbage = [0x16, 0x03, 0x01, 0x00, 0x08, 0x01, 0x00];
        assert!(evaluate(&garbage, &HashSet::new()).is_err());
    }
}
