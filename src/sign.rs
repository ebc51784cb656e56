//! HMAC-SHA256 signing for custom webhook robots.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Sign `"<timestamp_ms>\n<secret>"` with the secret and return it base64 encoded.
pub fn sign(secret: &str, timestamp_ms: i64) -> String {
    let string_to_sign = format!("{timestamp_ms}\n{secret}");
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(string_to_sign.as_bytes());
    STANDARD.encode(mac.finalize().into_bytes())
}

/// The `timestamp`/`sign` pair appended to a signed webhook URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedQuery {
    pub timestamp_ms: i64,
    pub sign: String,
}

impl SignedQuery {
    pub fn at(secret: &str, timestamp_ms: i64) -> Self {
        Self {
            timestamp_ms,
            sign: sign(secret, timestamp_ms),
        }
    }

    /// Signs the current wall-clock time. The gateway rejects stale
    /// timestamps, so this must be called per request.
    pub fn now(secret: &str) -> Self {
        Self::at(secret, chrono::Utc::now().timestamp_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_golden_signature() {
        assert_eq!(
            sign("s3cr3t", 1700000000000),
            "jRhQKmcWDB38YUNeCEXp9yo/I5OBM7UP81cpTrETHUw="
        );
    }

    #[test]
    fn test_signature_is_deterministic() {
        assert_eq!(sign("s3cr3t", 1700000000000), sign("s3cr3t", 1700000000000));
    }

    #[test]
    fn test_signature_changes_with_inputs() {
        let base = sign("s3cr3t", 1700000000000);
        assert_eq!(
            sign("s3cr3t", 1700000000001),
            "OIUfHlWI1pvEem6BTeDf2dAdrDloYBZbOfNvKNW/Ius="
        );
        assert_ne!(sign("s3cr3t", 1700000000001), base);
        assert_ne!(sign("other", 1700000000000), base);
    }

    #[test]
    fn test_now_uses_current_time() {
        let before = chrono::Utc::now().timestamp_millis();
        let query = SignedQuery::now("abc");
        let after = chrono::Utc::now().timestamp_millis();
        assert!(query.timestamp_ms >= before && query.timestamp_ms <= after);
        assert_eq!(query.sign, sign("abc", query.timestamp_ms));
    }
}
