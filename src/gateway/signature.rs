//! Webhook signature verification.
//!
//! The gateway signs each delivery with HMAC-SHA256 over `"{t}.{body}"` and
//! sends `Stripe-Signature: t=<unix seconds>,v1=<hex digest>[,v1=...]`.

use std::time::Duration;

use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::WebhookEvent;
use crate::errors::AppError;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

#[derive(Clone)]
pub struct WebhookVerifier {
    secret: String,
    tolerance: Duration,
}

impl WebhookVerifier {
    pub fn new(secret: &str, tolerance: Duration) -> Self {
        Self {
            secret: secret.to_string(),
            tolerance,
        }
    }

    fn mac(&self, timestamp: i64, payload: &[u8]) -> Result<HmacSha256, AppError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| AppError::Internal(format!("Invalid webhook secret: {e}")))?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        Ok(mac)
    }

    /// Check `header` against `payload` at time `now` (unix seconds).
    pub fn verify(&self, payload: &[u8], header: &str, now: i64) -> Result<(), AppError> {
        let mut timestamp = None;
        let mut signatures = Vec::new();

        for part in header.split(',') {
            match part.trim().split_once('=') {
                Some(("t", value)) => {
                    timestamp = Some(value.parse::<i64>().map_err(|_| {
                        AppError::InvalidSignature("malformed timestamp".to_string())
                    })?);
                }
                Some(("v1", value)) => signatures.push(value),
                _ => {}
            }
        }

        let timestamp = timestamp
            .ok_or_else(|| AppError::InvalidSignature("missing timestamp".to_string()))?;
        if signatures.is_empty() {
            return Err(AppError::InvalidSignature("missing v1 signature".to_string()));
        }

        if now.abs_diff(timestamp) > self.tolerance.as_secs() {
            return Err(AppError::InvalidSignature(
                "timestamp outside the tolerance window".to_string(),
            ));
        }

        let mac = self.mac(timestamp, payload)?;
        let matched = signatures.iter().any(|candidate| {
            hex::decode(candidate)
                .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
                .unwrap_or(false)
        });

        if matched {
            Ok(())
        } else {
            Err(AppError::InvalidSignature(
                "no signature matches the payload".to_string(),
            ))
        }
    }

    /// Verify a delivery and parse its event.
    pub fn construct_event(&self, payload: &[u8], header: &str) -> Result<WebhookEvent, AppError> {
        self.verify(payload, header, chrono::Utc::now().timestamp())?;
        serde_json::from_slice(payload)
            .map_err(|e| AppError::Validation(format!("Malformed webhook payload: {e}")))
    }

    /// Build a signature header for `payload`, as the gateway would.
    pub fn sign(&self, payload: &[u8], timestamp: i64) -> Result<String, AppError> {
        let digest = self.mac(timestamp, payload)?.finalize().into_bytes();
        Ok(format!("t={timestamp},v1={}", hex::encode(digest)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";
    const PAYLOAD: &[u8] = br#"{"id":"evt_1","type":"checkout.session.completed"}"#;

    fn verifier() -> WebhookVerifier {
        WebhookVerifier::new(SECRET, Duration::from_secs(300))
    }

    #[test]
    fn accepts_a_correctly_signed_payload() {
        let v = verifier();
        let header = v.sign(PAYLOAD, 1_700_000_000).unwrap();
        assert!(v.verify(PAYLOAD, &header, 1_700_000_010).is_ok());
    }

    #[test]
    fn accepts_when_any_v1_signature_matches() {
        let v = verifier();
        let good = v.sign(PAYLOAD, 1_700_000_000).unwrap();
        let digest = good.split("v1=").nth(1).unwrap();
        let header = format!("t=1700000000,v1={},v1={digest}", "00".repeat(32));
        assert!(v.verify(PAYLOAD, &header, 1_700_000_000).is_ok());
    }

    #[test]
    fn rejects_a_tampered_payload() {
        let v = verifier();
        let header = v.sign(PAYLOAD, 1_700_000_000).unwrap();
        let err = v
            .verify(br#"{"id":"evt_2"}"#, &header, 1_700_000_000)
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidSignature(_)));
    }

    #[test]
    fn rejects_a_different_secret() {
        let header = WebhookVerifier::new("whsec_other", Duration::from_secs(300))
            .sign(PAYLOAD, 1_700_000_000)
            .unwrap();
        assert!(verifier().verify(PAYLOAD, &header, 1_700_000_000).is_err());
    }

    #[test]
    fn rejects_stale_timestamps() {
        let v = verifier();
        let header = v.sign(PAYLOAD, 1_700_000_000).unwrap();
        assert!(v.verify(PAYLOAD, &header, 1_700_000_301).is_err());
    }

    #[test]
    fn rejects_malformed_headers() {
        let v = verifier();
        assert!(v.verify(PAYLOAD, "", 0).is_err());
        assert!(v.verify(PAYLOAD, "t=abc,v1=00", 0).is_err());
        assert!(v.verify(PAYLOAD, "t=0", 0).is_err());
        assert!(v.verify(PAYLOAD, "t=0,v1=not-hex", 0).is_err());
    }
}
