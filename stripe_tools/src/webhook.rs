//! Webhook signature verification.
//!
//! Stripe signs each delivery with a `Stripe-Signature` header of the form `t=<unix seconds>,v1=<hex>[,v1=<hex>]`.
//! The `v1` values are HMAC-SHA256 digests of `"{t}.{body}"`, keyed with the endpoint's webhook secret. There may be
//! more than one `v1` entry while a secret is being rolled, and a delivery is valid if any of them match.
use chrono::Utc;
use hmac::{Hmac, Mac};
use log::*;
use sha2::Sha256;

use crate::{StripeApiError, StripeEvent};

pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    pub timestamp: i64,
    pub signatures: Vec<Vec<u8>>,
}

impl SignatureHeader {
    pub fn parse(header: &str) -> Result<Self, StripeApiError> {
        let mut timestamp = None;
        let mut signatures = Vec::new();
        for part in header.split(',') {
            let Some((key, value)) = part.trim().split_once('=') else { continue };
            match key {
                "t" => {
                    let t = value
                        .parse::<i64>()
                        .map_err(|e| StripeApiError::InvalidSignature(format!("Invalid timestamp. {e}")))?;
                    timestamp = Some(t);
                },
                "v1" => match hex::decode(value) {
                    Ok(sig) => signatures.push(sig),
                    Err(e) => debug!("🔐️ Ignoring malformed v1 signature: {e}"),
                },
                _ => {},
            }
        }
        let timestamp = timestamp.ok_or_else(|| StripeApiError::InvalidSignature("No timestamp in header".into()))?;
        if signatures.is_empty() {
            return Err(StripeApiError::InvalidSignature("No v1 signature in header".into()));
        }
        Ok(Self { timestamp, signatures })
    }
}

fn mac_for(secret: &str, timestamp: i64, payload: &[u8]) -> Result<HmacSha256, StripeApiError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| StripeApiError::InvalidSignature(format!("Unusable webhook secret. {e}")))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// Produces a header value that [`verify_signature`] accepts. Handy for tests and for replaying events locally.
pub fn sign_payload(secret: &str, timestamp: i64, payload: &[u8]) -> Result<String, StripeApiError> {
    let digest = mac_for(secret, timestamp, payload)?.finalize().into_bytes();
    Ok(format!("t={timestamp},v1={}", hex::encode(digest)))
}

/// Checks the signature header against the raw request body. `now` is in unix seconds.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance: i64,
    now: i64,
) -> Result<(), StripeApiError> {
    if secret.is_empty() {
        return Err(StripeApiError::InvalidSignature("No webhook secret is configured".into()));
    }
    let header = SignatureHeader::parse(header)?;
    let mac = mac_for(secret, header.timestamp, payload)?;
    // verify_slice compares in constant time
    let matched = header.signatures.iter().any(|sig| mac.clone().verify_slice(sig).is_ok());
    if !matched {
        return Err(StripeApiError::InvalidSignature("No signature matches the payload".into()));
    }
    if tolerance > 0 && (now - header.timestamp).abs() > tolerance {
        return Err(StripeApiError::InvalidSignature(format!(
            "Timestamp {} is outside the tolerance of {tolerance}s",
            header.timestamp
        )));
    }
    Ok(())
}

/// Verifies the delivery and decodes the event it carries.
pub fn construct_event(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance: i64,
) -> Result<StripeEvent, StripeApiError> {
    verify_signature(payload, header, secret, tolerance, Utc::now().timestamp())?;
    trace!("🔐️ Webhook signature check ✅️");
    StripeEvent::from_slice(payload)
}
