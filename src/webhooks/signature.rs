//! GitHub webhook signature verification using HMAC-SHA1.
//!
//! The GitHub App signs each delivery with the shared webhook secret and sends
//! the result in the `X-Hub-Signature` header as `sha1=<hex>`.
//!
//! Verification is the first step in webhook processing. A delivery that fails
//! it is rejected before the payload is even parsed.

use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// Header prefix naming the digest algorithm.
const SIGNATURE_PREFIX: &str = "sha1=";

/// Parses a GitHub signature header (e.g., "sha1=abc123...") into raw bytes.
///
/// Returns `None` for malformed headers (missing prefix, invalid hex, etc.).
/// Never panics.
///
/// # Examples
///
/// ```
/// use about_gate::webhooks::parse_signature_header;
///
/// assert!(parse_signature_header("sha1=abcd1234").is_some());
///
/// // Missing prefix
/// assert!(parse_signature_header("abcd1234").is_none());
///
/// // Wrong algorithm
/// assert!(parse_signature_header("sha256=abcd1234").is_none());
///
/// // Bad hex
/// assert!(parse_signature_header("sha1=xyz").is_none());
/// ```
pub fn parse_signature_header(header: &str) -> Option<Vec<u8>> {
    let hex_sig = header.strip_prefix(SIGNATURE_PREFIX)?;
    hex::decode(hex_sig).ok()
}

/// Computes the HMAC-SHA1 signature of a payload using the given secret.
///
/// Useful for tests and for tooling that replays deliveries.
pub fn compute_signature(payload: &[u8], secret: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha1::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(payload);
    mac.finalize().into_bytes().to_vec()
}

/// Formats a signature as a GitHub-style header value (`sha1=<hex>`).
pub fn format_signature_header(signature: &[u8]) -> String {
    format!("{}{}", SIGNATURE_PREFIX, hex::encode(signature))
}

/// Verifies a GitHub webhook signature against the payload and secret.
///
/// Returns `true` only for the exact expected signature. A mismatch, a missing or
/// malformed header, or an empty secret all yield `false`. The digest comparison
/// is constant-time (done by the HMAC library).
///
/// # Arguments
///
/// * `payload` - The raw webhook body bytes
/// * `signature_header` - The `X-Hub-Signature` header value, if one was sent
/// * `secret` - The webhook secret configured on the GitHub App
///
/// # Examples
///
/// ```
/// use about_gate::webhooks::{compute_signature, format_signature_header, verify_signature};
///
/// let payload = b"Hello, World!";
/// let secret = b"my-secret-key";
///
/// let header = format_signature_header(&compute_signature(payload, secret));
///
/// assert!(verify_signature(payload, Some(&header), secret));
/// assert!(!verify_signature(payload, Some(&header), b"wrong-secret"));
/// assert!(!verify_signature(payload, None, secret));
/// ```
pub fn verify_signature(payload: &[u8], signature_header: Option<&str>, secret: &[u8]) -> bool {
    if secret.is_empty() {
        return false;
    }

    let Some(expected_signature) = signature_header.and_then(parse_signature_header) else {
        return false;
    };

    let mut mac = match HmacSha1::new_from_slice(secret) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(payload);

    mac.verify_slice(&expected_signature).is_ok()
}
