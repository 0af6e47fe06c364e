//! Webhook handling for GitHub events.
//!
//! This module provides:
//! - Signature verification for webhook payloads (HMAC-SHA1, `X-Hub-Signature`)
//! - Event classification: which deliveries run the gate, and with what context

pub mod classifier;
pub mod events;
pub mod signature;

pub use classifier::{ClassifyError, classify_webhook};
pub use events::{ClassifiedEvent, EventKind, NoOpReason, Repository, WebhookEvent};
pub use signature::{
    compute_signature, format_signature_header, parse_signature_header, verify_signature,
};
