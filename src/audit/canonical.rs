//! HMAC canonicalization for audit records.
//!
//! The canonical form: serialize every [`super::AuditEvent`] field except
//! `hmac_sha256` to JSON, then HMAC-SHA256 the resulting bytes. Object keys
//! come out alphabetically sorted at every nesting level because
//! `serde_json::Map` is backed by a `BTreeMap` whenever the `preserve_order`
//! feature is not enabled (it isn't, here) — this crate relies on that
//! default rather than re-implementing key sorting. Any reader that wants
//! to verify a stored record's MAC must reproduce exactly this procedure.

use super::AuditEvent;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Canonical JSON bytes of `event`, with `hmac_sha256` excluded.
pub fn canonicalize(event: &AuditEvent) -> Vec<u8> {
    let mut value = serde_json::to_value(event).expect("AuditEvent always serializes to JSON");
    if let Some(obj) = value.as_object_mut() {
        obj.remove("hmac_sha256");
    }
    serde_json::to_vec(&value).expect("a JSON Value always serializes")
}

/// Compute the hex-encoded HMAC-SHA256 of `event`'s canonical form under `key`.
pub fn compute_hmac(event: &AuditEvent, key: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC-SHA256 accepts any key length");
    mac.update(&canonicalize(event));
    hex_encode(&mac.finalize().into_bytes())
}

/// Whether `event.hmac_sha256` matches its canonical form under `key`.
/// An event with integrity `expected` is computed fresh — the stored value
/// is never trusted without recomputation.
pub fn verify_hmac(event: &AuditEvent, key: &[u8]) -> bool {
    compute_hmac(event, key) == event.hmac_sha256
}

pub fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        write!(out, "{b:02x}").expect("writing to a String never fails");
    }
    out
}
