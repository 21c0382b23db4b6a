//! Environment attestation, consumed from an external collaborator.
//!
//! This crate never determines whether a source medium is read-only; that
//! is a platform-specific concern explicitly out of scope. What
//! it does do is treat an externally produced [`Attestation`] as an
//! authenticated input, checked for staleness before being folded into a
//! [`crate::pipeline::JobRequest::source_readonly_attested`] boolean.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A single attestation of a source medium's read-only state, produced by
/// an external isolation layer (drive-letter policy enforcement, removable
/// media controller, etc.) and handed to this crate per job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attestation {
    /// Whether the source medium was read-only at `attested_at`.
    pub source_readonly: bool,
    /// When the attestation was produced.
    pub attested_at: chrono::DateTime<chrono::Utc>,
    /// Identifier of the system that produced the attestation, recorded
    /// for audit provenance even though it isn't part of `AuditEvent`
    /// itself today.
    pub source_identifier: String,
}

impl Attestation {
    /// Whether this attestation is both positive and recent enough to act
    /// on. An attestation older than `max_age` is treated as absent —
    /// stale information about a removable medium's state is as
    /// untrustworthy as no information at all.
    pub fn is_valid(&self, now: chrono::DateTime<chrono::Utc>, max_age: Duration) -> bool {
        if !self.source_readonly {
            return false;
        }
        let age = now.signed_duration_since(self.attested_at);
        age >= chrono::Duration::zero() && age <= chrono::Duration::from_std(max_age).unwrap_or(chrono::Duration::MAX)
    }
}

/// Fold an optional attestation into the boolean
/// [`crate::pipeline::JobRequest`] needs, applying the staleness window a
/// policy configures. Absence of an attestation is never upgraded to
/// `true`.
pub fn evaluate(
    attestation: Option<&Attestation>,
    now: chrono::DateTime<chrono::Utc>,
    max_age: Duration,
) -> bool {
    attestation.map(|a| a.is_valid(now, max_age)).unwrap_or(false)
}
