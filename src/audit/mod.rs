//! Tamper-evident, dual-format audit trail.
//!
//! Every job, successful or not, produces exactly one [`AuditEvent`]. It is
//! written twice — a JSON record for machine consumption and a
//! human-readable text summary — both under the same `event_id`-derived
//! file stem, and both covered by a single HMAC-SHA256 computed over the
//! JSON record's canonical form (see [`canonical`]).

pub mod canonical;

use crate::error::{AuditFailure, Result};
use crate::ir::{ThreatAction, ThreatEvent, ThreatSeverity};
use nix::fcntl::{FlockArg, flock};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

/// Per-job summary of input/output identity and timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub original_name: String,
    /// Hex-encoded SHA-256.
    pub original_sha256: String,
    pub original_bytes: u64,
    /// Absent for a job that never produced output.
    pub sanitized_name: Option<String>,
    /// Hex-encoded SHA-256, absent for a job that never produced output.
    pub sanitized_sha256: Option<String>,
    pub sanitized_bytes: Option<u64>,
    pub processing_ms: u64,
}

/// Outcome of a job, recorded verbatim in the audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Success,
    Failed,
    Rejected,
    Timeout,
    CompromiseAbort,
}

/// A single stripped-or-rejected construct, as it appears in the audit
/// record (a flat, serializable mirror of [`ThreatEvent`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatRecord {
    pub kind: String,
    pub severity: ThreatSeverity,
    pub locator: String,
    pub action: ThreatAction,
}

impl From<&ThreatEvent> for ThreatRecord {
    fn from(t: &ThreatEvent) -> Self {
        Self { kind: t.kind.clone(), severity: t.severity, locator: t.locator.clone(), action: t.action }
    }
}

/// One tamper-evident record of a completed job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// `STZ-YYYYMMDD-HHMMSSmmm`, monotonic per controller.
    pub event_id: String,
    /// ISO-8601 with milliseconds, `Z` suffix.
    pub utc_timestamp: String,
    pub workstation_id: String,
    pub operator: String,
    pub classification_tag: String,
    pub document: DocumentSummary,
    pub threats_removed: Vec<ThreatRecord>,
    /// `"AGGRESSIVE"` or `"LENIENT"`, the job's policy selector.
    pub policy: String,
    pub status: JobStatus,
    /// Present iff `status != Success`.
    pub failure_reason: Option<String>,
    /// Hex-encoded HMAC-SHA256 over the canonical form of every other field.
    /// Empty until [`AuditWriter::append`] signs it.
    #[serde(default)]
    pub hmac_sha256: String,
}

/// Builds a `STZ-YYYYMMDD-HHMMSSmmm` event id from a timestamp. Callers
/// (the pipeline controller) are responsible for bumping the millisecond
/// component when two jobs would otherwise land on the same instant, to
/// preserve the "monotonically non-decreasing" ordering guarantee.
pub fn format_event_id(now: chrono::DateTime<chrono::Utc>) -> String {
    format!("STZ-{}", now.format("%Y%m%d-%H%M%S%3f"))
}

/// Dual-sink, HMAC-signing audit writer. Holds an advisory lock on its
/// directory for the duration of each append, so multiple `AuditWriter`s
/// (e.g. from independent `PipelineController` processes) pointed at the
/// same directory don't interleave writes.
pub struct AuditWriter {
    dir: PathBuf,
    hmac_key: Vec<u8>,
}

impl AuditWriter {
    pub fn new(dir: impl Into<PathBuf>, hmac_key: Vec<u8>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(AuditFailure::Io)?;
        Ok(Self { dir, hmac_key })
    }

    /// Append `event`, signing it first. Idempotent by `event_id`: if both
    /// sink files for this id already exist, this is a no-op success.
    pub fn append(&self, mut event: AuditEvent) -> Result<()> {
        let json_path = self.dir.join(format!("{}.json", event.event_id));
        let text_path = self.dir.join(format!("{}.txt", event.event_id));

        let _lock = DirLock::acquire(&self.dir)?;

        if json_path.exists() && text_path.exists() {
            return Ok(());
        }

        event.hmac_sha256 = canonical::compute_hmac(&event, &self.hmac_key);
        let json_bytes = serde_json::to_vec_pretty(&event)
            .map_err(|e| AuditFailure::WriteFailed(e.to_string()))?;
        let text = render_text(&event);

        write_with_retry(&json_path, &json_bytes)?;
        write_with_retry(&text_path, text.as_bytes())?;
        Ok(())
    }

    /// Read back a stored JSON record and verify its HMAC. An invalid MAC
    /// is reported as [`AuditFailure::TamperDetected`], not silently
    /// corrected — per the tamper-evidence contract, a bad MAC is a
    /// discovery, not something to repair.
    pub fn read_and_verify(&self, event_id: &str) -> Result<AuditEvent> {
        let path = self.dir.join(format!("{event_id}.json"));
        let bytes = fs::read(&path).map_err(AuditFailure::Io)?;
        let event: AuditEvent =
            serde_json::from_slice(&bytes).map_err(|e| AuditFailure::WriteFailed(e.to_string()))?;
        if !canonical::verify_hmac(&event, &self.hmac_key) {
            return Err(AuditFailure::TamperDetected(event_id.to_string()).into());
        }
        Ok(event)
    }
}

fn write_with_retry(path: &Path, bytes: &[u8]) -> Result<()> {
    match write_atomic(path, bytes) {
        Ok(()) => Ok(()),
        Err(_) => write_atomic(path, bytes).map_err(|e| AuditFailure::WriteFailed(e.to_string()).into()),
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp_path = path.with_extension(format!(
        "{}.tmp",
        path.extension().and_then(|e| e.to_str()).unwrap_or("bin")
    ));
    {
        let mut f = File::create(&tmp_path)?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;
    // fsync the containing directory so the rename is itself durable
    // before the caller is told the record is written.
    if let Some(parent) = path.parent() {
        if let Ok(dir) = File::open(parent) {
            let _ = dir.sync_all();
        }
    }
    Ok(())
}

fn render_text(event: &AuditEvent) -> String {
    let mut out = String::new();
    out.push_str(&format!("event_id: {}\n", event.event_id));
    out.push_str(&format!("utc_timestamp: {}\n", event.utc_timestamp));
    out.push_str(&format!("operator: {}\n", event.operator));
    out.push_str(&format!("workstation_id: {}\n", event.workstation_id));
    out.push_str(&format!("classification: {}\n", event.classification_tag));
    out.push_str(&format!("policy: {}\n", event.policy));
    out.push_str(&format!("status: {:?}\n", event.status));
    if let Some(reason) = &event.failure_reason {
        out.push_str(&format!("failure_reason: {reason}\n"));
    }
    out.push_str(&format!(
        "original: {} ({} bytes, sha256 {})\n",
        event.document.original_name, event.document.original_bytes, event.document.original_sha256
    ));
    match (&event.document.sanitized_name, &event.document.sanitized_sha256, event.document.sanitized_bytes)
    {
        (Some(name), Some(sha), Some(bytes)) => {
            out.push_str(&format!("sanitized: {name} ({bytes} bytes, sha256 {sha})\n"));
        },
        _ => out.push_str("sanitized: (none)\n"),
    }
    out.push_str(&format!("processing_ms: {}\n", event.document.processing_ms));
    out.push_str(&format!("threats_removed: {}\n", event.threats_removed.len()));
    for t in &event.threats_removed {
        out.push_str(&format!("  - {:?} {} at {} -> {:?}\n", t.severity, t.kind, t.locator, t.action));
    }
    out
}

struct DirLock {
    _file: File,
}

impl DirLock {
    fn acquire(dir: &Path) -> Result<Self> {
        let lock_path = dir.join(".audit.lock");
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(AuditFailure::Io)?;
        flock(file.as_raw_fd(), FlockArg::LockExclusive)
            .map_err(|e| AuditFailure::LockFailed(e.to_string()))?;
        Ok(Self { _file: file })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event(id: &str) -> AuditEvent {
        AuditEvent {
            event_id: id.to_string(),
            utc_timestamp: "2026-08-01T12:00:00.000Z".to_string(),
            workstation_id: "ws-1".to_string(),
            operator: "alice".to_string(),
            classification_tag: "UNCLASSIFIED".to_string(),
            document: DocumentSummary {
                original_name: "in.pdf".to_string(),
                original_sha256: "0".repeat(64),
                original_bytes: 10,
                sanitized_name: Some("in_sanitized.pdf".to_string()),
                sanitized_sha256: Some("1".repeat(64)),
                sanitized_bytes: Some(9),
                processing_ms: 5,
            },
            threats_removed: vec![],
            policy: "AGGRESSIVE".to_string(),
            status: JobStatus::Success,
            failure_reason: None,
            hmac_sha256: String::new(),
        }
    }

    #[test]
    fn test_append_writes_both_sinks() {
        let dir = tempfile::tempdir().unwrap();
        let writer = AuditWriter::new(dir.path(), b"key".to_vec()).unwrap();
        writer.append(sample_event("STZ-20260801-120000000")).unwrap();
        assert!(dir.path().join("STZ-20260801-120000000.json").exists());
        assert!(dir.path().join("STZ-20260801-120000000.txt").exists());
    }

    #[test]
    fn test_append_is_idempotent_by_event_id() {
        let dir = tempfile::tempdir().unwrap();
        let writer = AuditWriter::new(dir.path(), b"key".to_vec()).unwrap();
        writer.append(sample_event("STZ-20260801-120000000")).unwrap();
        let mut second = sample_event("STZ-20260801-120000000");
        second.operator = "mallory".to_string();
        writer.append(second).unwrap();
        let stored = writer.read_and_verify("STZ-20260801-120000000").unwrap();
        assert_eq!(stored.operator, "alice");
    }

    #[test]
    fn test_read_and_verify_detects_tamper() {
        let dir = tempfile::tempdir().unwrap();
        let writer = AuditWriter::new(dir.path(), b"key".to_vec()).unwrap();
        writer.append(sample_event("STZ-20260801-120000001")).unwrap();
        let path = dir.path().join("STZ-20260801-120000001.json");
        let mut event: AuditEvent = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        event.operator = "mallory".to_string();
        fs::write(&path, serde_json::to_vec_pretty(&event).unwrap()).unwrap();
        let result = writer.read_and_verify("STZ-20260801-120000001");
        assert!(result.is_err());
    }

    #[test]
    fn test_event_id_format() {
        let now = chrono::DateTime::parse_from_rfc3339("2026-08-01T12:00:00.123Z")
            .unwrap()
            .with_timezone(&chrono::Utc);
        assert_eq!(format_event_id(now), "STZ-20260801-120000123");
    }
}
