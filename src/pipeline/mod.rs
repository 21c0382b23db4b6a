//! Job lifecycle and the single orchestrator that ties the whitelist
//! parser, isolation harness, reconstructor, and audit writer together.
//!
//! `PipelineController`
//! accepts one [`JobRequest`] at a time through a mutex-serialized queue —
//! the per-job OS resource envelope [`crate::isolation::IsolationLimits`] is
//! sized for exactly one worker, so running two jobs concurrently through
//! the same controller would silently violate that envelope rather than
//! just be slower. Throughput comes from running multiple controllers.

use crate::audit::canonical;
use crate::audit::{AuditEvent, AuditWriter, DocumentSummary, JobStatus, ThreatRecord, format_event_id};
use crate::error::{Error, PipelineFailure, Result};
use crate::ir::ImageFilter;
use crate::isolation::{self, IsolationLimits};
use crate::parser::whitelist::Policy;
use crate::parser_config::ParserLimits;
use crate::reconstruct;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::Instant;

/// One job submitted to a [`PipelineController`].
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub input_path: PathBuf,
    /// If absent, the output path is derived from the input's stem.
    pub output_path: Option<PathBuf>,
    pub operator: String,
    pub workstation_id: String,
    pub classification_tag: String,
    /// `Strict` is the aggressive policy (reject on any disallowed
    /// construct); `Standard` is the lenient one (drop and log). See
    /// `DESIGN.md`'s Open Question decisions for why this reuses
    /// `parser::whitelist::Policy` rather than a second enum.
    pub policy: Policy,
    /// Whether an external collaborator has attested the source medium is
    /// read-only for this job.
    pub source_readonly_attested: bool,
}

/// Outcome of [`PipelineController::submit`], independent of the fuller
/// detail recorded in the matching [`AuditEvent`].
#[derive(Debug, Clone)]
pub struct JobResult {
    pub event_id: String,
    pub status: JobStatus,
    pub output_path: Option<PathBuf>,
    /// Stable taxon string, present iff `status != Success`.
    pub failure_reason: Option<String>,
}

/// Read-only settings for a [`PipelineController`], loaded once at
/// controller construction.
pub struct PipelineConfig {
    /// Jobs' `input_path` must resolve inside this directory.
    pub input_root: PathBuf,
    /// Fallback output directory when a sibling-of-input path isn't writable.
    pub output_root: PathBuf,
    pub audit_dir: PathBuf,
    pub hmac_key: Vec<u8>,
    pub parser_limits: ParserLimits,
    pub isolation_limits: IsolationLimits,
    pub max_output_bytes: usize,
    pub allowed_image_filters: Vec<ImageFilter>,
    pub source_readonly_required: bool,
}

/// The single orchestrator. One instance processes one job at a time;
/// throughput comes from running multiple instances, each with its own
/// worker process and audit-event id space.
pub struct PipelineController {
    config: PipelineConfig,
    audit: AuditWriter,
    queue_lock: Mutex<()>,
    last_event_millis: AtomicI64,
    aborted: AtomicBool,
}

struct JobOutcome {
    status: JobStatus,
    output_path: Option<PathBuf>,
    sanitized: Option<(String, String, u64)>,
    threats: Vec<ThreatRecord>,
    failure_reason: Option<String>,
    input_sha256: String,
    input_bytes: u64,
}

impl PipelineController {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let audit = AuditWriter::new(config.audit_dir.clone(), config.hmac_key.clone())?;
        Ok(Self {
            config,
            audit,
            queue_lock: Mutex::new(()),
            last_event_millis: AtomicI64::new(0),
            aborted: AtomicBool::new(false),
        })
    }

    /// Process one job through the full lifecycle: precondition gate,
    /// output-path planning, isolated parse, reconstruction, and a durably
    /// written audit event — produced regardless of outcome.
    pub fn submit(&self, job: JobRequest) -> Result<JobResult> {
        let _serialize = self.queue_lock.lock().expect("pipeline mutex poisoned");
        if self.aborted.load(Ordering::SeqCst) {
            return Err(PipelineFailure::Aborted.into());
        }

        let start = Instant::now();
        let now = chrono::Utc::now();
        let event_id = self.next_event_id(now);

        let outcome = match self.precondition_gate(&job) {
            Ok((input_sha256, input_bytes)) => self.run_job(&job, input_sha256, input_bytes),
            Err(e) => JobOutcome {
                status: JobStatus::Failed,
                output_path: None,
                sanitized: None,
                threats: vec![],
                failure_reason: Some(e.taxon().to_string()),
                input_sha256: String::new(),
                input_bytes: 0,
            },
        };

        let event = AuditEvent {
            event_id: event_id.clone(),
            utc_timestamp: now.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            workstation_id: job.workstation_id.clone(),
            operator: job.operator.clone(),
            classification_tag: job.classification_tag.clone(),
            document: DocumentSummary {
                original_name: file_name(&job.input_path),
                original_sha256: outcome.input_sha256.clone(),
                original_bytes: outcome.input_bytes,
                sanitized_name: outcome.sanitized.as_ref().map(|(name, _, _)| name.clone()),
                sanitized_sha256: outcome.sanitized.as_ref().map(|(_, sha, _)| sha.clone()),
                sanitized_bytes: outcome.sanitized.as_ref().map(|(_, _, bytes)| *bytes),
                processing_ms: start.elapsed().as_millis() as u64,
            },
            threats_removed: outcome.threats.clone(),
            policy: policy_label(job.policy).to_string(),
            status: outcome.status,
            failure_reason: outcome.failure_reason.clone(),
            hmac_sha256: String::new(),
        };
        self.audit.append(event)?;

        Ok(JobResult {
            event_id,
            status: outcome.status,
            output_path: outcome.output_path,
            failure_reason: outcome.failure_reason,
        })
    }

    /// Record a final `COMPROMISE_ABORT` audit event and stop accepting
    /// jobs. For an external watchdog that has detected the controller's
    /// own environment may be compromised.
    pub fn abort(&self, reason: &str) -> Result<()> {
        let _serialize = self.queue_lock.lock().expect("pipeline mutex poisoned");
        self.aborted.store(true, Ordering::SeqCst);
        let now = chrono::Utc::now();
        let event = AuditEvent {
            event_id: self.next_event_id(now),
            utc_timestamp: now.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            workstation_id: String::new(),
            operator: String::new(),
            classification_tag: String::new(),
            document: DocumentSummary {
                original_name: String::new(),
                original_sha256: String::new(),
                original_bytes: 0,
                sanitized_name: None,
                sanitized_sha256: None,
                sanitized_bytes: None,
                processing_ms: 0,
            },
            threats_removed: vec![],
            policy: String::new(),
            status: JobStatus::CompromiseAbort,
            failure_reason: Some(reason.to_string()),
            hmac_sha256: String::new(),
        };
        self.audit.append(event)
    }

    /// Derive the next `event_id`, bumping past `now` when necessary so ids
    /// stay monotonically non-decreasing even for two jobs landing in the
    /// same millisecond.
    fn next_event_id(&self, now: chrono::DateTime<chrono::Utc>) -> String {
        let candidate = now.timestamp_millis();
        let assigned = loop {
            let last = self.last_event_millis.load(Ordering::SeqCst);
            let next = candidate.max(last + 1);
            if self
                .last_event_millis
                .compare_exchange(last, next, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                break next;
            }
        };
        let dt = chrono::DateTime::from_timestamp_millis(assigned).unwrap_or(now);
        format_event_id(dt)
    }

    /// Verify everything that can be checked before a single byte of the
    /// candidate PDF is handed to the isolated parser.
    fn precondition_gate(&self, job: &JobRequest) -> Result<(String, u64)> {
        if self.config.source_readonly_required && !job.source_readonly_attested {
            return Err(PipelineFailure::SourceNotReadonly.into());
        }

        let ext_ok = job
            .input_path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);
        if !ext_ok {
            return Err(PipelineFailure::InvalidInputPath("missing .pdf extension".into()).into());
        }

        let canonical_input = std::fs::canonicalize(&job.input_path)
            .map_err(|e| PipelineFailure::InvalidInputPath(e.to_string()))?;
        let root = std::fs::canonicalize(&self.config.input_root)
            .map_err(|e| PipelineFailure::InvalidInputPath(e.to_string()))?;
        if !canonical_input.starts_with(&root) {
            return Err(PipelineFailure::InvalidInputPath(
                "resolved path escapes the declared input root".into(),
            )
            .into());
        }

        let metadata =
            std::fs::metadata(&canonical_input).map_err(|e| PipelineFailure::InvalidInputPath(e.to_string()))?;
        let max = self.config.parser_limits.max_file_size as u64;
        if metadata.len() > max {
            return Err(PipelineFailure::Oversize { actual: metadata.len(), max }.into());
        }

        let bytes =
            std::fs::read(&canonical_input).map_err(|e| PipelineFailure::InvalidInputPath(e.to_string()))?;
        if !bytes.starts_with(b"%PDF-") {
            return Err(PipelineFailure::InvalidInputPath("missing %PDF- magic bytes".into()).into());
        }

        let sha = canonical::hex_encode(&Sha256::digest(&bytes));
        Ok((sha, metadata.len()))
    }

    /// Plan the output path, parse under isolation, and reconstruct.
    /// IR re-validation happens inside `isolation::parse_isolated` itself
    /// (the first point the IR crosses into controller-owned memory), so
    /// this doesn't redo it.
    fn run_job(&self, job: &JobRequest, input_sha256: String, input_bytes: u64) -> JobOutcome {
        let output_path = self.plan_output_path(job);

        let doc = match isolation::parse_isolated(
            &job.input_path,
            &self.config.parser_limits,
            &self.config.isolation_limits,
            job.policy,
            &self.config.allowed_image_filters,
        ) {
            Ok(doc) => doc,
            Err(e) => {
                return JobOutcome {
                    status: failure_status(&e),
                    output_path: None,
                    sanitized: None,
                    threats: synthesize_failure_threat(&e),
                    failure_reason: Some(e.taxon().to_string()),
                    input_sha256,
                    input_bytes,
                };
            },
        };

        let threats: Vec<ThreatRecord> = doc.threats.iter().map(ThreatRecord::from).collect();

        match reconstruct::reconstruct(&doc, &output_path, self.config.max_output_bytes) {
            Ok(()) => {
                let out_bytes = std::fs::read(&output_path).unwrap_or_default();
                let out_sha = canonical::hex_encode(&Sha256::digest(&out_bytes));
                JobOutcome {
                    status: JobStatus::Success,
                    output_path: Some(output_path.clone()),
                    sanitized: Some((file_name(&output_path), out_sha, out_bytes.len() as u64)),
                    threats,
                    failure_reason: None,
                    input_sha256,
                    input_bytes,
                }
            },
            Err(e) => JobOutcome {
                status: JobStatus::Failed,
                output_path: None,
                sanitized: None,
                threats,
                failure_reason: Some(e.taxon().to_string()),
                input_sha256,
                input_bytes,
            },
        }
    }

    fn plan_output_path(&self, job: &JobRequest) -> PathBuf {
        if let Some(explicit) = &job.output_path {
            return explicit.clone();
        }
        let stem = job.input_path.file_stem().and_then(|s| s.to_str()).unwrap_or("output");
        let sibling = job.input_path.parent().map(|p| p.join(format!("{stem}_sanitized.pdf")));
        match &sibling {
            Some(path) if directory_writable(path.parent().unwrap_or(Path::new("."))) => path.clone(),
            _ => self.config.output_root.join(format!("{stem}_sanitized.pdf")),
        }
    }
}

/// A worker rejection surfaces as `Error::Rejected` (the taxon/message pair
/// that crossed the process boundary); anything else is a harness- or
/// reconstructor-level failure.
fn failure_status(e: &Error) -> JobStatus {
    match e {
        Error::Isolation(crate::error::IsolationFailure::Timeout(_)) => JobStatus::Timeout,
        Error::Rejected { .. } | Error::Parse(_) => JobStatus::Rejected,
        _ => JobStatus::Failed,
    }
}

/// A `DISALLOWED_CONSTRUCT` rejection is the one case where a rejected job
/// still has a `threats_removed` entry to report: the single construct
/// that ended parsing. The worker reports it as `Error::Rejected` (taxon
/// preserved, message flattened to a string) rather than
/// `Error::Parse(ParseFailure::DisallowedConstruct{..})` directly, since it
/// crossed the isolation boundary — so the message is parsed back out of
/// its own stable, self-authored format (`disallowed construct '<c>' at
/// <locator>`) rather than matched structurally.
fn synthesize_failure_threat(e: &Error) -> Vec<ThreatRecord> {
    if e.taxon() != "DISALLOWED_CONSTRUCT" {
        return vec![];
    }
    if let Error::Parse(crate::error::ParseFailure::DisallowedConstruct { construct, locator }) = e {
        return vec![ThreatRecord {
            kind: construct.to_string(),
            severity: crate::ir::ThreatSeverity::Critical,
            locator: locator.clone(),
            action: crate::ir::ThreatAction::Rejected,
        }];
    }
    let message = e.to_string();
    let mut parts = message.splitn(2, '\'');
    parts.next();
    let Some(rest) = parts.next() else { return vec![] };
    let mut rest_parts = rest.splitn(2, "' at ");
    let construct = rest_parts.next().unwrap_or_default().to_string();
    let locator = rest_parts.next().unwrap_or_default().to_string();
    vec![ThreatRecord {
        kind: construct,
        severity: crate::ir::ThreatSeverity::Critical,
        locator,
        action: crate::ir::ThreatAction::Rejected,
    }]
}

fn policy_label(policy: Policy) -> &'static str {
    match policy {
        Policy::Strict => "AGGRESSIVE",
        Policy::Standard => "LENIENT",
    }
}

fn file_name(path: &Path) -> String {
    path.file_name().and_then(|n| n.to_str()).unwrap_or("").to_string()
}

fn directory_writable(dir: &Path) -> bool {
    let probe = dir.join(".pdf_sanitize_write_probe");
    match std::fs::File::create(&probe) {
        Ok(_) => {
            let _ = std::fs::remove_file(&probe);
            true
        },
        Err(_) => false,
    }
}
