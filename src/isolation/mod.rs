//! Process isolation harness.
//!
//! The parser never runs in the caller's process. It runs in a forked
//! child under OS-enforced resource limits, communicates back exactly one
//! file (a bincode-serialized [`WorkerOutcome`]), and is never retried: an
//! input that crashed or mistreated its resource budget once is not safer
//! to hand to a second worker.
//!
//! Network denial and filesystem-write confinement beyond the worker's own
//! temp directory are asserted here by construction (the worker links no
//! networking code path and is never told any path but its input and its
//! own temp directory) rather than enforced by a kernel sandbox layer
//! (seccomp/landlock); a future hardening pass could add one without
//! changing this module's public contract.

mod worker;

use crate::error::{Error, IsolationFailure, ParseFailure, Result};
use crate::ir::{Document, ImageFilter};
use crate::parser::whitelist::Policy;
use crate::parser_config::ParserLimits;
use nix::sys::signal::{self, Signal};
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::{ForkResult, Pid, fork};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, Instant};

/// Resource envelope enforced on the worker process, independent of the
/// parser's own [`ParserLimits`] (which bound the *document*; these bound
/// the *process*).
#[derive(Debug, Clone, Copy)]
pub struct IsolationLimits {
    /// Wall-clock budget for the whole parse. Exceeding it is a [`IsolationFailure::Timeout`].
    pub wall_clock_timeout: Duration,
    /// RLIMIT_AS in bytes.
    pub resident_memory_bytes: u64,
    /// Number of CPUs the worker is pinned to via `sched_setaffinity`.
    pub cpu_cores: usize,
    /// Maximum size of the serialized IR the worker may write back.
    pub max_output_bytes: usize,
}

impl Default for IsolationLimits {
    fn default() -> Self {
        Self {
            wall_clock_timeout: Duration::from_secs(300),
            resident_memory_bytes: 500 * 1024 * 1024,
            cpu_cores: 1,
            max_output_bytes: 64 * 1024 * 1024,
        }
    }
}

/// What the worker reports back across the process boundary. A clean
/// rejection is not a crash — only a panic or a resource-limit kill
/// produces an [`IsolationFailure`] instead of one of these.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) enum WorkerOutcome {
    /// The document parsed and validated.
    Parsed(Document),
    /// The document was rejected by the allow-list parser. Carries the
    /// original failure's stable taxon and display message, since the
    /// `Error` type itself isn't serializable end to end.
    Rejected { taxon: String, message: String },
}

/// Parse `input_path` inside an isolated worker process.
///
/// Returns the same error taxonomy a direct [`crate::parser::whitelist::parse_document`]
/// call would for a legitimate rejection (the worker's verdict, not a
/// harness failure); returns [`Error::Isolation`] only when the harness
/// itself failed to get a verdict out of the worker at all (crash,
/// timeout, corrupt transport).
pub fn parse_isolated(
    input_path: &Path,
    parser_limits: &ParserLimits,
    isolation_limits: &IsolationLimits,
    policy: Policy,
    allowed_image_filters: &[ImageFilter],
) -> Result<Document> {
    let metadata = std::fs::symlink_metadata(input_path).map_err(IsolationFailure::Io)?;
    if metadata.file_type().is_symlink() {
        return Err(ParseFailure::Malformed {
            offset: 0,
            reason: "input path is a symlink".to_string(),
        }
        .into());
    }
    if metadata.len() as usize > parser_limits.max_file_size {
        return Err(ParseFailure::Malformed {
            offset: 0,
            reason: format!("input exceeds max_file_size of {}", parser_limits.max_file_size),
        }
        .into());
    }

    let job_dir = tempfile::tempdir().map_err(IsolationFailure::Io)?;
    let ir_output_path = job_dir.path().join("ir.bin");

    // SAFETY: the child path between fork and exit performs only
    // async-signal-safe-equivalent work (setting rlimits, parsing in
    // memory, and a single file write) and never touches the parent's
    // runtime state.
    match unsafe { fork() } {
        Ok(ForkResult::Child) => {
            worker::run_child(
                input_path,
                &ir_output_path,
                parser_limits,
                isolation_limits,
                policy,
                allowed_image_filters,
            );
        },
        Ok(ForkResult::Parent { child }) => {
            supervise(child, isolation_limits, &ir_output_path)
        },
        Err(e) => Err(IsolationFailure::SpawnFailed(e.to_string()).into()),
    }
}

fn supervise(
    child: Pid,
    isolation_limits: &IsolationLimits,
    ir_output_path: &Path,
) -> Result<Document> {
    let start = Instant::now();
    let status = loop {
        match waitpid(child, Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) => {
                if start.elapsed() > isolation_limits.wall_clock_timeout {
                    let _ = signal::kill(child, Signal::SIGKILL);
                    let _ = waitpid(child, None);
                    return Err(IsolationFailure::Timeout(isolation_limits.wall_clock_timeout).into());
                }
                std::thread::sleep(Duration::from_millis(25));
            },
            Ok(status) => break status,
            Err(e) => return Err(IsolationFailure::AbnormalExit(format!("waitpid failed: {e}")).into()),
        }
    };

    match status {
        WaitStatus::Exited(_, 0) => read_outcome(ir_output_path, isolation_limits.max_output_bytes),
        WaitStatus::Exited(_, code) => {
            Err(IsolationFailure::AbnormalExit(format!("worker exited with status {code}")).into())
        },
        WaitStatus::Signaled(_, sig, _) => {
            let reason = match sig {
                Signal::SIGKILL | Signal::SIGXCPU | Signal::SIGXFSZ | Signal::SIGSEGV => {
                    IsolationFailure::ResourceLimitExceeded(format!("worker killed by {sig}"))
                },
                other => IsolationFailure::AbnormalExit(format!("worker killed by {other}")),
            };
            Err(reason.into())
        },
        other => Err(IsolationFailure::AbnormalExit(format!("unexpected wait status: {other:?}")).into()),
    }
}

fn read_outcome(ir_output_path: &Path, max_output_bytes: usize) -> Result<Document> {
    let bytes = std::fs::read(ir_output_path)
        .map_err(|e| Error::Isolation(IsolationFailure::CorruptOutput(e.to_string())))?;
    if bytes.len() > max_output_bytes {
        return Err(IsolationFailure::ResourceLimitExceeded(format!(
            "worker output of {} bytes exceeds max_output_bytes {max_output_bytes}",
            bytes.len()
        ))
        .into());
    }
    let outcome: WorkerOutcome = bincode::deserialize(&bytes)
        .map_err(|e| Error::Isolation(IsolationFailure::CorruptOutput(e.to_string())))?;
    match outcome {
        WorkerOutcome::Parsed(doc) => {
            crate::ir::validate::validate_document(&doc)?;
            Ok(doc)
        },
        WorkerOutcome::Rejected { taxon, message } => {
            Err(Error::Rejected { taxon: Box::leak(taxon.into_boxed_str()), message })
        },
    }
}
