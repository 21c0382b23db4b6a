//! The child-process side of the isolation boundary.
//!
//! Everything here runs after `fork` and before the process exits — there
//! is no return to the caller. Resource limits are applied before a single
//! byte of untrusted input is read; if applying them fails, the worker
//! exits without ever touching `input_path`.

use super::{IsolationLimits, WorkerOutcome};
use crate::ir::ImageFilter;
use crate::parser::whitelist::Policy;
use crate::parser_config::ParserLimits;
use nix::sched::{CpuSet, sched_setaffinity};
use nix::unistd::Pid;
use rlimit::Resource;
use std::io::Write;
use std::panic::AssertUnwindSafe;
use std::path::Path;

/// Exit code used when resource-limit setup itself fails, before any
/// parsing is attempted.
const EXIT_LIMIT_SETUP_FAILED: i32 = 102;
/// Exit code used when the parser panics instead of returning a `Result`.
const EXIT_PANIC: i32 = 101;

/// Apply resource limits, parse `input_path`, and write a [`WorkerOutcome`]
/// to `ir_output_path`. Never returns — the process always exits from
/// within this function.
pub(super) fn run_child(
    input_path: &Path,
    ir_output_path: &Path,
    parser_limits: &ParserLimits,
    isolation_limits: &IsolationLimits,
    policy: Policy,
    allowed_image_filters: &[ImageFilter],
) -> ! {
    if let Err(e) = apply_resource_limits(isolation_limits) {
        eprintln!("isolation worker: failed to apply resource limits: {e}");
        std::process::exit(EXIT_LIMIT_SETUP_FAILED);
    }

    let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| {
        crate::parser::whitelist::parse_document(
            input_path,
            parser_limits,
            policy,
            allowed_image_filters,
        )
    }));

    let worker_outcome = match outcome {
        Ok(Ok(doc)) => WorkerOutcome::Parsed(doc),
        Ok(Err(e)) => WorkerOutcome::Rejected { taxon: e.taxon().to_string(), message: e.to_string() },
        Err(_) => {
            eprintln!("isolation worker: parser panicked");
            std::process::exit(EXIT_PANIC);
        },
    };

    if let Err(e) = write_outcome(ir_output_path, &worker_outcome) {
        eprintln!("isolation worker: failed to write outcome: {e}");
        std::process::exit(EXIT_LIMIT_SETUP_FAILED);
    }
    std::process::exit(0);
}

fn apply_resource_limits(limits: &IsolationLimits) -> std::io::Result<()> {
    rlimit::setrlimit(Resource::AS, limits.resident_memory_bytes, limits.resident_memory_bytes)?;
    rlimit::setrlimit(
        Resource::CPU,
        limits.wall_clock_timeout.as_secs(),
        limits.wall_clock_timeout.as_secs(),
    )?;
    rlimit::setrlimit(Resource::FSIZE, limits.max_output_bytes as u64, limits.max_output_bytes as u64)?;
    // The worker may not fork further children of its own.
    rlimit::setrlimit(Resource::NPROC, 0, 0)?;

    let mut cpu_set = CpuSet::new();
    for core in 0..limits.cpu_cores.max(1) {
        cpu_set.set(core).map_err(std::io::Error::other)?;
    }
    sched_setaffinity(Pid::from_raw(0), &cpu_set).map_err(std::io::Error::other)?;
    Ok(())
}

/// Write `outcome` to `path` via a temp-file-then-rename so a crash
/// mid-write never leaves a half-written IR file for the parent to read.
fn write_outcome(path: &Path, outcome: &WorkerOutcome) -> std::io::Result<()> {
    let bytes = bincode::serialize(outcome)
        .map_err(|e| std::io::Error::other(format!("serializing worker outcome: {e}")))?;
    let tmp_path = path.with_extension("bin.tmp");
    {
        let mut f = std::fs::File::create(&tmp_path)?;
        f.write_all(&bytes)?;
        f.sync_all()?;
    }
    std::fs::rename(&tmp_path, path)
}
