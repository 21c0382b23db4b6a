//! Failure taxonomy for the sanitization engine.
//!
//! Five domain enums, one per component, matching the five failure buckets
//! the controller has to reason about: parsing, isolation, reconstruction,
//! audit I/O, and the pipeline-level wrapper around all of them. No error
//! is ever downgraded to `Ok` — a document that can't be classified cleanly
//! is rejected, not guessed at.

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures produced while reading an untrusted PDF into the allow-list IR.
#[derive(Debug, thiserror::Error)]
pub enum ParseFailure {
    /// The byte stream doesn't start with a recognizable PDF header.
    #[error("not a PDF: expected '%PDF-' header, found {0:?}")]
    NotAPdf(String),

    /// The byte stream ends before a structure the format requires is fully
    /// present (xref table, trailer, indirect object, declared stream length).
    #[error("truncated PDF: {0}")]
    Truncated(String),

    /// The header declares a `%PDF-N.N` version above the configured maximum.
    #[error("unsupported PDF version {found} (maximum {max})")]
    UnsupportedVersion {
        /// Version found in the header, e.g. `"2.0"`.
        found: String,
        /// Configured maximum, e.g. `"1.7"`.
        max: String,
    },

    /// A syntactic construct outside of what the tokenizer/reader accepts.
    #[error("malformed object at byte {offset}: {reason}")]
    Malformed {
        /// Byte offset of the failure.
        offset: usize,
        /// Human-readable reason.
        reason: String,
    },

    /// The document declares encryption. Encrypted documents are rejected,
    /// never decrypted.
    #[error("document is encrypted, rejecting without attempting decryption")]
    Encrypted,

    /// A dictionary key, object type, filter, or operator fell outside the
    /// allow-list.
    #[error("{construct} '{name}' is not on the allow-list")]
    NotWhitelisted {
        /// What kind of construct was rejected (filter, operator, object type...).
        construct: &'static str,
        /// The offending name.
        name: String,
    },

    /// A stream's declared filter(s) failed to decode.
    #[error("stream decode failed ({filter}): {reason}")]
    DecodeFailed {
        /// Filter name that failed.
        filter: String,
        /// Reason for the failure.
        reason: String,
    },

    /// Decompressed output exceeded the configured ratio or absolute size
    /// budget.
    #[error(
        "decompression budget exceeded: {actual} bytes from {compressed} compressed bytes (limit ratio {max_ratio}:1, limit size {max_size})"
    )]
    DecompressionBudgetExceeded {
        /// Compressed input size.
        compressed: usize,
        /// Decompressed output size that triggered the rejection.
        actual: usize,
        /// Configured maximum ratio.
        max_ratio: u32,
        /// Configured maximum absolute size.
        max_size: usize,
    },

    /// An image's decoded byte length didn't match
    /// width × height × components × bits/8 (invariant I5).
    #[error(
        "image size mismatch: decoded {decoded} bytes, expected {expected} for {width}x{height}x{components}@{bits_per_component}bpc"
    )]
    ImageSizeMismatch {
        /// Actual decoded length.
        decoded: usize,
        /// Expected length from declared dimensions.
        expected: usize,
        /// Declared width.
        width: u32,
        /// Declared height.
        height: u32,
        /// Declared component count.
        components: u8,
        /// Declared bits per component.
        bits_per_component: u8,
    },

    /// Object graph recursion or reference nesting exceeded the configured
    /// depth limit.
    #[error("recursion limit exceeded (max {0})")]
    RecursionLimitExceeded(u32),

    /// A resource cap other than recursion or decompression was exceeded:
    /// page count, image pixel count, or operators on a single page.
    #[error("limit exceeded: {which} (actual {actual}, max {max})")]
    LimitExceeded {
        /// Which limit, e.g. `"max_ops_per_page"` or `"max_image_pixels"`.
        which: &'static str,
        actual: u64,
        max: u64,
    },

    /// A reference cycle was found while resolving indirect objects.
    #[error("circular reference detected: object {0} {1} R")]
    CircularReference(u32, u16),

    /// The document has zero pages after parsing.
    #[error("document has no pages")]
    EmptyDocument,

    /// A disallowed, executable/interactive construct was found under a
    /// policy that rejects rather than strips (`Policy::Strict`).
    #[error("disallowed construct '{construct}' at {locator}")]
    DisallowedConstruct {
        /// Name of the construct, e.g. `OpenAction/JavaScript`.
        construct: &'static str,
        /// Where it was found.
        locator: String,
    },

    /// Generic catch-all for parse-time I/O.
    #[error("I/O error while parsing: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures produced by the isolation harness (spawning, supervising, or
/// communicating with the worker process).
#[derive(Debug, thiserror::Error)]
pub enum IsolationFailure {
    /// The worker process could not be spawned.
    #[error("failed to spawn worker process: {0}")]
    SpawnFailed(String),

    /// The worker exceeded its wall-clock budget and was killed.
    #[error("worker exceeded wall-clock timeout of {0:?}")]
    Timeout(std::time::Duration),

    /// The worker was killed or exited due to a resource limit
    /// (memory, CPU, subprocess count, filesystem write).
    #[error("worker violated resource limit: {0}")]
    ResourceLimitExceeded(String),

    /// The worker exited with a non-zero or signal-terminated status that
    /// isn't attributable to a known resource limit.
    #[error("worker exited abnormally: {0}")]
    AbnormalExit(String),

    /// The IR produced by the worker failed to deserialize.
    #[error("failed to decode worker output: {0}")]
    CorruptOutput(String),

    /// Setting an OS resource limit failed before exec.
    #[error("failed to apply resource limit: {0}")]
    LimitSetupFailed(String),

    /// Generic I/O failure talking to the worker (pipes, temp files).
    #[error("I/O error in isolation harness: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures produced while constructively emitting sanitized PDF bytes.
#[derive(Debug, thiserror::Error)]
pub enum ReconstructFailure {
    /// The IR handed to the reconstructor failed re-validation
    /// (defense-in-depth check before emission).
    #[error("IR failed re-validation: {0}")]
    InvalidIr(String),

    /// A font or image reference pointed at a resource the reconstructor
    /// doesn't know how to emit.
    #[error("unsupported resource: {0}")]
    UnsupportedResource(String),

    /// Internal serialization error (should not happen for a validated IR).
    #[error("serialization error: {0}")]
    Serialize(String),

    /// The IR has zero pages; there is nothing admissible to reconstruct.
    #[error("document has no pages, nothing to reconstruct")]
    EmptyDocument,

    /// The assembled output exceeds the configured output size budget.
    #[error("reconstructed output of {actual} bytes exceeds budget of {max}")]
    OutputExceedsBudget {
        /// Bytes produced so far.
        actual: usize,
        /// Configured maximum.
        max: usize,
    },

    /// Generic I/O failure while writing output bytes.
    #[error("I/O error during reconstruction: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures in the pipeline controller's own precondition checks, separate
/// from anything the parser, isolation harness, or reconstructor report.
#[derive(Debug, thiserror::Error)]
pub enum PipelineFailure {
    /// The source medium's read-only attestation was absent or false.
    #[error("source medium is not attested read-only")]
    SourceNotReadonly,

    /// The input path failed a structural precondition: wrong extension,
    /// path traversal, or resolution outside the declared input root.
    #[error("invalid input path: {0}")]
    InvalidInputPath(String),

    /// The input file exceeds the configured maximum.
    #[error("input file of {actual} bytes exceeds max_input_bytes of {max}")]
    Oversize {
        /// Actual file size.
        actual: u64,
        /// Configured maximum.
        max: u64,
    },

    /// The controller has received an ABORT signal and refuses new jobs.
    #[error("controller is aborted, refusing further jobs")]
    Aborted,
}

/// Failures writing or verifying the tamper-evident audit trail.
#[derive(Debug, thiserror::Error)]
pub enum AuditFailure {
    /// Could not acquire the advisory lock on the audit directory.
    #[error("failed to lock audit directory: {0}")]
    LockFailed(String),

    /// A write to the JSON or text sink failed.
    #[error("audit write failed: {0}")]
    WriteFailed(String),

    /// fsync of the audit record failed before the job was allowed to return.
    #[error("audit fsync failed: {0}")]
    FsyncFailed(String),

    /// HMAC verification of a stored record failed.
    #[error("audit record tamper-evidence check failed for event {0}")]
    TamperDetected(String),

    /// Generic I/O failure.
    #[error("I/O error in audit writer: {0}")]
    Io(#[from] std::io::Error),
}

impl ParseFailure {
    /// Shorthand for a single-filter decode failure, used throughout
    /// [`crate::decoders`].
    pub fn decode_failed(filter: &str, reason: impl std::fmt::Display) -> Error {
        Error::Parse(ParseFailure::DecodeFailed {
            filter: filter.to_string(),
            reason: reason.to_string(),
        })
    }
}

/// Top-level error wrapping every component failure, returned by the
/// pipeline controller.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Parsing failed inside the worker.
    #[error(transparent)]
    Parse(#[from] ParseFailure),

    /// The isolation harness itself failed.
    #[error(transparent)]
    Isolation(#[from] IsolationFailure),

    /// Reconstruction failed.
    #[error(transparent)]
    Reconstruct(#[from] ReconstructFailure),

    /// A pipeline-level precondition failed before parsing was ever
    /// attempted.
    #[error(transparent)]
    Pipeline(#[from] PipelineFailure),

    /// Writing the audit trail failed. Per the durability contract, this
    /// aborts the job even if parsing and reconstruction succeeded.
    #[error(transparent)]
    Audit(#[from] AuditFailure),

    /// A rejection verdict reconstructed from a worker process across the
    /// isolation boundary. The original `ParseFailure` variant doesn't
    /// survive process-boundary serialization intact; its stable taxon
    /// does, and that's what audit records need.
    #[error("{taxon}: {message}")]
    Rejected {
        /// Stable machine-readable taxon, copied from the worker's `Error::taxon()`.
        taxon: &'static str,
        /// Human-readable detail from the worker.
        message: String,
    },

    /// Configuration failed signature verification or failed to load.
    #[error("configuration error: {0}")]
    Config(String),

    /// Generic I/O.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Stable machine-readable taxon string recorded in `AuditEvent.failure_reason`.
    pub fn taxon(&self) -> &'static str {
        match self {
            Error::Parse(ParseFailure::NotAPdf(_)) => "NOT_A_PDF",
            Error::Parse(ParseFailure::Truncated(_)) => "TRUNCATED",
            Error::Parse(ParseFailure::UnsupportedVersion { .. }) => "UNSUPPORTED_VERSION",
            Error::Parse(ParseFailure::Malformed { .. }) => "MALFORMED",
            Error::Parse(ParseFailure::Encrypted) => "ENCRYPTED",
            Error::Parse(ParseFailure::NotWhitelisted { .. }) => "NOT_WHITELISTED",
            Error::Parse(ParseFailure::DecodeFailed { .. }) => "DECODE_FAILED",
            Error::Parse(ParseFailure::DecompressionBudgetExceeded { .. }) => {
                "DECOMPRESSION_BUDGET_EXCEEDED"
            },
            Error::Parse(ParseFailure::ImageSizeMismatch { .. }) => "IMAGE_SIZE_MISMATCH",
            Error::Parse(ParseFailure::RecursionLimitExceeded(_)) => {
                "RECURSION_LIMIT_EXCEEDED"
            },
            Error::Parse(ParseFailure::LimitExceeded { .. }) => "LIMIT_EXCEEDED",
            Error::Parse(ParseFailure::CircularReference(..)) => "CIRCULAR_REFERENCE",
            Error::Parse(ParseFailure::EmptyDocument) => "EMPTY_DOCUMENT",
            Error::Parse(ParseFailure::DisallowedConstruct { .. }) => "DISALLOWED_CONSTRUCT",
            Error::Parse(ParseFailure::Io(_)) => "PARSE_IO_ERROR",
            Error::Isolation(IsolationFailure::Timeout(_)) => "WORKER_TIMEOUT",
            Error::Isolation(IsolationFailure::ResourceLimitExceeded(_)) => {
                "RESOURCE_LIMIT_EXCEEDED"
            },
            Error::Isolation(IsolationFailure::AbnormalExit(_)) => "WORKER_ABNORMAL_EXIT",
            Error::Isolation(IsolationFailure::CorruptOutput(_)) => "WORKER_CORRUPT_OUTPUT",
            Error::Isolation(IsolationFailure::SpawnFailed(_)) => "WORKER_SPAWN_FAILED",
            Error::Isolation(IsolationFailure::LimitSetupFailed(_)) => {
                "WORKER_LIMIT_SETUP_FAILED"
            },
            Error::Isolation(IsolationFailure::Io(_)) => "ISOLATION_IO_ERROR",
            Error::Reconstruct(ReconstructFailure::InvalidIr(_)) => {
                "RECONSTRUCT_INVALID_IR"
            },
            Error::Reconstruct(ReconstructFailure::UnsupportedResource(_)) => {
                "RECONSTRUCT_UNSUPPORTED_RESOURCE"
            },
            Error::Reconstruct(ReconstructFailure::Serialize(_)) => {
                "RECONSTRUCT_SERIALIZE_ERROR"
            },
            Error::Reconstruct(ReconstructFailure::EmptyDocument) => {
                "RECONSTRUCT_EMPTY_DOCUMENT"
            },
            Error::Reconstruct(ReconstructFailure::OutputExceedsBudget { .. }) => {
                "OUTPUT_EXCEEDS_BUDGET"
            },
            Error::Reconstruct(ReconstructFailure::Io(_)) => "RECONSTRUCT_IO_ERROR",
            Error::Pipeline(PipelineFailure::SourceNotReadonly) => "SOURCE_NOT_READONLY",
            Error::Pipeline(PipelineFailure::InvalidInputPath(_)) => "INVALID_INPUT",
            Error::Pipeline(PipelineFailure::Oversize { .. }) => "OVERSIZE",
            Error::Pipeline(PipelineFailure::Aborted) => "ABORTED",
            Error::Audit(AuditFailure::WriteFailed(_)) => "AUDIT_WRITE_FAILED",
            Error::Audit(_) => "ABORT",
            Error::Rejected { taxon, .. } => taxon,
            Error::Config(_) => "CONFIG_ERROR",
            Error::Io(_) => "IO_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_taxon_strings_stable() {
        let e = Error::Parse(ParseFailure::EmptyDocument);
        assert_eq!(e.taxon(), "EMPTY_DOCUMENT");

        let e = Error::Parse(ParseFailure::Encrypted);
        assert_eq!(e.taxon(), "ENCRYPTED");

        let e = Error::Parse(ParseFailure::Truncated("xref table truncated before trailer".into()));
        assert_eq!(e.taxon(), "TRUNCATED");

        let e = Error::Parse(ParseFailure::UnsupportedVersion {
            found: "2.0".to_string(),
            max: "1.7".to_string(),
        });
        assert_eq!(e.taxon(), "UNSUPPORTED_VERSION");
    }

    #[test]
    fn test_audit_error_is_abort_taxon() {
        let e = Error::Audit(AuditFailure::FsyncFailed("disk full".into()));
        assert_eq!(e.taxon(), "ABORT");
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
