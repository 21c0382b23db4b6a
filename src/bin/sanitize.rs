//! Command-line entry point: load a signed configuration, evaluate the
//! caller-supplied attestation, and submit a single job to a
//! [`pdf_sanitize::PipelineController`].
//!
//! The only CLI tool this crate ships: one sanitization job submitted and
//! its outcome reported via exit code.

use clap::Parser;
use pdf_sanitize::attestation::{self, Attestation};
use pdf_sanitize::config;
use pdf_sanitize::pipeline::{JobRequest, PipelineConfig, PipelineController};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "sanitize", version = pdf_sanitize::VERSION, about = "Sanitize one PDF through the whitelist CDR pipeline")]
struct Cli {
    /// Path to the untrusted input PDF.
    #[arg(long)]
    input: PathBuf,

    /// Destination for the sanitized PDF. Defaults to a `_sanitized.pdf`
    /// sibling of the input when omitted.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Signed TOML configuration file.
    #[arg(long)]
    config: PathBuf,

    /// SPKI/PKCS#8 DER public key the configuration's signature verifies
    /// against.
    #[arg(long = "config-key")]
    config_key: PathBuf,

    /// Operator identity recorded on the audit event.
    #[arg(long)]
    operator: String,

    /// Workstation identifier recorded on the audit event.
    #[arg(long)]
    workstation: String,

    /// Classification tag recorded on the audit event.
    #[arg(long)]
    classification: String,

    /// JSON-encoded [`Attestation`] of the source medium's read-only
    /// state, produced by an external isolation layer. Omit when the
    /// loaded configuration doesn't require one.
    #[arg(long)]
    attestation: Option<String>,

    /// How old an attestation may be before it's treated as absent.
    #[arg(long = "attestation-max-age-secs", default_value_t = 300)]
    attestation_max_age_secs: u64,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let cfg = match config::load_signed(&cli.config, &cli.config_key) {
        Ok(cfg) => cfg,
        Err(e) => {
            log::error!("failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    let parsed_attestation: Option<Attestation> = match &cli.attestation {
        Some(raw) => match serde_json::from_str(raw) {
            Ok(a) => Some(a),
            Err(e) => {
                log::error!("failed to parse --attestation: {e}");
                return ExitCode::FAILURE;
            },
        },
        None => None,
    };
    let source_readonly_attested = attestation::evaluate(
        parsed_attestation.as_ref(),
        chrono::Utc::now(),
        Duration::from_secs(cli.attestation_max_age_secs),
    );

    let pipeline_config = PipelineConfig {
        input_root: cfg.input_root.clone(),
        output_root: cfg.output_root.clone(),
        audit_dir: cfg.audit_dir.clone(),
        hmac_key: resolve_hmac_key(&cfg.hmac_key_ref),
        parser_limits: cfg.parser_limits(),
        isolation_limits: cfg.isolation_limits(),
        max_output_bytes: cfg.max_decode_output_bytes,
        allowed_image_filters: cfg.image_filters(),
        source_readonly_required: cfg.source_readonly_required,
    };

    let controller = match PipelineController::new(pipeline_config) {
        Ok(c) => c,
        Err(e) => {
            log::error!("failed to start pipeline controller: {e}");
            return ExitCode::FAILURE;
        },
    };

    let job = JobRequest {
        input_path: cli.input,
        output_path: cli.output,
        operator: cli.operator,
        workstation_id: cli.workstation,
        classification_tag: cli.classification,
        policy: cfg.policy.into(),
        source_readonly_attested,
    };

    match controller.submit(job) {
        Ok(result) => {
            log::info!("job {} finished: {:?}", result.event_id, result.status);
            match result.output_path {
                Some(path) => {
                    println!("{}", path.display());
                    ExitCode::SUCCESS
                },
                None => {
                    eprintln!("rejected: {}", result.failure_reason.unwrap_or_default());
                    ExitCode::FAILURE
                },
            }
        },
        Err(e) => {
            log::error!("job submission failed: {e}");
            ExitCode::FAILURE
        },
    }
}

/// Resolve an `hmac_key_ref` (an opaque reference into a secrets layer
/// external to this crate) into key bytes. This binary reads
/// it as an environment variable name, the simplest integration a real
/// secrets manager's wrapper script can still satisfy without this crate
/// taking on a dependency on any particular vault client.
fn resolve_hmac_key(hmac_key_ref: &str) -> Vec<u8> {
    std::env::var(hmac_key_ref).map(|v| v.into_bytes()).unwrap_or_default()
}
