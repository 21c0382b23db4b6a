//! Typed, signature-gated configuration.
//!
//! Configuration is consumed as a
//! read-only, schema-validated TOML record; when persisted to disk it
//! carries a detached RSA/SHA-256 signature over its own canonical bytes,
//! checked once at load time. An invalid or missing signature refuses to
//! start rather than falling back to unsigned defaults.

use crate::error::{Error, Result};
use crate::ir::ImageFilter;
use crate::isolation::IsolationLimits;
use crate::parser::whitelist::Policy;
use crate::parser_config::ParserLimits;
use rsa::RsaPublicKey;
use rsa::pkcs1v15::{Signature, VerifyingKey};
use rsa::pkcs8::DecodePublicKey;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use signature::Verifier;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// `AGGRESSIVE`/`LENIENT` as spelled in configuration files, mapped onto
/// [`Policy`] at load time. See `DESIGN.md`'s Open Question decision on
/// policy naming for why the rest of the crate only knows `Policy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConfigPolicy {
    Aggressive,
    Lenient,
}

impl From<ConfigPolicy> for Policy {
    fn from(p: ConfigPolicy) -> Policy {
        match p {
            ConfigPolicy::Aggressive => Policy::Strict,
            ConfigPolicy::Lenient => Policy::Standard,
        }
    }
}

/// The schema-validated configuration record: policy and resource limits,
/// plus the path fields the pipeline controller needs for its precondition
/// gate and output planning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub policy: ConfigPolicy,
    pub memory_limit_bytes: u64,
    pub timeout_ms: u64,
    pub max_input_bytes: u64,
    pub max_pages: usize,
    pub max_ops_per_page: usize,
    pub max_image_pixels: u64,
    pub max_decode_output_bytes: usize,
    pub audit_dir: PathBuf,
    /// Reference to a key held by an external secrets layer; this crate
    /// never generates or stores key material itself. Resolved by the
    /// caller (see `bin/sanitize.rs`'s `resolve_hmac_key`).
    pub hmac_key_ref: String,
    pub source_readonly_required: bool,
    pub input_root: PathBuf,
    pub output_root: PathBuf,
    pub cpu_cores: usize,
    /// Image filters an operator admits beyond the built-in baseline (see
    /// `parser::whitelist::default_allowed_image_filters`). Config files
    /// written before this field existed omit it and get the baseline.
    #[serde(default = "default_config_image_filters")]
    pub image_filters: Vec<ImageFilter>,
}

fn default_config_image_filters() -> Vec<ImageFilter> {
    crate::parser::whitelist::default_allowed_image_filters()
}

impl Config {
    pub fn parser_limits(&self) -> ParserLimits {
        let defaults = ParserLimits::default();
        ParserLimits {
            max_decompressed_size: self.max_decode_output_bytes,
            max_file_size: self.max_input_bytes as usize,
            max_pages: self.max_pages,
            max_ops_per_page: self.max_ops_per_page,
            max_image_pixels: self.max_image_pixels,
            ..defaults
        }
    }

    pub fn isolation_limits(&self) -> IsolationLimits {
        IsolationLimits {
            wall_clock_timeout: Duration::from_millis(self.timeout_ms),
            resident_memory_bytes: self.memory_limit_bytes,
            cpu_cores: self.cpu_cores.max(1),
            max_output_bytes: self.max_decode_output_bytes,
        }
    }

    pub fn image_filters(&self) -> Vec<ImageFilter> {
        self.image_filters.clone()
    }
}

/// The on-disk layout of a persisted configuration record: the config
/// itself plus a hex-encoded detached signature over its canonical bytes.
#[derive(Debug, Serialize, Deserialize)]
struct SignedConfig {
    config: Config,
    /// Hex-encoded PKCS#1v1.5 RSA/SHA-256 signature of
    /// `canonicalize(&config)`.
    signature_hex: String,
}

/// Canonical bytes of `config`, signed and verified against. JSON with
/// `serde_json::Map`'s default `BTreeMap`-backed alphabetical key order —
/// the same procedure `audit::canonical` uses for audit records, so the
/// crate has exactly one canonicalization convention.
fn canonicalize(config: &Config) -> Result<Vec<u8>> {
    serde_json::to_vec(config).map_err(|e| Error::Config(format!("failed to canonicalize config: {e}")))
}

/// Load and verify a signed configuration file. `public_key_path` is a
/// SPKI/PKCS#8 DER-encoded RSA public key distributed out of band by the
/// same secure-configuration layer that issued the signature.
///
/// Refuses to start (`Error::Config`) on a missing signature, a signature
/// that doesn't verify, or a config file that doesn't parse — there is no
/// degraded "unsigned" mode.
pub fn load_signed(config_path: &Path, public_key_path: &Path) -> Result<Config> {
    let text = std::fs::read_to_string(config_path)
        .map_err(|e| Error::Config(format!("failed to read config {}: {e}", config_path.display())))?;
    let signed: SignedConfig =
        toml::from_str(&text).map_err(|e| Error::Config(format!("failed to parse config: {e}")))?;

    let key_der = std::fs::read(public_key_path)
        .map_err(|e| Error::Config(format!("failed to read config public key: {e}")))?;
    let public_key = RsaPublicKey::from_public_key_der(&key_der)
        .map_err(|e| Error::Config(format!("invalid config public key: {e}")))?;
    let verifying_key: VerifyingKey<Sha256> = VerifyingKey::new(public_key);

    let signature_bytes = hex_decode(&signed.signature_hex)
        .ok_or_else(|| Error::Config("config signature is not valid hex".to_string()))?;
    let signature = Signature::try_from(signature_bytes.as_slice())
        .map_err(|e| Error::Config(format!("malformed config signature: {e}")))?;

    let canonical = canonicalize(&signed.config)?;
    verifying_key
        .verify(&canonical, &signature)
        .map_err(|_| Error::Config("config signature verification failed".to_string()))?;

    Ok(signed.config)
}

fn hex_decode(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len()).step_by(2).map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> Config {
        Config {
            policy: ConfigPolicy::Aggressive,
            memory_limit_bytes: 500 * 1024 * 1024,
            timeout_ms: 300_000,
            max_input_bytes: 200 * 1024 * 1024,
            max_pages: 10_000,
            max_ops_per_page: 100_000,
            max_image_pixels: 64_000_000,
            max_decode_output_bytes: 100 * 1024 * 1024,
            audit_dir: PathBuf::from("/var/lib/pdf_sanitize/audit"),
            hmac_key_ref: "vault://pdf-sanitize/hmac-key".to_string(),
            source_readonly_required: true,
            input_root: PathBuf::from("/var/lib/pdf_sanitize/in"),
            output_root: PathBuf::from("/var/lib/pdf_sanitize/out"),
            cpu_cores: 1,
            image_filters: crate::parser::whitelist::default_allowed_image_filters(),
        }
    }

    #[test]
    fn test_config_policy_maps_to_parser_policy() {
        assert_eq!(Policy::from(ConfigPolicy::Aggressive), Policy::Strict);
        assert_eq!(Policy::from(ConfigPolicy::Lenient), Policy::Standard);
    }

    #[test]
    fn test_canonicalize_is_deterministic() {
        let config = sample_config();
        assert_eq!(canonicalize(&config).unwrap(), canonicalize(&config).unwrap());
    }

    #[test]
    fn test_parser_limits_derive_from_config() {
        let config = sample_config();
        let limits = config.parser_limits();
        assert_eq!(limits.max_pages, 10_000);
        assert_eq!(limits.max_ops_per_page, 100_000);
        assert_eq!(limits.max_image_pixels, 64_000_000);
        assert_eq!(limits.max_file_size, config.max_input_bytes as usize);
    }

    #[test]
    fn test_isolation_limits_derive_from_config() {
        let config = sample_config();
        let limits = config.isolation_limits();
        assert_eq!(limits.wall_clock_timeout, Duration::from_millis(300_000));
        assert_eq!(limits.resident_memory_bytes, 500 * 1024 * 1024);
    }

    #[test]
    fn test_image_filters_reflects_configured_list() {
        let mut config = sample_config();
        assert_eq!(config.image_filters(), crate::parser::whitelist::default_allowed_image_filters());

        config.image_filters.push(ImageFilter::Jbig2Decode);
        assert!(config.image_filters().contains(&ImageFilter::Jbig2Decode));
    }

    #[test]
    fn test_load_signed_rejects_missing_file() {
        let result = load_signed(Path::new("/nonexistent/config.toml"), Path::new("/nonexistent/key.der"));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_hex_decode_round_trips() {
        assert_eq!(hex_decode("0a1b"), Some(vec![0x0a, 0x1b]));
        assert_eq!(hex_decode("xyz"), None);
        assert_eq!(hex_decode("abc"), None);
    }
}
