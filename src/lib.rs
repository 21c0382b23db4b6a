#![allow(clippy::too_many_arguments)]
#![allow(clippy::enum_variant_names)]
#![cfg_attr(test, allow(dead_code))]

//! # pdf_sanitize
//!
//! Core sanitization engine of a defense-grade PDF content-disarm-and-reconstruct
//! (CDR) pipeline.
//!
//! A PDF never survives contact with this crate unmodified: it is read through
//! a strict allow-list parser into an intermediate representation (IR), the
//! parser itself runs inside an OS-isolated worker process, and the IR is the
//! only thing that ever crosses back out. Nothing from the original byte
//! stream is copied forward — the reconstructor emits fresh, deterministic
//! PDF bytes from the IR alone.
//!
//! ## Pipeline
//!
//! ```text
//! untrusted bytes
//!        |
//!        v
//! [isolation::spawn_worker] -- resource-capped child process
//!        |
//!        v
//! [parser::whitelist::parse] -- allow-list only, reject on any ambiguity
//!        |
//!        v
//!     ir::Document  (re-validated by the controller, defense in depth)
//!        |
//!        v
//! [reconstruct::rebuild] -- constructive emission, never touches source bytes
//!        |
//!        v
//! sanitized bytes + audit::AuditEvent (HMAC-SHA256 tamper-evident)
//! ```
//!
//! ## License
//!
//! Licensed under either of Apache License, Version 2.0 or MIT license at
//! your option.

pub mod error;

pub mod object;
pub mod lexer;
pub mod parser;
pub mod parser_config;

pub mod decoders;

pub mod ir;

pub mod isolation;

pub mod reconstruct;

pub mod audit;

pub mod pipeline;

pub mod config;
pub mod attestation;

pub use error::{Error, Result};
pub use ir::Document;
pub use pipeline::{JobRequest, JobResult, PipelineController};

/// Library version, surfaced in audit events and CLI `--version` output.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
