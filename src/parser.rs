//! Parsing: turning raw bytes into a validated [`crate::ir::Document`].
//!
//! Two layers. [`reader`] reads the untyped object graph (xref table,
//! trailer, indirect objects) with no policy opinions at all. [`whitelist`]
//! walks that graph and decides, object by object, operator by operator,
//! what survives into the IR — everything not explicitly allowed is a
//! rejection, never a best-effort pass-through.

pub mod content;
pub mod fonts;
pub mod images;
pub mod reader;
pub mod whitelist;

pub use whitelist::parse_document;
