//! Resource limits enforced while reading a document.
//!
//! There is exactly one parsing mode: every leniency knob
//! (skip-invalid-objects, allow-missing-endobj, guessed offsets, ...) is
//! gone, and only resource limits remain configurable. Ambiguity is always
//! a rejection, never a best-effort guess.

/// Resource limits applied while reading a document into the IR.
///
/// These exist to bound an adversarial input's cost, not to decide whether
/// malformed syntax is tolerated — it never is.
#[derive(Debug, Clone, Copy)]
pub struct ParserLimits {
    /// Maximum object/array/dictionary nesting depth.
    pub max_nesting: usize,

    /// Maximum indirect-reference recursion depth while resolving objects.
    pub max_recursion_depth: u32,

    /// Maximum decompression ratio (compressed:decompressed). 0 disables
    /// the check.
    pub max_decompression_ratio: u32,

    /// Maximum decompressed stream size in bytes. 0 disables the check.
    pub max_decompressed_size: usize,

    /// Maximum PDF file size accepted for parsing, in bytes.
    pub max_file_size: usize,

    /// Maximum number of pages accepted in a single document.
    pub max_pages: usize,

    /// Maximum number of objects accepted in a single document.
    pub max_objects: usize,

    /// Maximum number of content-stream operators accepted on a single page.
    pub max_ops_per_page: usize,

    /// Maximum width * height accepted for an admitted image, in pixels.
    pub max_image_pixels: u64,

    /// Maximum (major, minor) accepted from the `%PDF-N.N` header. A
    /// document declaring a version above this is rejected with
    /// `UNSUPPORTED_VERSION` before any object is read.
    pub max_pdf_version: (u8, u8),
}

impl Default for ParserLimits {
    fn default() -> Self {
        Self {
            max_nesting: 100,
            max_recursion_depth: 100,
            max_decompression_ratio: 100,
            max_decompressed_size: 100 * 1024 * 1024,
            max_file_size: 200 * 1024 * 1024,
            max_pages: 10_000,
            max_objects: 1_000_000,
            max_ops_per_page: 100_000,
            max_image_pixels: 64_000_000,
            max_pdf_version: (1, 7),
        }
    }
}
