//! Allow-list IR builder.
//!
//! This is the parser's whole reason for existing: walk the raw object
//! graph [`super::reader`] produced and decide, object by object and
//! operator by operator, what survives into the [`crate::ir::Document`].
//! Anything not explicitly admitted here is discarded, not passed through —
//! there is no generic "unknown object" fallback path. Font and image
//! resource resolution live in [`super::fonts`] and [`super::images`];
//! content-stream decoding lives in [`super::content`]. This module is the
//! orchestration: page tree traversal, inheritance, and policy.

use crate::decoders::decode_stream;
use crate::error::{Error, ParseFailure, Result};
use crate::ir::{Document, ImageFilter, MediaBox, Page, ThreatAction, ThreatEvent, ThreatSeverity};
use crate::object::{Object, extract_decode_params, extract_filter_names};
use crate::parser::content::parse_content_stream;
use crate::parser::fonts::resolve_fonts;
use crate::parser::images::resolve_images;
use crate::parser::reader::{ObjectGraph, read_objects};
use crate::parser_config::ParserLimits;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::Path;

/// How aggressively a single page's rejection propagates to the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// A page with a disallowed construct is dropped; the rest of the
    /// document is still admitted.
    Standard,
    /// Any page rejection rejects the whole document.
    Strict,
}

/// Image filters this build will decode for `ImageRef` admission.
/// `JBIG2Decode` is deliberately excluded by default — see `decoders::jbig2`.
pub fn default_allowed_image_filters() -> Vec<ImageFilter> {
    vec![ImageFilter::FlateDecode, ImageFilter::DctDecode, ImageFilter::CcittFaxDecode]
}

/// Catalog-level keys that are never admitted into the IR. Each is
/// executable, interactive, or identifying content, so finding one is
/// always recorded as a threat, not silently dropped.
const DISALLOWED_CATALOG_KEYS: &[(&str, ThreatSeverity)] = &[
    ("OpenAction", ThreatSeverity::Critical),
    ("AA", ThreatSeverity::Critical),
    ("JavaScript", ThreatSeverity::Critical),
    ("JS", ThreatSeverity::Critical),
    ("Launch", ThreatSeverity::Critical),
    ("SubmitForm", ThreatSeverity::Critical),
    ("GoToR", ThreatSeverity::High),
    ("EmbeddedFile", ThreatSeverity::High),
    ("RichMedia", ThreatSeverity::High),
    ("Annot", ThreatSeverity::Medium),
    ("AcroForm", ThreatSeverity::High),
    ("OCProperties", ThreatSeverity::Medium),
    ("Names", ThreatSeverity::Medium),
    ("Metadata", ThreatSeverity::Low),
    ("Info", ThreatSeverity::Low),
];

/// Scan `dict` (the catalog, or the trailer) for disallowed keys. Under
/// [`Policy::Strict`] the first hit rejects the document; under
/// [`Policy::Standard`] every hit is recorded and parsing continues.
fn scan_disallowed_keys(
    dict: &HashMap<String, Object>,
    locator: &str,
    policy: Policy,
    out: &mut Vec<ThreatEvent>,
) -> Result<()> {
    for (key, severity) in DISALLOWED_CATALOG_KEYS {
        if !dict.contains_key(*key) {
            continue;
        }
        if policy == Policy::Strict {
            return Err(ParseFailure::DisallowedConstruct {
                construct: key,
                locator: locator.to_string(),
            }
            .into());
        }
        out.push(ThreatEvent {
            kind: key.to_string(),
            severity: *severity,
            locator: locator.to_string(),
            action: ThreatAction::Removed,
        });
    }
    Ok(())
}

/// Read a candidate PDF at `path` and produce a validated [`Document`], or a
/// typed rejection. This is the parser's entire public contract.
pub fn parse_document(
    path: &Path,
    limits: &ParserLimits,
    policy: Policy,
    allowed_image_filters: &[ImageFilter],
) -> Result<Document> {
    let metadata = std::fs::symlink_metadata(path).map_err(ParseFailure::Io)?;
    if metadata.file_type().is_symlink() {
        return Err(ParseFailure::Malformed {
            offset: 0,
            reason: "input path is a symbolic link".to_string(),
        }
        .into());
    }
    if metadata.len() as usize > limits.max_file_size {
        return Err(ParseFailure::Malformed {
            offset: 0,
            reason: format!("input file exceeds max_file_size ({} bytes)", limits.max_file_size),
        }
        .into());
    }

    let bytes = std::fs::read(path).map_err(ParseFailure::Io)?;
    parse_document_bytes(&bytes, limits, policy, allowed_image_filters)
}

/// Same as [`parse_document`] but takes already-loaded bytes, for testing
/// and for the isolation worker (which reads its input over a pipe).
pub fn parse_document_bytes(
    bytes: &[u8],
    limits: &ParserLimits,
    policy: Policy,
    allowed_image_filters: &[ImageFilter],
) -> Result<Document> {
    let graph = read_objects(bytes, limits)?;

    if graph.trailer().contains_key("Encrypt") {
        return Err(ParseFailure::Encrypted.into());
    }

    let source_sha256: [u8; 32] = Sha256::digest(bytes).into();

    let mut threats = Vec::new();
    scan_disallowed_keys(graph.trailer(), "trailer", policy, &mut threats)?;

    let root_ref = graph.trailer().get("Root").ok_or_else(|| malformed("trailer missing /Root"))?;
    let catalog = graph.resolve(root_ref).ok_or_else(|| malformed("/Root does not resolve"))?;
    let catalog_dict = catalog.as_dict().ok_or_else(|| malformed("/Root is not a dictionary"))?;
    scan_disallowed_keys(catalog_dict, "catalog", policy, &mut threats)?;

    let pages_ref = catalog_dict.get("Pages").ok_or_else(|| malformed("Catalog missing /Pages"))?;

    let mut leaves = Vec::new();
    collect_page_leaves(&graph, pages_ref, &InheritedAttrs::default(), limits, 0, &mut leaves)?;

    if leaves.len() > limits.max_pages {
        return Err(malformed("page count exceeds configured limit"));
    }

    let mut pages = Vec::with_capacity(leaves.len());
    for (index, (page_dict, inherited)) in leaves.into_iter().enumerate() {
        match build_page(&graph, &page_dict, &inherited, limits, allowed_image_filters, index, policy, &mut threats) {
            Ok(page) => pages.push(page),
            Err(e) if policy == Policy::Strict => return Err(e),
            Err(e) => {
                threats.push(ThreatEvent {
                    kind: "DISALLOWED_PAGE_CONTENT".to_string(),
                    severity: ThreatSeverity::High,
                    locator: format!("page[{index}]: {e}"),
                    action: ThreatAction::Removed,
                });
                continue;
            },
        }
    }

    if pages.is_empty() {
        return Err(ParseFailure::EmptyDocument.into());
    }

    let doc = Document {
        pages,
        source_sha256,
        pdf_version: graph.version(),
        parser_version: env!("CARGO_PKG_VERSION").to_string(),
        threats,
    };
    crate::ir::validate::validate_document(&doc)?;
    Ok(doc)
}

fn malformed(reason: impl Into<String>) -> Error {
    ParseFailure::Malformed { offset: 0, reason: reason.into() }.into()
}

#[derive(Debug, Clone, Default)]
struct InheritedAttrs {
    media_box: Option<MediaBox>,
    crop_box: Option<MediaBox>,
    resources: Option<HashMap<String, Object>>,
}

/// Recursively walk the page tree, collecting leaf `/Type /Page` dictionaries
/// together with the attributes they inherit from ancestor `/Pages` nodes.
fn collect_page_leaves(
    graph: &ObjectGraph,
    node_ref: &Object,
    inherited: &InheritedAttrs,
    limits: &ParserLimits,
    depth: u32,
    out: &mut Vec<(HashMap<String, Object>, InheritedAttrs)>,
) -> Result<()> {
    if depth > limits.max_nesting as u32 {
        return Err(ParseFailure::RecursionLimitExceeded(limits.max_nesting as u32).into());
    }
    let node = graph.resolve(node_ref).ok_or_else(|| malformed("page tree node does not resolve"))?;
    let dict = node.as_dict().ok_or_else(|| malformed("page tree node is not a dictionary"))?;

    let mut next = inherited.clone();
    if let Some(mb) = dict.get("MediaBox") {
        next.media_box = Some(parse_media_box(graph, mb)?);
    }
    if let Some(cb) = dict.get("CropBox") {
        next.crop_box = Some(parse_media_box(graph, cb)?);
    }
    if let Some(res) = dict.get("Resources").and_then(|r| graph.resolve(r)) {
        if let Some(res_dict) = res.as_dict() {
            next.resources = Some(res_dict.clone());
        }
    }

    match dict.get("Type").and_then(Object::as_name) {
        Some("Pages") => {
            let kids = dict
                .get("Kids")
                .and_then(|k| graph.resolve(k))
                .and_then(Object::as_array)
                .ok_or_else(|| malformed("/Pages node missing /Kids array"))?;
            for kid in kids {
                collect_page_leaves(graph, kid, &next, limits, depth + 1, out)?;
            }
            Ok(())
        },
        Some("Page") => {
            out.push((dict.clone(), next));
            Ok(())
        },
        other => Err(malformed(format!("page tree node has unexpected /Type {other:?}"))),
    }
}

fn parse_media_box(graph: &ObjectGraph, obj: &Object) -> Result<MediaBox> {
    let resolved = graph.resolve(obj).ok_or_else(|| malformed("box reference does not resolve"))?;
    let arr = resolved.as_array().ok_or_else(|| malformed("box is not an array"))?;
    if arr.len() != 4 {
        return Err(malformed("box array must have exactly 4 entries"));
    }
    let mut v = [0.0f64; 4];
    for (i, item) in arr.iter().enumerate() {
        v[i] = graph
            .resolve(item)
            .and_then(Object::as_real)
            .ok_or_else(|| malformed("box entry is not numeric"))?;
    }
    Ok(MediaBox { x0: v[0], y0: v[1], x1: v[2], y1: v[3] })
}

fn build_page(
    graph: &ObjectGraph,
    page_dict: &HashMap<String, Object>,
    inherited: &InheritedAttrs,
    limits: &ParserLimits,
    allowed_image_filters: &[ImageFilter],
    page_index: usize,
    policy: Policy,
    threats: &mut Vec<ThreatEvent>,
) -> Result<Page> {
    let media_box = inherited.media_box.ok_or_else(|| malformed("page has no inherited /MediaBox"))?;
    let crop_box = inherited.crop_box;
    let resources = inherited.resources.clone().unwrap_or_default();

    scan_page_annotations(graph, page_dict, page_index, policy, threats)?;

    let fonts = resolve_fonts(graph, &resources);
    let images = resolve_images(graph, &resources, limits, allowed_image_filters)?;
    let content_ops = build_content_ops(graph, page_dict, limits)?;

    let page = Page { media_box, crop_box, content_ops, fonts, images };
    crate::ir::validate::validate_page(&page)?;
    Ok(page)
}

/// Scan a page's `/Annots` array for annotation dictionaries carrying their
/// own executable constructs (most notably `/AA` action dictionaries, ISO
/// 32000-1 §12.5.2). Each annotation is scanned the same way the catalog and
/// trailer are.
fn scan_page_annotations(
    graph: &ObjectGraph,
    page_dict: &HashMap<String, Object>,
    page_index: usize,
    policy: Policy,
    threats: &mut Vec<ThreatEvent>,
) -> Result<()> {
    let Some(annots) = page_dict.get("Annots") else {
        return Ok(());
    };
    let Some(annots) = graph.resolve(annots).and_then(Object::as_array) else {
        return Ok(());
    };
    for (annot_index, annot_ref) in annots.iter().enumerate() {
        let Some(annot) = graph.resolve(annot_ref).and_then(Object::as_dict) else {
            continue;
        };
        let locator = format!("page[{page_index}].Annots[{annot_index}]");
        scan_disallowed_keys(annot, &locator, policy, threats)?;
    }
    Ok(())
}

/// Resolve `/Contents` (a single stream or an array of streams, concatenated
/// with a newline separator per ISO 32000-1 §7.8.2) and decode it into the
/// closed `Op` enumeration.
fn build_content_ops(
    graph: &ObjectGraph,
    page_dict: &HashMap<String, Object>,
    limits: &ParserLimits,
) -> Result<Vec<crate::ir::Op>> {
    let contents = page_dict.get("Contents").ok_or_else(|| malformed("page missing /Contents"))?;
    let resolved = graph.resolve(contents).ok_or_else(|| malformed("/Contents does not resolve"))?;

    let mut data = Vec::new();
    match resolved {
        Object::Stream { .. } => append_stream_data(resolved, limits, &mut data)?,
        Object::Array(items) => {
            for item in items {
                let stream = graph
                    .resolve(item)
                    .ok_or_else(|| malformed("/Contents array entry does not resolve"))?;
                append_stream_data(stream, limits, &mut data)?;
                data.push(b'\n');
            }
        },
        _ => return Err(malformed("/Contents is neither a stream nor an array")),
    }

    let ops = parse_content_stream(&data, limits)?;
    if ops.len() > limits.max_ops_per_page {
        return Err(ParseFailure::LimitExceeded {
            which: "max_ops_per_page",
            actual: ops.len() as u64,
            max: limits.max_ops_per_page as u64,
        }
        .into());
    }
    Ok(ops)
}

fn append_stream_data(obj: &Object, limits: &ParserLimits, out: &mut Vec<u8>) -> Result<()> {
    match obj {
        Object::Stream { dict, data } => {
            let filter_names = dict.get("Filter").map(extract_filter_names).unwrap_or_default();
            let decode_params = extract_decode_params(dict.get("DecodeParms"));
            let decoded = if filter_names.is_empty() {
                data.to_vec()
            } else {
                decode_stream(data, &filter_names, decode_params.as_ref(), limits)?
            };
            out.extend_from_slice(&decoded);
            Ok(())
        },
        _ => Err(malformed("content stream entry is not a stream object")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_pdf(content: &[u8]) -> Vec<u8> {
        let mut pdf = b"%PDF-1.4\n".to_vec();

        let content_offset = pdf.len();
        pdf.extend_from_slice(
            format!("4 0 obj\n<< /Length {} >>\nstream\n", content.len()).as_bytes(),
        );
        pdf.extend_from_slice(content);
        pdf.extend_from_slice(b"\nendstream\nendobj\n");

        let page_offset = pdf.len();
        pdf.extend_from_slice(
            b"3 0 obj\n<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R /Resources << >> >>\nendobj\n",
        );

        let pages_offset = pdf.len();
        pdf.extend_from_slice(b"2 0 obj\n<< /Type /Pages /Kids [3 0 R] /Count 1 >>\nendobj\n");

        let catalog_offset = pdf.len();
        pdf.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");

        let xref_offset = pdf.len();
        pdf.extend_from_slice(b"xref\n0 5\n0000000000 65535 f \n");
        for offset in [catalog_offset, pages_offset, page_offset, content_offset] {
            pdf.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
        }
        pdf.extend_from_slice(b"trailer\n<< /Size 5 /Root 1 0 R >>\n");
        pdf.extend_from_slice(format!("startxref\n{xref_offset}\n%%EOF").as_bytes());
        pdf
    }

    #[test]
    fn test_parse_document_bytes_minimal() {
        let pdf = minimal_pdf(b"q 0 0 100 100 re f Q");
        let limits = ParserLimits::default();
        let doc = parse_document_bytes(&pdf, &limits, Policy::Standard, &default_allowed_image_filters())
            .unwrap();
        assert_eq!(doc.pages.len(), 1);
        assert_eq!(doc.pages[0].media_box, MediaBox { x0: 0.0, y0: 0.0, x1: 612.0, y1: 792.0 });
    }

    #[test]
    fn test_parse_document_bytes_rejects_unknown_operator_strict() {
        let pdf = minimal_pdf(b"1 w");
        let limits = ParserLimits::default();
        let result =
            parse_document_bytes(&pdf, &limits, Policy::Strict, &default_allowed_image_filters());
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_document_bytes_drops_bad_page_standard_policy() {
        let pdf = minimal_pdf(b"1 w");
        let limits = ParserLimits::default();
        let result =
            parse_document_bytes(&pdf, &limits, Policy::Standard, &default_allowed_image_filters());
        // the only page is dropped, leaving zero pages -> EMPTY_DOCUMENT
        assert!(matches!(result, Err(Error::Parse(ParseFailure::EmptyDocument))));
    }

    fn with_open_action(pdf: Vec<u8>) -> Vec<u8> {
        let marker = "1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n";
        let replaced =
            "1 0 obj\n<< /Type /Catalog /Pages 2 0 R /OpenAction << /S /JavaScript /JS (app.alert(1)) >> >>\nendobj\n";
        let text = String::from_utf8(pdf).unwrap();
        text.replacen(marker, replaced, 1).into_bytes()
    }

    #[test]
    fn test_parse_document_bytes_rejects_open_action_strict() {
        let pdf = with_open_action(minimal_pdf(b"q Q"));
        let limits = ParserLimits::default();
        let result =
            parse_document_bytes(&pdf, &limits, Policy::Strict, &default_allowed_image_filters());
        assert!(matches!(
            result,
            Err(Error::Parse(ParseFailure::DisallowedConstruct { construct: "OpenAction", .. }))
        ));
    }

    #[test]
    fn test_parse_document_bytes_strips_open_action_standard() {
        let pdf = with_open_action(minimal_pdf(b"q Q"));
        let limits = ParserLimits::default();
        let doc =
            parse_document_bytes(&pdf, &limits, Policy::Standard, &default_allowed_image_filters())
                .unwrap();
        assert_eq!(doc.threats.len(), 1);
        assert_eq!(doc.threats[0].kind, "OpenAction");
        assert_eq!(doc.threats[0].severity, crate::ir::ThreatSeverity::Critical);
    }

    /// A minimal document whose sole page carries an `/Annots` entry with its
    /// own `/AA` action dictionary — built directly (rather than patched from
    /// `minimal_pdf`) so object 5 and its xref entry stay consistent.
    fn minimal_pdf_with_page_annot_aa() -> Vec<u8> {
        let mut pdf = b"%PDF-1.4\n".to_vec();

        let content = b"q Q";
        let content_offset = pdf.len();
        pdf.extend_from_slice(
            format!("4 0 obj\n<< /Length {} >>\nstream\n", content.len()).as_bytes(),
        );
        pdf.extend_from_slice(content);
        pdf.extend_from_slice(b"\nendstream\nendobj\n");

        let page_offset = pdf.len();
        pdf.extend_from_slice(
            b"3 0 obj\n<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R /Resources << >> /Annots [5 0 R] >>\nendobj\n",
        );

        let pages_offset = pdf.len();
        pdf.extend_from_slice(b"2 0 obj\n<< /Type /Pages /Kids [3 0 R] /Count 1 >>\nendobj\n");

        let catalog_offset = pdf.len();
        pdf.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");

        let annot_offset = pdf.len();
        pdf.extend_from_slice(b"5 0 obj\n<< /Subtype /Widget /AA << /E 6 0 R >> >>\nendobj\n");

        let xref_offset = pdf.len();
        pdf.extend_from_slice(b"xref\n0 6\n0000000000 65535 f \n");
        for offset in [catalog_offset, pages_offset, page_offset, content_offset, annot_offset] {
            pdf.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
        }
        pdf.extend_from_slice(b"trailer\n<< /Size 6 /Root 1 0 R >>\n");
        pdf.extend_from_slice(format!("startxref\n{xref_offset}\n%%EOF").as_bytes());
        pdf
    }

    #[test]
    fn test_parse_document_bytes_strips_page_annot_action_standard() {
        let pdf = minimal_pdf_with_page_annot_aa();
        let limits = ParserLimits::default();
        let doc =
            parse_document_bytes(&pdf, &limits, Policy::Standard, &default_allowed_image_filters())
                .unwrap();
        assert!(doc.threats.iter().any(|t| t.kind == "AA" && t.locator.contains("Annots")));
    }

    #[test]
    fn test_parse_document_bytes_rejects_page_annot_action_strict() {
        let pdf = minimal_pdf_with_page_annot_aa();
        let limits = ParserLimits::default();
        let result =
            parse_document_bytes(&pdf, &limits, Policy::Strict, &default_allowed_image_filters());
        assert!(matches!(
            result,
            Err(Error::Parse(ParseFailure::DisallowedConstruct { construct: "AA", .. }))
        ));
    }

    #[test]
    fn test_parse_document_bytes_rejects_encrypted() {
        let pdf = minimal_pdf(b"q Q");
        let marker = "trailer\n<< /Size 5 /Root 1 0 R >>\n";
        let replaced = "trailer\n<< /Size 5 /Root 1 0 R /Encrypt 9 0 R >>\n";
        let text = String::from_utf8(pdf).unwrap();
        let patched = text.replacen(marker, replaced, 1);

        let limits = ParserLimits::default();
        let result = parse_document_bytes(
            patched.as_bytes(),
            &limits,
            Policy::Standard,
            &default_allowed_image_filters(),
        );
        assert!(matches!(result, Err(Error::Parse(ParseFailure::Encrypted))));
    }
}
