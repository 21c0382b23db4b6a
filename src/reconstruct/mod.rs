//! Constructive PDF emitter.
//!
//! [`reconstruct`] never touches a byte of the original input. It walks a
//! validated [`crate::ir::Document`] and writes a brand-new PDF from
//! scratch: freshly allocated object IDs, a freshly built xref table, and a
//! content stream re-serialized operator-by-operator. Given the same IR and
//! the same reconstructor version, the output bytes are identical — no
//! timestamps, no random IDs, nothing the original file could have
//! influenced beyond what made it into the IR.

pub mod content_writer;
pub mod object_serializer;

use crate::error::{ReconstructFailure, Result};
use crate::ir::validate::validate_document;
use crate::ir::{ColorSpace, Document, FontRef, ImageRef, MediaBox, Page};
use crate::object::Object;
use content_writer::write_content_stream;
use flate2::Compression;
use flate2::write::ZlibEncoder;
use object_serializer::{ObjectSerializer, dict, name, reference};
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

/// Default ceiling on reconstructed output size, in bytes.
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 256 * 1024 * 1024;

/// Every standard-14 font in a fixed order, used to allocate deterministic
/// shared font object IDs regardless of `HashMap`/`BTreeMap` iteration order
/// elsewhere.
const ALL_FONTS: [FontRef; 14] = [
    FontRef::Helvetica,
    FontRef::HelveticaBold,
    FontRef::HelveticaOblique,
    FontRef::HelveticaBoldOblique,
    FontRef::TimesRoman,
    FontRef::TimesBold,
    FontRef::TimesItalic,
    FontRef::TimesBoldItalic,
    FontRef::Courier,
    FontRef::CourierBold,
    FontRef::CourierOblique,
    FontRef::CourierBoldOblique,
    FontRef::Symbol,
    FontRef::ZapfDingbats,
];

/// Emit `ir` as a sanitized PDF at `out_path`. Re-validates the IR first
/// (defense-in-depth; the worker that produced it is untrusted), then
/// writes header, objects, xref, and trailer in a single deterministic pass.
pub fn reconstruct(ir: &Document, out_path: &Path, max_output_bytes: usize) -> Result<()> {
    let bytes = reconstruct_bytes(ir, max_output_bytes)?;
    std::fs::write(out_path, bytes).map_err(|e| ReconstructFailure::Io(e).into())
}

/// Build the sanitized PDF bytes without writing them anywhere, for callers
/// (tests, the isolation worker's sibling process) that want the bytes
/// directly.
pub fn reconstruct_bytes(ir: &Document, max_output_bytes: usize) -> Result<Vec<u8>> {
    validate_document(ir).map_err(|e| ReconstructFailure::InvalidIr(e.to_string()))?;
    if ir.pages.is_empty() {
        return Err(ReconstructFailure::EmptyDocument.into());
    }

    let serializer = ObjectSerializer;
    let mut out = Vec::new();
    writeln!(out, "%PDF-{}.{}", ir.pdf_version.0, ir.pdf_version.1)?;
    out.extend_from_slice(b"%\xE2\xE3\xCF\xD3\n");

    let catalog_id = 1u32;
    let pages_id = 2u32;
    let mut next_id = 3u32;

    let used_fonts: Vec<FontRef> =
        ALL_FONTS.iter().copied().filter(|f| ir.pages.iter().any(|p| p.fonts.values().any(|pf| pf == f))).collect();
    let mut font_ids: HashMap<FontRef, u32> = HashMap::new();
    for font in &used_fonts {
        font_ids.insert(*font, next_id);
        next_id += 1;
    }

    struct PlannedPage {
        page_id: u32,
        content_id: u32,
        image_ids: HashMap<String, u32>,
    }

    let planned: Vec<PlannedPage> = ir
        .pages
        .iter()
        .map(|page| {
            let page_id = next_id;
            next_id += 1;
            let content_id = next_id;
            next_id += 1;
            let mut image_ids = HashMap::new();
            for local_name in page.images.keys() {
                image_ids.insert(local_name.clone(), next_id);
                next_id += 1;
            }
            PlannedPage { page_id, content_id, image_ids }
        })
        .collect();

    let mut xref_offsets: Vec<(u32, usize)> = Vec::new();

    let pages_obj = dict(vec![
        ("Type", name("Pages")),
        ("Kids", Object::Array(planned.iter().map(|p| reference(p.page_id, 0)).collect())),
        ("Count", Object::Integer(ir.pages.len() as i64)),
    ]);
    let catalog_obj = dict(vec![("Type", name("Catalog")), ("Pages", reference(pages_id, 0))]);

    xref_offsets.push((catalog_id, out.len()));
    out.extend_from_slice(&serializer.serialize_indirect(catalog_id, 0, &catalog_obj));
    xref_offsets.push((pages_id, out.len()));
    out.extend_from_slice(&serializer.serialize_indirect(pages_id, 0, &pages_obj));

    for font in &used_fonts {
        let id = font_ids[font];
        let font_obj = build_font_dict(*font);
        xref_offsets.push((id, out.len()));
        out.extend_from_slice(&serializer.serialize_indirect(id, 0, &font_obj));
    }

    for (page, plan) in ir.pages.iter().zip(&planned) {
        let content_bytes = compress(&write_content_stream(&page.content_ops));
        let content_obj = Object::Stream {
            dict: HashMap::from([("Filter".to_string(), Object::Name("FlateDecode".to_string()))]),
            data: bytes::Bytes::from(content_bytes),
        };

        let page_obj = build_page_dict(page, plan.page_id, pages_id, plan.content_id, &font_ids, &plan.image_ids);

        xref_offsets.push((plan.page_id, out.len()));
        out.extend_from_slice(&serializer.serialize_indirect(plan.page_id, 0, &page_obj));
        xref_offsets.push((plan.content_id, out.len()));
        out.extend_from_slice(&serializer.serialize_indirect(plan.content_id, 0, &content_obj));

        for (local_name, image) in &page.images {
            let id = plan.image_ids[local_name];
            let image_obj = build_image_xobject(image);
            xref_offsets.push((id, out.len()));
            out.extend_from_slice(&serializer.serialize_indirect(id, 0, &image_obj));
        }
    }

    let xref_start = out.len();
    writeln!(out, "xref")?;
    writeln!(out, "0 {next_id}")?;
    writeln!(out, "0000000000 65535 f ")?;
    xref_offsets.sort_by_key(|(id, _)| *id);
    for (_, offset) in &xref_offsets {
        writeln!(out, "{offset:010} 00000 n ")?;
    }

    let trailer = dict(vec![
        ("Size", Object::Integer(next_id as i64)),
        ("Root", reference(catalog_id, 0)),
    ]);
    writeln!(out, "trailer")?;
    out.extend_from_slice(&serializer.serialize(&trailer));
    writeln!(out)?;
    writeln!(out, "startxref")?;
    writeln!(out, "{xref_start}")?;
    write!(out, "%%EOF")?;

    if out.len() > max_output_bytes {
        return Err(
            ReconstructFailure::OutputExceedsBudget { actual: out.len(), max: max_output_bytes }.into()
        );
    }
    Ok(out)
}

fn compress(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).expect("writing to a Vec<u8> cannot fail");
    encoder.finish().expect("writing to a Vec<u8> cannot fail")
}

fn build_font_dict(font: FontRef) -> Object {
    dict(vec![
        ("Type", name("Font")),
        ("Subtype", name("Type1")),
        ("BaseFont", name(font.canonical_name())),
    ])
}

fn color_space_name(cs: ColorSpace) -> &'static str {
    match cs {
        ColorSpace::DeviceGray => "DeviceGray",
        ColorSpace::DeviceRGB => "DeviceRGB",
        ColorSpace::DeviceCMYK => "DeviceCMYK",
    }
}

fn build_image_xobject(image: &ImageRef) -> Object {
    let compressed = compress(&image.pixel_data);
    Object::Stream {
        dict: HashMap::from([
            ("Type".to_string(), Object::Name("XObject".to_string())),
            ("Subtype".to_string(), Object::Name("Image".to_string())),
            ("Width".to_string(), Object::Integer(image.width as i64)),
            ("Height".to_string(), Object::Integer(image.height as i64)),
            ("ColorSpace".to_string(), Object::Name(color_space_name(image.color_space).to_string())),
            ("BitsPerComponent".to_string(), Object::Integer(image.bits_per_comp as i64)),
            ("Filter".to_string(), Object::Name("FlateDecode".to_string())),
        ]),
        data: bytes::Bytes::from(compressed),
    }
}

fn media_box_array(mb: &MediaBox) -> Object {
    Object::Array(vec![
        Object::Real(mb.x0),
        Object::Real(mb.y0),
        Object::Real(mb.x1),
        Object::Real(mb.y1),
    ])
}

fn build_page_dict(
    page: &Page,
    page_id: u32,
    pages_id: u32,
    content_id: u32,
    font_ids: &HashMap<FontRef, u32>,
    image_ids: &HashMap<String, u32>,
) -> Object {
    let _ = page_id;
    let font_dict: HashMap<String, Object> = page
        .fonts
        .iter()
        .map(|(local_name, font)| (local_name.clone(), reference(font_ids[font], 0)))
        .collect();
    let xobject_dict: HashMap<String, Object> = image_ids
        .iter()
        .map(|(local_name, id)| (local_name.clone(), reference(*id, 0)))
        .collect();

    let proc_set = Object::Array(
        ["PDF", "Text", "ImageB", "ImageC", "ImageI"].iter().map(|p| name(p)).collect(),
    );
    let mut resources = vec![("ProcSet", proc_set)];
    if !font_dict.is_empty() {
        resources.push(("Font", Object::Dictionary(font_dict)));
    }
    if !xobject_dict.is_empty() {
        resources.push(("XObject", Object::Dictionary(xobject_dict)));
    }

    let mut entries = vec![
        ("Type", name("Page")),
        ("Parent", reference(pages_id, 0)),
        ("MediaBox", media_box_array(&page.media_box)),
        ("Contents", reference(content_id, 0)),
        ("Resources", dict(resources)),
    ];
    if let Some(crop) = &page.crop_box {
        entries.push(("CropBox", media_box_array(crop)));
    }
    dict(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Op;
    use std::collections::BTreeMap;

    fn sample_doc() -> Document {
        Document {
            pages: vec![Page {
                media_box: MediaBox { x0: 0.0, y0: 0.0, x1: 612.0, y1: 792.0 },
                crop_box: None,
                content_ops: vec![
                    Op::TextBegin,
                    Op::TextMoveAbs { x: 72.0, y: 720.0 },
                    Op::ShowText { bytes: b"hello".to_vec() },
                    Op::TextEnd,
                ],
                fonts: BTreeMap::new(),
                images: BTreeMap::new(),
            }],
            source_sha256: [0u8; 32],
            pdf_version: (1, 7),
            parser_version: "0.0.0".to_string(),
            threats: vec![],
        }
    }

    #[test]
    fn test_reconstruct_bytes_minimal_document() {
        let doc = sample_doc();
        let bytes = reconstruct_bytes(&doc, DEFAULT_MAX_OUTPUT_BYTES).unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.starts_with("%PDF-1.7"));
        assert!(text.contains("/Type /Catalog"));
        assert!(text.contains("/Type /Pages"));
        assert!(text.contains("/Type /Page"));
        assert!(text.ends_with("%%EOF"));
    }

    #[test]
    fn test_reconstruct_is_deterministic() {
        let doc = sample_doc();
        let a = reconstruct_bytes(&doc, DEFAULT_MAX_OUTPUT_BYTES).unwrap();
        let b = reconstruct_bytes(&doc, DEFAULT_MAX_OUTPUT_BYTES).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_reconstruct_rejects_empty_document() {
        let doc = Document {
            pages: vec![],
            source_sha256: [0u8; 32],
            pdf_version: (1, 7),
            parser_version: "0.0.0".to_string(),
            threats: vec![],
        };
        let err = reconstruct_bytes(&doc, DEFAULT_MAX_OUTPUT_BYTES).unwrap_err();
        assert_eq!(err.taxon(), "RECONSTRUCT_EMPTY_DOCUMENT");
    }

    #[test]
    fn test_reconstruct_emits_input_pdf_version_not_a_hardcoded_one() {
        let mut doc = sample_doc();
        doc.pdf_version = (1, 4);
        let bytes = reconstruct_bytes(&doc, DEFAULT_MAX_OUTPUT_BYTES).unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.starts_with("%PDF-1.4"));
    }

    #[test]
    fn test_reconstruct_rejects_output_over_budget() {
        let doc = sample_doc();
        let err = reconstruct_bytes(&doc, 10).unwrap_err();
        assert_eq!(err.taxon(), "OUTPUT_EXCEEDS_BUDGET");
    }

    #[test]
    fn test_reconstruct_shares_font_objects_across_pages() {
        let mut doc = sample_doc();
        let mut fonts = BTreeMap::new();
        fonts.insert("F1".to_string(), FontRef::Helvetica);
        doc.pages[0].fonts = fonts.clone();
        doc.pages.push(Page {
            media_box: MediaBox { x0: 0.0, y0: 0.0, x1: 612.0, y1: 792.0 },
            crop_box: None,
            content_ops: vec![],
            fonts,
            images: BTreeMap::new(),
        });
        let bytes = reconstruct_bytes(&doc, DEFAULT_MAX_OUTPUT_BYTES).unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert_eq!(text.matches("/BaseFont /Helvetica").count(), 1);
    }
}
