//! Invariant checks I1-I6 over a [`super::Document`].
//!
//! Run twice: once inside the worker as the allow-list parser builds the
//! IR (so a violation never leaves the process as a serialized document),
//! and again by the controller on receipt, since the worker that produced
//! the IR is itself untrusted (§4.2.4 re-validation).

use super::{Document, ImageRef, MediaBox, Op, Page};
use crate::error::{ParseFailure, Result};

/// Pages beyond this area (media_box width × height, in PDF points²) are
/// rejected under I3, bounding the rasterized size a downstream renderer
/// would need to allocate.
pub const MAX_PAGE_AREA: f64 = 200.0 * 72.0 * 200.0 * 72.0;

/// Image dimensions beyond this, in either axis, are rejected before a
/// decode is even attempted.
pub const MAX_IMAGE_DIMENSION: u32 = 20_000;

/// Maximum nested `q`/`Q` depth permitted on a single page (I6).
pub const MAX_GSTATE_DEPTH: u32 = 64;

/// Check every invariant (I1-I6) over a whole document. Returns the first
/// violation found; does not attempt to collect all violations, since a
/// single failing page is enough to reject the document.
pub fn validate_document(doc: &Document) -> Result<()> {
    if doc.pages.is_empty() {
        return Err(ParseFailure::EmptyDocument.into());
    }
    for page in &doc.pages {
        validate_page(page)?;
    }
    Ok(())
}

/// Check I1-I6 over a single page.
pub fn validate_page(page: &Page) -> Result<()> {
    validate_media_box(&page.media_box, "media_box")?;
    if let Some(crop) = &page.crop_box {
        validate_media_box(crop, "crop_box")?;
    }
    for image in page.images.values() {
        validate_image(image)?;
    }
    validate_ops(page)?;
    Ok(())
}

fn validate_media_box(mb: &MediaBox, label: &'static str) -> Result<()> {
    if !mb.is_well_formed() {
        return Err(ParseFailure::Malformed {
            offset: 0,
            reason: format!("{label} is not finite or has non-positive extent"),
        }
        .into());
    }
    if mb.area() > MAX_PAGE_AREA {
        return Err(ParseFailure::Malformed {
            offset: 0,
            reason: format!("{label} area {} exceeds MAX_PAGE_AREA {}", mb.area(), MAX_PAGE_AREA),
        }
        .into());
    }
    Ok(())
}

/// I5: decoded byte length must match the declared dimensions, and
/// dimensions must be positive and within [`MAX_IMAGE_DIMENSION`].
fn validate_image(image: &ImageRef) -> Result<()> {
    if image.width == 0 || image.height == 0 {
        return Err(ParseFailure::ImageSizeMismatch {
            decoded: image.pixel_data.len(),
            expected: 0,
            width: image.width,
            height: image.height,
            components: image.color_space.components(),
            bits_per_component: image.bits_per_comp,
        }
        .into());
    }
    if image.width > MAX_IMAGE_DIMENSION || image.height > MAX_IMAGE_DIMENSION {
        return Err(ParseFailure::Malformed {
            offset: 0,
            reason: format!(
                "image {}x{} exceeds MAX_IMAGE_DIMENSION {}",
                image.width, image.height, MAX_IMAGE_DIMENSION
            ),
        }
        .into());
    }
    let expected = image.expected_byte_len();
    if image.pixel_data.len() != expected {
        return Err(ParseFailure::ImageSizeMismatch {
            decoded: image.pixel_data.len(),
            expected,
            width: image.width,
            height: image.height,
            components: image.color_space.components(),
            bits_per_component: image.bits_per_comp,
        }
        .into());
    }
    Ok(())
}

/// I1, I2, I6: resource resolution and well-balanced Save/Restore and
/// TextBegin/TextEnd nesting. I4 (closed operator enumeration) is enforced
/// by the type system — `Op` has no catch-all variant, so there is nothing
/// left to check here beyond what already deserialized.
fn validate_ops(page: &Page) -> Result<()> {
    let mut gstate_depth: u32 = 0;
    let mut in_text_object = false;

    for op in &page.content_ops {
        match op {
            Op::SaveGraphicsState => {
                gstate_depth += 1;
                if gstate_depth > MAX_GSTATE_DEPTH {
                    return Err(ParseFailure::Malformed {
                        offset: 0,
                        reason: format!("graphics state nesting exceeds MAX_GSTATE_DEPTH {MAX_GSTATE_DEPTH}"),
                    }
                    .into());
                }
            },
            Op::RestoreGraphicsState => {
                gstate_depth = gstate_depth.checked_sub(1).ok_or_else(|| ParseFailure::Malformed {
                    offset: 0,
                    reason: "Q with no matching q".to_string(),
                })?;
            },
            Op::TextBegin => {
                if in_text_object {
                    return Err(ParseFailure::Malformed {
                        offset: 0,
                        reason: "nested BT without intervening ET".to_string(),
                    }
                    .into());
                }
                in_text_object = true;
            },
            Op::TextEnd => {
                if !in_text_object {
                    return Err(ParseFailure::Malformed {
                        offset: 0,
                        reason: "ET with no matching BT".to_string(),
                    }
                    .into());
                }
                in_text_object = false;
            },
            Op::ShowText { .. } | Op::ShowTextArray { .. } => {
                if !in_text_object {
                    return Err(ParseFailure::Malformed {
                        offset: 0,
                        reason: "text-showing operator outside BT/ET".to_string(),
                    }
                    .into());
                }
            },
            Op::InvokeXObject { name } => {
                if !page.images.contains_key(name) {
                    return Err(ParseFailure::NotWhitelisted {
                        construct: "XObject",
                        name: name.clone(),
                    }
                    .into());
                }
            },
            _ => {},
        }
    }

    if gstate_depth != 0 {
        return Err(ParseFailure::Malformed {
            offset: 0,
            reason: format!("{gstate_depth} unmatched q at end of page"),
        }
        .into());
    }
    if in_text_object {
        return Err(ParseFailure::Malformed {
            offset: 0,
            reason: "unmatched BT at end of page".to_string(),
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{ColorSpace, FontRef, ImageFilter};
    use std::collections::BTreeMap;

    fn page_with_ops(ops: Vec<Op>) -> Page {
        Page {
            media_box: MediaBox { x0: 0.0, y0: 0.0, x1: 612.0, y1: 792.0 },
            crop_box: None,
            content_ops: ops,
            fonts: BTreeMap::new(),
            images: BTreeMap::new(),
        }
    }

    #[test]
    fn test_validate_document_rejects_empty() {
        let doc = Document {
            pages: vec![],
            source_sha256: [0; 32],
            pdf_version: (1, 4),
            parser_version: "0".into(),
            threats: vec![],
        };
        assert!(validate_document(&doc).is_err());
    }

    #[test]
    fn test_validate_page_accepts_balanced_ops() {
        let page = page_with_ops(vec![
            Op::SaveGraphicsState,
            Op::TextBegin,
            Op::ShowText { bytes: b"hi".to_vec() },
            Op::TextEnd,
            Op::RestoreGraphicsState,
        ]);
        assert!(validate_page(&page).is_ok());
    }

    #[test]
    fn test_validate_page_rejects_unbalanced_save_restore() {
        let page = page_with_ops(vec![Op::RestoreGraphicsState]);
        assert!(validate_page(&page).is_err());
    }

    #[test]
    fn test_validate_page_rejects_dangling_save() {
        let page = page_with_ops(vec![Op::SaveGraphicsState]);
        assert!(validate_page(&page).is_err());
    }

    #[test]
    fn test_validate_page_rejects_nested_text_begin() {
        let page = page_with_ops(vec![Op::TextBegin, Op::TextBegin, Op::TextEnd]);
        assert!(validate_page(&page).is_err());
    }

    #[test]
    fn test_validate_page_rejects_show_text_outside_text_object() {
        let page = page_with_ops(vec![Op::ShowText { bytes: b"hi".to_vec() }]);
        assert!(validate_page(&page).is_err());
    }

    #[test]
    fn test_validate_page_rejects_gstate_depth_overflow() {
        let ops = (0..MAX_GSTATE_DEPTH + 1).map(|_| Op::SaveGraphicsState).collect();
        let page = page_with_ops(ops);
        assert!(validate_page(&page).is_err());
    }

    #[test]
    fn test_validate_page_rejects_unresolved_xobject() {
        let page = page_with_ops(vec![Op::InvokeXObject { name: "Im1".to_string() }]);
        assert!(validate_page(&page).is_err());
    }

    #[test]
    fn test_validate_page_accepts_resolved_xobject() {
        let mut page = page_with_ops(vec![Op::InvokeXObject { name: "Im1".to_string() }]);
        page.images.insert(
            "Im1".to_string(),
            ImageRef {
                width: 2,
                height: 2,
                color_space: ColorSpace::DeviceGray,
                bits_per_comp: 8,
                filter_chain: vec![ImageFilter::FlateDecode],
                pixel_data: vec![0; 4],
            },
        );
        assert!(validate_page(&page).is_ok());
    }

    #[test]
    fn test_validate_image_rejects_size_mismatch() {
        let image = ImageRef {
            width: 10,
            height: 10,
            color_space: ColorSpace::DeviceRGB,
            bits_per_comp: 8,
            filter_chain: vec![],
            pixel_data: vec![0; 10],
        };
        assert!(validate_image(&image).is_err());
    }

    #[test]
    fn test_validate_image_rejects_oversized_dimension() {
        let image = ImageRef {
            width: MAX_IMAGE_DIMENSION + 1,
            height: 1,
            color_space: ColorSpace::DeviceGray,
            bits_per_comp: 8,
            filter_chain: vec![],
            pixel_data: vec![0; (MAX_IMAGE_DIMENSION + 1) as usize],
        };
        assert!(validate_image(&image).is_err());
    }

    #[test]
    fn test_validate_media_box_rejects_oversized_area() {
        let mb = MediaBox { x0: 0.0, y0: 0.0, x1: 1_000_000.0, y1: 1_000_000.0 };
        assert!(validate_media_box(&mb, "media_box").is_err());
    }

    #[test]
    fn test_font_ref_not_used_dangling() {
        // fonts referenced only by local name in Op::ShowText via the
        // resource map at the parser level; validate_page only checks
        // image resolution directly since FontRef itself has no name to
        // dangle once resolved to an enum variant.
        let _ = FontRef::Helvetica;
    }
}
