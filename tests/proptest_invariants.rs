//! Property-based coverage of reconstruction determinism and media-box
//! validation: universal claims over a generated input rather than a
//! fixed fixture.

use pdf_sanitize::ir::validate::{validate_document, MAX_PAGE_AREA};
use pdf_sanitize::ir::{Document, MediaBox, Page};
use pdf_sanitize::reconstruct::reconstruct_bytes;
use proptest::prelude::*;

fn document_with_media_box(mb: MediaBox) -> Document {
    Document {
        pages: vec![Page {
            media_box: mb,
            crop_box: None,
            content_ops: vec![],
            fonts: Default::default(),
            images: Default::default(),
        }],
        source_sha256: [0u8; 32],
        pdf_version: (1, 7),
        parser_version: pdf_sanitize::VERSION.to_string(),
        threats: vec![],
    }
}

fn well_formed_media_box() -> impl Strategy<Value = MediaBox> {
    (0.0f64..500.0, 0.0f64..500.0, 1.0f64..600.0, 1.0f64..600.0)
        .prop_map(|(x0, y0, w, h)| MediaBox { x0, y0, x1: x0 + w, y1: y0 + h })
}

proptest! {
    /// P2: reconstructing the same well-formed IR twice yields byte-identical output.
    #[test]
    fn p2_reconstruction_is_deterministic_for_any_well_formed_document(mb in well_formed_media_box()) {
        let doc = document_with_media_box(mb);
        let a = reconstruct_bytes(&doc, pdf_sanitize::reconstruct::DEFAULT_MAX_OUTPUT_BYTES).unwrap();
        let b = reconstruct_bytes(&doc, pdf_sanitize::reconstruct::DEFAULT_MAX_OUTPUT_BYTES).unwrap();
        prop_assert_eq!(a, b);
    }

    /// P5: a media box with zero or negative extent violates I3/well-formedness
    /// and is rejected by validation before reconstruction is ever attempted.
    #[test]
    fn p5_non_positive_extent_media_box_is_rejected(
        x0 in -100.0f64..100.0,
        y0 in -100.0f64..100.0,
        dx in -50.0f64..0.0,
        dy in -50.0f64..0.0,
    ) {
        let mb = MediaBox { x0, y0, x1: x0 + dx, y1: y0 + dy };
        let doc = document_with_media_box(mb);
        prop_assert!(validate_document(&doc).is_err());
    }

    /// P5: a media box exceeding MAX_PAGE_AREA is rejected even though its
    /// extent is otherwise well-formed.
    #[test]
    fn p5_oversized_media_box_is_rejected(scale in 1.001f64..10.0) {
        let side = (MAX_PAGE_AREA * scale).sqrt();
        let mb = MediaBox { x0: 0.0, y0: 0.0, x1: side, y1: side };
        let doc = document_with_media_box(mb);
        prop_assert!(validate_document(&doc).is_err());
    }
}
