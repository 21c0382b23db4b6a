//! Standard-14 font resolution.
//!
//! A page's `/Resources/Font` dictionary maps local resource names to font
//! dictionaries. Only fonts whose `/BaseFont` names one of the fourteen
//! standard base fonts are admitted (invariant I2); anything else — an
//! embedded font program, a CID font, a name outside the standard set — is
//! silently excluded from the resource map rather than causing a rejection,
//! since a font that's merely unused by the final content stream isn't a
//! threat on its own.

use crate::ir::FontRef;
use crate::object::Object;
use crate::parser::reader::ObjectGraph;
use std::collections::{BTreeMap, HashMap};

/// Resolve a page's `/Resources/Font` dictionary into local-name -> FontRef.
pub fn resolve_fonts(
    graph: &ObjectGraph,
    resources: &HashMap<String, Object>,
) -> BTreeMap<String, FontRef> {
    let mut fonts = BTreeMap::new();
    let Some(font_dict) =
        resources.get("Font").and_then(|r| graph.resolve(r)).and_then(Object::as_dict)
    else {
        return fonts;
    };

    for (local_name, font_obj) in font_dict {
        if let Some(font_ref) = resolve_one(graph, font_obj) {
            fonts.insert(local_name.clone(), font_ref);
        }
    }
    fonts
}

fn resolve_one(graph: &ObjectGraph, font_obj: &Object) -> Option<FontRef> {
    let font = graph.resolve(font_obj)?.as_dict()?;
    let base_font = font.get("BaseFont").and_then(Object::as_name)?;
    // Subset fonts are tagged with a six-letter uppercase prefix and a '+'
    // (ISO 32000-1 §9.6.4.3); the suffix is still checked against the
    // standard-14 table, which a genuine subset of a non-standard font will
    // never match.
    let canonical = base_font.split('+').next_back().unwrap_or(base_font);
    FontRef::from_canonical_name(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser_config::ParserLimits;

    fn graph_with_font(base_font: &str) -> ObjectGraph {
        let mut pdf = b"%PDF-1.4\n".to_vec();
        let font_offset = pdf.len();
        pdf.extend_from_slice(
            format!("2 0 obj\n<< /Type /Font /Subtype /Type1 /BaseFont /{base_font} >>\nendobj\n")
                .as_bytes(),
        );
        let catalog_offset = pdf.len();
        pdf.extend_from_slice(b"1 0 obj\n<< /Type /Catalog >>\nendobj\n");
        let xref_offset = pdf.len();
        pdf.extend_from_slice(b"xref\n0 3\n0000000000 65535 f \n");
        pdf.extend_from_slice(format!("{catalog_offset:010} 00000 n \n").as_bytes());
        pdf.extend_from_slice(format!("{font_offset:010} 00000 n \n").as_bytes());
        pdf.extend_from_slice(b"trailer\n<< /Size 3 /Root 1 0 R >>\n");
        pdf.extend_from_slice(format!("startxref\n{xref_offset}\n%%EOF").as_bytes());
        crate::parser::reader::read_objects(&pdf, &ParserLimits::default()).unwrap()
    }

    #[test]
    fn test_resolve_fonts_standard14() {
        let graph = graph_with_font("Helvetica");
        let mut resources = HashMap::new();
        resources.insert("F1".to_string(), Object::Reference(crate::object::ObjectRef::new(2, 0)));
        let fonts = resolve_fonts(&graph, &resources);
        assert_eq!(fonts.get("F1"), Some(&FontRef::Helvetica));
    }

    #[test]
    fn test_resolve_fonts_excludes_non_standard() {
        let graph = graph_with_font("Arial");
        let mut resources = HashMap::new();
        resources.insert(
            "F1".to_string(),
            Object::Reference(crate::object::ObjectRef::new(2, 0)),
        );
        let fonts = resolve_fonts(&graph, &resources);
        assert!(fonts.is_empty());
    }

    #[test]
    fn test_resolve_fonts_strips_subset_prefix() {
        let graph = graph_with_font("ABCDEF+Helvetica-Bold");
        let mut resources = HashMap::new();
        resources.insert(
            "F1".to_string(),
            Object::Reference(crate::object::ObjectRef::new(2, 0)),
        );
        let fonts = resolve_fonts(&graph, &resources);
        assert_eq!(fonts.get("F1"), Some(&FontRef::HelveticaBold));
    }
}
