//! Image XObject admission.
//!
//! Only `/Subtype /Image` XObjects with an allow-listed filter chain and a
//! decoded byte length that matches their declared dimensions are admitted
//! (invariant I5). Form XObjects — arbitrary content streams wrapped as
//! resources — are never a match for `/Subtype /Image` and are silently
//! excluded, since §4.1.2 names Form XObjects as never-admitted.

use crate::decoders::decode_stream;
use crate::error::{ParseFailure, Result};
use crate::ir::{ColorSpace, ImageFilter, ImageRef};
use crate::object::{Object, extract_decode_params, extract_filter_names};
use crate::parser::reader::ObjectGraph;
use crate::parser_config::ParserLimits;
use std::collections::{BTreeMap, HashMap};

/// Resolve a page's `/Resources/XObject` dictionary into local-name ->
/// decoded, measured image. XObjects that aren't `/Subtype /Image` are
/// skipped; Image XObjects that fail decode or measurement propagate as a
/// hard error, since a page that references an image it cannot honestly
/// admit cannot be reconstructed faithfully.
pub fn resolve_images(
    graph: &ObjectGraph,
    resources: &HashMap<String, Object>,
    limits: &ParserLimits,
    allowed_filters: &[ImageFilter],
) -> Result<BTreeMap<String, ImageRef>> {
    let mut images = BTreeMap::new();
    let Some(xobj_dict) =
        resources.get("XObject").and_then(|r| graph.resolve(r)).and_then(Object::as_dict)
    else {
        return Ok(images);
    };

    for (local_name, xobj_ref) in xobj_dict {
        if let Some(image) = try_resolve_one(graph, xobj_ref, limits, allowed_filters)? {
            images.insert(local_name.clone(), image);
        }
    }
    Ok(images)
}

fn try_resolve_one(
    graph: &ObjectGraph,
    xobj_ref: &Object,
    limits: &ParserLimits,
    allowed_filters: &[ImageFilter],
) -> Result<Option<ImageRef>> {
    let Some(obj) = graph.resolve(xobj_ref) else { return Ok(None) };
    let (dict, data) = match obj {
        Object::Stream { dict, data } => (dict, data),
        _ => return Ok(None),
    };
    if dict.get("Subtype").and_then(Object::as_name) != Some("Image") {
        return Ok(None);
    }
    decode_image(graph, dict, data, limits, allowed_filters).map(Some)
}

fn decode_image(
    graph: &ObjectGraph,
    dict: &HashMap<String, Object>,
    data: &bytes::Bytes,
    limits: &ParserLimits,
    allowed_filters: &[ImageFilter],
) -> Result<ImageRef> {
    let width = required_int(graph, dict, "Width")? as u32;
    let height = required_int(graph, dict, "Height")? as u32;
    let bits_per_comp = required_int(graph, dict, "BitsPerComponent")? as u8;
    if ![1u8, 2, 4, 8, 16].contains(&bits_per_comp) {
        return Err(malformed(format!("invalid /BitsPerComponent {bits_per_comp}")));
    }
    let pixel_count = width as u64 * height as u64;
    if pixel_count > limits.max_image_pixels {
        return Err(ParseFailure::LimitExceeded {
            which: "max_image_pixels",
            actual: pixel_count,
            max: limits.max_image_pixels,
        }
        .into());
    }

    let color_space = resolve_color_space(graph, dict)?;
    let filter_chain = resolve_filter_chain(dict, allowed_filters)?;

    let filter_names = dict.get("Filter").map(extract_filter_names).unwrap_or_default();
    let decode_params = extract_decode_params(dict.get("DecodeParms"));
    let pixel_data = if filter_names.is_empty() {
        data.to_vec()
    } else {
        decode_stream(data, &filter_names, decode_params.as_ref(), limits)?
    };

    let image = ImageRef { width, height, color_space, bits_per_comp, filter_chain, pixel_data };
    let expected = image.expected_byte_len();
    if image.pixel_data.len() != expected {
        return Err(ParseFailure::ImageSizeMismatch {
            decoded: image.pixel_data.len(),
            expected,
            width,
            height,
            components: color_space.components(),
            bits_per_component: bits_per_comp,
        }
        .into());
    }
    Ok(image)
}

fn required_int(graph: &ObjectGraph, dict: &HashMap<String, Object>, key: &'static str) -> Result<i64> {
    dict.get(key)
        .and_then(|o| graph.resolve(o))
        .and_then(Object::as_integer)
        .ok_or_else(|| malformed(format!("image missing /{key}")))
}

fn resolve_color_space(graph: &ObjectGraph, dict: &HashMap<String, Object>) -> Result<ColorSpace> {
    let name = dict
        .get("ColorSpace")
        .and_then(|o| graph.resolve(o))
        .and_then(Object::as_name)
        .ok_or_else(|| malformed("image /ColorSpace is missing or not a direct name"))?;
    match name {
        "DeviceGray" => Ok(ColorSpace::DeviceGray),
        "DeviceRGB" => Ok(ColorSpace::DeviceRGB),
        "DeviceCMYK" => Ok(ColorSpace::DeviceCMYK),
        other => {
            Err(ParseFailure::NotWhitelisted { construct: "color space", name: other.to_string() }.into())
        },
    }
}

fn resolve_filter_chain(
    dict: &HashMap<String, Object>,
    allowed_filters: &[ImageFilter],
) -> Result<Vec<ImageFilter>> {
    let filter_names = dict.get("Filter").map(extract_filter_names).unwrap_or_default();
    let mut chain = Vec::with_capacity(filter_names.len());
    for name in &filter_names {
        let filter = match name.as_str() {
            "FlateDecode" => ImageFilter::FlateDecode,
            "DCTDecode" => ImageFilter::DctDecode,
            "CCITTFaxDecode" => ImageFilter::CcittFaxDecode,
            "JBIG2Decode" => ImageFilter::Jbig2Decode,
            other => {
                return Err(ParseFailure::NotWhitelisted {
                    construct: "image filter",
                    name: other.to_string(),
                }
                .into());
            },
        };
        if !allowed_filters.contains(&filter) {
            return Err(ParseFailure::NotWhitelisted {
                construct: "image filter",
                name: name.clone(),
            }
            .into());
        }
        chain.push(filter);
    }
    Ok(chain)
}

fn malformed(reason: impl Into<String>) -> crate::error::Error {
    ParseFailure::Malformed { offset: 0, reason: reason.into() }.into()
}
