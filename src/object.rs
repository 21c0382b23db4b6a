//! Raw PDF object model.
//!
//! This is the untyped object graph produced by [`crate::parser::reader`]
//! before the whitelist parser decides what to keep. Nothing here enforces
//! policy — `Object` can represent anything syntactically legal in a PDF,
//! whitelisted or not. Policy lives in [`crate::parser::whitelist`].

use crate::error::{ParseFailure, Result};

/// PDF object representation.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    /// Null object
    Null,
    /// Boolean value
    Boolean(bool),
    /// Integer value
    Integer(i64),
    /// Real (floating-point) value
    Real(f64),
    /// String (byte array)
    String(Vec<u8>),
    /// Name (starting with /)
    Name(String),
    /// Array of objects
    Array(Vec<Object>),
    /// Dictionary (key-value pairs)
    Dictionary(std::collections::HashMap<String, Object>),
    /// Stream (dictionary + data)
    Stream {
        /// Stream dictionary
        dict: std::collections::HashMap<String, Object>,
        /// Raw, still-encoded stream data
        data: bytes::Bytes,
    },
    /// Indirect object reference
    Reference(ObjectRef),
}

/// Reference to an indirect object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    /// Object number
    pub id: u32,
    /// Generation number
    pub gen: u16,
}

impl ObjectRef {
    /// Create a new object reference.
    pub fn new(id: u32, gen: u16) -> Self {
        Self { id, gen }
    }
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} R", self.id, self.gen)
    }
}

impl Object {
    /// Get the type name of this object (without data), used in rejection
    /// messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Null => "Null",
            Object::Boolean(_) => "Boolean",
            Object::Integer(_) => "Integer",
            Object::Real(_) => "Real",
            Object::String(_) => "String",
            Object::Name(_) => "Name",
            Object::Array(_) => "Array",
            Object::Dictionary(_) => "Dictionary",
            Object::Stream { .. } => "Stream",
            Object::Reference(_) => "Reference",
        }
    }

    /// Try to cast to integer.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Object::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to cast to name.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Object::Name(s) => Some(s),
            _ => None,
        }
    }

    /// Try to cast to dictionary. Works for both Dictionary and Stream objects.
    pub fn as_dict(&self) -> Option<&std::collections::HashMap<String, Object>> {
        match self {
            Object::Dictionary(d) => Some(d),
            Object::Stream { dict, .. } => Some(dict),
            _ => None,
        }
    }

    /// Try to cast to array.
    pub fn as_array(&self) -> Option<&Vec<Object>> {
        match self {
            Object::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Try to cast to reference.
    pub fn as_reference(&self) -> Option<ObjectRef> {
        match self {
            Object::Reference(r) => Some(*r),
            _ => None,
        }
    }

    /// Try to cast to boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Object::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to cast to real number (accepting integers too, as PDF numeric
    /// operands commonly mix the two).
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Object::Real(r) => Some(*r),
            Object::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Try to cast to string (bytes).
    pub fn as_string(&self) -> Option<&[u8]> {
        match self {
            Object::String(s) => Some(s),
            _ => None,
        }
    }

    /// Check if object is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Object::Null)
    }

    /// Decode a stream's data through its declared filter pipeline.
    ///
    /// Unlike an extractor, this never tolerates a filter it can't decode
    /// cleanly — any failure propagates as [`ParseFailure::DecodeFailed`].
    pub fn decode_stream_data(&self, limits: &crate::parser_config::ParserLimits) -> Result<Vec<u8>> {
        match self {
            Object::Stream { dict, data } => {
                let trimmed = trim_leading_stream_whitespace(data);

                let filters = dict
                    .get("Filter")
                    .map(extract_filter_names)
                    .unwrap_or_default();

                if filters.is_empty() {
                    return Ok(trimmed.to_vec());
                }

                let decode_params = extract_decode_params(dict.get("DecodeParms"));
                crate::decoders::decode_stream(trimmed, &filters, decode_params.as_ref(), limits)
                    .map_err(|e| {
                        crate::error::Error::Parse(ParseFailure::DecodeFailed {
                            filter: filters.join(","),
                            reason: e.to_string(),
                        })
                    })
            },
            _ => Err(crate::error::Error::Parse(ParseFailure::Malformed {
                offset: 0,
                reason: format!("expected Stream, found {}", self.type_name()),
            })),
        }
    }
}

/// Trim leading PDF whitespace from stream data (PDF Spec 7.3.4.2). Some
/// generators emit extra whitespace after the `stream` keyword before the
/// EOL marker; this tolerance is pure syntax, not a security-relevant guess.
fn trim_leading_stream_whitespace(data: &[u8]) -> &[u8] {
    let mut start = 0;
    while start < data.len() {
        match data[start] {
            0x00 | 0x09 | 0x0A | 0x0C | 0x0D | 0x20 => start += 1,
            _ => break,
        }
    }
    &data[start..]
}

/// Extract filter names from a Filter object (single Name or Array of Names).
pub fn extract_filter_names(filter_obj: &Object) -> Vec<String> {
    match filter_obj {
        Object::Name(name) => vec![name.clone()],
        Object::Array(arr) => arr
            .iter()
            .filter_map(|obj| obj.as_name().map(|s| s.to_string()))
            .collect(),
        _ => vec![],
    }
}

/// Extract predictor parameters from a DecodeParms object (Table 3.7).
pub fn extract_decode_params(params_obj: Option<&Object>) -> Option<crate::decoders::DecodeParams> {
    let dict = match params_obj? {
        Object::Dictionary(d) => d,
        Object::Array(arr) => arr.iter().filter_map(|obj| obj.as_dict()).next()?,
        _ => return None,
    };

    let predictor = dict.get("Predictor").and_then(|o| o.as_integer()).unwrap_or(1);
    let columns = dict.get("Columns").and_then(|o| o.as_integer()).unwrap_or(1) as usize;
    let colors = dict.get("Colors").and_then(|o| o.as_integer()).unwrap_or(1) as usize;
    let bits_per_component = dict
        .get("BitsPerComponent")
        .and_then(|o| o.as_integer())
        .unwrap_or(8) as usize;
    let k = dict.get("K").and_then(|o| o.as_integer()).unwrap_or(0) as i32;
    let rows = dict.get("Rows").and_then(|o| o.as_integer()).map(|r| r as u32);
    let black_is_1 = dict.get("BlackIs1").and_then(|o| o.as_bool()).unwrap_or(false);
    let encoded_byte_align = dict
        .get("EncodedByteAlign")
        .and_then(|o| o.as_bool())
        .unwrap_or(false);

    Some(crate::decoders::DecodeParams {
        predictor,
        columns,
        colors,
        bits_per_component,
        k,
        rows,
        black_is_1,
        encoded_byte_align,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_object_integer() {
        let obj = Object::Integer(42);
        assert_eq!(obj.as_integer(), Some(42));
        assert!(obj.as_name().is_none());
        assert!(!obj.is_null());
    }

    #[test]
    fn test_object_real_accepts_integer() {
        let obj = Object::Integer(3);
        assert_eq!(obj.as_real(), Some(3.0));
    }

    #[test]
    fn test_object_ref_display() {
        let obj_ref = ObjectRef::new(10, 0);
        assert_eq!(format!("{}", obj_ref), "10 0 R");
    }

    #[test]
    fn test_decode_stream_no_filter() {
        let mut dict = HashMap::new();
        dict.insert("Length".to_string(), Object::Integer(5));
        let obj = Object::Stream {
            dict,
            data: bytes::Bytes::from_static(b"Hello"),
        };

        let limits = crate::parser_config::ParserLimits::default();
        let decoded = obj.decode_stream_data(&limits).unwrap();
        assert_eq!(decoded, b"Hello");
    }

    #[test]
    fn test_decode_stream_not_a_stream() {
        let obj = Object::Integer(42);
        let limits = crate::parser_config::ParserLimits::default();
        assert!(obj.decode_stream_data(&limits).is_err());
    }

    #[test]
    fn test_extract_filter_names_array() {
        let filter = Object::Array(vec![
            Object::Name("ASCII85Decode".to_string()),
            Object::Name("FlateDecode".to_string()),
        ]);
        let names = extract_filter_names(&filter);
        assert_eq!(names, vec!["ASCII85Decode", "FlateDecode"]);
    }
}
