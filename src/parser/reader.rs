//! Object-graph reader: xref table, trailer, and indirect objects.
//!
//! There is exactly one parsing mode. No repaired malformed xref tables, no
//! guessed offsets, no brute-force object scanning when the xref table
//! doesn't check out. A malformed xref, a truncated object stream, or a
//! `/Prev` cycle is a rejection, not a repair opportunity.

use crate::error::{ParseFailure, Result};
use crate::lexer::{Token, token};
use crate::object::{Object, ObjectRef};
use crate::parser_config::ParserLimits;
use std::collections::HashMap;

/// Decode escape sequences in a PDF literal string (ISO 32000-1:2008 §7.3.4.2).
pub fn decode_literal_string_escapes(raw: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'\\' && i + 1 < raw.len() {
            match raw[i + 1] {
                b'n' => {
                    result.push(b'\n');
                    i += 2;
                },
                b'r' => {
                    result.push(b'\r');
                    i += 2;
                },
                b't' => {
                    result.push(b'\t');
                    i += 2;
                },
                b'b' => {
                    result.push(8);
                    i += 2;
                },
                b'f' => {
                    result.push(12);
                    i += 2;
                },
                b'(' => {
                    result.push(b'(');
                    i += 2;
                },
                b')' => {
                    result.push(b')');
                    i += 2;
                },
                b'\\' => {
                    result.push(b'\\');
                    i += 2;
                },
                b'\n' => i += 2,
                b'\r' => {
                    i += 2;
                    if i < raw.len() && raw[i] == b'\n' {
                        i += 1;
                    }
                },
                c if c.is_ascii_digit() && c < b'8' => {
                    let start = i + 1;
                    let mut octal_value: u32 = 0;
                    let mut octal_len = 0;
                    for j in 0..3 {
                        if start + j < raw.len() {
                            let digit = raw[start + j];
                            if (b'0'..b'8').contains(&digit) {
                                octal_value = octal_value * 8 + (digit - b'0') as u32;
                                octal_len += 1;
                            } else {
                                break;
                            }
                        } else {
                            break;
                        }
                    }
                    if octal_len > 0 {
                        result.push((octal_value & 0xFF) as u8);
                        i += 1 + octal_len;
                    } else {
                        result.push(b'\\');
                        i += 1;
                    }
                },
                _ => {
                    result.push(b'\\');
                    i += 1;
                },
            }
        } else {
            result.push(raw[i]);
            i += 1;
        }
    }
    result
}

fn decode_hex(hex_bytes: &[u8]) -> Result<Vec<u8>> {
    let hex_str: Vec<u8> =
        hex_bytes.iter().filter(|&&c| !c.is_ascii_whitespace()).copied().collect();
    if hex_str.is_empty() {
        return Ok(Vec::new());
    }
    let mut result = Vec::with_capacity(hex_str.len().div_ceil(2));
    for chunk in hex_str.chunks(2) {
        let padded: String = match chunk.len() {
            2 => std::str::from_utf8(chunk)
                .map_err(|e| malformed(format!("invalid hex digit: {e}")))?
                .to_string(),
            1 => format!("{}0", std::str::from_utf8(chunk).map_err(|e| malformed(e.to_string()))?),
            _ => unreachable!(),
        };
        let byte = u8::from_str_radix(&padded, 16).map_err(|e| malformed(e.to_string()))?;
        result.push(byte);
    }
    Ok(result)
}

fn malformed(reason: impl Into<String>) -> crate::error::Error {
    ParseFailure::Malformed { offset: 0, reason: reason.into() }.into()
}

fn truncated(reason: impl Into<String>) -> crate::error::Error {
    ParseFailure::Truncated(reason.into()).into()
}

/// Parse the `%PDF-N.N` header version digits, rejecting anything else that
/// follows the magic bytes.
fn parse_pdf_version(input: &[u8]) -> Result<(u8, u8)> {
    let rest = input.strip_prefix(b"%PDF-").ok_or_else(|| {
        ParseFailure::NotAPdf(String::from_utf8_lossy(&input[..input.len().min(16)]).to_string())
    })?;
    let header_end = rest.iter().position(|&c| c == b'\r' || c == b'\n').unwrap_or(rest.len());
    let header = &rest[..header_end];
    let text = std::str::from_utf8(header)
        .map_err(|_| malformed("PDF version header is not valid UTF-8"))?;
    let (major, minor) = text
        .split_once('.')
        .ok_or_else(|| malformed(format!("malformed PDF version header {text:?}")))?;
    let major: u8 = major
        .parse()
        .map_err(|_| malformed(format!("malformed PDF version header {text:?}")))?;
    let minor: u8 = minor
        .parse()
        .map_err(|_| malformed(format!("malformed PDF version header {text:?}")))?;
    Ok((major, minor))
}

/// Parse a single PDF object from `input`, strictly: unclosed arrays,
/// unclosed dictionaries, and non-name dictionary keys are rejections, not
/// best-effort returns.
pub fn parse_object<'a>(input: &'a [u8], depth: u32, limits: &ParserLimits) -> Result<(&'a [u8], Object)> {
    if depth > limits.max_nesting as u32 {
        return Err(ParseFailure::RecursionLimitExceeded(limits.max_nesting as u32).into());
    }
    let (input, tok) = token(input).map_err(|e| malformed(format!("{e:?}")))?;

    match tok {
        Token::Null => Ok((input, Object::Null)),
        Token::True => Ok((input, Object::Boolean(true))),
        Token::False => Ok((input, Object::Boolean(false))),
        Token::Integer(i) => {
            if let Ok((input2, Token::Integer(gen))) = token(input) {
                if let Ok((input3, Token::R)) = token(input2) {
                    return Ok((input3, Object::Reference(ObjectRef::new(i as u32, gen as u16))));
                }
            }
            Ok((input, Object::Integer(i)))
        },
        Token::Real(r) => Ok((input, Object::Real(r))),
        Token::LiteralString(bytes) => {
            Ok((input, Object::String(decode_literal_string_escapes(bytes))))
        },
        Token::HexString(hex_bytes) => Ok((input, Object::String(decode_hex(hex_bytes)?))),
        Token::Name(name) => Ok((input, Object::Name(name))),
        Token::ArrayStart => parse_array(input, depth + 1, limits),
        Token::DictStart => {
            let (remaining, dict) = parse_dictionary(input, depth + 1, limits)?;
            if let Ok((stream_input, Token::StreamStart)) = token(remaining) {
                let (final_input, data) = parse_stream_data(stream_input, &dict)?;
                return Ok((final_input, Object::Stream { dict, data: bytes::Bytes::from(data) }));
            }
            Ok((remaining, Object::Dictionary(dict)))
        },
        other => Err(malformed(format!("unexpected token {other:?}"))),
    }
}

/// Stream data must be preceded by CRLF or LF (ISO 32000-1:2008 §7.3.8.1) and
/// have a correct `/Length`; there is no scan-for-`endstream` fallback.
fn parse_stream_data<'a>(
    input: &'a [u8],
    dict: &HashMap<String, Object>,
) -> Result<(&'a [u8], Vec<u8>)> {
    let input = if let Some(rest) = input.strip_prefix(b"\r\n") {
        rest
    } else if let Some(rest) = input.strip_prefix(b"\n") {
        rest
    } else {
        return Err(malformed("stream keyword not followed by CRLF or LF"));
    };

    let length = dict
        .get("Length")
        .and_then(|o| o.as_integer())
        .ok_or_else(|| malformed("stream dictionary missing /Length"))? as usize;

    if input.len() < length {
        return Err(truncated("stream data shorter than declared /Length"));
    }
    let data = input[..length].to_vec();
    let remaining = &input[length..];
    let remaining = skip_whitespace(remaining);
    let (remaining, tok) = token(remaining).map_err(|e| malformed(format!("{e:?}")))?;
    if tok != Token::StreamEnd {
        return Err(malformed("expected endstream after stream data"));
    }
    Ok((remaining, data))
}

fn skip_whitespace(input: &[u8]) -> &[u8] {
    let mut i = 0;
    while i < input.len() && input[i].is_ascii_whitespace() {
        i += 1;
    }
    &input[i..]
}

fn parse_array<'a>(mut input: &'a [u8], depth: u32, limits: &ParserLimits) -> Result<(&'a [u8], Object)> {
    let mut objects = Vec::new();
    loop {
        let (after_peek, tok) = token(input).map_err(|e| malformed(format!("{e:?}")))?;
        if tok == Token::ArrayEnd {
            return Ok((after_peek, Object::Array(objects)));
        }
        let (rest, obj) = parse_object(input, depth, limits)?;
        objects.push(obj);
        input = rest;
    }
}

fn parse_dictionary<'a>(
    mut input: &'a [u8],
    depth: u32,
    limits: &ParserLimits,
) -> Result<(&'a [u8], HashMap<String, Object>)> {
    let mut dict = HashMap::new();
    loop {
        let (rest, tok) = token(input).map_err(|e| malformed(format!("{e:?}")))?;
        if tok == Token::DictEnd {
            return Ok((rest, dict));
        }
        let key = match tok {
            Token::Name(key) => key,
            other => return Err(malformed(format!("dictionary key must be a name, found {other:?}"))),
        };
        let (rest, value) = parse_object(rest, depth, limits)?;
        dict.insert(key, value);
        input = rest;
    }
}

/// A parsed, trailer-linked object graph: every indirect object plus the
/// document trailer dictionary.
#[derive(Debug)]
pub struct ObjectGraph {
    objects: HashMap<u32, Object>,
    trailer: HashMap<String, Object>,
    version: (u8, u8),
}

impl ObjectGraph {
    /// An empty graph with no indirect objects and an empty trailer, for
    /// tests that exercise object-level logic without a full PDF byte
    /// stream to parse.
    #[cfg(test)]
    pub(crate) fn empty() -> Self {
        Self { objects: HashMap::new(), trailer: HashMap::new(), version: (1, 7) }
    }

    /// Look up an indirect object by number.
    pub fn get(&self, id: u32) -> Option<&Object> {
        self.objects.get(&id)
    }

    /// The document trailer dictionary (or, for xref streams, the xref
    /// stream's own dictionary).
    pub fn trailer(&self) -> &HashMap<String, Object> {
        &self.trailer
    }

    /// (major, minor) parsed from the `%PDF-N.N` header.
    pub fn version(&self) -> (u8, u8) {
        self.version
    }

    /// Resolve an object, following at most one level of indirection
    /// (PDF references never chain to another reference).
    pub fn resolve<'a>(&'a self, obj: &'a Object) -> Option<&'a Object> {
        match obj {
            Object::Reference(r) => self.get(r.id),
            other => Some(other),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum XRefEntry {
    Uncompressed { offset: u64, generation: u16 },
    Compressed { stream_obj: u32, index: u16 },
}

/// Read the full object graph out of a complete PDF byte buffer.
pub fn read_objects(input: &[u8], limits: &ParserLimits) -> Result<ObjectGraph> {
    let version = parse_pdf_version(input)?;
    if version > limits.max_pdf_version {
        return Err(ParseFailure::UnsupportedVersion {
            found: format!("{}.{}", version.0, version.1),
            max: format!("{}.{}", limits.max_pdf_version.0, limits.max_pdf_version.1),
        }
        .into());
    }

    let start_offset = find_startxref(input)?;
    let (mut entries, trailer) = read_xref_chain(input, start_offset, limits, 0)?;

    let mut objects = HashMap::new();
    let mut objstm_cache: HashMap<u32, HashMap<u32, Object>> = HashMap::new();

    let pending: Vec<(u32, XRefEntry)> = entries.drain().collect();
    for (obj_num, entry) in pending {
        if objects.len() >= limits.max_objects {
            return Err(malformed("object count exceeds configured limit"));
        }
        match entry {
            XRefEntry::Uncompressed { offset, .. } => {
                let obj = read_indirect_object_at(input, offset, limits)?;
                objects.insert(obj_num, obj);
            },
            XRefEntry::Compressed { stream_obj, index } => {
                if !objstm_cache.contains_key(&stream_obj) {
                    let stream = read_object_stream(input, stream_obj, &objects, limits)?;
                    objstm_cache.insert(stream_obj, stream);
                }
                let members = &objstm_cache[&stream_obj];
                if let Some(obj) = members.get(&(index as u32)) {
                    objects.insert(obj_num, obj.clone());
                }
            },
        }
    }

    Ok(ObjectGraph { objects, trailer, version })
}

fn find_startxref(input: &[u8]) -> Result<u64> {
    let tail_start = input.len().saturating_sub(2048);
    let tail = String::from_utf8_lossy(&input[tail_start..]);
    let pos = tail.rfind("startxref").ok_or_else(|| malformed("missing startxref"))?;
    let after = &tail[pos + "startxref".len()..];
    for line in after.lines() {
        let trimmed = line.trim();
        if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()) {
            return trimmed.parse::<u64>().map_err(|_| malformed("malformed startxref offset"));
        }
    }
    Err(malformed("startxref offset not found"))
}

fn read_xref_chain(
    input: &[u8],
    offset: u64,
    limits: &ParserLimits,
    depth: u32,
) -> Result<(HashMap<u32, XRefEntry>, HashMap<String, Object>)> {
    if depth > 64 {
        return Err(malformed("xref /Prev chain too deep"));
    }
    let at = offset as usize;
    if at >= input.len() {
        return Err(truncated("xref offset out of bounds"));
    }
    let region = &input[at..];
    let trimmed = skip_whitespace(region);

    let (mut entries, trailer) = if trimmed.starts_with(b"xref") {
        parse_traditional_xref(trimmed)?
    } else if trimmed.first().is_some_and(u8::is_ascii_digit) {
        parse_xref_stream(trimmed, limits)?
    } else {
        return Err(malformed("xref offset does not point at a table or stream"));
    };

    if let Some(prev_offset) = trailer.get("Prev").and_then(|o| o.as_integer()) {
        let (prev_entries, _prev_trailer) =
            read_xref_chain(input, prev_offset as u64, limits, depth + 1)?;
        for (id, entry) in prev_entries {
            entries.entry(id).or_insert(entry);
        }
    }

    Ok((entries, trailer))
}

fn parse_traditional_xref(
    input: &[u8],
) -> Result<(HashMap<u32, XRefEntry>, HashMap<String, Object>)> {
    let text = String::from_utf8_lossy(input);
    let lines: Vec<&str> = text.lines().collect();
    let mut entries = HashMap::new();
    let mut idx = 0;

    if !lines.first().is_some_and(|l| l.trim_start().starts_with("xref")) {
        return Err(malformed("expected xref keyword"));
    }
    idx += 1;

    loop {
        if idx >= lines.len() {
            return Err(truncated("xref table truncated before trailer"));
        }
        let trimmed = lines[idx].trim();
        if trimmed.starts_with("trailer") {
            idx += 1;
            break;
        }
        if trimmed.is_empty() {
            idx += 1;
            continue;
        }
        let parts: Vec<&str> = trimmed.split_whitespace().collect();
        if parts.len() != 2 {
            return Err(malformed("malformed xref subsection header"));
        }
        let start: u32 = parts[0].parse().map_err(|_| malformed("bad xref subsection start"))?;
        let count: u32 = parts[1].parse().map_err(|_| malformed("bad xref subsection count"))?;
        idx += 1;
        for i in 0..count {
            if idx >= lines.len() {
                return Err(truncated("xref subsection truncated"));
            }
            let entry_line = lines[idx].trim();
            idx += 1;
            let parts: Vec<&str> = entry_line.split_whitespace().collect();
            if parts.len() < 3 {
                return Err(malformed("malformed xref entry"));
            }
            let offset: u64 = parts[0].parse().map_err(|_| malformed("bad xref entry offset"))?;
            let generation: u16 =
                parts[1].parse().map_err(|_| malformed("bad xref entry generation"))?;
            match parts[2] {
                "n" => {
                    entries.insert(start + i, XRefEntry::Uncompressed { offset, generation });
                },
                "f" => {},
                _ => return Err(malformed("invalid xref entry type flag")),
            }
        }
    }

    // Remaining lines form the trailer dictionary text.
    let trailer_text = lines[idx..].join("\n");
    let (_, trailer_obj) =
        parse_object(trailer_text.as_bytes(), 0, &ParserLimits::default())
            .map_err(|_| malformed("malformed trailer dictionary"))?;
    let trailer = match trailer_obj {
        Object::Dictionary(d) => d,
        _ => return Err(malformed("trailer is not a dictionary")),
    };

    Ok((entries, trailer))
}

fn parse_xref_stream(
    input: &[u8],
    limits: &ParserLimits,
) -> Result<(HashMap<u32, XRefEntry>, HashMap<String, Object>)> {
    let (rest, _obj_num) = token(input).map_err(|e| malformed(format!("{e:?}")))?;
    let (rest, _gen) = token(rest).map_err(|e| malformed(format!("{e:?}")))?;
    let (rest, obj_kw) = token(rest).map_err(|e| malformed(format!("{e:?}")))?;
    if obj_kw != Token::ObjStart {
        return Err(malformed("expected 'obj' keyword for xref stream"));
    }
    let (_, obj) = parse_object(rest, 0, limits)?;
    let (dict, data) = match obj {
        Object::Stream { dict, data } => (dict, data),
        _ => return Err(malformed("xref stream object is not a stream")),
    };

    if dict.get("Type").and_then(|o| o.as_name()) != Some("XRef") {
        return Err(malformed("expected /Type /XRef"));
    }

    let w = dict
        .get("W")
        .and_then(|o| o.as_array())
        .ok_or_else(|| malformed("xref stream missing /W"))?;
    if w.len() != 3 {
        return Err(malformed("xref stream /W must have 3 entries"));
    }
    let w1 = w[0].as_integer().ok_or_else(|| malformed("invalid /W[0]"))? as usize;
    let w2 = w[1].as_integer().ok_or_else(|| malformed("invalid /W[1]"))? as usize;
    let w3 = w[2].as_integer().ok_or_else(|| malformed("invalid /W[2]"))? as usize;
    let entry_size = w1 + w2 + w3;

    let size = dict
        .get("Size")
        .and_then(|o| o.as_integer())
        .ok_or_else(|| malformed("xref stream missing /Size"))? as u32;

    let index_ranges: Vec<(u32, u32)> = if let Some(index) = dict.get("Index") {
        let arr = index.as_array().ok_or_else(|| malformed("invalid /Index"))?;
        let mut ranges = Vec::new();
        for pair in arr.chunks(2) {
            if pair.len() != 2 {
                return Err(malformed("/Index has an odd number of entries"));
            }
            let start = pair[0].as_integer().ok_or_else(|| malformed("invalid /Index start"))? as u32;
            let count = pair[1].as_integer().ok_or_else(|| malformed("invalid /Index count"))? as u32;
            ranges.push((start, count));
        }
        ranges
    } else {
        vec![(0, size)]
    };

    let filter_name = dict.get("Filter").and_then(|o| o.as_name());
    let decode_params = crate::object::extract_decode_params(dict.get("DecodeParms"));
    let decoded = match filter_name {
        Some(name) => crate::decoders::decode_stream(
            &data,
            &[name.to_string()],
            decode_params.as_ref(),
            limits,
        )?,
        None => data.to_vec(),
    };

    let mut entries = HashMap::new();
    let mut pos = 0;
    for (start, count) in index_ranges {
        for i in 0..count {
            if pos + entry_size > decoded.len() {
                return Err(truncated("truncated xref stream data"));
            }
            let chunk = &decoded[pos..pos + entry_size];
            pos += entry_size;
            let entry_type = if w1 > 0 { read_be(&chunk[0..w1]) } else { 1 };
            let field2 = read_be(&chunk[w1..w1 + w2]);
            let field3 = read_be(&chunk[w1 + w2..w1 + w2 + w3]);
            match entry_type {
                0 => {},
                1 => {
                    entries.insert(
                        start + i,
                        XRefEntry::Uncompressed { offset: field2, generation: field3 as u16 },
                    );
                },
                2 => {
                    entries.insert(
                        start + i,
                        XRefEntry::Compressed { stream_obj: field2 as u32, index: field3 as u16 },
                    );
                },
                other => return Err(malformed(format!("invalid xref entry type {other}"))),
            }
        }
    }

    Ok((entries, dict))
}

fn read_be(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64)
}

fn read_indirect_object_at(input: &[u8], offset: u64, limits: &ParserLimits) -> Result<Object> {
    let at = offset as usize;
    if at >= input.len() {
        return Err(truncated("indirect object offset out of bounds"));
    }
    let region = &input[at..];
    let (rest, _obj_num) = token(region).map_err(|e| malformed(format!("{e:?}")))?;
    let (rest, _gen) = token(rest).map_err(|e| malformed(format!("{e:?}")))?;
    let (rest, kw) = token(rest).map_err(|e| malformed(format!("{e:?}")))?;
    if kw != Token::ObjStart {
        return Err(malformed("expected 'obj' keyword"));
    }
    let (_, obj) = parse_object(rest, 0, limits)?;
    Ok(obj)
}

fn read_object_stream(
    input: &[u8],
    stream_obj_num: u32,
    objects_read_so_far: &HashMap<u32, Object>,
    limits: &ParserLimits,
) -> Result<HashMap<u32, Object>> {
    // The object stream itself must already have been located by the xref
    // table as an uncompressed object.
    let stream = objects_read_so_far
        .get(&stream_obj_num)
        .cloned()
        .ok_or_else(|| malformed("object stream not found in xref table"))?;
    let (dict, data) = match &stream {
        Object::Stream { dict, data } => (dict.clone(), data.clone()),
        _ => return Err(malformed("/ObjStm entry is not a stream")),
    };

    let n = dict.get("N").and_then(|o| o.as_integer()).ok_or_else(|| malformed("ObjStm missing /N"))?
        as usize;
    let first = dict
        .get("First")
        .and_then(|o| o.as_integer())
        .ok_or_else(|| malformed("ObjStm missing /First"))? as usize;

    let filters = dict.get("Filter").map(crate::object::extract_filter_names).unwrap_or_default();
    let decode_params = crate::object::extract_decode_params(dict.get("DecodeParms"));
    let decoded = if filters.is_empty() {
        data.to_vec()
    } else {
        crate::decoders::decode_stream(&data, &filters, decode_params.as_ref(), limits)?
    };

    let header_text = std::str::from_utf8(&decoded[..first.min(decoded.len())])
        .map_err(|_| malformed("ObjStm header is not valid UTF-8"))?;
    let header_numbers: Vec<u32> = header_text
        .split_whitespace()
        .map(|s| s.parse::<u32>().map_err(|_| malformed("ObjStm header has a non-integer")))
        .collect::<Result<_>>()?;
    if header_numbers.len() != n * 2 {
        return Err(malformed("ObjStm header pair count doesn't match /N"));
    }

    let mut members = HashMap::new();
    for pair in header_numbers.chunks(2) {
        let obj_num = pair[0];
        let rel_offset = pair[1] as usize;
        let body_start = first + rel_offset;
        if body_start > decoded.len() {
            return Err(malformed("ObjStm member offset out of bounds"));
        }
        let (_, obj) = parse_object(&decoded[body_start..], 0, limits)?;
        members.insert(obj_num, obj);
    }

    Ok(members)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_object_primitives() {
        let limits = ParserLimits::default();
        assert_eq!(parse_object(b"null", 0, &limits).unwrap().1, Object::Null);
        assert_eq!(parse_object(b"true", 0, &limits).unwrap().1, Object::Boolean(true));
        assert_eq!(parse_object(b"42", 0, &limits).unwrap().1, Object::Integer(42));
        assert_eq!(parse_object(b"/Name", 0, &limits).unwrap().1, Object::Name("Name".into()));
    }

    #[test]
    fn test_parse_object_reference() {
        let limits = ParserLimits::default();
        let (_, obj) = parse_object(b"10 0 R", 0, &limits).unwrap();
        assert_eq!(obj, Object::Reference(ObjectRef::new(10, 0)));
    }

    #[test]
    fn test_parse_object_rejects_unclosed_array() {
        let limits = ParserLimits::default();
        assert!(parse_object(b"[ 1 2 3", 0, &limits).is_err());
    }

    #[test]
    fn test_parse_object_rejects_unclosed_dictionary() {
        let limits = ParserLimits::default();
        assert!(parse_object(b"<< /Type /Page", 0, &limits).is_err());
    }

    #[test]
    fn test_parse_object_rejects_non_name_dict_key() {
        let limits = ParserLimits::default();
        assert!(parse_object(b"<< 123 /Value >>", 0, &limits).is_err());
    }

    #[test]
    fn test_parse_object_array_and_dict() {
        let limits = ParserLimits::default();
        let (_, obj) = parse_object(b"[ 1 2 3 ]", 0, &limits).unwrap();
        assert_eq!(obj.as_array().unwrap().len(), 3);
        let (_, obj) = parse_object(b"<< /Type /Page >>", 0, &limits).unwrap();
        assert_eq!(obj.as_dict().unwrap().get("Type").unwrap().as_name(), Some("Page"));
    }

    #[test]
    fn test_find_startxref() {
        let mut pdf = b"%PDF-1.7\n".to_vec();
        pdf.extend_from_slice(b"1 0 obj\n<< >>\nendobj\n");
        pdf.extend_from_slice(b"xref\n0 1\n0000000000 65535 f \ntrailer\n<< /Size 1 >>\n");
        pdf.extend_from_slice(format!("startxref\n{}\n%%EOF", pdf.len()).as_bytes());
        assert!(find_startxref(&pdf).is_ok());
    }

    #[test]
    fn test_read_objects_rejects_non_pdf() {
        let limits = ParserLimits::default();
        assert!(read_objects(b"not a pdf", &limits).is_err());
    }

    #[test]
    fn test_parse_pdf_version() {
        assert_eq!(parse_pdf_version(b"%PDF-1.7\nrest").unwrap(), (1, 7));
        assert_eq!(parse_pdf_version(b"%PDF-1.4\r\nrest").unwrap(), (1, 4));
        assert!(parse_pdf_version(b"not a pdf").is_err());
        assert!(parse_pdf_version(b"%PDF-bogus\n").is_err());
    }

    #[test]
    fn test_read_objects_rejects_version_above_cap() {
        let mut pdf = b"%PDF-2.0\n".to_vec();
        pdf.extend_from_slice(b"xref\n0 1\n0000000000 65535 f \ntrailer\n<< /Size 1 >>\n");
        pdf.extend_from_slice(format!("startxref\n{}\n%%EOF", 9).as_bytes());
        let limits = ParserLimits { max_pdf_version: (1, 7), ..ParserLimits::default() };
        let err = read_objects(&pdf, &limits).unwrap_err();
        assert_eq!(err.taxon(), "UNSUPPORTED_VERSION");
    }

    #[test]
    fn test_read_objects_traditional_xref() {
        let mut pdf = b"%PDF-1.4\n".to_vec();
        let obj_offset = pdf.len();
        pdf.extend_from_slice(b"1 0 obj\n<< /Type /Catalog >>\nendobj\n");
        let xref_offset = pdf.len();
        pdf.extend_from_slice(b"xref\n0 2\n0000000000 65535 f \n");
        pdf.extend_from_slice(format!("{:010} 00000 n \n", obj_offset).as_bytes());
        pdf.extend_from_slice(b"trailer\n<< /Size 2 /Root 1 0 R >>\n");
        pdf.extend_from_slice(format!("startxref\n{xref_offset}\n%%EOF").as_bytes());

        let limits = ParserLimits::default();
        let graph = read_objects(&pdf, &limits).unwrap();
        let obj = graph.get(1).unwrap();
        assert_eq!(obj.as_dict().unwrap().get("Type").unwrap().as_name(), Some("Catalog"));
        assert_eq!(graph.trailer().get("Size").unwrap().as_integer(), Some(2));
    }
}
