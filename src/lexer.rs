//! PDF lexer (tokenizer).
//!
//! Low-level tokenization of PDF byte streams, used by the object-graph
//! reader in [`crate::parser::reader`] to walk indirect objects, arrays,
//! dictionaries and xref entries. This layer only knows PDF *grammar* —
//! whether a given name, operator or filter is actually permitted is a
//! [`crate::parser::whitelist`] decision, not a lexer one. There is no
//! generic keyword fallback: a bareword that isn't one of the fixed set
//! below (`true`, `false`, `null`, `obj`, `endobj`, `stream`, `endstream`,
//! `R`) fails to tokenize rather than being passed through as an opaque
//! identifier. Content-stream operators are scanned by
//! [`crate::parser::content`] against its own operator allow-list with its
//! own manual byte-scanning, never through this module — the two parsers
//! read different grammars and intentionally don't share a combinator.
//!
//! # PDF Syntax Overview
//!
//! PDF uses a PostScript-like syntax with the following token types:
//! - Numbers: integers (42, -123) and reals (3.14, -2.5)
//! - Strings: literal ((Hello)) and hexadecimal (<48656C6C6F>)
//! - Names: identifiers starting with / (/Type, /Pages)
//! - Keywords: true, false, null
//! - Delimiters: `[`, `]`, `<<`, `>>`, `obj`, `endobj`, `stream`, `endstream`
//! - References: indirect object references (10 0 R)
//!
//! Whitespace (space, \t, \r, \n, \0, \f) and comments (% to EOL) are skipped.

/// Token types recognized by the PDF lexer.
///
/// Tokens are the atomic units of PDF syntax. The parser combines tokens
/// into higher-level objects (dictionaries, arrays, etc.).
#[derive(Debug, PartialEq, Clone)]
pub enum Token<'a> {
    /// Integer number (e.g., 42, -123)
    Integer(i64),

    /// Real (floating-point) number (e.g., 3.14, -2.5, .5)
    Real(f64),

    /// Literal string bytes (e.g., content of "(Hello)")
    /// Escape sequences are NOT decoded at lexer level.
    LiteralString(&'a [u8]),

    /// Hexadecimal string bytes (e.g., content of "<48656C6C6F>")
    /// Whitespace is preserved; decoding happens at parser level.
    HexString(&'a [u8]),

    /// Name (e.g., "Type" from "/Type")
    /// `#XX` escape sequences ARE decoded at lexer level per spec.
    Name(String),

    /// Boolean true keyword
    True,

    /// Boolean false keyword
    False,

    /// Null keyword
    Null,

    /// Array start delimiter [
    ArrayStart,

    /// Array end delimiter ]
    ArrayEnd,

    /// Dictionary start delimiter <<
    DictStart,

    /// Dictionary end delimiter >>
    DictEnd,

    /// Indirect object start keyword "obj"
    ObjStart,

    /// Indirect object end keyword "endobj"
    ObjEnd,

    /// Stream start keyword "stream"
    StreamStart,

    /// Stream end keyword "endstream"
    StreamEnd,

    /// Reference keyword "R" (used in "10 0 R")
    R,
}

/// A lexing failure: the input doesn't start with any token form this
/// module recognizes. Carries a short fixed reason rather than a byte
/// offset — callers already track their own cursor into the buffer and
/// wrap this into a `Malformed` failure with their own locator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LexError(&'static str);

type LexResult<'a, T> = Result<(&'a [u8], T), LexError>;

fn is_pdf_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n' | 0x00 | 0x0C)
}

fn is_delimiter(b: u8) -> bool {
    matches!(b, b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%')
}

/// Skip whitespace and `%`-to-end-of-line comments (ISO 32000-1 §7.2).
fn skip_ws_and_comments(mut input: &[u8]) -> &[u8] {
    loop {
        let non_ws = input.iter().position(|&b| !is_pdf_whitespace(b)).unwrap_or(input.len());
        if non_ws > 0 {
            input = &input[non_ws..];
            continue;
        }
        if input.first() == Some(&b'%') {
            let eol = input.iter().position(|&b| b == b'\r' || b == b'\n').unwrap_or(input.len());
            input = &input[eol..];
            continue;
        }
        return input;
    }
}

/// Parse an integer or real number.
///
/// PDF numbers can be integers (42, -123, +17) or reals (3.14, -2.5, .5,
/// 0., -.002).
fn parse_number(input: &[u8]) -> LexResult<'_, Token<'_>> {
    let mut i = 0;
    let negative = match input.first() {
        Some(b'+') => {
            i += 1;
            false
        },
        Some(b'-') => {
            i += 1;
            true
        },
        _ => false,
    };

    let int_start = i;
    while i < input.len() && input[i].is_ascii_digit() {
        i += 1;
    }
    let int_digits = &input[int_start..i];

    let mut frac_digits: &[u8] = &[];
    let mut has_dot = false;
    if input.get(i) == Some(&b'.') {
        has_dot = true;
        i += 1;
        let frac_start = i;
        while i < input.len() && input[i].is_ascii_digit() {
            i += 1;
        }
        frac_digits = &input[frac_start..i];
    }

    if int_digits.is_empty() && frac_digits.is_empty() {
        return Err(LexError("not a number"));
    }

    let rest = &input[i..];
    if !has_dot {
        let int_str = std::str::from_utf8(int_digits).map_err(|_| LexError("non-UTF-8 integer"))?;
        let mut value: i64 = int_str.parse().map_err(|_| LexError("integer overflow"))?;
        if negative {
            value = -value;
        }
        return Ok((rest, Token::Integer(value)));
    }

    let int_part = if int_digits.is_empty() { "0" } else { std::str::from_utf8(int_digits).unwrap() };
    let frac_part = if frac_digits.is_empty() { "0" } else { std::str::from_utf8(frac_digits).unwrap() };
    let sign = if negative { "-" } else { "" };
    let value: f64 = format!("{sign}{int_part}.{frac_part}")
        .parse()
        .map_err(|_| LexError("malformed real number"))?;
    Ok((rest, Token::Real(value)))
}

/// Parse a literal string enclosed in parentheses (ISO 32000-1 §7.3.4.2).
/// Balanced nested parentheses and backslash escapes are tracked to find
/// the matching closing `)`; decoding the escapes themselves is a parser
/// concern, not a lexer one.
fn parse_literal_string(input: &[u8]) -> LexResult<'_, Token<'_>> {
    if input.first() != Some(&b'(') {
        return Err(LexError("not a literal string"));
    }
    let body = &input[1..];
    let mut depth = 1usize;
    let mut i = 0;
    while depth > 0 {
        let Some(&b) = body.get(i) else {
            return Err(LexError("unterminated literal string"));
        };
        match b {
            b'\\' => {
                i += 1;
                match body.get(i) {
                    Some(d) if d.is_ascii_digit() => {
                        i += 1;
                        for _ in 0..2 {
                            if body.get(i).is_some_and(u8::is_ascii_digit) {
                                i += 1;
                            }
                        }
                    },
                    Some(_) => i += 1,
                    None => {},
                }
            },
            b'(' => {
                depth += 1;
                i += 1;
            },
            b')' => {
                depth -= 1;
                i += 1;
            },
            _ => i += 1,
        }
    }
    let content = &body[..i - 1];
    Ok((&body[i..], Token::LiteralString(content)))
}

/// Parse a hexadecimal string enclosed in angle brackets (ISO 32000-1
/// §7.3.4.3). Must not be mistaken for a dictionary's `<<`.
fn parse_hex_string(input: &[u8]) -> LexResult<'_, Token<'_>> {
    if input.first() != Some(&b'<') || input.get(1) == Some(&b'<') {
        return Err(LexError("not a hex string"));
    }
    let body = &input[1..];
    let end = body.iter().position(|&b| b == b'>').ok_or(LexError("unterminated hex string"))?;
    let content = &body[..end];
    if !content.iter().all(|&b| b.is_ascii_hexdigit() || is_pdf_whitespace(b)) {
        return Err(LexError("invalid hex string digit"));
    }
    Ok((&body[end + 1..], Token::HexString(content)))
}

/// Decode #XX escape sequences in PDF names.
///
/// PDF Spec: ISO 32000-1:2008, Section 7.3.5 - Name Objects
///
/// Name objects can contain any characters encoded as #XX where XX is a
/// two-digit hexadecimal code. For example, /A#20B becomes "A B".
///
/// # Examples
///
/// ```
/// # use pdf_sanitize::lexer::decode_name_escapes;
/// assert_eq!(decode_name_escapes("A#20B#23C"), "A B#C");
/// assert_eq!(decode_name_escapes("Type"), "Type");
/// assert_eq!(decode_name_escapes("A#"), "A#"); // Invalid sequence preserved
/// ```
pub fn decode_name_escapes(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    let mut chars = name.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '#' {
            result.push(ch);
            continue;
        }
        let hex1 = chars.next();
        let hex2 = chars.next();
        match (hex1, hex2) {
            (Some(h1), Some(h2)) => {
                let hex_str = format!("{h1}{h2}");
                if let Ok(byte) = u8::from_str_radix(&hex_str, 16) {
                    result.push(byte as char);
                } else {
                    result.push('#');
                    result.push(h1);
                    result.push(h2);
                }
            },
            (Some(h1), None) => {
                result.push('#');
                result.push(h1);
            },
            _ => result.push('#'),
        }
    }

    result
}

/// Parse a name starting with `/` (ISO 32000-1 §7.3.5). Runs until
/// whitespace, a comment, or a delimiter; `#XX` escapes are decoded here
/// per spec, unlike literal/hex string escapes which stay raw.
fn parse_name(input: &[u8]) -> LexResult<'_, Token<'_>> {
    if input.first() != Some(&b'/') {
        return Err(LexError("not a name"));
    }
    let body = &input[1..];
    let end =
        body.iter().position(|&b| is_pdf_whitespace(b) || is_delimiter(b)).unwrap_or(body.len());
    let raw = std::str::from_utf8(&body[..end]).unwrap_or("");
    Ok((&body[end..], Token::Name(decode_name_escapes(raw))))
}

/// Fixed keywords and multi-character delimiters, tried longest-match
/// first: `<<`/`>>` before the hex-string `<`, `endstream`/`endobj`
/// before `stream`/`obj`.
const KEYWORDS: &[(&[u8], Token<'static>)] = &[
    (b"false", Token::False),
    (b"true", Token::True),
    (b"null", Token::Null),
    (b"endobj", Token::ObjEnd),
    (b"obj", Token::ObjStart),
    (b"endstream", Token::StreamEnd),
    (b"stream", Token::StreamStart),
    (b"<<", Token::DictStart),
    (b">>", Token::DictEnd),
    (b"[", Token::ArrayStart),
    (b"]", Token::ArrayEnd),
    (b"R", Token::R),
];

fn parse_keyword(input: &[u8]) -> LexResult<'_, Token<'_>> {
    for (tag, tok) in KEYWORDS {
        if input.starts_with(tag) {
            return Ok((&input[tag.len()..], tok.clone()));
        }
    }
    Err(LexError("not a keyword"))
}

/// Parse a single PDF token.
///
/// Skips whitespace/comments, then tries each token form in a fixed order:
/// keywords and delimiters first (so `obj`/`R`/`<<` aren't mistaken for
/// names or numbers), then names, then numbers, then the two string forms.
/// Returns `Err` if the input doesn't start with a valid token — there is
/// no catch-all that admits an unrecognized bareword.
pub fn token(input: &[u8]) -> LexResult<'_, Token<'_>> {
    let input = skip_ws_and_comments(input);

    parse_keyword(input)
        .or_else(|_| parse_name(input))
        .or_else(|_| parse_number(input))
        .or_else(|_| parse_literal_string(input))
        .or_else(|_| parse_hex_string(input))
}

/// Repeatedly call [`token`] until the input is exhausted or a token fails
/// to parse. Unlike [`token`], running out of recognizable tokens is not an
/// error here — callers use this to greedily collect what they can.
pub fn tokens(input: &[u8]) -> LexResult<'_, Vec<Token<'_>>> {
    let mut out = Vec::new();
    let mut rest = input;
    loop {
        if skip_ws_and_comments(rest).is_empty() {
            return Ok((rest, out));
        }
        match token(rest) {
            Ok((next, tok)) => {
                out.push(tok);
                rest = next;
            },
            Err(_) => return Ok((rest, out)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_positive_integer() {
        let result = token(b"42");
        assert_eq!(result, Ok((&b""[..], Token::Integer(42))));
    }

    #[test]
    fn test_parse_negative_integer() {
        let result = token(b"-123");
        assert_eq!(result, Ok((&b""[..], Token::Integer(-123))));
    }

    #[test]
    fn test_parse_zero() {
        let result = token(b"0");
        assert_eq!(result, Ok((&b""[..], Token::Integer(0))));
    }

    #[test]
    #[allow(clippy::approx_constant)]
    fn test_parse_positive_real() {
        let result = token(b"3.14");
        assert_eq!(result, Ok((&b""[..], Token::Real(3.14))));
    }

    #[test]
    fn test_parse_negative_real() {
        let result = token(b"-2.5");
        assert_eq!(result, Ok((&b""[..], Token::Real(-2.5))));
    }

    #[test]
    fn test_parse_real_starting_with_dot() {
        let result = token(b".5");
        assert_eq!(result, Ok((&b""[..], Token::Real(0.5))));
    }

    #[test]
    fn test_parse_real_ending_with_dot() {
        let result = token(b"5.");
        assert_eq!(result, Ok((&b""[..], Token::Real(5.0))));
    }

    #[test]
    fn test_parse_negative_real_starting_with_dot() {
        let result = token(b"-.002");
        assert_eq!(result, Ok((&b""[..], Token::Real(-0.002))));
    }

    #[test]
    fn test_parse_literal_string() {
        let result = token(b"(Hello)");
        assert_eq!(result, Ok((&b""[..], Token::LiteralString(b"Hello"))));
    }

    #[test]
    fn test_parse_literal_string_with_spaces() {
        let result = token(b"(Hello World)");
        assert_eq!(result, Ok((&b""[..], Token::LiteralString(b"Hello World"))));
    }

    #[test]
    fn test_parse_literal_string_with_nested_parens() {
        let result = token(b"(Hello (nested) World)");
        assert_eq!(result, Ok((&b""[..], Token::LiteralString(b"Hello (nested) World"))));
    }

    #[test]
    fn test_parse_literal_string_with_escape() {
        let result = token(b"(Line1\\nLine2)");
        assert_eq!(result, Ok((&b""[..], Token::LiteralString(b"Line1\\nLine2"))));
    }

    #[test]
    fn test_parse_literal_string_with_escaped_paren() {
        let result = token(b"(Open \\( Close \\))");
        assert_eq!(result, Ok((&b""[..], Token::LiteralString(b"Open \\( Close \\)"))));
    }

    #[test]
    fn test_parse_empty_literal_string() {
        let result = token(b"()");
        assert_eq!(result, Ok((&b""[..], Token::LiteralString(b""))));
    }

    #[test]
    fn test_parse_literal_string_unterminated() {
        assert!(token(b"(Hello").is_err());
    }

    #[test]
    fn test_parse_hex_string() {
        let result = token(b"<48656C6C6F>");
        assert_eq!(result, Ok((&b""[..], Token::HexString(b"48656C6C6F"))));
    }

    #[test]
    fn test_parse_hex_string_with_whitespace() {
        let result = token(b"<48 65 6C 6C 6F>");
        assert_eq!(result, Ok((&b""[..], Token::HexString(b"48 65 6C 6C 6F"))));
    }

    #[test]
    fn test_parse_empty_hex_string() {
        let result = token(b"<>");
        assert_eq!(result, Ok((&b""[..], Token::HexString(b""))));
    }

    #[test]
    fn test_parse_hex_string_rejects_non_hex_digit() {
        assert!(token(b"<48ZZ>").is_err());
    }

    #[test]
    fn test_parse_name() {
        let result = token(b"/Type");
        assert_eq!(result, Ok((&b""[..], Token::Name("Type".to_string()))));
    }

    #[test]
    fn test_parse_name_with_special_chars() {
        let result = token(b"/A;Name_With-Various***Characters");
        assert_eq!(
            result,
            Ok((&b""[..], Token::Name("A;Name_With-Various***Characters".to_string())))
        );
    }

    #[test]
    fn test_parse_empty_name() {
        let result = token(b"/ ");
        assert_eq!(result, Ok((&b" "[..], Token::Name("".to_string()))));
    }

    #[test]
    fn test_parse_name_with_hex_escape() {
        let result = token(b"/A#20B");
        assert_eq!(result, Ok((&b""[..], Token::Name("A B".to_string()))));
    }

    #[test]
    fn test_parse_name_with_multiple_hex_escapes() {
        let result = token(b"/A#20B#23C");
        assert_eq!(result, Ok((&b""[..], Token::Name("A B#C".to_string()))));
    }

    #[test]
    fn test_parse_name_with_invalid_hex_escape() {
        let result = token(b"/A#ZZ");
        assert_eq!(result, Ok((&b""[..], Token::Name("A#ZZ".to_string()))));
    }

    #[test]
    fn test_decode_name_escapes_directly() {
        assert_eq!(decode_name_escapes("Type"), "Type");
        assert_eq!(decode_name_escapes("A#20B"), "A B");
        assert_eq!(decode_name_escapes("A#20B#23C"), "A B#C");
        assert_eq!(decode_name_escapes("A#"), "A#");
        assert_eq!(decode_name_escapes("A#2"), "A#2");
        assert_eq!(decode_name_escapes("A#ZZ"), "A#ZZ");
    }

    #[test]
    fn test_parse_true() {
        let result = token(b"true");
        assert_eq!(result, Ok((&b""[..], Token::True)));
    }

    #[test]
    fn test_parse_false() {
        let result = token(b"false");
        assert_eq!(result, Ok((&b""[..], Token::False)));
    }

    #[test]
    fn test_parse_null() {
        let result = token(b"null");
        assert_eq!(result, Ok((&b""[..], Token::Null)));
    }

    #[test]
    fn test_parse_array_start() {
        let result = token(b"[");
        assert_eq!(result, Ok((&b""[..], Token::ArrayStart)));
    }

    #[test]
    fn test_parse_array_end() {
        let result = token(b"]");
        assert_eq!(result, Ok((&b""[..], Token::ArrayEnd)));
    }

    #[test]
    fn test_parse_dict_start() {
        let result = token(b"<<");
        assert_eq!(result, Ok((&b""[..], Token::DictStart)));
    }

    #[test]
    fn test_parse_dict_end() {
        let result = token(b">>");
        assert_eq!(result, Ok((&b""[..], Token::DictEnd)));
    }

    #[test]
    fn test_parse_obj_start() {
        let result = token(b"obj");
        assert_eq!(result, Ok((&b""[..], Token::ObjStart)));
    }

    #[test]
    fn test_parse_obj_end() {
        let result = token(b"endobj");
        assert_eq!(result, Ok((&b""[..], Token::ObjEnd)));
    }

    #[test]
    fn test_parse_stream_start() {
        let result = token(b"stream");
        assert_eq!(result, Ok((&b""[..], Token::StreamStart)));
    }

    #[test]
    fn test_parse_stream_end() {
        let result = token(b"endstream");
        assert_eq!(result, Ok((&b""[..], Token::StreamEnd)));
    }

    #[test]
    fn test_parse_reference_marker() {
        let result = token(b"R");
        assert_eq!(result, Ok((&b""[..], Token::R)));
    }

    #[test]
    fn test_parse_unrecognized_bareword_fails_closed() {
        // "BT"/"Tj"/etc. are content-stream operators, not lexer keywords —
        // the allow-list for those lives in parser::content, not here.
        assert!(token(b"BT").is_err());
        assert!(token(b"Tj").is_err());
    }

    #[test]
    fn test_skip_leading_whitespace() {
        let result = token(b"  \n\t42");
        assert_eq!(result, Ok((&b""[..], Token::Integer(42))));
    }

    #[test]
    fn test_skip_comment() {
        let result = token(b"% This is a comment\n42");
        assert_eq!(result, Ok((&b""[..], Token::Integer(42))));
    }

    #[test]
    fn test_skip_multiple_comments() {
        let result = token(b"% Comment 1\n% Comment 2\n42");
        assert_eq!(result, Ok((&b""[..], Token::Integer(42))));
    }

    #[test]
    fn test_skip_mixed_whitespace_and_comments() {
        let result = token(b"  % Comment\n  \t% Another\n  42");
        assert_eq!(result, Ok((&b""[..], Token::Integer(42))));
    }

    #[test]
    fn test_multiple_tokens() {
        let input = b"42 /Type (Hello) true";
        let (input, tok1) = token(input).unwrap();
        assert_eq!(tok1, Token::Integer(42));

        let (input, tok2) = token(input).unwrap();
        assert_eq!(tok2, Token::Name("Type".to_string()));

        let (input, tok3) = token(input).unwrap();
        assert_eq!(tok3, Token::LiteralString(b"Hello"));

        let (input, tok4) = token(input).unwrap();
        assert_eq!(tok4, Token::True);
        assert_eq!(input, &b""[..]);
    }

    #[test]
    fn test_tokens_function() {
        let input = b"42 /Type (Hello) true";
        let (remaining, toks) = tokens(input).unwrap();
        assert_eq!(remaining, &b""[..]);
        assert_eq!(toks.len(), 4);
        assert_eq!(toks[0], Token::Integer(42));
        assert_eq!(toks[1], Token::Name("Type".to_string()));
        assert_eq!(toks[2], Token::LiteralString(b"Hello"));
        assert_eq!(toks[3], Token::True);
    }

    #[test]
    fn test_tokens_stops_before_unrecognized_bareword() {
        let input = b"42 BT";
        let (remaining, toks) = tokens(input).unwrap();
        assert_eq!(toks, vec![Token::Integer(42)]);
        assert_eq!(remaining, &b" BT"[..]);
    }

    #[test]
    fn test_dict_vs_hex_string() {
        let result = token(b"<<");
        assert_eq!(result, Ok((&b""[..], Token::DictStart)));

        let result = token(b"<ABC>");
        assert_eq!(result, Ok((&b""[..], Token::HexString(b"ABC"))));
    }

    #[test]
    fn test_complex_pdf_snippet() {
        let input = b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj";
        let (input, tok1) = token(input).unwrap();
        assert_eq!(tok1, Token::Integer(1));

        let (input, tok2) = token(input).unwrap();
        assert_eq!(tok2, Token::Integer(0));

        let (input, tok3) = token(input).unwrap();
        assert_eq!(tok3, Token::ObjStart);

        let (input, tok4) = token(input).unwrap();
        assert_eq!(tok4, Token::DictStart);

        let (input, tok5) = token(input).unwrap();
        assert_eq!(tok5, Token::Name("Type".to_string()));

        let (input, tok6) = token(input).unwrap();
        assert_eq!(tok6, Token::Name("Catalog".to_string()));

        let (input, tok7) = token(input).unwrap();
        assert_eq!(tok7, Token::Name("Pages".to_string()));

        let (input, tok8) = token(input).unwrap();
        assert_eq!(tok8, Token::Integer(2));

        let (input, tok9) = token(input).unwrap();
        assert_eq!(tok9, Token::Integer(0));

        let (input, tok10) = token(input).unwrap();
        assert_eq!(tok10, Token::R);

        let (input, tok11) = token(input).unwrap();
        assert_eq!(tok11, Token::DictEnd);

        let (input, tok12) = token(input).unwrap();
        assert_eq!(tok12, Token::ObjEnd);

        assert_eq!(input, &b""[..]);
    }

    #[test]
    fn test_real_vs_integer_distinction() {
        assert!(matches!(token(b"0").unwrap().1, Token::Integer(0)));
        assert!(matches!(token(b"42").unwrap().1, Token::Integer(42)));
        assert!(matches!(token(b"-123").unwrap().1, Token::Integer(-123)));

        assert!(matches!(token(b"0.0").unwrap().1, Token::Real(_)));
        assert!(matches!(token(b"3.14").unwrap().1, Token::Real(_)));
        assert!(matches!(token(b".5").unwrap().1, Token::Real(_)));
        assert!(matches!(token(b"5.").unwrap().1, Token::Real(_)));
    }
}
