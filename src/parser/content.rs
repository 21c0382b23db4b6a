//! Content-stream operator decoder.
//!
//! There is no fallback path. `Tf`/`Tc`/`Tw`/`Tz`/`TL`/`Tr`/`Ts`, inline
//! images (`BI`), and every other operator outside
//! [`super::super::ir::Op`]'s enumeration are unrecognized by construction.
//! Any operator called with the wrong operand count or types, or any
//! operator not in that enumeration, rejects the whole page
//! (`UNKNOWN_OPERATOR`, invariant I4) rather than being dropped or guessed
//! at.

use crate::error::{ParseFailure, Result};
use crate::ir::{Op, TextArrayElement};
use crate::object::Object;
use crate::parser::reader::parse_object;
use crate::parser_config::ParserLimits;

fn not_whitelisted(name: &str) -> crate::error::Error {
    ParseFailure::NotWhitelisted { construct: "operator", name: name.to_string() }.into()
}

fn malformed(reason: impl Into<String>) -> crate::error::Error {
    ParseFailure::Malformed { offset: 0, reason: reason.into() }.into()
}

/// Decode a content stream into the closed [`Op`] enumeration.
pub fn parse_content_stream(data: &[u8], limits: &ParserLimits) -> Result<Vec<Op>> {
    let mut ops = Vec::new();
    let mut input = data;

    while !skip_whitespace(input).is_empty() {
        input = skip_whitespace(input);
        let (rest, op) = parse_one(input, limits)?;
        ops.push(op);
        input = rest;
    }

    Ok(ops)
}

fn skip_whitespace(input: &[u8]) -> &[u8] {
    let mut i = 0;
    while i < input.len() && input[i].is_ascii_whitespace() {
        i += 1;
    }
    &input[i..]
}

fn is_operator_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'\'' || b == b'"' || b == b'*'
}

fn parse_one<'a>(input: &'a [u8], limits: &ParserLimits) -> Result<(&'a [u8], Op)> {
    let mut operands: Vec<Object> = Vec::new();
    let mut remaining = input;

    loop {
        remaining = skip_whitespace(remaining);
        if remaining.is_empty() {
            return Err(malformed("content stream ended mid-operator"));
        }
        if remaining[0].is_ascii_alphabetic() || remaining[0] == b'\'' || remaining[0] == b'"' {
            let end = remaining.iter().position(|&b| !is_operator_byte(b)).unwrap_or(remaining.len());
            let (name_bytes, rest) = remaining.split_at(end);
            let name = std::str::from_utf8(name_bytes)
                .map_err(|_| malformed("operator name is not valid UTF-8"))?;
            let op = build_op(name, &operands)?;
            return Ok((rest, op));
        }

        let (rest, obj) = parse_object(remaining, 0, limits)?;
        operands.push(obj);
        remaining = rest;
    }
}

fn number(operands: &[Object], idx: usize) -> Result<f64> {
    operands
        .get(idx)
        .and_then(Object::as_real)
        .ok_or_else(|| malformed(format!("missing or non-numeric operand at index {idx}")))
}

fn build_op(name: &str, operands: &[Object]) -> Result<Op> {
    match name {
        "BT" => expect_arity(name, operands, 0).map(|_| Op::TextBegin),
        "ET" => expect_arity(name, operands, 0).map(|_| Op::TextEnd),
        "Td" => Ok(Op::TextMoveAbs { x: number(operands, 0)?, y: number(operands, 1)? }),
        "TD" => Ok(Op::TextMoveRel { x: number(operands, 0)?, y: number(operands, 1)? }),
        "T*" => expect_arity(name, operands, 0).map(|_| Op::TextMoveNext),
        "Tm" => Ok(Op::SetTextMatrix {
            a: number(operands, 0)?,
            b: number(operands, 1)?,
            c: number(operands, 2)?,
            d: number(operands, 3)?,
            e: number(operands, 4)?,
            f: number(operands, 5)?,
        }),
        "Tj" => {
            let bytes = operands
                .first()
                .and_then(Object::as_string)
                .ok_or_else(|| malformed("Tj requires a string operand"))?;
            Ok(Op::ShowText { bytes: bytes.to_vec() })
        },
        "TJ" => {
            let array = operands
                .first()
                .and_then(Object::as_array)
                .ok_or_else(|| malformed("TJ requires an array operand"))?;
            let mut elements = Vec::with_capacity(array.len());
            for item in array {
                match item {
                    Object::String(s) => elements.push(TextArrayElement::Text(s.clone())),
                    Object::Integer(_) | Object::Real(_) => {
                        elements.push(TextArrayElement::Adjust(item.as_real().unwrap()))
                    },
                    other => {
                        return Err(malformed(format!(
                            "TJ array element must be string or number, found {}",
                            other.type_name()
                        )));
                    },
                }
            }
            Ok(Op::ShowTextArray { elements })
        },
        "m" => Ok(Op::MoveTo { x: number(operands, 0)?, y: number(operands, 1)? }),
        "l" => Ok(Op::LineTo { x: number(operands, 0)?, y: number(operands, 1)? }),
        "c" => Ok(Op::CurveTo {
            x1: number(operands, 0)?,
            y1: number(operands, 1)?,
            x2: number(operands, 2)?,
            y2: number(operands, 3)?,
            x3: number(operands, 4)?,
            y3: number(operands, 5)?,
        }),
        "h" => expect_arity(name, operands, 0).map(|_| Op::ClosePath),
        "re" => Ok(Op::Rect {
            x: number(operands, 0)?,
            y: number(operands, 1)?,
            w: number(operands, 2)?,
            h: number(operands, 3)?,
        }),
        "f" | "F" | "f*" => expect_arity(name, operands, 0).map(|_| Op::Fill),
        "S" => expect_arity(name, operands, 0).map(|_| Op::Stroke),
        "n" => expect_arity(name, operands, 0).map(|_| Op::EndPath),
        "q" => expect_arity(name, operands, 0).map(|_| Op::SaveGraphicsState),
        "Q" => expect_arity(name, operands, 0).map(|_| Op::RestoreGraphicsState),
        "Do" => {
            let xobj_name = operands
                .first()
                .and_then(Object::as_name)
                .ok_or_else(|| malformed("Do requires a name operand"))?;
            Ok(Op::InvokeXObject { name: xobj_name.to_string() })
        },
        other => Err(not_whitelisted(other)),
    }
}

fn expect_arity(name: &str, operands: &[Object], expected: usize) -> Result<()> {
    if operands.len() != expected {
        return Err(malformed(format!(
            "{name} expects {expected} operands, found {}",
            operands.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_text_stream() {
        let data = b"BT /F1 12 Tf 100 700 Td (Hello) Tj ET";
        // /F1 12 Tf is not on the allow-list, so this rejects.
        let limits = ParserLimits::default();
        assert!(parse_content_stream(data, &limits).is_err());
    }

    #[test]
    fn test_parse_allowed_text_stream() {
        let data = b"q BT 100 700 Td (Hello) Tj ET Q";
        let limits = ParserLimits::default();
        let ops = parse_content_stream(data, &limits).unwrap();
        assert_eq!(
            ops,
            vec![
                Op::SaveGraphicsState,
                Op::TextBegin,
                Op::TextMoveAbs { x: 100.0, y: 700.0 },
                Op::ShowText { bytes: b"Hello".to_vec() },
                Op::TextEnd,
                Op::RestoreGraphicsState,
            ]
        );
    }

    #[test]
    fn test_parse_rejects_unknown_operator() {
        let data = b"1 w";
        let limits = ParserLimits::default();
        assert!(parse_content_stream(data, &limits).is_err());
    }

    #[test]
    fn test_parse_invoke_xobject() {
        let data = b"/Im1 Do";
        let limits = ParserLimits::default();
        let ops = parse_content_stream(data, &limits).unwrap();
        assert_eq!(ops, vec![Op::InvokeXObject { name: "Im1".to_string() }]);
    }

    #[test]
    fn test_parse_rectangle_and_fill() {
        let data = b"0 0 100 100 re f";
        let limits = ParserLimits::default();
        let ops = parse_content_stream(data, &limits).unwrap();
        assert_eq!(ops, vec![Op::Rect { x: 0.0, y: 0.0, w: 100.0, h: 100.0 }, Op::Fill]);
    }

    #[test]
    fn test_parse_text_array() {
        let data = b"[(A) -120 (B)] TJ";
        let limits = ParserLimits::default();
        let ops = parse_content_stream(data, &limits).unwrap();
        assert_eq!(
            ops,
            vec![Op::ShowTextArray {
                elements: vec![
                    TextArrayElement::Text(b"A".to_vec()),
                    TextArrayElement::Adjust(-120.0),
                    TextArrayElement::Text(b"B".to_vec()),
                ]
            }]
        );
    }

    #[test]
    fn test_parse_rejects_wrong_arity() {
        let data = b"1 2 3 m";
        let limits = ParserLimits::default();
        assert!(parse_content_stream(data, &limits).is_err());
    }
}
