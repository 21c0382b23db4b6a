//! Content-stream operator re-serialization.
//!
//! The inverse of [`crate::parser::content`]: each [`Op`] is written as its
//! operands followed by its operator keyword, space-separated, one
//! instruction per line. No comments, no operator aliasing (`f*` always
//! becomes `f`), nothing beyond the fixed [`Op`] enumeration can appear.

use crate::ir::{Op, TextArrayElement};
use std::io::Write;

/// Serialize a page's operator stream to PDF content-stream bytes.
pub fn write_content_stream(ops: &[Op]) -> Vec<u8> {
    let mut out = Vec::new();
    for op in ops {
        write_op(&mut out, op).expect("writing to a Vec<u8> cannot fail");
    }
    out
}

fn write_real<W: Write>(w: &mut W, value: f64) -> std::io::Result<()> {
    if value.fract() == 0.0 {
        write!(w, "{}", value as i64)
    } else {
        let formatted = format!("{value:.5}");
        let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
        write!(w, "{trimmed}")
    }
}

fn write_string<W: Write>(w: &mut W, bytes: &[u8]) -> std::io::Result<()> {
    write!(w, "(")?;
    for &b in bytes {
        match b {
            b'(' => write!(w, "\\(")?,
            b')' => write!(w, "\\)")?,
            b'\\' => write!(w, "\\\\")?,
            _ => w.write_all(&[b])?,
        }
    }
    write!(w, ")")
}

fn write_op<W: Write>(w: &mut W, op: &Op) -> std::io::Result<()> {
    match op {
        Op::TextBegin => writeln!(w, "BT"),
        Op::TextEnd => writeln!(w, "ET"),
        Op::TextMoveAbs { x, y } => {
            write_real(w, *x)?;
            write!(w, " ")?;
            write_real(w, *y)?;
            writeln!(w, " Td")
        },
        Op::TextMoveRel { x, y } => {
            write_real(w, *x)?;
            write!(w, " ")?;
            write_real(w, *y)?;
            writeln!(w, " TD")
        },
        Op::TextMoveNext => writeln!(w, "T*"),
        Op::SetTextMatrix { a, b, c, d, e, f } => {
            for v in [a, b, c, d, e, f] {
                write_real(w, *v)?;
                write!(w, " ")?;
            }
            writeln!(w, "Tm")
        },
        Op::ShowText { bytes } => {
            write_string(w, bytes)?;
            writeln!(w, " Tj")
        },
        Op::ShowTextArray { elements } => {
            write!(w, "[")?;
            for el in elements {
                match el {
                    TextArrayElement::Text(bytes) => write_string(w, bytes)?,
                    TextArrayElement::Adjust(v) => write_real(w, *v)?,
                }
                write!(w, " ")?;
            }
            writeln!(w, "] TJ")
        },
        Op::MoveTo { x, y } => {
            write_real(w, *x)?;
            write!(w, " ")?;
            write_real(w, *y)?;
            writeln!(w, " m")
        },
        Op::LineTo { x, y } => {
            write_real(w, *x)?;
            write!(w, " ")?;
            write_real(w, *y)?;
            writeln!(w, " l")
        },
        Op::CurveTo { x1, y1, x2, y2, x3, y3 } => {
            for v in [x1, y1, x2, y2, x3, y3] {
                write_real(w, *v)?;
                write!(w, " ")?;
            }
            writeln!(w, "c")
        },
        Op::ClosePath => writeln!(w, "h"),
        Op::Rect { x, y, w: rw, h } => {
            for v in [x, y, rw, h] {
                write_real(w, *v)?;
                write!(w, " ")?;
            }
            writeln!(w, "re")
        },
        Op::Fill => writeln!(w, "f"),
        Op::Stroke => writeln!(w, "S"),
        Op::EndPath => writeln!(w, "n"),
        Op::SaveGraphicsState => writeln!(w, "q"),
        Op::RestoreGraphicsState => writeln!(w, "Q"),
        Op::InvokeXObject { name } => {
            write!(w, "/")?;
            write!(w, "{name}")?;
            writeln!(w, " Do")
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_simple_text() {
        let ops = vec![
            Op::TextBegin,
            Op::TextMoveAbs { x: 72.0, y: 720.0 },
            Op::ShowText { bytes: b"Hi".to_vec() },
            Op::TextEnd,
        ];
        let out = String::from_utf8(write_content_stream(&ops)).unwrap();
        assert_eq!(out, "BT\n72 720 Td\n(Hi) Tj\nET\n");
    }

    #[test]
    fn test_write_rect_and_fill() {
        let ops = vec![Op::Rect { x: 0.0, y: 0.0, w: 10.5, h: 20.0 }, Op::Fill];
        let out = String::from_utf8(write_content_stream(&ops)).unwrap();
        assert_eq!(out, "0 0 10.5 20 re\nf\n");
    }

    #[test]
    fn test_write_invoke_xobject() {
        let ops = vec![Op::InvokeXObject { name: "Im1".to_string() }];
        let out = String::from_utf8(write_content_stream(&ops)).unwrap();
        assert_eq!(out, "/Im1 Do\n");
    }

    #[test]
    fn test_write_text_array() {
        let ops = vec![Op::ShowTextArray {
            elements: vec![
                TextArrayElement::Text(b"AB".to_vec()),
                TextArrayElement::Adjust(-120.0),
                TextArrayElement::Text(b"C".to_vec()),
            ],
        }];
        let out = String::from_utf8(write_content_stream(&ops)).unwrap();
        assert_eq!(out, "[(AB) -120 (C) ] TJ\n");
    }

    #[test]
    fn test_escapes_parens_in_strings() {
        let ops = vec![Op::ShowText { bytes: b"a(b)c".to_vec() }];
        let out = String::from_utf8(write_content_stream(&ops)).unwrap();
        assert_eq!(out, "(a\\(b\\)c) Tj\n");
    }
}
