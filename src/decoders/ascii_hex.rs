//! ASCIIHexDecode implementation.
//!
//! Decodes hexadecimal-encoded data (e.g. "48656C6C6F" -> "Hello"), per
//! ISO 32000-1 §7.4.2. Decoding stops at the first `>` (EOD) marker;
//! anything after it is outside the string and never reaches the output.
//! Whitespace between digit pairs is ignored. An odd number of digits is
//! padded with an implicit trailing `0`, per spec. A byte that is neither a
//! hex digit, whitespace, nor `>` is rejected rather than silently dropped
//! — this decoder never guesses at malformed filter input.

use crate::decoders::StreamDecoder;
use crate::error::{ParseFailure, Result};

/// ASCIIHexDecode filter implementation.
pub struct AsciiHexDecoder;

impl StreamDecoder for AsciiHexDecoder {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let digits = collect_hex_digits(input)?;

        let mut output = Vec::with_capacity(digits.len().div_ceil(2));
        let mut pairs = digits.chunks(2);
        for pair in &mut pairs {
            let high = hex_value(pair[0])?;
            let low = if pair.len() == 2 { hex_value(pair[1])? } else { 0 };
            output.push((high << 4) | low);
        }

        Ok(output)
    }

    fn name(&self) -> &str {
        "ASCIIHexDecode"
    }
}

/// Scan for the digits that make up the string, stopping at the first `>`
/// (or end of input, which is tolerated — a missing EOD marker is common in
/// the wild and the byte count is still unambiguous).
fn collect_hex_digits(input: &[u8]) -> Result<Vec<u8>> {
    let mut digits = Vec::with_capacity(input.len());
    for &byte in input {
        if byte == b'>' {
            break;
        }
        if byte.is_ascii_whitespace() {
            continue;
        }
        if !byte.is_ascii_hexdigit() {
            return Err(ParseFailure::decode_failed(
                "ASCIIHexDecode",
                format!("invalid hex digit '{}'", byte as char),
            ));
        }
        digits.push(byte);
    }
    Ok(digits)
}

fn hex_value(digit: u8) -> Result<u8> {
    (digit as char)
        .to_digit(16)
        .map(|v| v as u8)
        .ok_or_else(|| ParseFailure::decode_failed("ASCIIHexDecode", format!("invalid hex digit '{}'", digit as char)))
}
