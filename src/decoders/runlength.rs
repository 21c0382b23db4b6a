//! RunLengthDecode implementation.
//!
//! Decodes run-length encoded data per ISO 32000-1 §7.4.5:
//! - length byte 0-127: copy the next `length + 1` bytes literally
//! - length byte 128: EOD marker, decoding stops here
//! - length byte 129-255: repeat the next single byte `257 - length` times
//!
//! A missing EOD marker is rejected rather than treated as an implicit end
//! of data — this decoder never guesses where a truncated stream meant to
//! stop.

use crate::decoders::StreamDecoder;
use crate::error::{ParseFailure, Result};

const EOD: u8 = 128;

/// RunLengthDecode filter implementation.
pub struct RunLengthDecoder;

impl StreamDecoder for RunLengthDecoder {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        let mut cursor = input;

        loop {
            let Some((&op, rest)) = cursor.split_first() else {
                return Err(ParseFailure::decode_failed("RunLengthDecode", "missing EOD marker"));
            };

            match op {
                EOD => return Ok(output),
                0..=127 => {
                    let count = op as usize + 1;
                    let run = rest.get(..count).ok_or_else(|| {
                        ParseFailure::decode_failed(
                            "RunLengthDecode",
                            format!("not enough data for literal run (need {count}, have {})", rest.len()),
                        )
                    })?;
                    output.extend_from_slice(run);
                    cursor = &rest[count..];
                },
                _ => {
                    let count = 257 - op as usize;
                    let &byte = rest.first().ok_or_else(|| {
                        ParseFailure::decode_failed("RunLengthDecode", "missing byte for run")
                    })?;
                    output.resize(output.len() + count, byte);
                    cursor = &rest[1..];
                },
            }
        }
    }

    fn name(&self) -> &str {
        "RunLengthDecode"
    }
}
