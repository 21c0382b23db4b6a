//! CCITTFaxDecode implementation.
//!
//! Group 3 and Group 4 fax decompression for the bilevel images scanned
//! documents embed. Unlike an extractor tolerating real-world PDFs for best
//! recall, this decoder runs once, with the dimensions declared in
//! `/DecodeParms`, and rejects anything it can't decode cleanly — no
//! leading-zero-stripping retry, no white-pixel fallback on failure. A
//! CCITT stream that fails to decode never reaches the image-size check in
//! [`crate::object::Object::decode_stream_data`], so a silent fallback here
//! would mean admitting an image nobody actually decoded.
//!
//! PDF Spec: ISO 32000-1:2008, Section 7.4.6.

use crate::decoders::{DecodeParams, StreamDecoder};
use crate::error::{ParseFailure, Result};

/// CCITTFaxDecode filter implementation, parameterized by the stream's
/// `/DecodeParms` dictionary.
pub struct CcittFaxDecoder {
    params: DecodeParams,
}

impl CcittFaxDecoder {
    /// Build a decoder for the given `/DecodeParms`.
    pub fn new(params: DecodeParams) -> Self {
        Self { params }
    }

    /// `/K` < 0 selects Group 4 (T.6); `/K` >= 0 selects Group 3 (T.4).
    fn is_group_4(&self) -> bool {
        self.params.k < 0
    }
}

impl StreamDecoder for CcittFaxDecoder {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        if self.params.columns == 0 {
            return Err(ParseFailure::decode_failed(
                "CCITTFaxDecode",
                "missing required /Columns parameter",
            ));
        }

        let width = self.params.columns;
        let height = self.params.rows;

        let mut output = decode_with_fax(input, width, height, self.is_group_4())?;

        if self.params.black_is_1 {
            for byte in output.iter_mut() {
                *byte = !*byte;
            }
        }

        if let Some(expected_rows) = height {
            let bytes_per_row = width.div_ceil(8);
            let expected_len = expected_rows as usize * bytes_per_row;
            if output.len() != expected_len {
                return Err(ParseFailure::decode_failed(
                    "CCITTFaxDecode",
                    format!(
                        "decoded {} bytes, expected {} for {}x{}",
                        output.len(),
                        expected_len,
                        width,
                        expected_rows
                    ),
                ));
            }
        }

        Ok(output)
    }

    fn name(&self) -> &str {
        "CCITTFaxDecode"
    }
}

fn decode_with_fax(data: &[u8], width: usize, height: Option<u32>, group_4: bool) -> Result<Vec<u8>> {
    use fax::decoder;

    let height_u16 = height.map(|h| h as u16);
    let mut output_rows: Vec<Vec<u8>> = Vec::new();
    let bytes_iter = data.iter().copied();

    let success = if group_4 {
        decoder::decode_g4(bytes_iter, width as u16, height_u16, |transitions: &[u16]| {
            output_rows.push(transitions_to_bytes(transitions, width));
        })
    } else {
        decoder::decode_g3(bytes_iter, |transitions: &[u16]| {
            output_rows.push(transitions_to_bytes(transitions, width));
        })
    };

    if success.is_none() {
        return Err(ParseFailure::decode_failed("CCITTFaxDecode", "fax decoder rejected input"));
    }

    Ok(output_rows.into_iter().flatten().collect())
}

/// Convert run-length transition positions (alternating white/black runs,
/// starting white) into MSB-first packed pixel bytes.
fn transitions_to_bytes(transitions: &[u16], width: usize) -> Vec<u8> {
    let bytes_per_row = width.div_ceil(8);
    let mut row_bytes = vec![0u8; bytes_per_row];

    let mut is_black = false;
    let mut start_pos = 0usize;

    for &transition_pos in transitions {
        let transition_pos = transition_pos as usize;
        if is_black {
            for pixel_idx in start_pos..transition_pos.min(width) {
                let byte_idx = pixel_idx / 8;
                let bit_idx = 7 - (pixel_idx % 8);
                row_bytes[byte_idx] |= 1 << bit_idx;
            }
        }
        is_black = !is_black;
        start_pos = transition_pos;
    }

    if is_black && start_pos < width {
        for pixel_idx in start_pos..width {
            let byte_idx = pixel_idx / 8;
            let bit_idx = 7 - (pixel_idx % 8);
            row_bytes[byte_idx] |= 1 << bit_idx;
        }
    }

    row_bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions_to_bytes() {
        let transitions = vec![2, 5, 7];
        let row = transitions_to_bytes(&transitions, 8);
        assert_eq!(row.len(), 1);
        assert_eq!(row[0], 0b00111001);
    }

    #[test]
    fn test_ccitt_decode_rejects_missing_columns() {
        let decoder = CcittFaxDecoder::new(DecodeParams {
            columns: 0,
            ..Default::default()
        });
        assert!(decoder.decode(&[0u8; 4]).is_err());
    }

    #[test]
    fn test_ccitt_decode_rejects_garbage() {
        let decoder = CcittFaxDecoder::new(DecodeParams {
            columns: 8,
            rows: Some(1),
            k: -1,
            ..Default::default()
        });
        assert!(decoder.decode(&[0xFF, 0xFF, 0xFF]).is_err());
    }

    #[test]
    fn test_ccitt_decoder_name() {
        let decoder = CcittFaxDecoder::new(DecodeParams::default());
        assert_eq!(decoder.name(), "CCITTFaxDecode");
    }
}
