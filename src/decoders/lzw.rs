//! LZWDecode implementation for PDF.
//!
//! Decompresses data using the Lempel-Ziv-Welch algorithm as specified in
//! the PDF Reference (Section 7.4.4): MSB-first bit ordering, 9-bit initial
//! codes, EarlyChange=1 (code size grows one code earlier than GIF/TIFF),
//! clear code 256, EOD code 257, first available code 258.

use crate::decoders::StreamDecoder;
use crate::error::{ParseFailure, Result};
use weezl::{BitOrder, decode::Decoder as WeezlDecoder};

/// LZWDecode filter implementation.
pub struct LzwDecoder;

impl StreamDecoder for LzwDecoder {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut decoder = WeezlDecoder::new(BitOrder::Msb, 8);
        decoder
            .decode(input)
            .map_err(|e| ParseFailure::decode_failed("LZWDecode", format!("{:?}", e)))
    }

    fn name(&self) -> &str {
        "LZWDecode"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weezl::encode::Encoder as LzwEncoder;

    #[test]
    fn test_lzw_decode_simple() {
        let decoder = LzwDecoder;
        let original = b"ABCABCABCABC";
        let mut encoder = LzwEncoder::new(BitOrder::Msb, 8);
        let compressed = encoder.encode(original).unwrap();

        let decoded = decoder.decode(&compressed).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_lzw_decode_empty() {
        let decoder = LzwDecoder;
        let original = b"";
        let mut encoder = LzwEncoder::new(BitOrder::Msb, 8);
        let compressed = encoder.encode(original).unwrap();

        let decoded = decoder.decode(&compressed).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_lzw_decode_repeated_pattern() {
        let decoder = LzwDecoder;
        let original = b"The quick brown fox jumps over the lazy dog. ".repeat(10);
        let mut encoder = LzwEncoder::new(BitOrder::Msb, 8);
        let compressed = encoder.encode(&original).unwrap();

        let decoded = decoder.decode(&compressed).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_lzw_decode_invalid_data_rejected() {
        let decoder = LzwDecoder;
        let invalid = b"This is not LZW compressed data";
        assert!(decoder.decode(invalid).is_err());
    }

    #[test]
    fn test_lzw_decoder_name() {
        assert_eq!(LzwDecoder.name(), "LZWDecode");
    }
}
