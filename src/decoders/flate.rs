//! FlateDecode (zlib/deflate).
//!
//! A stream labeled `/FlateDecode` either decompresses cleanly under zlib or
//! it doesn't — there is no recovery ladder here. A corrupt or mislabeled
//! stream is malicious or broken input either way, and both get rejected.

use crate::decoders::StreamDecoder;
use crate::error::{Error, ParseFailure, Result};
use flate2::read::ZlibDecoder;
use std::io::Read;

/// FlateDecode filter implementation.
pub struct FlateDecoder;

impl StreamDecoder for FlateDecoder {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut decoder = ZlibDecoder::new(input);
        let mut output = Vec::new();
        decoder.read_to_end(&mut output).map_err(|e| {
            Error::Parse(ParseFailure::DecodeFailed {
                filter: "FlateDecode".to_string(),
                reason: e.to_string(),
            })
        })?;
        Ok(output)
    }

    fn name(&self) -> &str {
        "FlateDecode"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::ZlibEncoder;
    use std::io::Write;

    #[test]
    fn test_flate_decode_simple() {
        let decoder = FlateDecoder;
        let original = b"Hello, FlateDecode!";
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(original).unwrap();
        let compressed = encoder.finish().unwrap();

        let decoded = decoder.decode(&compressed).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_flate_decode_empty() {
        let decoder = FlateDecoder;
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"").unwrap();
        let compressed = encoder.finish().unwrap();

        let decoded = decoder.decode(&compressed).unwrap();
        assert_eq!(decoded, b"");
    }

    #[test]
    fn test_flate_decode_large_data() {
        let decoder = FlateDecoder;
        let original = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ".repeat(1000);
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&original).unwrap();
        let compressed = encoder.finish().unwrap();

        let decoded = decoder.decode(&compressed).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_flate_decode_invalid_data_rejected() {
        let decoder = FlateDecoder;
        let invalid = b"This is not zlib compressed data";
        assert!(decoder.decode(invalid).is_err());
    }

    #[test]
    fn test_flate_decoder_name() {
        assert_eq!(FlateDecoder.name(), "FlateDecode");
    }
}
