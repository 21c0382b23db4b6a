//! DCTDecode (JPEG) implementation.
//!
//! Unlike a pass-through extractor, this decoder fully decodes the JPEG to
//! raw sample bytes. Invariant I5 requires every image to be decoded and
//! measured before IR admission, so a corrupt or hostile JPEG has to fail
//! here rather than ride along as opaque bytes to be decoded later by a
//! renderer that might not reject it.

use crate::decoders::StreamDecoder;
use crate::error::{ParseFailure, Result};
use image::codecs::jpeg::JpegDecoder;
use image::ImageDecoder;

/// DCTDecode filter implementation.
pub struct DctDecoder;

impl StreamDecoder for DctDecoder {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let decoder = JpegDecoder::new(std::io::Cursor::new(input))
            .map_err(|e| ParseFailure::decode_failed("DCTDecode", e))?;

        let mut buf = vec![0u8; decoder.total_bytes() as usize];
        decoder
            .read_image(&mut buf)
            .map_err(|e| ParseFailure::decode_failed("DCTDecode", e))?;

        Ok(buf)
    }

    fn name(&self) -> &str {
        "DCTDecode"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dct_decode_rejects_non_jpeg() {
        let decoder = DctDecoder;
        assert!(decoder.decode(b"not a jpeg").is_err());
    }

    #[test]
    fn test_dct_decode_rejects_empty() {
        let decoder = DctDecoder;
        assert!(decoder.decode(b"").is_err());
    }

    #[test]
    fn test_dct_decoder_name() {
        assert_eq!(DctDecoder.name(), "DCTDecode");
    }
}
