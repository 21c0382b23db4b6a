//! JBIG2Decode implementation.
//!
//! No JBIG2 decoder is implemented. This is the one filter the engine is
//! honest about not supporting rather than faking: an allow-listed config
//! can opt JBIG2Decode into the accepted image-filter set, but a stream
//! actually tagged with it is always rejected since nothing here decodes
//! it to measurable pixel bytes, and invariant I5 forbids admitting an
//! image that was never decoded.
//!
//! PDF Spec: ISO 32000-1:2008, Section 7.4.7.

use crate::decoders::StreamDecoder;
use crate::error::{ParseFailure, Result};

/// JBIG2Decode filter implementation. Always rejects.
pub struct Jbig2Decoder;

impl StreamDecoder for Jbig2Decoder {
    fn decode(&self, _input: &[u8]) -> Result<Vec<u8>> {
        Err(ParseFailure::decode_failed("JBIG2Decode", "JBIG2 decoding is not implemented"))
    }

    fn name(&self) -> &str {
        "JBIG2Decode"
    }
}
