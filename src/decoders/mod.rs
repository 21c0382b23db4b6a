//! Stream decoder implementations for PDF filters.
//!
//! Eight filters are recognized: FlateDecode, ASCIIHexDecode, ASCII85Decode,
//! LZWDecode, RunLengthDecode, DCTDecode, CCITTFaxDecode, JBIG2Decode.
//! [`decode_stream`] chains them in declaration order and applies a PNG/TIFF
//! predictor afterward if one is declared. Every step is fail-closed: a
//! filter that can't decode its input cleanly returns an error, never a
//! best-effort guess.

use crate::error::{ParseFailure, Result};
use crate::parser_config::ParserLimits;

mod ascii85;
mod ascii_hex;
mod ccitt;
mod dct;
mod flate;
mod jbig2;
mod lzw;
mod predictor;
mod runlength;

pub use ascii85::Ascii85Decoder;
pub use ascii_hex::AsciiHexDecoder;
pub use ccitt::CcittFaxDecoder;
pub use dct::DctDecoder;
pub use flate::FlateDecoder;
pub use jbig2::Jbig2Decoder;
pub use lzw::LzwDecoder;
pub use predictor::{DecodeParams, PngPredictor, decode_predictor};
pub use runlength::RunLengthDecoder;

/// PDF stream filter types recognized by the allow-list parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    /// FlateDecode (deflate/zlib compression)
    FlateDecode,
    /// ASCIIHexDecode (hexadecimal encoding)
    ASCIIHexDecode,
    /// ASCII85Decode (base-85 encoding)
    ASCII85Decode,
    /// LZWDecode (Lempel-Ziv-Welch compression)
    LZWDecode,
    /// RunLengthDecode (run-length encoding)
    RunLengthDecode,
    /// DCTDecode (JPEG compression)
    DCTDecode,
    /// CCITTFaxDecode (CCITT Fax compression)
    CCITTFaxDecode,
    /// JBIG2Decode (JBIG2 compression) — always rejected, see [`Jbig2Decoder`].
    JBIG2Decode,
}

impl Filter {
    /// Parse a `/Filter` name, returning `None` for anything off the
    /// allow-list rather than a catch-all variant.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "FlateDecode" => Some(Filter::FlateDecode),
            "ASCIIHexDecode" => Some(Filter::ASCIIHexDecode),
            "ASCII85Decode" => Some(Filter::ASCII85Decode),
            "LZWDecode" => Some(Filter::LZWDecode),
            "RunLengthDecode" => Some(Filter::RunLengthDecode),
            "DCTDecode" => Some(Filter::DCTDecode),
            "CCITTFaxDecode" => Some(Filter::CCITTFaxDecode),
            "JBIG2Decode" => Some(Filter::JBIG2Decode),
            _ => None,
        }
    }

    /// The canonical PDF name for this filter.
    pub fn name(&self) -> &'static str {
        match self {
            Filter::FlateDecode => "FlateDecode",
            Filter::ASCIIHexDecode => "ASCIIHexDecode",
            Filter::ASCII85Decode => "ASCII85Decode",
            Filter::LZWDecode => "LZWDecode",
            Filter::RunLengthDecode => "RunLengthDecode",
            Filter::DCTDecode => "DCTDecode",
            Filter::CCITTFaxDecode => "CCITTFaxDecode",
            Filter::JBIG2Decode => "JBIG2Decode",
        }
    }
}

/// A single PDF stream filter.
pub trait StreamDecoder {
    /// Decode the input data, or fail if it can't be decoded cleanly.
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>>;

    /// The filter's canonical name, used in error messages.
    fn name(&self) -> &str;
}

fn build_decoder(filter_name: &str, params: Option<&DecodeParams>) -> Result<Box<dyn StreamDecoder>> {
    match filter_name {
        "FlateDecode" => Ok(Box::new(FlateDecoder)),
        "ASCIIHexDecode" => Ok(Box::new(AsciiHexDecoder)),
        "ASCII85Decode" => Ok(Box::new(Ascii85Decoder)),
        "LZWDecode" => Ok(Box::new(LzwDecoder)),
        "RunLengthDecode" => Ok(Box::new(RunLengthDecoder)),
        "DCTDecode" => Ok(Box::new(DctDecoder)),
        "CCITTFaxDecode" => Ok(Box::new(CcittFaxDecoder::new(params.cloned().unwrap_or_default()))),
        "JBIG2Decode" => Ok(Box::new(Jbig2Decoder)),
        other => Err(crate::error::Error::Parse(ParseFailure::NotWhitelisted {
            construct: "filter",
            name: other.to_string(),
        })),
    }
}

/// Decode stream data through its declared filter pipeline, then apply a
/// predictor if one is declared in `/DecodeParms`.
///
/// Decompression is bounded by `limits.max_decompression_ratio` and
/// `limits.max_decompressed_size` after every filter stage, not just the
/// last one, since a filter chain can expand data at each step.
pub fn decode_stream(
    data: &[u8],
    filters: &[String],
    params: Option<&DecodeParams>,
    limits: &ParserLimits,
) -> Result<Vec<u8>> {
    let compressed_size = data.len().max(1);
    let mut current = data.to_vec();

    for filter_name in filters {
        let decoder = build_decoder(filter_name, params)?;
        current = decoder.decode(&current)?;

        if limits.max_decompression_ratio > 0 {
            let ratio = current.len() as u64 / compressed_size as u64;
            if ratio > limits.max_decompression_ratio as u64 {
                return Err(crate::error::Error::Parse(ParseFailure::DecompressionBudgetExceeded {
                    compressed: compressed_size,
                    actual: current.len(),
                    max_ratio: limits.max_decompression_ratio,
                    max_size: limits.max_decompressed_size,
                }));
            }
        }

        if limits.max_decompressed_size > 0 && current.len() > limits.max_decompressed_size {
            return Err(crate::error::Error::Parse(ParseFailure::DecompressionBudgetExceeded {
                compressed: compressed_size,
                actual: current.len(),
                max_ratio: limits.max_decompression_ratio,
                max_size: limits.max_decompressed_size,
            }));
        }
    }

    if let Some(params) = params {
        if params.predictor != 1 {
            current = decode_predictor(&current, params)?;
        }
    }

    Ok(current)
}
