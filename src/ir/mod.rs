//! Intermediate representation: the only artifact that crosses the
//! isolation boundary from worker to controller.
//!
//! Every field is bounded and explicitly typed — no raw PDF object
//! references, streams, or unescaped bytes cross without going through one
//! of these types. [`validate`] re-checks invariants I1-I6 on the
//! controller side, since the worker that produced this IR is itself
//! untrusted.

pub mod validate;

use serde::{Deserialize, Serialize};

/// A validated document, ready for reconstruction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Pages in document order. 1..=limits.max_pages.
    pub pages: Vec<Page>,
    /// SHA-256 of the original input bytes.
    pub source_sha256: [u8; 32],
    /// (major, minor) parsed from the input's `%PDF-N.N` header. Reconstruction
    /// never emits a version above this.
    pub pdf_version: (u8, u8),
    /// Version of the parser that produced this IR, for audit provenance.
    pub parser_version: String,
    /// Disallowed constructs found and stripped under a policy that
    /// continues rather than rejects. Empty for a document that had
    /// nothing to strip.
    pub threats: Vec<ThreatEvent>,
}

/// How dangerous a stripped construct was judged to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThreatSeverity {
    Low,
    Medium,
    High,
    Critical,
}

/// What happened to a disallowed construct once it was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThreatAction {
    /// Dropped from the IR entirely.
    Removed,
    /// Replaced with a neutral placeholder rather than dropped outright.
    Zeroed,
    /// Caused the whole document (or containing page) to be rejected.
    Rejected,
}

/// One disallowed construct encountered during parsing, recorded for the
/// audit trail's `threats_removed` field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatEvent {
    /// Stable name of the construct, e.g. `OpenAction/JavaScript`.
    pub kind: String,
    pub severity: ThreatSeverity,
    /// Where in the document it was found (object, page index, ...).
    pub locator: String,
    pub action: ThreatAction,
}

/// A single page's validated geometry, content, and resources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    /// (x0, y0, x1, y1), finite, x1 > x0, y1 > y0.
    pub media_box: MediaBox,
    /// Optional crop region, same shape constraints as `media_box`.
    pub crop_box: Option<MediaBox>,
    /// Pre-validated operator stream.
    pub content_ops: Vec<Op>,
    /// Local resource name -> standard-14 font.
    pub fonts: std::collections::BTreeMap<String, FontRef>,
    /// Local resource name -> decoded, measured image.
    pub images: std::collections::BTreeMap<String, ImageRef>,
}

/// A page or crop box: (x0, y0, x1, y1).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MediaBox {
    /// Lower-left x.
    pub x0: f64,
    /// Lower-left y.
    pub y0: f64,
    /// Upper-right x.
    pub x1: f64,
    /// Upper-right y.
    pub y1: f64,
}

impl MediaBox {
    /// Width × height, used against MAX_PAGE_AREA (invariant I3).
    pub fn area(&self) -> f64 {
        (self.x1 - self.x0) * (self.y1 - self.y0)
    }

    /// Whether the box satisfies I3: finite, non-NaN, x1>x0, y1>y0.
    pub fn is_well_formed(&self) -> bool {
        [self.x0, self.y0, self.x1, self.y1].iter().all(|v| v.is_finite())
            && self.x1 > self.x0
            && self.y1 > self.y0
    }
}

/// One content-stream instruction. Exhaustive — every variant here is the
/// entire allow-list (invariant I4); there is no catch-all "raw" variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Op {
    /// BT
    TextBegin,
    /// ET
    TextEnd,
    /// Td
    TextMoveAbs {
        /// Horizontal offset.
        x: f64,
        /// Vertical offset.
        y: f64,
    },
    /// TD
    TextMoveRel {
        /// Horizontal offset.
        x: f64,
        /// Vertical offset.
        y: f64,
    },
    /// T*
    TextMoveNext,
    /// Tm
    SetTextMatrix {
        /// Matrix a.
        a: f64,
        /// Matrix b.
        b: f64,
        /// Matrix c.
        c: f64,
        /// Matrix d.
        d: f64,
        /// Matrix e (x translation).
        e: f64,
        /// Matrix f (y translation).
        f: f64,
    },
    /// Tj — raw font-encoded bytes, opaque (O1).
    ShowText {
        /// Encoded text bytes.
        bytes: Vec<u8>,
    },
    /// TJ — mixed string/adjustment array.
    ShowTextArray {
        /// Each element is either encoded text or a positioning adjustment.
        elements: Vec<TextArrayElement>,
    },
    /// m
    MoveTo {
        /// X.
        x: f64,
        /// Y.
        y: f64,
    },
    /// l
    LineTo {
        /// X.
        x: f64,
        /// Y.
        y: f64,
    },
    /// c
    CurveTo {
        /// First control point x.
        x1: f64,
        /// First control point y.
        y1: f64,
        /// Second control point x.
        x2: f64,
        /// Second control point y.
        y2: f64,
        /// End point x.
        x3: f64,
        /// End point y.
        y3: f64,
    },
    /// h
    ClosePath,
    /// re
    Rect {
        /// X.
        x: f64,
        /// Y.
        y: f64,
        /// Width.
        w: f64,
        /// Height.
        h: f64,
    },
    /// f
    Fill,
    /// S
    Stroke,
    /// n
    EndPath,
    /// q
    SaveGraphicsState,
    /// Q
    RestoreGraphicsState,
    /// Do — resolves only to an `ImageRef` (invariant I1).
    InvokeXObject {
        /// Local resource name, a key in the page's `images`.
        name: String,
    },
}

/// One element of a `TJ` array: shown text or a positioning adjustment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TextArrayElement {
    /// Encoded text bytes.
    Text(Vec<u8>),
    /// Positioning adjustment in thousandths of text space units.
    Adjust(f64),
}

/// One of the fourteen standard base fonts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FontRef {
    /// Helvetica
    Helvetica,
    /// Helvetica-Bold
    HelveticaBold,
    /// Helvetica-Oblique
    HelveticaOblique,
    /// Helvetica-BoldOblique
    HelveticaBoldOblique,
    /// Times-Roman
    TimesRoman,
    /// Times-Bold
    TimesBold,
    /// Times-Italic
    TimesItalic,
    /// Times-BoldItalic
    TimesBoldItalic,
    /// Courier
    Courier,
    /// Courier-Bold
    CourierBold,
    /// Courier-Oblique
    CourierOblique,
    /// Courier-BoldOblique
    CourierBoldOblique,
    /// Symbol
    Symbol,
    /// ZapfDingbats
    ZapfDingbats,
}

impl FontRef {
    /// The canonical PDF `/BaseFont` name.
    pub fn canonical_name(&self) -> &'static str {
        match self {
            FontRef::Helvetica => "Helvetica",
            FontRef::HelveticaBold => "Helvetica-Bold",
            FontRef::HelveticaOblique => "Helvetica-Oblique",
            FontRef::HelveticaBoldOblique => "Helvetica-BoldOblique",
            FontRef::TimesRoman => "Times-Roman",
            FontRef::TimesBold => "Times-Bold",
            FontRef::TimesItalic => "Times-Italic",
            FontRef::TimesBoldItalic => "Times-BoldItalic",
            FontRef::Courier => "Courier",
            FontRef::CourierBold => "Courier-Bold",
            FontRef::CourierOblique => "Courier-Oblique",
            FontRef::CourierBoldOblique => "Courier-BoldOblique",
            FontRef::Symbol => "Symbol",
            FontRef::ZapfDingbats => "ZapfDingbats",
        }
    }

    /// Parse a `/BaseFont` name into one of the fourteen standard fonts.
    pub fn from_canonical_name(name: &str) -> Option<Self> {
        Some(match name {
            "Helvetica" => FontRef::Helvetica,
            "Helvetica-Bold" => FontRef::HelveticaBold,
            "Helvetica-Oblique" => FontRef::HelveticaOblique,
            "Helvetica-BoldOblique" => FontRef::HelveticaBoldOblique,
            "Times-Roman" => FontRef::TimesRoman,
            "Times-Bold" => FontRef::TimesBold,
            "Times-Italic" => FontRef::TimesItalic,
            "Times-BoldItalic" => FontRef::TimesBoldItalic,
            "Courier" => FontRef::Courier,
            "Courier-Bold" => FontRef::CourierBold,
            "Courier-Oblique" => FontRef::CourierOblique,
            "Courier-BoldOblique" => FontRef::CourierBoldOblique,
            "Symbol" => FontRef::Symbol,
            "ZapfDingbats" => FontRef::ZapfDingbats,
            _ => return None,
        })
    }
}

/// Allow-listed image color space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorSpace {
    /// 1 component.
    DeviceGray,
    /// 3 components.
    DeviceRGB,
    /// 4 components.
    DeviceCMYK,
}

impl ColorSpace {
    /// Number of color components.
    pub fn components(&self) -> u8 {
        match self {
            ColorSpace::DeviceGray => 1,
            ColorSpace::DeviceRGB => 3,
            ColorSpace::DeviceCMYK => 4,
        }
    }
}

/// Allow-listed image filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageFilter {
    /// FlateDecode
    FlateDecode,
    /// DCTDecode (JPEG)
    DctDecode,
    /// CCITTFaxDecode
    CcittFaxDecode,
    /// JBIG2Decode — accepted only if the configured allow-list opts in;
    /// the shipped decoder always fails (see `crate::decoders::jbig2`).
    Jbig2Decode,
}

/// A decoded, measured image (invariant I5 already checked by the time one
/// of these exists).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRef {
    /// Width in pixels, positive, bounded by MAX_IMAGE_DIMENSION.
    pub width: u32,
    /// Height in pixels, positive, bounded by MAX_IMAGE_DIMENSION.
    pub height: u32,
    /// Color space.
    pub color_space: ColorSpace,
    /// Bits per component: one of {1, 2, 4, 8, 16}.
    pub bits_per_comp: u8,
    /// Filters that were applied to reach `pixel_data`, in order, recorded
    /// for audit — the bytes themselves are already fully decoded.
    pub filter_chain: Vec<ImageFilter>,
    /// Fully decoded pixel bytes, width*height*components*bits/8 long.
    pub pixel_data: Vec<u8>,
}

impl ImageRef {
    /// Expected decoded length given the declared dimensions.
    pub fn expected_byte_len(&self) -> usize {
        let bits_per_pixel = self.color_space.components() as usize * self.bits_per_comp as usize;
        let bytes_per_row = (self.width as usize * bits_per_pixel).div_ceil(8);
        bytes_per_row * self.height as usize
    }
}
