use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CaptureEncoding {
    Jpeg,
    Png,
    /// Tightly packed 8-bit RGB, row-major.
    Rgb8,
    /// Tightly packed 8-bit RGBA, row-major. Alpha is discarded.
    Rgba8,
}

impl CaptureEncoding {
    /// Guess the encoding of a still from its file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(CaptureEncoding::Jpeg),
            "png" => Some(CaptureEncoding::Png),
            _ => None,
        }
    }

    pub(crate) fn raw_channels(&self) -> Option<usize> {
        match self {
            CaptureEncoding::Rgb8 => Some(3),
            CaptureEncoding::Rgba8 => Some(4),
            CaptureEncoding::Jpeg | CaptureEncoding::Png => None,
        }
    }
}

/// One still image handed over by the capture service.
///
/// For compressed encodings `width`/`height` are what the camera declared; the
/// decoder is authoritative. For raw encodings they define the buffer layout.
#[derive(Debug, Clone)]
pub struct CaptureBuffer {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub encoding: CaptureEncoding,
}

impl CaptureBuffer {
    pub fn new(bytes: Vec<u8>, width: u32, height: u32, encoding: CaptureEncoding) -> Self {
        Self {
            bytes,
            width,
            height,
            encoding,
        }
    }

    /// Wrap an encoded still whose dimensions are only known after decoding.
    pub fn encoded(bytes: Vec<u8>, encoding: CaptureEncoding) -> Self {
        Self::new(bytes, 0, 0, encoding)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
