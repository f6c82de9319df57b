use image::{imageops::FilterType, DynamicImage, ImageFormat, RgbImage, RgbaImage};
use thiserror::Error;

use super::{CaptureBuffer, CaptureEncoding};

pub const TENSOR_WIDTH: u32 = 224;
pub const TENSOR_HEIGHT: u32 = 224;
pub const TENSOR_CHANNELS: usize = 3;
pub const TENSOR_LEN: usize = TENSOR_WIDTH as usize * TENSOR_HEIGHT as usize * TENSOR_CHANNELS;

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("shape mismatch: expected {expected} values, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },
    #[error("invalid pixel data at element {index}: {value}")]
    InvalidPixelData { index: usize, value: f32 },
    #[error("capture could not be decoded: {0}")]
    Decode(#[from] image::ImageError),
}

/// Classifier input: 224×224 RGB, row-major, channels interleaved
/// (`[r, g, b, r, g, b, ...]`), every value in `[-1, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct InputTensor {
    data: Vec<f32>,
}

impl InputTensor {
    /// Validates length and value range; nothing else constructs a tensor.
    pub fn from_vec(data: Vec<f32>) -> Result<Self, PreprocessError> {
        if data.len() != TENSOR_LEN {
            return Err(PreprocessError::ShapeMismatch {
                expected: TENSOR_LEN,
                actual: data.len(),
            });
        }

        if let Some((index, &value)) = data
            .iter()
            .enumerate()
            .find(|(_, v)| !v.is_finite() || !(-1.0..=1.0).contains(*v))
        {
            return Err(PreprocessError::InvalidPixelData { index, value });
        }

        Ok(Self { data })
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Value at column `x`, row `y`, channel `c`.
    pub fn at(&self, x: usize, y: usize, c: usize) -> f32 {
        self.data[(y * TENSOR_WIDTH as usize + x) * TENSOR_CHANNELS + c]
    }
}

/// Decode, resize and normalize one capture.
///
/// The capture is consumed; its bytes are dropped once the tensor exists.
pub fn to_tensor(capture: CaptureBuffer) -> Result<InputTensor, PreprocessError> {
    let rgb = decode_rgb(capture)?;

    if rgb.width() == 0 || rgb.height() == 0 {
        return Err(PreprocessError::ShapeMismatch {
            expected: TENSOR_LEN,
            actual: 0,
        });
    }

    let resized = if rgb.dimensions() == (TENSOR_WIDTH, TENSOR_HEIGHT) {
        rgb
    } else {
        // Triangle is the bilinear kernel.
        image::imageops::resize(&rgb, TENSOR_WIDTH, TENSOR_HEIGHT, FilterType::Triangle)
    };

    let data = resized
        .into_raw()
        .into_iter()
        .map(|v| v as f32 / 127.5 - 1.0)
        .collect();

    InputTensor::from_vec(data)
}

fn decode_rgb(capture: CaptureBuffer) -> Result<RgbImage, PreprocessError> {
    let CaptureBuffer {
        bytes,
        width,
        height,
        encoding,
    } = capture;

    if let Some(channels) = encoding.raw_channels() {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|px| px.checked_mul(channels))
            .unwrap_or(usize::MAX);
        if bytes.is_empty() || bytes.len() != expected {
            return Err(PreprocessError::ShapeMismatch {
                expected,
                actual: bytes.len(),
            });
        }
        let actual = bytes.len();
        let mismatch = || PreprocessError::ShapeMismatch { expected, actual };

        return match encoding {
            CaptureEncoding::Rgb8 => RgbImage::from_raw(width, height, bytes).ok_or_else(mismatch),
            _ => RgbaImage::from_raw(width, height, bytes)
                .map(|rgba| DynamicImage::ImageRgba8(rgba).to_rgb8())
                .ok_or_else(mismatch),
        };
    }

    if bytes.is_empty() {
        return Err(PreprocessError::ShapeMismatch {
            expected: TENSOR_LEN,
            actual: 0,
        });
    }

    let format = match encoding {
        CaptureEncoding::Png => ImageFormat::Png,
        _ => ImageFormat::Jpeg,
    };
    let decoded = image::load_from_memory_with_format(&bytes, format)?;

    if width != 0 && height != 0 && (decoded.width(), decoded.height()) != (width, height) {
        log::debug!(
            "capture declared {}x{} but decoded as {}x{}",
            width,
            height,
            decoded.width(),
            decoded.height()
        );
    }

    Ok(decoded.to_rgb8())
}
