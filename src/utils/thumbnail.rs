//! Thumbnail rendering
//!
//! Scales the source to cover the requested box, crops the overflow around
//! the center and re-encodes in the source format. JPEG output uses a fixed
//! quality factor of 0.8. ICO cannot hold more than 256 pixels per side, so
//! larger ICO thumbnails are written as PNG.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};

pub const OUTPUT_QUALITY: f32 = 0.8;

/// Largest accepted width or height.
pub const MAX_EDGE: u32 = 8192;

/// Largest width or height an ICO entry can hold.
pub const ICO_MAX_EDGE: u32 = 256;

#[derive(Debug, thiserror::Error)]
pub enum ThumbnailError {
    #[error("invalid thumbnail size {width}x{height}")]
    InvalidSize { width: i64, height: i64 },

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

fn edge(value: i64) -> Option<u32> {
    u32::try_from(value)
        .ok()
        .filter(|v| (1..=MAX_EDGE).contains(v))
}

/// Render `source` as a `width` x `height` thumbnail. Either side must be
/// within `1..=MAX_EDGE`.
pub fn render(source: &[u8], width: i64, height: i64) -> Result<Vec<u8>, ThumbnailError> {
    let (Some(w), Some(h)) = (edge(width), edge(height)) else {
        return Err(ThumbnailError::InvalidSize { width, height });
    };

    let format = image::guess_format(source)?;
    let decoded = image::load_from_memory_with_format(source, format)?;
    let thumbnail = decoded.resize_to_fill(w, h, FilterType::Lanczos3);

    encode(&thumbnail, format)
}

fn encode(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>, ThumbnailError> {
    let mut out = Cursor::new(Vec::new());
    match format {
        ImageFormat::Jpeg => {
            let quality = (OUTPUT_QUALITY * 100.0).round() as u8;
            let encoder = JpegEncoder::new_with_quality(&mut out, quality);
            image.to_rgb8().write_with_encoder(encoder)?;
        }
        ImageFormat::Ico
            if image.width() <= ICO_MAX_EDGE && image.height() <= ICO_MAX_EDGE =>
        {
            DynamicImage::ImageRgba8(image.to_rgba8()).write_to(&mut out, format)?
        }
        ImageFormat::Png | ImageFormat::Gif | ImageFormat::Bmp | ImageFormat::Tiff => {
            image.write_to(&mut out, format)?
        }
        _ => image.write_to(&mut out, ImageFormat::Png)?,
    }
    Ok(out.into_inner())
}
