//! Thin wrappers over the `image` codecs used by the compressor.

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::FilterType;
use image::{DynamicImage, ImageEncoder};

use crate::error::ThumbnailError;

const PNG_SIGNATURE: [u8; 4] = [0x89, 0x50, 0x4E, 0x47];
const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];
const JPEG_EOI: [u8; 2] = [0xFF, 0xD9];

pub(crate) fn is_png(data: &[u8]) -> bool {
    data.starts_with(&PNG_SIGNATURE)
}

/// True when the JPEG ends with its EOI marker, ignoring zero or fill-byte padding.
fn jpeg_is_complete(data: &[u8]) -> bool {
    let end = data
        .iter()
        .rposition(|&b| b != 0x00 && b != 0xFF)
        .map_or(0, |i| i + 1);
    data[..end].ends_with(&JPEG_EOI)
}

pub(crate) fn decode(data: &[u8]) -> Result<DynamicImage, ThumbnailError> {
    if data.starts_with(&JPEG_SOI) && !jpeg_is_complete(data) {
        return Err(ThumbnailError::Decode(
            "truncated jpeg: missing end of image marker".to_string(),
        ));
    }
    let image =
        image::load_from_memory(data).map_err(|e| ThumbnailError::Decode(e.to_string()))?;
    if image.width() == 0 || image.height() == 0 {
        return Err(ThumbnailError::Decode("image has zero dimension".to_string()));
    }
    Ok(image)
}

/// Baseline JPEG at `quality` (1..=100). Expects an 8-bit RGB or luma image.
pub(crate) fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, ThumbnailError> {
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality)
        .write_image(
            image.as_bytes(),
            image.width(),
            image.height(),
            image.color().into(),
        )
        .map_err(|e| ThumbnailError::Encode(format!("jpeg (quality {quality}): {e}")))?;
    Ok(buf)
}

/// PNG with the strongest deflate setting; pixels are untouched.
pub(crate) fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, ThumbnailError> {
    let mut buf = Vec::new();
    let encoder = PngEncoder::new_with_quality(&mut buf, CompressionType::Best, PngFilter::Adaptive);
    encoder
        .write_image(
            image.as_bytes(),
            image.width(),
            image.height(),
            image.color().into(),
        )
        .map_err(|e| ThumbnailError::Encode(format!("png: {e}")))?;
    Ok(buf)
}

pub(crate) fn resize(image: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    image.resize_exact(width.max(1), height.max(1), FilterType::Triangle)
}

/// Map a 0..1 quality factor onto the encoder's 1..=100 scale.
pub(crate) fn quality_percent(factor: f32) -> u8 {
    (factor * 100.0).round().clamp(1.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, RgbaImage};

    #[test]
    fn test_is_png() {
        assert!(is_png(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A]));
        assert!(!is_png(&[0xFF, 0xD8, 0xFF]));
        assert!(!is_png(&[]));
    }

    #[test]
    fn test_quality_percent() {
        assert_eq!(quality_percent(0.9), 90);
        assert_eq!(quality_percent(0.5), 50);
        assert_eq!(quality_percent(0.001), 1);
        assert_eq!(quality_percent(1.7), 100);
    }

    #[test]
    fn test_jpeg_roundtrip_dimensions() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 20, Rgb([10, 200, 30])));
        let bytes = encode_jpeg(&img, 80).unwrap();
        assert!(bytes.starts_with(&[0xFF, 0xD8]));
        let decoded = decode(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (40, 20));
    }

    #[test]
    fn test_png_keeps_alpha() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            16,
            16,
            image::Rgba([1, 2, 3, 128]),
        ));
        let bytes = encode_png(&img).unwrap();
        assert!(is_png(&bytes));
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.to_rgba8().get_pixel(0, 0).0, [1, 2, 3, 128]);
    }

    #[test]
    fn test_jpeg_completeness() {
        assert!(jpeg_is_complete(&[0xFF, 0xD8, 0x01, 0xFF, 0xD9]));
        assert!(jpeg_is_complete(&[0xFF, 0xD8, 0x01, 0xFF, 0xD9, 0x00, 0x00]));
        assert!(jpeg_is_complete(&[0xFF, 0xD8, 0x01, 0xFF, 0xD9, 0xFF]));
        assert!(!jpeg_is_complete(&[0xFF, 0xD8, 0x01, 0x02]));
        assert!(!jpeg_is_complete(&[0x00, 0x00]));
    }

    #[test]
    fn test_decode_rejects_truncated_jpeg() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(64, 64, |x, y| {
            Rgb([(x * 4) as u8, (y * 4) as u8, ((x ^ y) * 4) as u8])
        }));
        let bytes = encode_jpeg(&img, 90).unwrap();
        assert!(decode(&bytes).is_ok());

        let result = decode(&bytes[..bytes.len() / 2]);
        assert!(matches!(result, Err(ThumbnailError::Decode(_))));
    }

    #[test]
    fn test_decode_garbage() {
        let result = decode(b"definitely not an image");
        assert!(matches!(result, Err(ThumbnailError::Decode(_))));
    }

    #[test]
    fn test_resize_exact_size() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(300, 150, Rgb([0, 0, 0])));
        let out = resize(&img, 120, 60);
        assert_eq!((out.width(), out.height()), (120, 60));
    }
}
