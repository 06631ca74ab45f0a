//! Decoding of sources and logos, and encoding to the canonical JPEG output.

use super::WatermarkError;
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::io::Cursor;

/// Detect image format from magic bytes, falling back to the name's extension.
pub fn detect_image_format(data: &[u8], name_hint: &str) -> Result<ImageFormat, WatermarkError> {
    if let Ok(format) = image::guess_format(data) {
        return Ok(format);
    }

    let ext = name_hint
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "png" => Ok(ImageFormat::Png),
        "jpg" | "jpeg" => Ok(ImageFormat::Jpeg),
        "gif" => Ok(ImageFormat::Gif),
        "webp" => Ok(ImageFormat::WebP),
        _ => Err(WatermarkError::DecodeError(format!(
            "unrecognized image format for '{}'",
            name_hint
        ))),
    }
}

pub fn decode_image(data: &[u8], name_hint: &str) -> Result<DynamicImage, WatermarkError> {
    let format = detect_image_format(data, name_hint)?;
    image::load(Cursor::new(data), format).map_err(|e| WatermarkError::DecodeError(e.to_string()))
}

/// Encode as baseline JPEG. Transparent pixels are flattened onto white.
pub fn encode_jpeg(image: &RgbaImage, quality: u8) -> Result<Vec<u8>, WatermarkError> {
    use image::codecs::jpeg::JpegEncoder;
    use image::ImageEncoder as _;

    if image.width() == 0 || image.height() == 0 {
        return Err(WatermarkError::EncodeError("zero-sized image".to_string()));
    }

    let rgb = flatten_onto_white(image);

    let mut output = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut output, quality.clamp(1, 100))
        .write_image(&rgb, image.width(), image.height(), image::ColorType::Rgb8)
        .map_err(|e| WatermarkError::EncodeError(e.to_string()))?;

    Ok(output.into_inner())
}

fn flatten_onto_white(image: &RgbaImage) -> Vec<u8> {
    let mut rgb = Vec::with_capacity((image.width() * image.height() * 3) as usize);
    for pixel in image.pixels() {
        let alpha = pixel[3] as u32;
        for c in 0..3 {
            let value = (pixel[c] as u32 * alpha + 255 * (255 - alpha) + 127) / 255;
            rgb.push(value as u8);
        }
    }
    rgb
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn png_bytes(image: &RgbaImage) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(image.clone())
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn test_detect_from_magic_bytes() {
        let data = png_bytes(&RgbaImage::new(2, 2));
        assert_eq!(
            detect_image_format(&data, "logo.jpg").unwrap(),
            ImageFormat::Png
        );
    }

    #[test]
    fn test_detect_from_extension() {
        assert_eq!(
            detect_image_format(b"????", "a/b/photo.JPEG").unwrap(),
            ImageFormat::Jpeg
        );
        assert!(detect_image_format(b"????", "notes.txt").is_err());
        assert!(detect_image_format(b"????", "noext").is_err());
    }

    #[test]
    fn test_decode_garbage_is_decode_error() {
        let err = decode_image(b"\x89PNG\r\n\x1a\nbroken", "x.png").unwrap_err();
        assert!(matches!(err, WatermarkError::DecodeError(_)));
    }

    #[test]
    fn test_encode_jpeg_roundtrip_dimensions() {
        let image = RgbaImage::from_pixel(40, 30, Rgba([10, 200, 30, 255]));
        let jpeg = encode_jpeg(&image, 90).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);

        let decoded = decode_image(&jpeg, "out.jpg").unwrap();
        assert_eq!((decoded.width(), decoded.height()), (40, 30));
    }

    #[test]
    fn test_transparent_pixels_become_white() {
        let rgb = flatten_onto_white(&RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 0])));
        assert_eq!(rgb, vec![255, 255, 255]);
        let rgb = flatten_onto_white(&RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 255])));
        assert_eq!(rgb, vec![0, 0, 0]);
    }

    #[test]
    fn test_encode_is_deterministic() {
        let image = RgbaImage::from_fn(16, 16, |x, y| Rgba([x as u8 * 10, y as u8 * 10, 0, 255]));
        assert_eq!(encode_jpeg(&image, 85).unwrap(), encode_jpeg(&image, 85).unwrap());
    }
}
