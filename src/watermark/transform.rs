//! Geometric transforms for watermark assets.

use image::imageops::FilterType;
use image::{DynamicImage, Rgba, RgbaImage};

/// Resize to fit inside a `max_side` square, preserving aspect ratio.
pub fn resize_to_fit(image: &DynamicImage, max_side: u32) -> RgbaImage {
    let max_side = max_side.max(1);
    let (src_w, src_h) = (image.width().max(1), image.height().max(1));

    let scale = max_side as f32 / src_w.max(src_h) as f32;
    let target_w = ((src_w as f32 * scale).round() as u32).max(1);
    let target_h = ((src_h as f32 * scale).round() as u32).max(1);

    image
        .resize_exact(target_w, target_h, FilterType::Lanczos3)
        .to_rgba8()
}

/// Rotate by `degrees` (positive is clockwise) onto a transparent canvas
/// that holds the whole rotated image.
pub fn rotate_image(image: &RgbaImage, degrees: f32) -> RgbaImage {
    let radians = degrees.to_radians();
    let (sin, cos) = radians.sin_cos();

    let src_w = image.width() as f32;
    let src_h = image.height() as f32;
    let cx = src_w / 2.0;
    let cy = src_h / 2.0;

    let dst_w = ((src_w * cos.abs() + src_h * sin.abs()).ceil() as u32).max(1);
    let dst_h = ((src_w * sin.abs() + src_h * cos.abs()).ceil() as u32).max(1);
    let dst_cx = dst_w as f32 / 2.0;
    let dst_cy = dst_h as f32 / 2.0;

    let mut rotated = RgbaImage::new(dst_w, dst_h);

    for dy in 0..dst_h {
        for dx in 0..dst_w {
            // Inverse-map the destination pixel center into the source
            let rx = dx as f32 + 0.5 - dst_cx;
            let ry = dy as f32 + 0.5 - dst_cy;
            let sx = rx * cos + ry * sin + cx - 0.5;
            let sy = -rx * sin + ry * cos + cy - 0.5;

            if let Some(pixel) = sample_bilinear(image, sx, sy) {
                rotated.put_pixel(dx, dy, pixel);
            }
        }
    }

    rotated
}

fn sample_bilinear(image: &RgbaImage, sx: f32, sy: f32) -> Option<Rgba<u8>> {
    let max_x = image.width() as f32 - 1.0;
    let max_y = image.height() as f32 - 1.0;
    if sx < 0.0 || sy < 0.0 || sx > max_x || sy > max_y {
        return None;
    }

    let x0 = sx.floor() as u32;
    let y0 = sy.floor() as u32;
    let x1 = (x0 + 1).min(image.width() - 1);
    let y1 = (y0 + 1).min(image.height() - 1);
    let fx = sx - x0 as f32;
    let fy = sy - y0 as f32;

    let p00 = image.get_pixel(x0, y0);
    let p10 = image.get_pixel(x1, y0);
    let p01 = image.get_pixel(x0, y1);
    let p11 = image.get_pixel(x1, y1);

    let interpolate = |c: usize| -> u8 {
        let v = p00[c] as f32 * (1.0 - fx) * (1.0 - fy)
            + p10[c] as f32 * fx * (1.0 - fy)
            + p01[c] as f32 * (1.0 - fx) * fy
            + p11[c] as f32 * fx * fy;
        v.round().clamp(0.0, 255.0) as u8
    };

    Some(Rgba([
        interpolate(0),
        interpolate(1),
        interpolate(2),
        interpolate(3),
    ]))
}
