use catalog_image_proxy::watermark::codec::{decode_image, encode_jpeg};
use catalog_image_proxy::watermark::transform::{resize_to_fit, rotate_image};
use catalog_image_proxy::watermark::{create_grid_layers, Compositor, ImageDimensions};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;
use std::sync::Arc;

fn create_bench_image(width: u32, height: u32) -> Vec<u8> {
    let mut img = RgbaImage::new(width, height);
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        *pixel = Rgba([(x % 255) as u8, (y % 255) as u8, ((x + y) % 255) as u8, 255]);
    }
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, ImageFormat::Png).unwrap();
    buffer.into_inner()
}

fn bench_logo_grid(c: &mut Criterion) {
    let input_data = create_bench_image(1920, 1080);
    let logo = DynamicImage::ImageRgba8(RgbaImage::from_pixel(256, 256, Rgba([255, 255, 255, 255])));

    let mut group = c.benchmark_group("watermark");
    group.sample_size(10); // Image ops are slow, reduce sample size

    group.bench_function("logo_grid_1080p", |b| {
        b.iter(|| {
            let mut canvas = decode_image(black_box(&input_data), "bench.png")
                .unwrap()
                .to_rgba8();
            let dims = ImageDimensions {
                width: canvas.width(),
                height: canvas.height(),
            };
            let side = (dims.width.min(dims.height) as f32 * 0.15) as u32;
            let rotated = Arc::new(rotate_image(&resize_to_fit(&logo, side), -45.0));

            let mut compositor = Compositor::new();
            compositor.extend(create_grid_layers(rotated, &dims, 5, 5, 0.3));
            compositor.apply(&mut canvas);
            encode_jpeg(&canvas, 90).unwrap()
        })
    });

    group.bench_function("clean_reencode_1080p", |b| {
        b.iter(|| {
            let canvas = decode_image(black_box(&input_data), "bench.png")
                .unwrap()
                .to_rgba8();
            encode_jpeg(&canvas, 90).unwrap()
        })
    });

    group.finish();
}

criterion_group!(benches, bench_logo_grid);
criterion_main!(benches);
