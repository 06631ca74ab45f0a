// Test harness for integration tests
// Builds an ImageService over in-memory stores and generates image fixtures

use bytes::Bytes;
use catalog_image_proxy::config::Config;
use catalog_image_proxy::delivery::{ImageResponse, ImageService};
use catalog_image_proxy::settings::StaticSettingsStore;
use catalog_image_proxy::storage::MemoryBlobStore;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::io::{Cursor, Read, Write};
use std::net::TcpListener;
use std::sync::Arc;

pub const BASE_YAML: &str = r#"
server:
  address: "127.0.0.1"
  port: 8080
storage:
  backend: memory
"#;

/// Service plus handles to the stores behind it
pub struct DeliveryHarness {
    pub store: Arc<MemoryBlobStore>,
    pub settings: Arc<StaticSettingsStore>,
    pub service: ImageService,
}

impl DeliveryHarness {
    pub fn new() -> Self {
        Self::with_config(Config::from_yaml_with_env(BASE_YAML).unwrap())
    }

    pub fn with_config(config: Config) -> Self {
        let store = Arc::new(MemoryBlobStore::new());
        let settings = Arc::new(StaticSettingsStore::new());
        let service =
            ImageService::with_backends(&config, store.clone(), settings.clone()).unwrap();
        Self {
            store,
            settings,
            service,
        }
    }

    pub fn put_original(&self, key: &str, bytes: Bytes, content_type: &str) {
        self.store.insert("original", key, bytes, content_type);
    }

    pub fn put_legacy(&self, key: &str, bytes: Bytes, content_type: &str) {
        self.store.insert("products", key, bytes, content_type);
    }

    /// Configure logo-mode watermarking with `logo` as the logo reference.
    pub fn use_logo(&self, logo: &str) {
        self.settings.set("watermark_mode", "logo");
        self.settings.set("watermark_logo", logo);
    }

    pub async fn get(&self, query: &str) -> ImageResponse {
        self.service.handle(Some(query)).await
    }
}

/// Gradient image so re-encoding is not trivially lossless.
pub fn gradient(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, 255])
    })
}

pub fn encode(image: RgbaImage, format: ImageFormat) -> Bytes {
    let mut out = Cursor::new(Vec::new());
    let image = match format {
        // JPEG has no alpha channel
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(image).to_rgb8()),
        _ => DynamicImage::ImageRgba8(image),
    };
    image.write_to(&mut out, format).unwrap();
    Bytes::from(out.into_inner())
}

pub fn jpeg_fixture(width: u32, height: u32) -> Bytes {
    encode(gradient(width, height), ImageFormat::Jpeg)
}

pub fn png_fixture(width: u32, height: u32) -> Bytes {
    encode(gradient(width, height), ImageFormat::Png)
}

pub fn white_logo(side: u32) -> Bytes {
    encode(
        RgbaImage::from_pixel(side, side, Rgba([255, 255, 255, 255])),
        ImageFormat::Png,
    )
}

pub fn decode(bytes: &[u8]) -> RgbaImage {
    image::load_from_memory(bytes).unwrap().to_rgba8()
}

/// Serve a single HTTP response on a loopback port and return its base URL.
/// Only the first connection is answered.
pub fn serve_once(content_type: &str, body: Bytes) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let content_type = content_type.to_string();

    std::thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            let mut buf = [0u8; 4096];
            let _ = stream.read(&mut buf);
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                content_type,
                body.len()
            );
            let _ = stream.write_all(head.as_bytes());
            let _ = stream.write_all(&body);
        }
    });

    format!("http://{}", addr)
}
