// End-to-end delivery tests: caching, headers, validation, determinism

use super::test_harness::{decode, jpeg_fixture, png_fixture, serve_once, white_logo, DeliveryHarness};
use catalog_image_proxy::watermark::{
    calculate_grid_positions, ImageDimensions, WatermarkDimensions,
};

#[tokio::test]
async fn test_clean_request_end_to_end() {
    let harness = DeliveryHarness::new();
    harness.put_original("abc.jpg", jpeg_fixture(120, 80), "image/jpeg");

    let first = harness.get("path=abc.jpg").await;
    assert_eq!(first.status, 200);
    assert_eq!(first.header("Content-Type"), Some("image/jpeg"));
    assert_eq!(
        first.header("Cache-Control"),
        Some("public, max-age=31536000, immutable")
    );
    assert!(first.header("Content-Disposition").is_none());
    assert!(!first.cache_hit);
    assert_eq!(decode(&first.body).dimensions(), (120, 80));

    let second = harness.get("path=abc.jpg").await;
    assert_eq!(second.status, 200);
    assert!(second.cache_hit);
    assert_eq!(second.header("X-Cache"), Some("HIT"));
    assert_eq!(second.body, first.body);

    // The second request never reached the resolver
    assert_eq!(harness.store.download_count("original"), 1);
}

#[tokio::test]
async fn test_watermark_request_is_an_attachment() {
    let harness = DeliveryHarness::new();
    harness.put_original("parts/axle.png", png_fixture(200, 200), "image/png");
    harness.put_original("brand/logo.png", white_logo(32), "image/png");
    harness.use_logo("brand/logo.png");

    let response = harness.get("path=parts%2Faxle.png&watermark=true").await;
    assert_eq!(response.status, 200);
    assert_eq!(response.header("Content-Type"), Some("image/jpeg"));
    assert_eq!(
        response.header("Content-Disposition"),
        Some("attachment; filename=\"axle.png\"")
    );
    assert!(harness.store.peek("watermarked", "wm_parts/axle.png").is_some());

    let clean = harness.get("path=parts%2Faxle.png").await;
    assert!(clean.header("Content-Disposition").is_none());
    assert_ne!(clean.body, response.body);
}

#[tokio::test]
async fn test_default_text_watermark_is_rendered_and_cached() {
    // No logo and no mode setting: text mode with the site name
    let harness = DeliveryHarness::new();
    harness.put_original("parts/cab.png", png_fixture(640, 360), "image/png");

    let response = harness.get("path=parts%2Fcab.png&watermark=true").await;
    assert_eq!(response.status, 200);
    assert_eq!(response.header("Content-Type"), Some("image/jpeg"));
    assert_eq!(
        response.header("Cache-Control"),
        Some("public, max-age=31536000, immutable")
    );
    assert!(harness.store.peek("watermarked", "wm_parts/cab.png").is_some());

    let clean = harness.get("path=parts%2Fcab.png").await;
    assert!(clean.header("Content-Disposition").is_none());
    assert_ne!(clean.body, response.body);
}

#[tokio::test]
async fn test_watermarked_output_is_deterministic() {
    let render = || async {
        let harness = DeliveryHarness::new();
        harness.put_original("a.png", png_fixture(150, 100), "image/png");
        harness.put_original("logo.png", white_logo(24), "image/png");
        harness.use_logo("logo.png");
        harness.get("path=a.png&watermark=true").await.body
    };

    let first = render().await;
    let second = render().await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_parameter_validation() {
    let harness = DeliveryHarness::new();

    let response = harness.service.handle(None).await;
    assert_eq!(response.status, 400);

    let response = harness.get("watermark=true").await;
    assert_eq!(response.status, 400);

    let response = harness
        .get("path=a.jpg&url=https%3A%2F%2Fcdn.example.com%2Fa.jpg")
        .await;
    assert_eq!(response.status, 400);

    let response = harness.get("path=nowhere.jpg").await;
    assert_eq!(response.status, 404);
    assert_eq!(&response.body[..], b"Image not found");
}

#[tokio::test]
async fn test_external_url_is_fetched_once() {
    let harness = DeliveryHarness::new();
    let base = serve_once("image/png; charset=binary", png_fixture(64, 48));
    let query = format!(
        "url={}",
        urlencoding::encode(&format!("{}/images/pump.png", base))
    );

    let first = harness.get(&query).await;
    assert_eq!(first.status, 200);
    assert_eq!(first.header("Content-Type"), Some("image/jpeg"));
    let key = first.cache_key.clone().unwrap();
    assert!(key.as_str().starts_with("clean_"));
    assert!(key.as_str().ends_with(".jpg"));

    // The remote server answers a single connection; this must be a hit
    let second = harness.get(&query).await;
    assert_eq!(second.status, 200);
    assert!(second.cache_hit);
    assert_eq!(second.body, first.body);
}

#[tokio::test]
async fn test_unreachable_external_url_is_not_found() {
    let harness = DeliveryHarness::new();
    let response = harness
        .get("url=http%3A%2F%2F127.0.0.1%3A1%2Fmissing.jpg")
        .await;
    assert_eq!(response.status, 404);
}

#[test]
fn test_logo_tiling_geometry() {
    let positions = calculate_grid_positions(
        &ImageDimensions {
            width: 1000,
            height: 1000,
        },
        &WatermarkDimensions {
            width: 100,
            height: 100,
        },
        5,
        5,
    );

    assert_eq!(positions.len(), 25);
    for (i, position) in positions.iter().enumerate() {
        let col = (i % 5) as i32;
        let row = (i / 5) as i32;
        assert_eq!(position.x, col * 200 + 50);
        assert_eq!(position.y, row * 200 + 50);
    }
}
