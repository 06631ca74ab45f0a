// Fallback and graceful degradation tests

use super::test_harness::{jpeg_fixture, png_fixture, DeliveryHarness};

#[tokio::test]
async fn test_legacy_namespace_fallback() {
    let harness = DeliveryHarness::new();
    harness.put_legacy("old/bracket.jpg", jpeg_fixture(64, 64), "image/jpeg");

    let response = harness.get("path=old%2Fbracket.jpg").await;
    assert_eq!(response.status, 200);
    assert_eq!(response.header("Content-Type"), Some("image/jpeg"));
    assert_eq!(harness.store.download_count("original"), 1);
    assert_eq!(harness.store.download_count("products"), 1);
}

#[tokio::test]
async fn test_primary_outage_still_reaches_legacy() {
    let harness = DeliveryHarness::new();
    harness.put_legacy("bracket.jpg", jpeg_fixture(32, 32), "image/jpeg");
    harness.store.set_namespace_unavailable("original", true);

    let response = harness.get("path=bracket.jpg").await;
    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn test_unreachable_logo_serves_source_unmodified() {
    let harness = DeliveryHarness::new();
    let source = png_fixture(80, 60);
    harness.put_original("a.png", source.clone(), "image/png");
    harness.use_logo("http://127.0.0.1:1/logo.png");

    let response = harness.get("path=a.png&watermark=true").await;
    assert_eq!(response.status, 200);
    assert_eq!(response.body, source);
    assert_eq!(response.header("Content-Type"), Some("image/png"));
    assert_eq!(response.header("Cache-Control"), Some("no-cache"));
    assert!(response.header("Content-Disposition").is_some());

    // Degraded output is not cached, so a fixed logo takes effect next time
    assert!(harness.store.peek("watermarked", "wm_a.png").is_none());
}

#[tokio::test]
async fn test_logo_mode_without_logo_is_degraded() {
    let harness = DeliveryHarness::new();
    let source = png_fixture(40, 40);
    harness.put_original("a.png", source.clone(), "image/png");
    harness.settings.set("watermark_mode", "logo");

    let response = harness.get("path=a.png&watermark=true").await;
    assert_eq!(response.status, 200);
    assert_eq!(response.body, source);
}

#[tokio::test]
async fn test_disabled_flag_overrides_watermark_request() {
    let harness = DeliveryHarness::new();
    harness.put_original("a.png", png_fixture(40, 40), "image/png");
    harness.put_original("logo.png", png_fixture(8, 8), "image/png");
    harness.use_logo("logo.png");
    harness.settings.set("watermark_enabled", "false");

    let watermarked = harness.get("path=a.png&watermark=true").await;
    let clean = harness.get("path=a.png").await;
    assert_eq!(watermarked.status, 200);
    assert_eq!(watermarked.body, clean.body);
    assert!(harness.store.peek("watermarked", "wm_a.png").is_some());
}

#[tokio::test]
async fn test_stale_cache_survives_settings_change_by_default() {
    let harness = DeliveryHarness::new();
    harness.put_original("a.png", png_fixture(60, 60), "image/png");
    harness.put_original("logo.png", png_fixture(8, 8), "image/png");
    harness.use_logo("logo.png");

    let first = harness.get("path=a.png&watermark=true").await;
    harness.settings.set("watermark_enabled", "false");
    let second = harness.get("path=a.png&watermark=true").await;

    assert!(second.cache_hit);
    assert_eq!(first.body, second.body);
}

#[tokio::test]
async fn test_cache_outage_does_not_fail_requests() {
    let harness = DeliveryHarness::new();
    harness.put_original("a.jpg", jpeg_fixture(30, 30), "image/jpeg");
    harness.store.set_namespace_unavailable("watermarked", true);

    let first = harness.get("path=a.jpg").await;
    let second = harness.get("path=a.jpg").await;
    assert_eq!(first.status, 200);
    assert_eq!(second.status, 200);
    assert!(!second.cache_hit);
    assert_eq!(harness.store.download_count("original"), 2);
}
