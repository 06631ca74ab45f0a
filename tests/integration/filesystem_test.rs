// Delivery over the filesystem store (local uploads layout)

use super::test_harness::{png_fixture, BASE_YAML};
use catalog_image_proxy::config::Config;
use catalog_image_proxy::delivery::ImageService;
use catalog_image_proxy::settings::StaticSettingsStore;
use catalog_image_proxy::storage::FilesystemBlobStore;
use std::sync::Arc;
use tempfile::TempDir;

#[tokio::test]
async fn test_renders_are_written_under_cache_namespace() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("original/parts")).unwrap();
    std::fs::write(dir.path().join("original/parts/hub.png"), png_fixture(50, 50)).unwrap();

    let config = Config::from_yaml_with_env(BASE_YAML).unwrap();
    let store = Arc::new(FilesystemBlobStore::new(dir.path().to_path_buf()));
    let settings = Arc::new(StaticSettingsStore::new());
    let service = ImageService::with_backends(&config, store, settings).unwrap();

    let first = service.handle(Some("path=parts%2Fhub.png")).await;
    assert_eq!(first.status, 200);
    assert_eq!(first.header("Content-Type"), Some("image/jpeg"));

    let cached = dir.path().join("watermarked/clean_parts/hub.png");
    assert_eq!(std::fs::read(&cached).unwrap(), first.body.to_vec());

    let second = service.handle(Some("path=parts%2Fhub.png")).await;
    assert!(second.cache_hit);
    assert_eq!(second.body, first.body);
}
