//! Watermark rendering for delivered images.
//!
//! Two strategies are selected by the watermark mode from site settings:
//!
//! - **Text**: the site text, uppercased and centered, at a subdued opacity
//! - **Logo**: the site logo, rotated and tiled on a 5x5 grid
//!
//! All renders are re-encoded to JPEG. Logos are fetched through the same
//! storage chain as source images and memoized in memory.
//!
//! # Configuration Example
//!
//! ```yaml
//! render:
//!   jpeg_quality: 90
//!   font_path: /usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf
//!   logo_cache_ttl_seconds: 300
//! ```

use std::sync::Arc;
use std::time::Duration;

use crate::config::RenderConfig;
use crate::resolver::StorageResolver;

pub mod codec;
pub mod compositor;
pub mod error;
pub mod logo;
pub mod position;
pub mod processor;
pub mod text_renderer;
pub mod transform;

pub use compositor::{create_centered_layer, create_grid_layers, Compositor, WatermarkLayer};
pub use error::WatermarkError;
pub use logo::{LogoFetcher, LogoFetcherConfig};
pub use position::{
    calculate_centered_position, calculate_grid_positions, ImageDimensions, PlacementPosition,
    WatermarkDimensions,
};
pub use processor::{RenderOutcome, Rendition, WatermarkCompositor};
pub use text_renderer::{Color, FontSource, TextRenderOptions, TextRenderer};

/// Build the compositor from render configuration.
///
/// Fails only when an explicitly configured font cannot be loaded. Without
/// one, a system font or the bundled font is used.
pub fn build_compositor(
    config: &RenderConfig,
    resolver: Arc<StorageResolver>,
) -> Result<WatermarkCompositor, WatermarkError> {
    let text = TextRenderer::discover(config.font_path.as_deref())?;
    tracing::info!(font = %text.source(), "Loaded watermark font");

    let logos = LogoFetcher::new(
        resolver,
        LogoFetcherConfig {
            max_cache_entries: config.logo_cache_max_entries,
            cache_ttl: Duration::from_secs(config.logo_cache_ttl_seconds),
        },
    );

    Ok(WatermarkCompositor::new(Some(text), logos, config.jpeg_quality))
}
