//! Watermark rendering strategies.
//!
//! [`WatermarkCompositor`] turns source bytes plus the current
//! [`WatermarkConfig`] into the canonical JPEG output:
//!
//! - Text mode: uppercase text sized to about 30% of the image width,
//!   centered, light colored, at `opacity_percent * 0.6 / 100`.
//! - Logo mode: logo scaled to fit 15% of the shorter image side, alpha
//!   masked at a fixed 30%, rotated -45 degrees and tiled on a 5x5 grid.
//!
//! A logo that cannot be fetched does not fail the render: the source bytes
//! are returned untouched and the result is marked degraded. Decode, text
//! and encode failures are returned as errors for the caller to handle.

use super::codec::{decode_image, encode_jpeg};
use super::compositor::{create_centered_layer, create_grid_layers, Compositor};
use super::logo::LogoFetcher;
use super::position::ImageDimensions;
use super::text_renderer::{Color, TextRenderOptions, TextRenderer};
use super::transform::{resize_to_fit, rotate_image};
use super::WatermarkError;
use crate::constants::CANONICAL_CONTENT_TYPE;
use crate::settings::{WatermarkConfig, WatermarkMode};
use bytes::Bytes;
use image::{DynamicImage, RgbaImage};
use std::sync::Arc;

/// Share of the image width the text should span
const TEXT_WIDTH_RATIO: f32 = 0.3;

/// Empirical glyph-width factor for deriving font size from text length
const TEXT_SIZE_FACTOR: f32 = 1.5;

/// Text mode attenuates the configured opacity by this factor
const TEXT_OPACITY_FACTOR: f32 = 0.6;

/// Logo side as a share of the shorter image side
const LOGO_SIZE_RATIO: f32 = 0.15;

/// Logo mode ignores the configured opacity
const LOGO_OPACITY: f32 = 0.3;

const LOGO_ROTATION_DEGREES: f32 = -45.0;

const LOGO_GRID_COLUMNS: u32 = 5;
const LOGO_GRID_ROWS: u32 = 5;

/// How a rendition was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    /// Re-encoded without a watermark
    Clean,
    /// Watermark applied in the given mode
    Watermarked(WatermarkMode),
    /// Watermark requested but not applied
    Degraded,
}

impl RenderOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clean => "clean",
            Self::Watermarked(mode) => mode.as_str(),
            Self::Degraded => "degraded",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Rendition {
    pub bytes: Bytes,
    pub content_type: String,
    pub outcome: RenderOutcome,
}

impl Rendition {
    fn jpeg(bytes: Vec<u8>, outcome: RenderOutcome) -> Self {
        Self {
            bytes: Bytes::from(bytes),
            content_type: CANONICAL_CONTENT_TYPE.to_string(),
            outcome,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.outcome == RenderOutcome::Degraded
    }
}

pub struct WatermarkCompositor {
    text: Option<Arc<TextRenderer>>,
    logos: LogoFetcher,
    jpeg_quality: u8,
}

impl WatermarkCompositor {
    /// `text` is `None` when no font could be loaded; text mode then fails
    /// with a render error.
    pub fn new(text: Option<TextRenderer>, logos: LogoFetcher, jpeg_quality: u8) -> Self {
        Self {
            text: text.map(Arc::new),
            logos,
            jpeg_quality,
        }
    }

    pub fn jpeg_quality(&self) -> u8 {
        self.jpeg_quality
    }

    /// Render `source` with the configured watermark.
    pub async fn apply(
        &self,
        source: Bytes,
        source_content_type: &str,
        name_hint: &str,
        config: &WatermarkConfig,
    ) -> Result<Rendition, WatermarkError> {
        match config.mode {
            WatermarkMode::Text => {
                let renderer = self.text.clone().ok_or_else(|| {
                    WatermarkError::RenderError("no font loaded for text watermark".to_string())
                })?;
                let text = config.text.clone();
                let opacity = config.opacity_percent as f32 * TEXT_OPACITY_FACTOR / 100.0;
                let hint = name_hint.to_string();
                let quality = self.jpeg_quality;

                run_blocking(move || {
                    let mut canvas = decode_image(&source, &hint)?.to_rgba8();
                    apply_text(&mut canvas, &renderer, &text, opacity)?;
                    let bytes = encode_jpeg(&canvas, quality)?;
                    Ok(Rendition::jpeg(bytes, RenderOutcome::Watermarked(WatermarkMode::Text)))
                })
                .await
            }
            WatermarkMode::Logo => {
                let Some(logo_ref) = config.logo.as_deref() else {
                    tracing::warn!("Logo watermark selected but no logo is configured");
                    return Ok(unmodified(source, source_content_type));
                };

                let logo = match self.logos.fetch(logo_ref).await {
                    Ok(logo) => logo,
                    Err(e) => {
                        tracing::warn!(logo = %logo_ref, error = %e, "Logo unavailable, serving source without watermark");
                        return Ok(unmodified(source, source_content_type));
                    }
                };

                let hint = name_hint.to_string();
                let quality = self.jpeg_quality;

                run_blocking(move || {
                    let mut canvas = decode_image(&source, &hint)?.to_rgba8();
                    apply_logo_grid(&mut canvas, &logo);
                    let bytes = encode_jpeg(&canvas, quality)?;
                    Ok(Rendition::jpeg(bytes, RenderOutcome::Watermarked(WatermarkMode::Logo)))
                })
                .await
            }
        }
    }

    /// Re-encode `source` to the canonical format without a watermark.
    pub async fn render_clean(
        &self,
        source: Bytes,
        name_hint: &str,
        outcome: RenderOutcome,
    ) -> Result<Rendition, WatermarkError> {
        let hint = name_hint.to_string();
        let quality = self.jpeg_quality;

        run_blocking(move || {
            let canvas = decode_image(&source, &hint)?.to_rgba8();
            Ok(Rendition::jpeg(encode_jpeg(&canvas, quality)?, outcome))
        })
        .await
    }
}

fn unmodified(source: Bytes, content_type: &str) -> Rendition {
    Rendition {
        bytes: source,
        content_type: content_type.to_string(),
        outcome: RenderOutcome::Degraded,
    }
}

async fn run_blocking<F>(task: F) -> Result<Rendition, WatermarkError>
where
    F: FnOnce() -> Result<Rendition, WatermarkError> + Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| WatermarkError::RenderError(format!("render task failed: {}", e)))?
}

/// Font size that makes `text` span roughly `target_width` pixels.
pub fn text_font_size(image_width: u32, text: &str) -> f32 {
    let target_width = image_width as f32 * TEXT_WIDTH_RATIO;
    let len = text.chars().count().max(1) as f32;
    (target_width / len * TEXT_SIZE_FACTOR).max(1.0)
}

/// Logo bounding-box side for an image.
pub fn logo_side(image: &ImageDimensions) -> u32 {
    ((image.width.min(image.height) as f32 * LOGO_SIZE_RATIO) as u32).max(1)
}

fn apply_text(
    canvas: &mut RgbaImage,
    renderer: &TextRenderer,
    text: &str,
    opacity: f32,
) -> Result<(), WatermarkError> {
    let text = text.to_uppercase();
    let dims = ImageDimensions {
        width: canvas.width(),
        height: canvas.height(),
    };

    let rendered = renderer.render(&TextRenderOptions {
        font_size: text_font_size(dims.width, &text),
        text,
        color: Color::white(),
        opacity: 1.0,
    })?;

    let mut compositor = Compositor::new();
    compositor.add_layer(create_centered_layer(rendered, &dims, opacity));
    compositor.apply(canvas);
    Ok(())
}

fn apply_logo_grid(canvas: &mut RgbaImage, logo: &DynamicImage) {
    let dims = ImageDimensions {
        width: canvas.width(),
        height: canvas.height(),
    };

    let resized = resize_to_fit(logo, logo_side(&dims));
    let rotated = Arc::new(rotate_image(&resized, LOGO_ROTATION_DEGREES));

    let mut compositor = Compositor::new();
    compositor.extend(create_grid_layers(
        rotated,
        &dims,
        LOGO_GRID_COLUMNS,
        LOGO_GRID_ROWS,
        LOGO_OPACITY,
    ));
    compositor.apply(canvas);
}
