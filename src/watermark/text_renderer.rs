//! Text watermark rendering.
//!
//! Text is rasterized with `ab_glyph` onto a transparent RGBA canvas that
//! the compositor then blends onto the target. The font is loaded once at
//! startup from the configured path, then the first common system font
//! location that exists, and finally the DejaVu Sans Mono copy compiled
//! into the binary.

use super::WatermarkError;
use ab_glyph::{Font, FontArc, GlyphId, PxScale, ScaleFont};
use image::{Rgba, RgbaImage};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Embedded fallback font (DejaVu Sans Mono, Bitstream Vera license).
const BUNDLED_FONT_DATA: &[u8] = include_bytes!("fonts/DejaVuSansMono.ttf");

static BUNDLED_FONT: OnceLock<Option<FontArc>> = OnceLock::new();

fn bundled_font() -> Option<FontArc> {
    BUNDLED_FONT
        .get_or_init(|| FontArc::try_from_slice(BUNDLED_FONT_DATA).ok())
        .clone()
}

/// Tried in order when no font path is configured.
const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Bold.ttf",
    "/usr/share/fonts/noto/NotoSans-Bold.ttf",
    "/usr/share/fonts/truetype/noto/NotoSans-Bold.ttf",
    "/Library/Fonts/Arial.ttf",
    "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
    "C:\\Windows\\Fonts\\arialbd.ttf",
];

/// Padding added around measured text, in pixels.
const TEXT_PADDING: u32 = 2;

/// RGB text color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn white() -> Self {
        Self::new(255, 255, 255)
    }
}

#[derive(Debug, Clone)]
pub struct TextRenderOptions {
    pub text: String,
    /// Font size in pixels.
    pub font_size: f32,
    pub color: Color,
    /// Opacity (0.0 to 1.0).
    pub opacity: f32,
}

impl Default for TextRenderOptions {
    fn default() -> Self {
        Self {
            text: String::new(),
            font_size: 24.0,
            color: Color::white(),
            opacity: 1.0,
        }
    }
}

/// Where the loaded font came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FontSource {
    File(PathBuf),
    Bundled,
}

impl fmt::Display for FontSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FontSource::File(path) => write!(f, "{}", path.display()),
            FontSource::Bundled => f.write_str("bundled DejaVu Sans Mono"),
        }
    }
}

/// A loaded TrueType font.
pub struct TextRenderer {
    font: FontArc,
    source: FontSource,
}

impl std::fmt::Debug for TextRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextRenderer")
            .field("source", &self.source)
            .finish()
    }
}

impl TextRenderer {
    pub fn from_file(path: &Path) -> Result<Self, WatermarkError> {
        let data = std::fs::read(path).map_err(|e| {
            WatermarkError::RenderError(format!("cannot read font {}: {}", path.display(), e))
        })?;
        let font = FontArc::try_from_vec(data).map_err(|e| {
            WatermarkError::RenderError(format!("invalid font {}: {}", path.display(), e))
        })?;
        Ok(Self {
            font,
            source: FontSource::File(path.to_path_buf()),
        })
    }

    /// The font compiled into the binary.
    pub fn bundled() -> Result<Self, WatermarkError> {
        let font = bundled_font().ok_or_else(|| {
            WatermarkError::RenderError("bundled font failed to parse".to_string())
        })?;
        Ok(Self {
            font,
            source: FontSource::Bundled,
        })
    }

    /// Load the configured font, else the first system font that loads,
    /// else the bundled one.
    ///
    /// A configured path that fails to load is an error; it never falls
    /// through to the other sources.
    pub fn discover(configured: Option<&Path>) -> Result<Self, WatermarkError> {
        if let Some(path) = configured {
            return Self::from_file(path);
        }

        SYSTEM_FONT_CANDIDATES
            .iter()
            .map(Path::new)
            .filter(|path| path.exists())
            .find_map(|path| Self::from_file(path).ok())
            .map_or_else(Self::bundled, Ok)
    }

    pub fn source(&self) -> &FontSource {
        &self.source
    }

    /// Width and height of rendered text, padding included.
    pub fn measure(&self, text: &str, font_size: f32) -> (u32, u32) {
        let scaled = self.font.as_scaled(PxScale::from(font_size));

        let mut width = 0.0f32;
        let mut prev: Option<GlyphId> = None;
        for c in text.chars() {
            let glyph_id = scaled.glyph_id(c);
            if let Some(prev) = prev {
                width += scaled.kern(prev, glyph_id);
            }
            width += scaled.h_advance(glyph_id);
            prev = Some(glyph_id);
        }

        (
            width.ceil().max(0.0) as u32 + TEXT_PADDING,
            scaled.height().ceil().max(0.0) as u32 + TEXT_PADDING,
        )
    }

    /// Render text onto a transparent canvas sized to fit it.
    pub fn render(&self, options: &TextRenderOptions) -> Result<RgbaImage, WatermarkError> {
        if options.text.trim().is_empty() {
            return Err(WatermarkError::RenderError(
                "cannot render empty text".to_string(),
            ));
        }
        if !(options.font_size.is_finite() && options.font_size > 0.0) {
            return Err(WatermarkError::RenderError(format!(
                "invalid font size {}",
                options.font_size
            )));
        }

        let scale = PxScale::from(options.font_size);
        let scaled = self.font.as_scaled(scale);

        let (width, height) = self.measure(&options.text, options.font_size);
        let mut canvas = RgbaImage::new(width.max(1), height.max(1));
        let alpha = options.opacity.clamp(0.0, 1.0) * 255.0;

        let baseline_y = TEXT_PADDING as f32 / 2.0 + scaled.ascent();
        let mut cursor_x = TEXT_PADDING as f32 / 2.0;
        let mut prev: Option<GlyphId> = None;

        for c in options.text.chars() {
            let glyph_id = scaled.glyph_id(c);
            if let Some(prev) = prev {
                cursor_x += scaled.kern(prev, glyph_id);
            }

            let glyph = glyph_id.with_scale_and_position(scale, ab_glyph::point(cursor_x, baseline_y));
            if let Some(outlined) = self.font.outline_glyph(glyph) {
                let bounds = outlined.px_bounds();
                outlined.draw(|px, py, coverage| {
                    let x = px as i32 + bounds.min.x as i32;
                    let y = py as i32 + bounds.min.y as i32;
                    if x < 0 || y < 0 || x >= canvas.width() as i32 || y >= canvas.height() as i32
                    {
                        return;
                    }

                    let pixel_alpha = (coverage.clamp(0.0, 1.0) * alpha) as u8;
                    let existing = canvas.get_pixel_mut(x as u32, y as u32);
                    // Overlapping glyph edges keep the stronger coverage
                    if pixel_alpha > existing[3] {
                        *existing = Rgba([
                            options.color.r,
                            options.color.g,
                            options.color.b,
                            pixel_alpha,
                        ]);
                    }
                });
            }

            cursor_x += scaled.h_advance(glyph_id);
            prev = Some(glyph_id);
        }

        Ok(canvas)
    }
}
