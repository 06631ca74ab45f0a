//! Alpha blending of watermark layers onto a target image.
//!
//! A [`Compositor`] collects layers and applies all of them to the target in
//! a single pass, in insertion order. Layers that fall partially outside the
//! target are clipped.

use super::position::{
    calculate_centered_position, calculate_grid_positions, ImageDimensions, PlacementPosition,
    WatermarkDimensions,
};
use image::{Rgba, RgbaImage};
use std::sync::Arc;

/// One placement of a watermark image on the target.
#[derive(Clone)]
pub struct WatermarkLayer {
    /// The watermark image (RGBA), shared between tiled copies.
    pub image: Arc<RgbaImage>,
    /// Top-left corner on the target.
    pub position: PlacementPosition,
    /// Multiplier on the image's own alpha, 0.0 to 1.0.
    pub opacity: f32,
}

impl std::fmt::Debug for WatermarkLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatermarkLayer")
            .field("dimensions", &(self.image.width(), self.image.height()))
            .field("position", &self.position)
            .field("opacity", &self.opacity)
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct Compositor {
    layers: Vec<WatermarkLayer>,
}

impl Compositor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_layer(&mut self, layer: WatermarkLayer) {
        self.layers.push(layer);
    }

    pub fn extend(&mut self, layers: impl IntoIterator<Item = WatermarkLayer>) {
        self.layers.extend(layers);
    }

    /// Blend every layer onto `target`, in insertion order.
    pub fn apply(&self, target: &mut RgbaImage) {
        for layer in &self.layers {
            blend_layer(target, layer);
        }
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn layers(&self) -> &[WatermarkLayer] {
        &self.layers
    }
}

/// Overlap between a layer and the target, in target coordinates.
struct ClipRect {
    left: u32,
    top: u32,
    right: u32,
    bottom: u32,
}

impl ClipRect {
    fn of(target: &RgbaImage, layer: &WatermarkLayer) -> Option<Self> {
        let (tw, th) = (target.width() as i64, target.height() as i64);
        let (x, y) = (layer.position.x as i64, layer.position.y as i64);

        let left = x.clamp(0, tw);
        let top = y.clamp(0, th);
        let right = (x + layer.image.width() as i64).clamp(0, tw);
        let bottom = (y + layer.image.height() as i64).clamp(0, th);

        (left < right && top < bottom).then(|| Self {
            left: left as u32,
            top: top as u32,
            right: right as u32,
            bottom: bottom as u32,
        })
    }
}

fn blend_layer(target: &mut RgbaImage, layer: &WatermarkLayer) {
    let Some(clip) = ClipRect::of(target, layer) else {
        return;
    };
    let opacity = layer.opacity.clamp(0.0, 1.0);
    if opacity == 0.0 {
        return;
    }

    // Offsets from target space into layer space; non-negative inside the clip
    let dx = (clip.left as i64 - layer.position.x as i64) as u32;
    let dy = (clip.top as i64 - layer.position.y as i64) as u32;

    for y in clip.top..clip.bottom {
        let src_y = y - clip.top + dy;
        for x in clip.left..clip.right {
            let src = *layer.image.get_pixel(x - clip.left + dx, src_y);
            if src[3] == 0 {
                continue;
            }
            let dst = target.get_pixel_mut(x, y);
            *dst = blend_pixels(*dst, src, opacity);
        }
    }
}

/// Source-over compositing of `foreground`, scaled by `opacity`, onto
/// `background`. Channels are straight (not premultiplied) alpha.
pub(crate) fn blend_pixels(background: Rgba<u8>, foreground: Rgba<u8>, opacity: f32) -> Rgba<u8> {
    let src_a = f32::from(foreground[3]) / 255.0 * opacity.clamp(0.0, 1.0);
    let dst_a = f32::from(background[3]) / 255.0;
    let dst_weight = dst_a * (1.0 - src_a);
    let out_a = src_a + dst_weight;

    if out_a <= f32::EPSILON {
        return Rgba([0; 4]);
    }

    let mut out = [0u8; 4];
    for (c, slot) in out.iter_mut().take(3).enumerate() {
        let mixed = f32::from(foreground[c]) * src_a + f32::from(background[c]) * dst_weight;
        *slot = (mixed / out_a).round().clamp(0.0, 255.0) as u8;
    }
    out[3] = (out_a * 255.0).round() as u8;
    Rgba(out)
}

/// Layers placing one copy of `watermark` in each cell of a grid.
pub fn create_grid_layers(
    watermark: Arc<RgbaImage>,
    image_dims: &ImageDimensions,
    columns: u32,
    rows: u32,
    opacity: f32,
) -> Vec<WatermarkLayer> {
    let wm_dims = WatermarkDimensions {
        width: watermark.width(),
        height: watermark.height(),
    };

    calculate_grid_positions(image_dims, &wm_dims, columns, rows)
        .into_iter()
        .map(|position| WatermarkLayer {
            image: watermark.clone(),
            position,
            opacity,
        })
        .collect()
}

/// A single layer centered on the image.
pub fn create_centered_layer(
    watermark: RgbaImage,
    image_dims: &ImageDimensions,
    opacity: f32,
) -> WatermarkLayer {
    let wm_dims = WatermarkDimensions {
        width: watermark.width(),
        height: watermark.height(),
    };

    WatermarkLayer {
        position: calculate_centered_position(image_dims, &wm_dims),
        image: Arc::new(watermark),
        opacity,
    }
}
