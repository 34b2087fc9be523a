//! Pixel buffer adapter: the measured image and its optional background frame.
//!
//! A [`Scene`] owns the decoded RGB raster (plus an optional background
//! exposure of identical dimensions) for the lifetime of a measurement
//! session. Pipeline stages borrow read-only views; every transform
//! (enhancement, background subtraction) produces a fresh buffer.

use image::{ImageBuffer, Luma, Rgb, RgbImage};

/// Rec.601 luminance weights, matching the reported brightness definition.
pub const LUMA_WEIGHTS: [f64; 3] = [0.299, 0.587, 0.114];

// ── Error type ─────────────────────────────────────────────────────────────

/// Errors raised when assembling a scene.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// Background raster dimensions differ from the image.
    BackgroundSizeMismatch {
        /// Image dimensions (width, height).
        image: (u32, u32),
        /// Background dimensions (width, height).
        background: (u32, u32),
    },
}

impl std::fmt::Display for SceneError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BackgroundSizeMismatch { image, background } => write!(
                f,
                "background size {}x{} does not match image size {}x{}",
                background.0, background.1, image.0, image.1
            ),
        }
    }
}

impl std::error::Error for SceneError {}

// ── Scene ──────────────────────────────────────────────────────────────────

/// One loaded image plus an optional background frame of the same size.
#[derive(Debug, Clone)]
pub struct Scene {
    image: RgbImage,
    background: Option<RgbImage>,
}

impl Scene {
    /// Wrap a decoded image without a background frame.
    pub fn new(image: RgbImage) -> Self {
        Self {
            image,
            background: None,
        }
    }

    /// Wrap an image with a background exposure of identical dimensions.
    pub fn with_background(image: RgbImage, background: RgbImage) -> Result<Self, SceneError> {
        if image.dimensions() != background.dimensions() {
            return Err(SceneError::BackgroundSizeMismatch {
                image: image.dimensions(),
                background: background.dimensions(),
            });
        }
        Ok(Self {
            image,
            background: Some(background),
        })
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn background(&self) -> Option<&RgbImage> {
        self.background.as_ref()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Image with the background frame subtracted per channel, saturating
    /// at zero. Returns a plain copy when no background is present.
    pub fn background_subtracted(&self) -> RgbImage {
        match &self.background {
            None => self.image.clone(),
            Some(bg) => {
                let mut out = self.image.clone();
                for (dst, src) in out.pixels_mut().zip(bg.pixels()) {
                    let Rgb([r, g, b]) = *dst;
                    let Rgb([br, bg_, bb]) = *src;
                    *dst = Rgb([
                        r.saturating_sub(br),
                        g.saturating_sub(bg_),
                        b.saturating_sub(bb),
                    ]);
                }
                out
            }
        }
    }
}

// ── Luminance helpers ──────────────────────────────────────────────────────

/// Rec.601 luminance of one RGB triple.
#[inline]
pub fn luminance(r: f64, g: f64, b: f64) -> f64 {
    LUMA_WEIGHTS[0] * r + LUMA_WEIGHTS[1] * g + LUMA_WEIGHTS[2] * b
}

/// Luminance plane of an RGB image as `f32` in [0, 255].
pub fn luma_plane(image: &RgbImage) -> ImageBuffer<Luma<f32>, Vec<f32>> {
    let (w, h) = image.dimensions();
    let mut out = ImageBuffer::new(w, h);
    for (x, y, px) in image.enumerate_pixels() {
        let Rgb([r, g, b]) = *px;
        out.put_pixel(
            x,
            y,
            Luma([luminance(r as f64, g as f64, b as f64) as f32]),
        );
    }
    out
}
