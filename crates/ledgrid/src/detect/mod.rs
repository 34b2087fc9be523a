//! Automatic LED candidate detection.
//!
//! Stages: optional boundary masking, Gaussian pre-blur, spectral pitch
//! estimation, Otsu binarization over the masked histogram, and
//! connected-component extraction with a pitch-scaled plausible-area band.
//!
//! Under-yield is a normal outcome, not an error: when fewer than
//! [`DetectConfig::min_candidates`] blobs survive filtering the candidate
//! list comes back empty and [`DetectionOutcome::n_survivors`] carries the
//! count for the caller to surface.

mod blobs;
mod pitch;
mod threshold;

pub use pitch::PitchEstimate;

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::grid::{Boundary, Point};
use crate::scene::luma_plane;

/// Configuration for candidate detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectConfig {
    /// Gaussian sigma applied to the luminance plane before thresholding.
    pub blur_sigma: f32,
    /// Minimum surviving blob count for a usable detection.
    pub min_candidates: usize,
    /// Minimum blob area in pixels; smaller blobs are noise specks.
    pub min_area_px: usize,
    /// Maximum blob side as a fraction of the estimated pitch; blobs larger
    /// than the squared bound are merged neighbors or glare.
    pub max_area_frac_of_pitch: f64,
    /// Maximum blob area in pixels when no pitch estimate is available.
    pub fallback_max_area_px: usize,
    /// Spectral peak must exceed this multiple of the median profile
    /// magnitude for a pitch estimate to be accepted.
    pub pitch_peak_ratio: f64,
}

impl Default for DetectConfig {
    fn default() -> Self {
        Self {
            blur_sigma: 1.0,
            min_candidates: 4,
            min_area_px: 10,
            max_area_frac_of_pitch: 0.75,
            fallback_max_area_px: 4096,
            pitch_peak_ratio: 4.0,
        }
    }
}

/// A raw detected LED blob, not yet bound to any grid slot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Candidate {
    /// Centroid x in pixels.
    pub x: f64,
    /// Centroid y in pixels.
    pub y: f64,
    /// Blob area in pixels.
    pub area: usize,
    /// Mean luminance over the blob's pixels.
    pub confidence: f32,
}

impl Candidate {
    /// Centroid as a point.
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Result of one detection run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectionOutcome {
    /// Surviving candidates, best confidence first. Empty when fewer than
    /// `min_candidates` survived.
    pub candidates: Vec<Candidate>,
    /// Estimated LED spacing, when the scene is periodic enough.
    pub pitch: Option<PitchEstimate>,
    /// Number of blobs that survived area filtering, reported even when the
    /// candidate list is withheld for under-yield.
    pub n_survivors: usize,
}

/// Detect LED candidates in `image`, optionally restricted to `boundary`.
///
/// Pixels outside the boundary are zeroed and contribute nothing to the
/// threshold histogram or the pitch spectrum.
pub fn detect(
    image: &RgbImage,
    boundary: Option<&Boundary>,
    config: &DetectConfig,
) -> DetectionOutcome {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return DetectionOutcome::default();
    }
    let w = w as usize;
    let h = h as usize;

    let luma_img = luma_plane(image);
    let mut luma: Vec<f32> = luma_img.as_raw().clone();

    let mask: Option<Vec<bool>> = boundary.map(|b| {
        let mut m = vec![false; w * h];
        for y in 0..h {
            for x in 0..w {
                m[y * w + x] = b.contains(Point::new(x as f64, y as f64));
            }
        }
        m
    });
    if let Some(mask) = &mask {
        for (v, &keep) in luma.iter_mut().zip(mask.iter()) {
            if !keep {
                *v = 0.0;
            }
        }
    }

    let blurred: Vec<f32> = if config.blur_sigma > 0.0 {
        let buf = image::ImageBuffer::<image::Luma<f32>, Vec<f32>>::from_raw(
            w as u32,
            h as u32,
            luma.clone(),
        )
        .expect("plane dimensions match");
        imageproc::filter::gaussian_blur_f32(&buf, config.blur_sigma).into_raw()
    } else {
        luma.clone()
    };

    let pitch = pitch::estimate_pitch(&blurred, w, h, config.pitch_peak_ratio);
    if let Some(p) = &pitch {
        tracing::debug!(
            "Pitch estimate: {:.1}px horizontal, {:.1}px vertical",
            p.horizontal_px,
            p.vertical_px
        );
    }

    let hist = threshold::masked_histogram(&blurred, mask.as_deref());
    let level = threshold::otsu_level(&hist);
    tracing::debug!("Otsu threshold: {}", level);

    let mut foreground: Vec<bool> = blurred.iter().map(|&v| v > level as f32).collect();
    if let Some(mask) = &mask {
        for (fg, &keep) in foreground.iter_mut().zip(mask.iter()) {
            *fg &= keep;
        }
    }

    let max_area = pitch
        .as_ref()
        .map(|p| {
            let side = config.max_area_frac_of_pitch * p.mean_px();
            (side * side).round() as usize
        })
        .unwrap_or(config.fallback_max_area_px)
        .max(config.min_area_px);

    let mut candidates: Vec<Candidate> = blobs::extract_blobs(&foreground, &luma, w, h)
        .into_iter()
        .filter(|b| (config.min_area_px..=max_area).contains(&b.area))
        .map(|b| {
            let (x, y) = b.centroid();
            Candidate {
                x,
                y,
                area: b.area,
                confidence: b.mean_luma(),
            }
        })
        .collect();
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.y.total_cmp(&b.y))
            .then(a.x.total_cmp(&b.x))
    });

    let n_survivors = candidates.len();
    if n_survivors < config.min_candidates {
        tracing::info!(
            "Detection under-yield: {} candidates, {} required",
            n_survivors,
            config.min_candidates
        );
        return DetectionOutcome {
            candidates: Vec::new(),
            pitch,
            n_survivors,
        };
    }

    tracing::info!("Detected {} LED candidates", n_survivors);
    DetectionOutcome {
        candidates,
        pitch,
        n_survivors,
    }
}
