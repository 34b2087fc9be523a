//! Dark-region enhancement: gamma lift plus tile-local contrast equalization.
//!
//! Detection aid only. The filter brightens dim LEDs without saturating lit
//! ones, at the cost of distorting absolute intensity, so measurement reads
//! the un-enhanced buffer unless a run explicitly opts into the enhanced one.
//! The input is never mutated; a new buffer is returned.

use image::{Rgb, RgbImage};
use serde::{Deserialize, Serialize};

use crate::scene::luminance;

/// Enhancement controls.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhanceConfig {
    /// Gamma exponent; values below 1 brighten shadows.
    pub gamma: f32,
    /// Histogram clip limit as a multiple of the uniform bin height.
    pub clip_limit: f32,
    /// Number of equalization tiles per image axis.
    pub tiles: u32,
}

impl Default for EnhanceConfig {
    fn default() -> Self {
        Self {
            gamma: 0.5,
            clip_limit: 3.0,
            tiles: 8,
        }
    }
}

/// Apply gamma correction and contrast-limited adaptive histogram
/// equalization to the luminance channel, preserving chrominance by scaling
/// each RGB channel with the luminance gain.
pub fn enhance(image: &RgbImage, config: &EnhanceConfig) -> RgbImage {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return image.clone();
    }

    let gamma_lut = build_gamma_lut(config.gamma);
    let mut work = image.clone();
    for px in work.pixels_mut() {
        let Rgb([r, g, b]) = *px;
        *px = Rgb([
            gamma_lut[r as usize],
            gamma_lut[g as usize],
            gamma_lut[b as usize],
        ]);
    }

    let luma: Vec<u8> = work
        .pixels()
        .map(|&Rgb([r, g, b])| luminance(r as f64, g as f64, b as f64).round() as u8)
        .collect();
    let equalized = clahe(&luma, w, h, config);

    let mut out = work;
    for (i, px) in out.pixels_mut().enumerate() {
        let before = luma[i] as f64;
        let after = equalized[i] as f64;
        if before <= 0.0 {
            continue;
        }
        let gain = after / before;
        let Rgb([r, g, b]) = *px;
        *px = Rgb([
            scale_channel(r, gain),
            scale_channel(g, gain),
            scale_channel(b, gain),
        ]);
    }
    out
}

fn build_gamma_lut(gamma: f32) -> [u8; 256] {
    let g = gamma as f64;
    let mut lut = [0u8; 256];
    for (v, slot) in lut.iter_mut().enumerate() {
        *slot = (255.0 * (v as f64 / 255.0).powf(g)).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

#[inline]
fn scale_channel(v: u8, gain: f64) -> u8 {
    (v as f64 * gain).round().clamp(0.0, 255.0) as u8
}

/// Contrast-limited adaptive histogram equalization over a u8 plane.
///
/// Per-tile clipped histograms yield per-tile mapping LUTs; each pixel is
/// remapped by bilinear interpolation between the four nearest tile LUTs.
fn clahe(plane: &[u8], w: u32, h: u32, config: &EnhanceConfig) -> Vec<u8> {
    let tiles = config.tiles.max(1).min(w).min(h) as usize;
    let w = w as usize;
    let h = h as usize;
    let tile_w = w.div_ceil(tiles);
    let tile_h = h.div_ceil(tiles);

    // One 256-entry mapping per tile.
    let mut luts = vec![[0u8; 256]; tiles * tiles];
    for ty in 0..tiles {
        for tx in 0..tiles {
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            let x1 = (x0 + tile_w).min(w);
            let y1 = (y0 + tile_h).min(h);

            let mut hist = [0u32; 256];
            for y in y0..y1 {
                for x in x0..x1 {
                    hist[plane[y * w + x] as usize] += 1;
                }
            }
            let n_px = ((x1 - x0) * (y1 - y0)) as u32;
            clip_histogram(&mut hist, n_px, config.clip_limit);

            let mut cdf = 0u32;
            let lut = &mut luts[ty * tiles + tx];
            for (v, slot) in lut.iter_mut().enumerate() {
                cdf += hist[v];
                *slot = ((cdf as f64 / n_px.max(1) as f64) * 255.0).round() as u8;
            }
        }
    }

    let max_tile = (tiles - 1) as f64;
    let mut out = vec![0u8; plane.len()];
    for y in 0..h {
        let tyf = ((y as f64 + 0.5) / tile_h as f64 - 0.5).clamp(0.0, max_tile);
        let ty0 = tyf.floor() as usize;
        let ty1 = (ty0 + 1).min(tiles - 1);
        let fy = tyf - ty0 as f64;
        for x in 0..w {
            let txf = ((x as f64 + 0.5) / tile_w as f64 - 0.5).clamp(0.0, max_tile);
            let tx0 = txf.floor() as usize;
            let tx1 = (tx0 + 1).min(tiles - 1);
            let fx = txf - tx0 as f64;

            let v = plane[y * w + x] as usize;
            let v00 = luts[ty0 * tiles + tx0][v] as f64;
            let v01 = luts[ty0 * tiles + tx1][v] as f64;
            let v10 = luts[ty1 * tiles + tx0][v] as f64;
            let v11 = luts[ty1 * tiles + tx1][v] as f64;
            let top = v00 * (1.0 - fx) + v01 * fx;
            let bot = v10 * (1.0 - fx) + v11 * fx;
            out[y * w + x] = (top * (1.0 - fy) + bot * fy).round() as u8;
        }
    }
    out
}

/// Clip histogram bins at `clip_limit` times the uniform height and spread
/// the clipped mass evenly across all bins.
fn clip_histogram(hist: &mut [u32; 256], n_px: u32, clip_limit: f32) {
    if clip_limit <= 0.0 {
        return;
    }
    let limit = ((clip_limit as f64 * n_px as f64 / 256.0).ceil() as u32).max(1);
    let mut excess = 0u32;
    for bin in hist.iter_mut() {
        if *bin > limit {
            excess += *bin - limit;
            *bin = limit;
        }
    }
    let share = excess / 256;
    let remainder = (excess % 256) as usize;
    for (i, bin) in hist.iter_mut().enumerate() {
        *bin += share + u32::from(i < remainder);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enhancement_brightens_dark_pixels() {
        let dark = RgbImage::from_pixel(32, 32, Rgb([20, 20, 20]));
        let out = enhance(&dark, &EnhanceConfig::default());
        let p = out.get_pixel(16, 16);
        assert!(p[0] > 20, "gamma lift should brighten, got {}", p[0]);
    }

    #[test]
    fn input_buffer_is_untouched() {
        let img = RgbImage::from_pixel(16, 16, Rgb([40, 80, 120]));
        let copy = img.clone();
        let _ = enhance(&img, &EnhanceConfig::default());
        assert_eq!(img, copy);
    }

    #[test]
    fn black_stays_black() {
        let img = RgbImage::from_pixel(16, 16, Rgb([0, 0, 0]));
        let out = enhance(&img, &EnhanceConfig::default());
        assert_eq!(*out.get_pixel(8, 8), Rgb([0, 0, 0]));
    }

    #[test]
    fn channel_ratios_are_roughly_preserved() {
        let img = RgbImage::from_pixel(32, 32, Rgb([30, 60, 90]));
        let out = enhance(&img, &EnhanceConfig::default());
        let p = out.get_pixel(16, 16);
        // The gamma stage moves channels independently, but the
        // equalization gain is shared, so ordering must survive.
        assert!(p[0] < p[1] && p[1] < p[2], "got {:?}", p);
    }

    #[test]
    fn gamma_lut_is_monotonic() {
        let lut = build_gamma_lut(0.5);
        for v in 1..256 {
            assert!(lut[v] >= lut[v - 1]);
        }
        assert_eq!(lut[0], 0);
        assert_eq!(lut[255], 255);
    }
}
