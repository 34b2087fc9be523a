//! LED pitch estimation from the 2D spectrum of the luminance plane.
//!
//! A regular LED array is periodic along both image axes, so its spectrum
//! carries a dominant peak away from DC on each axis. The peak bin gives the
//! center-to-center spacing. The estimate only scales the plausible blob
//! area band in blob filtering; it is never a position source.

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use serde::{Deserialize, Serialize};

/// Estimated LED center-to-center spacing per image axis.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PitchEstimate {
    /// Horizontal spacing in pixels.
    pub horizontal_px: f64,
    /// Vertical spacing in pixels.
    pub vertical_px: f64,
}

impl PitchEstimate {
    /// Mean of the two axis spacings.
    pub fn mean_px(&self) -> f64 {
        0.5 * (self.horizontal_px + self.vertical_px)
    }
}

/// Smallest plane side the spectrum peak search is attempted on.
const MIN_SIDE: usize = 16;

/// Estimate the dominant periodicity of a row-major `w`×`h` luminance plane.
///
/// Returns `None` when either axis has no spectral peak clearing
/// `min_peak_ratio` times the median profile magnitude, which covers flat,
/// noisy and aperiodic scenes.
pub(crate) fn estimate_pitch(
    luma: &[f32],
    w: usize,
    h: usize,
    min_peak_ratio: f64,
) -> Option<PitchEstimate> {
    debug_assert_eq!(luma.len(), w * h);
    if w < MIN_SIDE || h < MIN_SIDE {
        return None;
    }

    // DC removal keeps the mask/background plateau out of the low bins.
    let mean = luma.iter().copied().sum::<f32>() / (w * h) as f32;
    let mut spectrum: Vec<Complex<f32>> = luma
        .iter()
        .map(|&v| Complex::new(v - mean, 0.0))
        .collect();

    let mut planner = FftPlanner::<f32>::new();
    let row_fft = planner.plan_fft_forward(w);
    for row in spectrum.chunks_exact_mut(w) {
        row_fft.process(row);
    }

    let col_fft = planner.plan_fft_forward(h);
    let mut column = vec![Complex::new(0.0f32, 0.0); h];
    for x in 0..w {
        for y in 0..h {
            column[y] = spectrum[y * w + x];
        }
        col_fft.process(&mut column);
        for y in 0..h {
            spectrum[y * w + x] = column[y];
        }
    }

    // Collapse the magnitude spectrum onto each axis.
    let mut profile_u = vec![0.0f64; w];
    let mut profile_v = vec![0.0f64; h];
    for y in 0..h {
        for x in 0..w {
            let mag = spectrum[y * w + x].norm() as f64;
            profile_u[x] += mag;
            profile_v[y] += mag;
        }
    }

    let horizontal = axis_pitch(&profile_u, min_peak_ratio)?;
    let vertical = axis_pitch(&profile_v, min_peak_ratio)?;
    Some(PitchEstimate {
        horizontal_px: horizontal,
        vertical_px: vertical,
    })
}

/// Dominant period of one axis profile, with parabolic sub-bin refinement.
fn axis_pitch(profile: &[f64], min_peak_ratio: f64) -> Option<f64> {
    let n = profile.len();
    // Bins 0..2 are DC and whole-image-scale trends; past n/2 mirrors.
    let lo = 2;
    let hi = n / 2;
    if hi <= lo {
        return None;
    }

    let (mut peak_bin, mut peak_val) = (lo, profile[lo]);
    for (bin, &v) in profile.iter().enumerate().take(hi + 1).skip(lo) {
        if v > peak_val {
            peak_bin = bin;
            peak_val = v;
        }
    }

    let mut sorted: Vec<f64> = profile[lo..=hi].to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).expect("finite magnitudes"));
    let median = sorted[sorted.len() / 2];
    if peak_val < min_peak_ratio * median.max(f64::EPSILON) {
        return None;
    }

    let delta = if peak_bin > lo && peak_bin < hi {
        let prev = profile[peak_bin - 1];
        let next = profile[peak_bin + 1];
        let denom = prev - 2.0 * peak_val + next;
        if denom.abs() > f64::EPSILON {
            (0.5 * (prev - next) / denom).clamp(-0.5, 0.5)
        } else {
            0.0
        }
    } else {
        0.0
    };

    Some(n as f64 / (peak_bin as f64 + delta))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn periodic_plane(w: usize, h: usize, pitch: usize) -> Vec<f32> {
        let mut luma = vec![0.0f32; w * h];
        for cy in (pitch / 2..h).step_by(pitch) {
            for cx in (pitch / 2..w).step_by(pitch) {
                for dy in 0..3 {
                    for dx in 0..3 {
                        let x = cx + dx - 1;
                        let y = cy + dy - 1;
                        if x < w && y < h {
                            luma[y * w + x] = 220.0;
                        }
                    }
                }
            }
        }
        luma
    }

    #[test]
    fn recovers_grid_pitch() {
        let luma = periodic_plane(128, 128, 16);
        let est = estimate_pitch(&luma, 128, 128, 4.0).expect("periodic plane has a pitch");
        assert!(
            (est.horizontal_px - 16.0).abs() < 1.5,
            "horizontal {}",
            est.horizontal_px
        );
        assert!(
            (est.vertical_px - 16.0).abs() < 1.5,
            "vertical {}",
            est.vertical_px
        );
    }

    #[test]
    fn flat_plane_has_no_pitch() {
        let luma = vec![128.0f32; 64 * 64];
        assert!(estimate_pitch(&luma, 64, 64, 4.0).is_none());
    }

    #[test]
    fn tiny_plane_is_rejected() {
        let luma = vec![0.0f32; 8 * 8];
        assert!(estimate_pitch(&luma, 8, 8, 4.0).is_none());
    }
}
