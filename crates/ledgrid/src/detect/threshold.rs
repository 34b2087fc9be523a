//! Global binarization threshold from the masked luminance histogram.

/// 256-bin histogram over the masked-in pixels of a luminance plane.
///
/// Masked-out pixels contribute nothing; the threshold therefore reflects
/// only the region under consideration.
pub(crate) fn masked_histogram(luma: &[f32], mask: Option<&[bool]>) -> [u32; 256] {
    let mut hist = [0u32; 256];
    match mask {
        None => {
            for &v in luma {
                hist[bin(v)] += 1;
            }
        }
        Some(mask) => {
            for (&v, &keep) in luma.iter().zip(mask.iter()) {
                if keep {
                    hist[bin(v)] += 1;
                }
            }
        }
    }
    hist
}

#[inline]
fn bin(v: f32) -> usize {
    v.round().clamp(0.0, 255.0) as usize
}

/// Otsu's threshold: the level maximizing between-class variance.
///
/// Returns 0 for an empty or single-level histogram, which makes an all-dark
/// plane produce no foreground (nothing is strictly above the level).
pub(crate) fn otsu_level(hist: &[u32; 256]) -> u8 {
    let total: f64 = hist.iter().map(|&c| c as f64).sum();
    if total <= 0.0 {
        return 0;
    }
    let sum_total: f64 = hist
        .iter()
        .enumerate()
        .map(|(v, &c)| v as f64 * c as f64)
        .sum();

    let mut sum_background = 0.0;
    let mut weight_background = 0.0;
    let mut max_variance = f64::MIN;
    let mut threshold = 0u8;

    for (value, &count) in hist.iter().enumerate() {
        weight_background += count as f64;
        if weight_background == 0.0 {
            continue;
        }
        let weight_foreground = total - weight_background;
        if weight_foreground == 0.0 {
            break;
        }
        sum_background += value as f64 * count as f64;

        let mean_background = sum_background / weight_background;
        let mean_foreground = (sum_total - sum_background) / weight_foreground;
        let variance =
            weight_background * weight_foreground * (mean_background - mean_foreground).powi(2);
        if variance > max_variance {
            max_variance = variance;
            threshold = value as u8;
        }
    }
    threshold
}
