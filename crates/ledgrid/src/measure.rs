//! Brightness sampling over resolved slot positions.
//!
//! Each resolved slot is sampled over a square window centered at its pixel
//! position, clipped to the image bounds (LEDs near the edge are common, so
//! clipping is silent). Channel means feed the Rec.601 luminance that is
//! reported as brightness.

use image::{Rgb, RgbImage};
use serde::{Deserialize, Serialize};

use crate::assign::{PositionSource, SlotGrid};
use crate::grid::Point;
use crate::scene::{luminance, Scene};
use crate::Measurement;

// ── Error type ─────────────────────────────────────────────────────────────

/// Errors for measurement parameters and manual positioning input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeasureError {
    /// Manual click count differs from rows × cols.
    CountMismatch {
        /// Required number of points.
        expected: usize,
        /// Provided number of points.
        got: usize,
    },
    /// Sampling window side must be odd and within 3..=15.
    InvalidSampleSize {
        /// Provided window side.
        got: u32,
    },
}

impl std::fmt::Display for MeasureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CountMismatch { expected, got } => {
                write!(f, "manual positioning needs {} points, got {}", expected, got)
            }
            Self::InvalidSampleSize { got } => {
                write!(f, "sample size must be odd and within 3..=15, got {}", got)
            }
        }
    }
}

impl std::error::Error for MeasureError {}

// ── Method & params ────────────────────────────────────────────────────────

/// Measurement method selected for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasureMethod {
    /// Use resolved positions as-is; unresolved slots are skipped.
    #[default]
    Direct,
    /// Interpolate positions for unresolved slots before sampling.
    Interpolation,
    /// Positions come one-to-one from user clicks in row-major order.
    Manual,
}

impl MeasureMethod {
    fn from_source(source: PositionSource) -> Self {
        match source {
            PositionSource::Direct => Self::Direct,
            PositionSource::Interpolated => Self::Interpolation,
            PositionSource::Manual => Self::Manual,
        }
    }
}

/// Sampling controls.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SampleParams {
    /// Square window side in pixels; odd, 3..=15.
    pub sample_size: u32,
    /// Subtract the scene's background frame before averaging.
    pub subtract_background: bool,
}

impl Default for SampleParams {
    fn default() -> Self {
        Self {
            sample_size: 5,
            subtract_background: false,
        }
    }
}

impl SampleParams {
    fn validate(&self) -> Result<(), MeasureError> {
        let s = self.sample_size;
        if !(3..=15).contains(&s) || s % 2 == 0 {
            return Err(MeasureError::InvalidSampleSize { got: s });
        }
        Ok(())
    }
}

// ── Sampling ───────────────────────────────────────────────────────────────

/// Measure every resolved slot of `slots` on the scene.
///
/// Each Measurement's `method` reflects how that slot's position was
/// obtained, and `interpolated` mirrors the slot's flag. Unresolved slots
/// produce no Measurement. Output is row-major over the resolved slots.
pub fn measure(
    scene: &Scene,
    slots: &SlotGrid,
    params: &SampleParams,
) -> Result<Vec<Measurement>, MeasureError> {
    params.validate()?;

    let subtracted;
    let img: &RgbImage = if params.subtract_background && scene.background().is_some() {
        subtracted = scene.background_subtracted();
        &subtracted
    } else {
        scene.image()
    };

    let mut out = Vec::with_capacity(slots.n_resolved());
    for slot in slots.iter() {
        let Some(resolved) = slot.resolved else {
            continue;
        };
        let (r, g, b) = window_mean(img, resolved.point, params.sample_size);
        let brightness = luminance(r, g, b).clamp(0.0, 255.0);
        out.push(Measurement {
            row: slot.row,
            col: slot.col,
            brightness,
            r,
            g,
            b,
            interpolated: resolved.source == PositionSource::Interpolated,
            method: MeasureMethod::from_source(resolved.source),
        });
    }
    tracing::info!("Measured {} of {} slots", out.len(), slots.rows() * slots.cols());
    Ok(out)
}

/// Per-channel mean over the clipped square window centered at `center`.
fn window_mean(img: &RgbImage, center: Point, size: u32) -> (f64, f64, f64) {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return (0.0, 0.0, 0.0);
    }
    let half = (size / 2) as i64;
    let cx = center.x.round() as i64;
    let cy = center.y.round() as i64;

    let x0 = (cx - half).clamp(0, w as i64 - 1);
    let x1 = (cx + half).clamp(0, w as i64 - 1);
    let y0 = (cy - half).clamp(0, h as i64 - 1);
    let y1 = (cy + half).clamp(0, h as i64 - 1);

    let mut sum = [0.0f64; 3];
    let mut n = 0usize;
    for y in y0..=y1 {
        for x in x0..=x1 {
            let Rgb([r, g, b]) = *img.get_pixel(x as u32, y as u32);
            sum[0] += r as f64;
            sum[1] += g as f64;
            sum[2] += b as f64;
            n += 1;
        }
    }
    let n = n.max(1) as f64;
    (sum[0] / n, sum[1] / n, sum[2] / n)
}

/// Build a fully resolved grid from an ordered manual click list.
///
/// Point `i` (row-major) becomes slot `(i / cols, i % cols)`. The count must
/// equal `rows * cols`; otherwise no grid is produced.
pub fn manual_slots(
    points: &[Point],
    rows: usize,
    cols: usize,
) -> Result<SlotGrid, MeasureError> {
    let expected = rows * cols;
    if points.len() != expected {
        return Err(MeasureError::CountMismatch {
            expected,
            got: points.len(),
        });
    }
    let mut grid = SlotGrid::empty(rows, cols);
    for (slot, &point) in grid.slots_mut().iter_mut().zip(points.iter()) {
        slot.resolved = Some(crate::assign::ResolvedPosition {
            point,
            source: PositionSource::Manual,
        });
    }
    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assign::ResolvedPosition;

    fn solid_scene(w: u32, h: u32, rgb: [u8; 3]) -> Scene {
        Scene::new(RgbImage::from_pixel(w, h, Rgb(rgb)))
    }

    fn single_slot(x: f64, y: f64) -> SlotGrid {
        let mut grid = SlotGrid::empty(1, 1);
        grid.slots_mut()[0].resolved = Some(ResolvedPosition {
            point: Point::new(x, y),
            source: PositionSource::Direct,
        });
        grid
    }

    #[test]
    fn rejects_even_and_out_of_range_sizes() {
        let scene = solid_scene(20, 20, [10; 3]);
        let grid = single_slot(10.0, 10.0);
        for bad in [0u32, 2, 4, 17] {
            let params = SampleParams {
                sample_size: bad,
                subtract_background: false,
            };
            assert_eq!(
                measure(&scene, &grid, &params),
                Err(MeasureError::InvalidSampleSize { got: bad })
            );
        }
    }

    #[test]
    fn brightness_scales_with_uniform_intensity() {
        let grid = single_slot(10.0, 10.0);
        let params = SampleParams::default();
        let dim = measure(&solid_scene(20, 20, [40, 40, 40]), &grid, &params).unwrap();
        let lit = measure(&solid_scene(20, 20, [120, 120, 120]), &grid, &params).unwrap();
        assert!((lit[0].brightness / dim[0].brightness - 3.0).abs() < 1e-9);
    }

    #[test]
    fn identical_background_measures_zero() {
        let img = RgbImage::from_pixel(16, 16, Rgb([90, 60, 30]));
        let scene = Scene::with_background(img.clone(), img).unwrap();
        let grid = single_slot(8.0, 8.0);
        let params = SampleParams {
            sample_size: 5,
            subtract_background: true,
        };
        let m = measure(&scene, &grid, &params).unwrap();
        assert_eq!(m[0].brightness, 0.0);
        assert_eq!((m[0].r, m[0].g, m[0].b), (0.0, 0.0, 0.0));
    }

    #[test]
    fn edge_window_is_clipped_not_rejected() {
        // Bright corner pixel; window at (0,0) covers the 3x3 clipped region.
        let mut img = RgbImage::new(16, 16);
        for y in 0..3 {
            for x in 0..3 {
                img.put_pixel(x, y, Rgb([90, 90, 90]));
            }
        }
        let scene = Scene::new(img);
        let grid = single_slot(0.0, 0.0);
        let params = SampleParams {
            sample_size: 5,
            subtract_background: false,
        };
        let m = measure(&scene, &grid, &params).unwrap();
        // Clipped window spans x,y in 0..=2: exactly the bright region.
        assert!((m[0].r - 90.0).abs() < 1e-9);
    }

    #[test]
    fn unresolved_slots_are_absent_from_output() {
        let scene = solid_scene(20, 20, [50; 3]);
        let mut grid = SlotGrid::empty(2, 2);
        grid.slots_mut()[3].resolved = Some(ResolvedPosition {
            point: Point::new(10.0, 10.0),
            source: PositionSource::Direct,
        });
        let m = measure(&scene, &grid, &SampleParams::default()).unwrap();
        assert_eq!(m.len(), 1);
        assert_eq!((m[0].row, m[0].col), (1, 1));
    }

    #[test]
    fn interpolated_slot_is_flagged() {
        let scene = solid_scene(20, 20, [50; 3]);
        let mut grid = SlotGrid::empty(1, 1);
        grid.slots_mut()[0].resolved = Some(ResolvedPosition {
            point: Point::new(10.0, 10.0),
            source: PositionSource::Interpolated,
        });
        let m = measure(&scene, &grid, &SampleParams::default()).unwrap();
        assert!(m[0].interpolated);
        assert_eq!(m[0].method, MeasureMethod::Interpolation);
    }

    #[test]
    fn manual_points_bind_row_major() {
        let points: Vec<Point> = (0..6)
            .map(|i| Point::new(i as f64 * 10.0, i as f64))
            .collect();
        let grid = manual_slots(&points, 2, 3).unwrap();
        for i in 0..6usize {
            let slot = grid.get(i / 3, i % 3).unwrap();
            assert_eq!(slot.position(), Some(points[i]));
            assert_eq!(slot.resolved.unwrap().source, PositionSource::Manual);
        }
    }

    #[test]
    fn manual_count_mismatch_fails() {
        let points = vec![Point::new(0.0, 0.0); 5];
        assert_eq!(
            manual_slots(&points, 2, 3),
            Err(MeasureError::CountMismatch {
                expected: 6,
                got: 5
            })
        );
    }
}
