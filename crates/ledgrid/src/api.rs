//! High-level measurement API.
//!
//! [`Analyzer`] is the primary entry point: it wraps an [`AnalyzerConfig`]
//! and exposes one method per run shape. Create once, measure many scenes;
//! every call recomputes all derived state from its inputs, so the analyzer
//! is freely reusable across independent images.

use serde::{Deserialize, Serialize};

use crate::assign::AssignConfig;
use crate::detect::DetectConfig;
use crate::enhance::EnhanceConfig;
use crate::grid::{GridSpec, Point};
use crate::measure::{MeasureError, MeasureMethod, SampleParams};
use crate::pipeline;
use crate::scene::Scene;
use crate::MeasurementSet;

/// Top-level configuration aggregating all stage controls.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Candidate detection controls.
    pub detect: DetectConfig,
    /// Dark-region enhancement controls.
    pub enhance: EnhanceConfig,
    /// Candidate-to-slot assignment controls.
    pub assign: AssignConfig,
    /// Sampling window and background subtraction controls.
    pub sample: SampleParams,
    /// Measurement method for this run.
    pub method: MeasureMethod,
    /// Run the enhancement filter before detection.
    pub enhance_enabled: bool,
    /// Sample the enhanced buffer instead of the original pixels.
    ///
    /// Off by default: enhancement distorts absolute intensity and is meant
    /// as a detection aid.
    pub sample_enhanced: bool,
    /// Mask detection to the grid boundary instead of the whole image.
    pub restrict_to_boundary: bool,
}

/// Primary measurement interface.
///
/// # Examples
///
/// ```no_run
/// use ledgrid::{Analyzer, Boundary, GridSpec, Point, Scene};
///
/// let image = image::open("array.png").unwrap().to_rgb8();
/// let scene = Scene::new(image);
/// let boundary = Boundary::from_points(&[
///     Point::new(40.0, 30.0),
///     Point::new(600.0, 35.0),
///     Point::new(595.0, 580.0),
///     Point::new(35.0, 575.0),
/// ])
/// .unwrap();
/// let spec = GridSpec::square(8, boundary).unwrap();
///
/// let analyzer = Analyzer::new();
/// let result = analyzer.measure_grid(&scene, &spec).unwrap();
/// println!("{} LEDs measured", result.measurements.len());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    config: AnalyzerConfig,
}

impl Analyzer {
    /// Analyzer with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Analyzer with full config control.
    pub fn with_config(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    /// Access the current configuration.
    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Mutable access for post-construction tuning.
    pub fn config_mut(&mut self) -> &mut AnalyzerConfig {
        &mut self.config
    }

    /// Measure using positions mapped directly from the grid boundary,
    /// without running detection.
    pub fn measure_grid(
        &self,
        scene: &Scene,
        spec: &GridSpec,
    ) -> Result<MeasurementSet, MeasureError> {
        pipeline::run_grid(scene, spec, &self.config)
    }

    /// Measure using auto-detected candidate positions.
    ///
    /// Slots without a matching candidate stay unmeasured unless the
    /// configured method is [`MeasureMethod::Interpolation`]. A configured
    /// [`MeasureMethod::Manual`] does not apply here and behaves as
    /// [`MeasureMethod::Direct`]; use [`Analyzer::measure_manual`] instead.
    pub fn measure_auto(
        &self,
        scene: &Scene,
        spec: &GridSpec,
    ) -> Result<MeasurementSet, MeasureError> {
        pipeline::run_auto(scene, spec, &self.config)
    }

    /// Measure at externally supplied click positions, row-major.
    pub fn measure_manual(
        &self,
        scene: &Scene,
        points: &[Point],
        rows: usize,
        cols: usize,
    ) -> Result<MeasurementSet, MeasureError> {
        pipeline::run_manual(scene, points, rows, cols, &self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Boundary;
    use crate::measure::MeasureMethod;
    use crate::test_utils::draw_led_grid;

    fn rect_boundary(side: f64) -> Boundary {
        Boundary::from_points(&[
            Point::new(0.0, 0.0),
            Point::new(side, 0.0),
            Point::new(side, side),
            Point::new(0.0, side),
        ])
        .unwrap()
    }

    #[test]
    fn grid_run_measures_every_slot_of_a_4x4_array() {
        // 4x4 grid over a 300px square boundary: centers every 100px,
        // one measurement per slot.
        let img = draw_led_grid(320, 320, 4, 4, 0.0, 100.0, 4.0, [200, 200, 200]);
        let scene = Scene::new(img);
        let spec = GridSpec::square(4, rect_boundary(300.0)).unwrap();

        let analyzer = Analyzer::new();
        let result = analyzer.measure_grid(&scene, &spec).unwrap();
        assert_eq!(result.measurements.len(), 16);

        for (i, m) in result.measurements.iter().enumerate() {
            assert_eq!((m.row, m.col), (i / 4, i % 4));
            assert_eq!(m.method, MeasureMethod::Direct);
            assert!(!m.interpolated);
            // Window centered on the LED: well above background.
            assert!(m.brightness > 100.0, "slot {} brightness {}", i, m.brightness);
        }
    }

    #[test]
    fn auto_run_recovers_offset_led_positions() {
        // LEDs shifted a few pixels off the nominal lattice; detection must
        // land measurements on the true centers.
        let mut img = draw_led_grid(320, 320, 4, 4, 8.0, 100.0, 4.0, [220, 220, 220]);
        // Extra jitter on one LED.
        for dy in -4i32..=4 {
            for dx in -4i32..=4 {
                if (dx * dx + dy * dy) as f64 <= 16.0 {
                    img.put_pixel((214 + dx) as u32, (110 + dy) as u32, image::Rgb([220; 3]));
                }
            }
        }
        let scene = Scene::new(img);
        let spec = GridSpec::square(4, rect_boundary(300.0)).unwrap();

        let analyzer = Analyzer::new();
        let result = analyzer.measure_auto(&scene, &spec).unwrap();
        assert!(
            result.measurements.len() >= 12,
            "measured {}",
            result.measurements.len()
        );
        assert!(!result.candidates.is_empty());
        for m in &result.measurements {
            assert!(m.brightness > 80.0);
        }
    }

    #[test]
    fn manual_run_uses_click_positions() {
        let img = draw_led_grid(160, 160, 2, 2, 30.0, 80.0, 4.0, [180, 180, 180]);
        let scene = Scene::new(img);
        let points = vec![
            Point::new(30.0, 30.0),
            Point::new(110.0, 30.0),
            Point::new(30.0, 110.0),
            Point::new(110.0, 110.0),
        ];
        let analyzer = Analyzer::new();
        let result = analyzer.measure_manual(&scene, &points, 2, 2).unwrap();
        assert_eq!(result.measurements.len(), 4);
        for m in &result.measurements {
            assert_eq!(m.method, MeasureMethod::Manual);
            assert!(m.brightness > 80.0);
        }
    }

    #[test]
    fn manual_run_with_wrong_count_measures_nothing() {
        let scene = Scene::new(image::RgbImage::new(32, 32));
        let analyzer = Analyzer::new();
        let err = analyzer
            .measure_manual(&scene, &[Point::new(1.0, 1.0)], 2, 2)
            .expect_err("count mismatch");
        assert_eq!(
            err,
            MeasureError::CountMismatch {
                expected: 4,
                got: 1
            }
        );
    }
}
