//! ledgrid — per-LED brightness measurement from photographs of LED arrays.
//!
//! Given a coarse alignment (grid corners or a boundary quadrilateral) and an
//! n×n logical array size, the pipeline resolves a pixel position per LED and
//! reports a stable brightness/color value for each. The stages are:
//!
//! 1. **Scene** – decoded RGB raster plus optional background frame.
//! 2. **Enhance** – gamma lift + local contrast equalization as a detection
//!    aid for dim LEDs.
//! 3. **Detect** – spectral pitch estimate, Otsu binarization, connected
//!    component extraction with a pitch-scaled area band.
//! 4. **Assign** – greedy nearest-first binding of candidates to grid slots,
//!    plus neighbor interpolation for the slots detection missed.
//! 5. **Measure** – windowed sampling with optional background subtraction,
//!    Rec.601 luminance per slot.
//!
//! # Public API
//! [`Analyzer`] and [`AnalyzerConfig`] are the primary entry points; the
//! stage functions ([`detect::detect`], [`assign::assign`],
//! [`measure::measure`], …) remain available for callers composing their own
//! flow. The library performs no file I/O; loading pixels and persisting
//! results belong to the caller.

pub mod assign;
pub mod detect;
pub mod enhance;
pub mod grid;
pub mod measure;
pub mod scene;
pub mod session;

mod api;
mod pipeline;

#[cfg(test)]
pub(crate) mod test_utils;

pub use api::{Analyzer, AnalyzerConfig};
pub use assign::{AssignConfig, LedSlot, PositionSource, SlotGrid};
pub use detect::{Candidate, DetectConfig, DetectionOutcome, PitchEstimate};
pub use enhance::EnhanceConfig;
pub use grid::{Boundary, GeometryError, GridSpec, Point};
pub use measure::{MeasureError, MeasureMethod, SampleParams};
pub use scene::{Scene, SceneError};
pub use session::SessionState;

use serde::{Deserialize, Serialize};

/// One measured LED.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Grid row, 0-indexed.
    pub row: usize,
    /// Grid column, 0-indexed.
    pub col: usize,
    /// Rec.601 luminance of the sample window, clamped to [0, 255].
    pub brightness: f64,
    /// Mean red over the sample window.
    pub r: f64,
    /// Mean green over the sample window.
    pub g: f64,
    /// Mean blue over the sample window.
    pub b: f64,
    /// True when the slot position was estimated from neighbors.
    pub interpolated: bool,
    /// How the slot position was obtained.
    pub method: MeasureMethod,
}

/// Full result of one measurement run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasurementSet {
    /// One row per resolved slot, row-major.
    pub measurements: Vec<Measurement>,
    /// Raw detection candidates, for overlay display. Empty for runs that
    /// skip detection.
    pub candidates: Vec<Candidate>,
    /// Estimated LED spacing, when auto-detection ran and found one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pitch: Option<PitchEstimate>,
    /// Image dimensions [width, height].
    pub image_size: [u32; 2],
}

impl MeasurementSet {
    /// Construct an empty result for an image with the provided dimensions.
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            measurements: Vec::new(),
            candidates: Vec::new(),
            pitch: None,
            image_size: [width, height],
        }
    }

    /// Number of measurements with interpolated positions.
    pub fn n_interpolated(&self) -> usize {
        self.measurements.iter().filter(|m| m.interpolated).count()
    }
}
