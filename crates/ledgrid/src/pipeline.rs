//! Measurement pipeline glue.
//!
//! Wires the stages together: enhancement -> detection -> assignment ->
//! interpolation -> sampling. Algorithmic primitives live in their own
//! modules; this layer only decides stage order and data flow for the three
//! run shapes (auto-detection, grid mapping, manual points).

use crate::api::AnalyzerConfig;
use crate::assign::{assign, interpolate_unresolved, SlotGrid};
use crate::detect::detect;
use crate::enhance::enhance;
use crate::grid::{GridSpec, Point};
use crate::measure::{manual_slots, measure, MeasureError, MeasureMethod};
use crate::scene::Scene;
use crate::MeasurementSet;

/// Auto-detection run: detect candidates, bind them to slots, optionally
/// interpolate the misses, then sample.
pub(crate) fn run_auto(
    scene: &Scene,
    spec: &GridSpec,
    config: &AnalyzerConfig,
) -> Result<MeasurementSet, MeasureError> {
    let enhanced = config
        .enhance_enabled
        .then(|| enhance(scene.image(), &config.enhance));
    let detect_input = enhanced.as_ref().unwrap_or(scene.image());

    let mask = config.restrict_to_boundary.then(|| spec.boundary());
    let outcome = detect(detect_input, mask, &config.detect);

    let mut slots = assign(&outcome.candidates, spec, &config.assign, outcome.pitch.as_ref());
    if config.method == MeasureMethod::Interpolation {
        interpolate_unresolved(&mut slots);
    }

    let measurements = sample(scene, enhanced, &slots, config)?;
    let (w, h) = scene.dimensions();
    Ok(MeasurementSet {
        measurements,
        candidates: outcome.candidates,
        pitch: outcome.pitch,
        image_size: [w, h],
    })
}

/// Grid run: no detection, every slot mapped directly from the boundary.
pub(crate) fn run_grid(
    scene: &Scene,
    spec: &GridSpec,
    config: &AnalyzerConfig,
) -> Result<MeasurementSet, MeasureError> {
    let slots = SlotGrid::from_grid(spec);
    let enhanced = sampling_enhancement(scene, config);
    let measurements = sample(scene, enhanced, &slots, config)?;
    let (w, h) = scene.dimensions();
    Ok(MeasurementSet {
        measurements,
        candidates: Vec::new(),
        pitch: None,
        image_size: [w, h],
    })
}

/// Manual run: positions come one-to-one from the supplied click list.
pub(crate) fn run_manual(
    scene: &Scene,
    points: &[Point],
    rows: usize,
    cols: usize,
    config: &AnalyzerConfig,
) -> Result<MeasurementSet, MeasureError> {
    let slots = manual_slots(points, rows, cols)?;
    let enhanced = sampling_enhancement(scene, config);
    let measurements = sample(scene, enhanced, &slots, config)?;
    let (w, h) = scene.dimensions();
    Ok(MeasurementSet {
        measurements,
        candidates: Vec::new(),
        pitch: None,
        image_size: [w, h],
    })
}

/// Enhancement for runs that skip detection: only computed when sampling
/// explicitly opts into the enhanced buffer.
fn sampling_enhancement(scene: &Scene, config: &AnalyzerConfig) -> Option<image::RgbImage> {
    (config.enhance_enabled && config.sample_enhanced)
        .then(|| enhance(scene.image(), &config.enhance))
}

/// Sample either the original scene or, on explicit opt-in, the enhanced
/// buffer. Enhancement distorts absolute intensity, so the default reads the
/// un-enhanced pixels.
fn sample(
    scene: &Scene,
    enhanced: Option<image::RgbImage>,
    slots: &SlotGrid,
    config: &AnalyzerConfig,
) -> Result<Vec<crate::Measurement>, MeasureError> {
    match enhanced {
        Some(img) if config.sample_enhanced => {
            let enhanced_scene = match scene.background() {
                Some(bg) => Scene::with_background(img, bg.clone())
                    .expect("background dimensions validated at scene construction"),
                None => Scene::new(img),
            };
            measure(&enhanced_scene, slots, &config.sample)
        }
        _ => measure(scene, slots, &config.sample),
    }
}
