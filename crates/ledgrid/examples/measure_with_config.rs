use image::ImageReader;
use ledgrid::{Analyzer, AnalyzerConfig, Boundary, GridSpec, MeasureMethod, Point, Scene};
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 11 {
        eprintln!(
            "Usage: {} <image.png> <n> <tl_x> <tl_y> <tr_x> <tr_y> <br_x> <br_y> <bl_x> <bl_y>",
            args[0]
        );
        std::process::exit(2);
    }

    let image = ImageReader::open(&args[1])?.decode()?.to_rgb8();
    let n: usize = args[2].parse()?;
    let coords: Vec<f64> = args[3..11]
        .iter()
        .map(|s| s.parse())
        .collect::<Result<_, _>>()?;
    let corners: Vec<Point> = coords.chunks(2).map(|c| Point::new(c[0], c[1])).collect();

    let boundary = Boundary::from_points(&corners)?;
    let spec = GridSpec::square(n, boundary)?;
    let scene = Scene::new(image);

    let mut cfg = AnalyzerConfig {
        method: MeasureMethod::Interpolation,
        enhance_enabled: true,
        restrict_to_boundary: true,
        ..Default::default()
    };
    cfg.sample.sample_size = 7;
    cfg.detect.min_candidates = n;

    let analyzer = Analyzer::with_config(cfg);
    let result = analyzer.measure_auto(&scene, &spec)?;

    if let Some(pitch) = result.pitch.as_ref() {
        println!(
            "Pitch estimate: {:.1}px horizontal, {:.1}px vertical",
            pitch.horizontal_px, pitch.vertical_px
        );
    }
    println!(
        "{} candidates, {} LEDs measured ({} interpolated).",
        result.candidates.len(),
        result.measurements.len(),
        result.n_interpolated()
    );
    Ok(())
}
