use image::ImageReader;
use ledgrid::{Analyzer, Boundary, GridSpec, Point, Scene};
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 11 {
        eprintln!(
            "Usage: {} <image.png> <n> <tl_x> <tl_y> <tr_x> <tr_y> <br_x> <br_y> <bl_x> <bl_y> [out.json]",
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

    let analyzer = Analyzer::new();
    let result = analyzer.measure_grid(&scene, &spec)?;

    println!("Measured {} LEDs.", result.measurements.len());
    for m in &result.measurements {
        println!(
            "  ({}, {})  brightness {:6.1}  rgb ({:5.1}, {:5.1}, {:5.1})",
            m.row, m.col, m.brightness, m.r, m.g, m.b
        );
    }

    if let Some(out_path) = args.get(11) {
        let json = serde_json::to_string_pretty(&result)?;
        std::fs::write(out_path, json)?;
        println!("Wrote {out_path}");
    }
    Ok(())
}
