use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{Rgb, RgbImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use ledgrid::{
    detect, Analyzer, AnalyzerConfig, Boundary, GridSpec, MeasureMethod, Point, Scene,
};

/// Synthetic 8x8 LED array with mild sensor noise.
fn synthetic_array(w: u32, h: u32, n: usize, origin: f64, spacing: f64) -> RgbImage {
    let mut rng = StdRng::seed_from_u64(7);
    let mut img = RgbImage::new(w, h);
    for px in img.pixels_mut() {
        let noise: u8 = rng.gen_range(0..12);
        *px = Rgb([noise, noise, noise]);
    }
    for row in 0..n {
        for col in 0..n {
            let cx = origin + col as f64 * spacing;
            let cy = origin + row as f64 * spacing;
            for dy in -4i64..=4 {
                for dx in -4i64..=4 {
                    if (dx * dx + dy * dy) as f64 <= 16.0 {
                        let x = (cx as i64 + dx).clamp(0, w as i64 - 1) as u32;
                        let y = (cy as i64 + dy).clamp(0, h as i64 - 1) as u32;
                        img.put_pixel(x, y, Rgb([230, 225, 210]));
                    }
                }
            }
        }
    }
    img
}

fn square_boundary(origin: f64, side: f64) -> Boundary {
    Boundary::from_points(&[
        Point::new(origin, origin),
        Point::new(origin + side, origin),
        Point::new(origin + side, origin + side),
        Point::new(origin, origin + side),
    ])
    .expect("valid boundary")
}

fn bench_detect(c: &mut Criterion) {
    let img = synthetic_array(512, 512, 8, 40.0, 60.0);
    let config = ledgrid::DetectConfig::default();
    c.bench_function("detect_512", |b| {
        b.iter(|| detect::detect(black_box(&img), None, &config))
    });
}

fn bench_full_auto_run(c: &mut Criterion) {
    let img = synthetic_array(512, 512, 8, 40.0, 60.0);
    let scene = Scene::new(img);
    let spec = GridSpec::square(8, square_boundary(40.0, 420.0)).expect("valid spec");
    let analyzer = Analyzer::with_config(AnalyzerConfig {
        method: MeasureMethod::Interpolation,
        ..Default::default()
    });
    c.bench_function("measure_auto_8x8", |b| {
        b.iter(|| analyzer.measure_auto(black_box(&scene), &spec))
    });
}

fn bench_grid_run(c: &mut Criterion) {
    let img = synthetic_array(512, 512, 8, 40.0, 60.0);
    let scene = Scene::new(img);
    let spec = GridSpec::square(8, square_boundary(40.0, 420.0)).expect("valid spec");
    let analyzer = Analyzer::new();
    c.bench_function("measure_grid_8x8", |b| {
        b.iter(|| analyzer.measure_grid(black_box(&scene), &spec))
    });
}

criterion_group!(benches, bench_detect, bench_full_auto_run, bench_grid_run);
criterion_main!(benches);
