//! Shared test utilities for image-based unit tests.

use image::{Rgb, RgbImage};

/// Render a synthetic LED array: filled disks on a black background.
///
/// LED centers form a regular lattice with the given origin and spacing
/// (both axes). Pixels within `radius` of a center take `color`.
pub(crate) fn draw_led_grid(
    w: u32,
    h: u32,
    rows: usize,
    cols: usize,
    origin: f64,
    spacing: f64,
    radius: f64,
    color: [u8; 3],
) -> RgbImage {
    let mut img = RgbImage::new(w, h);
    let r_sq = radius * radius;
    for row in 0..rows {
        for col in 0..cols {
            let cx = origin + col as f64 * spacing;
            let cy = origin + row as f64 * spacing;
            let x0 = ((cx - radius).floor().max(0.0)) as u32;
            let y0 = ((cy - radius).floor().max(0.0)) as u32;
            let x1 = ((cx + radius).ceil() as u32).min(w.saturating_sub(1));
            let y1 = ((cy + radius).ceil() as u32).min(h.saturating_sub(1));
            for y in y0..=y1 {
                for x in x0..=x1 {
                    let dx = x as f64 - cx;
                    let dy = y as f64 - cy;
                    if dx * dx + dy * dy <= r_sq {
                        img.put_pixel(x, y, Rgb(color));
                    }
                }
            }
        }
    }
    img
}
