//! Logical-grid geometry: boundary quadrilaterals and the bilinear cell mapper.
//!
//! The caller supplies four corner points in TL, TR, BR, BL order (the order
//! is a contract, corners are never re-sorted here). The quadrilateral is
//! treated as a bilinear patch; cell (row, col) of an n×m grid maps to the
//! patch point at normalized parameters `u = col/(cols-1)`, `v = row/(rows-1)`.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

// ── Error type ─────────────────────────────────────────────────────────────

/// Errors for malformed boundaries and grid sizes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeometryError {
    /// A boundary needs exactly four corner points.
    WrongPointCount {
        /// Provided number of points.
        got: usize,
    },
    /// Corners coincide or are collinear; the bilinear patch has zero area.
    DegenerateBoundary,
    /// Grid dimensions must be at least 1×1.
    BadGridSize {
        /// Requested rows.
        rows: usize,
        /// Requested columns.
        cols: usize,
    },
}

impl std::fmt::Display for GeometryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WrongPointCount { got } => {
                write!(f, "boundary needs exactly 4 points, got {}", got)
            }
            Self::DegenerateBoundary => write!(f, "boundary quadrilateral has zero area"),
            Self::BadGridSize { rows, cols } => {
                write!(f, "grid size must be at least 1x1, got {}x{}", rows, cols)
            }
        }
    }
}

impl std::error::Error for GeometryError {}

// ── Types ──────────────────────────────────────────────────────────────────

/// A sub-pixel image coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

impl From<Point> for Vector2<f64> {
    fn from(p: Point) -> Self {
        Vector2::new(p.x, p.y)
    }
}

/// Boundary quadrilateral in TL, TR, BR, BL order.
///
/// Construction validates the point count and rejects zero-area patches;
/// a constructed `Boundary` is always usable by the mapper.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Boundary {
    corners: [Point; 4],
}

/// Minimum accepted quadrilateral area in square pixels.
const MIN_BOUNDARY_AREA: f64 = 1e-6;

impl Boundary {
    /// Build a boundary from corner points in TL, TR, BR, BL order.
    pub fn from_points(points: &[Point]) -> Result<Self, GeometryError> {
        let corners: [Point; 4] = points
            .try_into()
            .map_err(|_| GeometryError::WrongPointCount { got: points.len() })?;

        for i in 0..4 {
            for j in (i + 1)..4 {
                if corners[i] == corners[j] {
                    return Err(GeometryError::DegenerateBoundary);
                }
            }
        }
        let b = Self { corners };
        if b.area().abs() < MIN_BOUNDARY_AREA {
            return Err(GeometryError::DegenerateBoundary);
        }
        Ok(b)
    }

    /// Corner points in TL, TR, BR, BL order.
    pub fn corners(&self) -> &[Point; 4] {
        &self.corners
    }

    pub fn top_left(&self) -> Point {
        self.corners[0]
    }

    pub fn top_right(&self) -> Point {
        self.corners[1]
    }

    pub fn bottom_right(&self) -> Point {
        self.corners[2]
    }

    pub fn bottom_left(&self) -> Point {
        self.corners[3]
    }

    /// Signed area via the shoelace formula (positive for TL,TR,BR,BL
    /// winding in image coordinates, y down).
    pub fn area(&self) -> f64 {
        let mut acc = 0.0;
        for i in 0..4 {
            let a = Vector2::from(self.corners[i]);
            let b = Vector2::from(self.corners[(i + 1) % 4]);
            acc += a.x * b.y - b.x * a.y;
        }
        acc * 0.5
    }

    /// Even-odd test: does the quadrilateral contain `p`?
    ///
    /// Edge-inclusive within floating-point tolerance; works for any simple
    /// (also non-convex) quadrilateral.
    pub fn contains(&self, p: Point) -> bool {
        let mut inside = false;
        let mut j = 3;
        for i in 0..4 {
            let pi = self.corners[i];
            let pj = self.corners[j];
            if (pi.y > p.y) != (pj.y > p.y) {
                let x_cross = (pj.x - pi.x) * (p.y - pi.y) / (pj.y - pi.y) + pi.x;
                if p.x < x_cross {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside || self.on_edge(p)
    }

    fn on_edge(&self, p: Point) -> bool {
        let tol = 1e-9;
        for i in 0..4 {
            let a = Vector2::from(self.corners[i]);
            let b = Vector2::from(self.corners[(i + 1) % 4]);
            let ab = b - a;
            let ap = Vector2::from(p) - a;
            let cross = ab.x * ap.y - ab.y * ap.x;
            if cross.abs() > tol * ab.norm().max(1.0) {
                continue;
            }
            let t = ap.dot(&ab) / ab.norm_squared();
            if (-tol..=1.0 + tol).contains(&t) {
                return true;
            }
        }
        false
    }

    /// Bilinear patch point at normalized parameters `u, v` in [0, 1].
    pub fn at(&self, u: f64, v: f64) -> Point {
        let [tl, tr, br, bl] = self.corners;
        let top_x = tl.x * (1.0 - u) + tr.x * u;
        let top_y = tl.y * (1.0 - u) + tr.y * u;
        let bot_x = bl.x * (1.0 - u) + br.x * u;
        let bot_y = bl.y * (1.0 - u) + br.y * u;
        Point::new(top_x * (1.0 - v) + bot_x * v, top_y * (1.0 - v) + bot_y * v)
    }

    /// Index of the corner nearest to `p` within `max_dist`, if any.
    ///
    /// Supports corner-editing surfaces: a click near a corner selects it.
    pub fn nearest_corner(&self, p: Point, max_dist: f64) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, c) in self.corners.iter().enumerate() {
            let d = c.distance_to(&p);
            if d <= max_dist && best.is_none_or(|(_, bd)| d < bd) {
                best = Some((i, d));
            }
        }
        best.map(|(i, _)| i)
    }
}

/// Logical array size bound to the boundary its cells are mapped over.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    rows: usize,
    cols: usize,
    boundary: Boundary,
}

impl GridSpec {
    /// Bind an n×m logical grid to a boundary. `rows` and `cols` must be >= 1.
    pub fn new(rows: usize, cols: usize, boundary: Boundary) -> Result<Self, GeometryError> {
        if rows == 0 || cols == 0 {
            return Err(GeometryError::BadGridSize { rows, cols });
        }
        Ok(Self {
            rows,
            cols,
            boundary,
        })
    }

    /// Square n×n grid.
    pub fn square(n: usize, boundary: Boundary) -> Result<Self, GeometryError> {
        Self::new(n, n, boundary)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn boundary(&self) -> &Boundary {
        &self.boundary
    }

    pub fn n_slots(&self) -> usize {
        self.rows * self.cols
    }

    /// Expected pixel positions of all cells, row-major.
    pub fn positions(&self) -> Vec<Point> {
        map_grid(&self.boundary, self.rows, self.cols).expect("dimensions validated at construction")
    }

    /// Mean center-to-center spacing along the boundary edges, in pixels.
    ///
    /// Used as the assignment-tolerance scale when no measured pitch is
    /// available.
    pub fn nominal_spacing(&self) -> f64 {
        let [tl, tr, br, bl] = *self.boundary.corners();
        let h = 0.5 * (tl.distance_to(&tr) + bl.distance_to(&br));
        let v = 0.5 * (tl.distance_to(&bl) + tr.distance_to(&br));
        let h_step = if self.cols > 1 {
            h / (self.cols - 1) as f64
        } else {
            h
        };
        let v_step = if self.rows > 1 {
            v / (self.rows - 1) as f64
        } else {
            v
        };
        0.5 * (h_step + v_step)
    }
}

/// Map every (row, col) cell of a `rows`×`cols` grid to its pixel position.
///
/// Returned row-major: index `row * cols + col`. Pure and deterministic:
/// identical inputs give bit-identical output. Single-row or single-column
/// grids pin the corresponding parameter at 0.
pub fn map_grid(
    boundary: &Boundary,
    rows: usize,
    cols: usize,
) -> Result<Vec<Point>, GeometryError> {
    if rows == 0 || cols == 0 {
        return Err(GeometryError::BadGridSize { rows, cols });
    }

    let mut positions = Vec::with_capacity(rows * cols);
    for row in 0..rows {
        let v = if rows > 1 {
            row as f64 / (rows - 1) as f64
        } else {
            0.0
        };
        for col in 0..cols {
            let u = if cols > 1 {
                col as f64 / (cols - 1) as f64
            } else {
                0.0
            };
            positions.push(boundary.at(u, v));
        }
    }
    Ok(positions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(w: f64, h: f64) -> Boundary {
        Boundary::from_points(&[
            Point::new(0.0, 0.0),
            Point::new(w, 0.0),
            Point::new(w, h),
            Point::new(0.0, h),
        ])
        .expect("valid rectangle")
    }

    #[test]
    fn rejects_wrong_point_count() {
        let pts = [Point::new(0.0, 0.0), Point::new(1.0, 0.0)];
        assert_eq!(
            Boundary::from_points(&pts),
            Err(GeometryError::WrongPointCount { got: 2 })
        );
    }

    #[test]
    fn rejects_duplicate_corner() {
        let p = Point::new(5.0, 5.0);
        let pts = [p, Point::new(10.0, 5.0), Point::new(10.0, 10.0), p];
        assert_eq!(
            Boundary::from_points(&pts),
            Err(GeometryError::DegenerateBoundary)
        );
    }

    #[test]
    fn rejects_collinear_corners() {
        let pts = [
            Point::new(0.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(2.0, 2.0),
            Point::new(3.0, 3.0),
        ];
        assert_eq!(
            Boundary::from_points(&pts),
            Err(GeometryError::DegenerateBoundary)
        );
    }

    #[test]
    fn rectangular_boundary_maps_to_even_spacing() {
        let b = rect(300.0, 300.0);
        let pos = map_grid(&b, 4, 4).unwrap();
        assert_eq!(pos.len(), 16);
        for row in 0..4 {
            for col in 0..4 {
                let p = pos[row * 4 + col];
                assert!((p.x - col as f64 * 100.0).abs() < 1e-12);
                assert!((p.y - row as f64 * 100.0).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn mapping_is_deterministic() {
        let b = Boundary::from_points(&[
            Point::new(12.5, 7.25),
            Point::new(311.0, 19.0),
            Point::new(298.75, 305.5),
            Point::new(4.0, 290.0),
        ])
        .unwrap();
        let a = map_grid(&b, 8, 8).unwrap();
        let c = map_grid(&b, 8, 8).unwrap();
        assert_eq!(a, c);
    }

    #[test]
    fn single_row_pins_v_at_zero() {
        let b = rect(100.0, 100.0);
        let pos = map_grid(&b, 1, 3).unwrap();
        assert_eq!(pos.len(), 3);
        for p in &pos {
            assert_eq!(p.y, 0.0);
        }
        assert_eq!(pos[2].x, 100.0);
    }

    #[test]
    fn single_cell_is_top_left() {
        let b = rect(50.0, 50.0);
        let pos = map_grid(&b, 1, 1).unwrap();
        assert_eq!(pos, vec![Point::new(0.0, 0.0)]);
    }

    #[test]
    fn zero_dimension_is_rejected() {
        let b = rect(10.0, 10.0);
        assert_eq!(
            map_grid(&b, 0, 4),
            Err(GeometryError::BadGridSize { rows: 0, cols: 4 })
        );
        assert!(GridSpec::new(4, 0, b).is_err());
    }

    #[test]
    fn skewed_patch_interpolates_between_edges() {
        // Non-rectangular quad: midpoint of the patch is the corner mean.
        let b = Boundary::from_points(&[
            Point::new(0.0, 0.0),
            Point::new(200.0, 40.0),
            Point::new(240.0, 260.0),
            Point::new(-20.0, 200.0),
        ])
        .unwrap();
        let pos = map_grid(&b, 3, 3).unwrap();
        let mid = pos[4];
        assert!((mid.x - (0.0 + 200.0 + 240.0 - 20.0) / 4.0).abs() < 1e-9);
        assert!((mid.y - (0.0 + 40.0 + 260.0 + 200.0) / 4.0).abs() < 1e-9);
    }

    #[test]
    fn contains_accepts_interior_and_rejects_exterior() {
        let b = rect(100.0, 100.0);
        assert!(b.contains(Point::new(50.0, 50.0)));
        assert!(b.contains(Point::new(0.0, 0.0)));
        assert!(!b.contains(Point::new(150.0, 50.0)));
        assert!(!b.contains(Point::new(-1.0, 50.0)));
    }

    #[test]
    fn nearest_corner_respects_threshold() {
        let b = rect(100.0, 100.0);
        assert_eq!(b.nearest_corner(Point::new(98.0, 3.0), 20.0), Some(1));
        assert_eq!(b.nearest_corner(Point::new(50.0, 50.0), 20.0), None);
    }

    #[test]
    fn nominal_spacing_of_rectangle() {
        let b = rect(300.0, 300.0);
        let spec = GridSpec::square(4, b).unwrap();
        assert!((spec.nominal_spacing() - 100.0).abs() < 1e-12);
    }
}
