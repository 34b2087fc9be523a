//! Binding detected candidates to logical grid slots, and position
//! interpolation for the slots detection missed.
//!
//! Assignment is greedy nearest-first over all (slot, candidate) pairs in
//! ascending distance order, so a slot cannot steal a candidate that matches
//! another slot more closely. Each candidate claims at most one slot.

use serde::{Deserialize, Serialize};

use crate::detect::{Candidate, PitchEstimate};
use crate::grid::{GridSpec, Point};

/// How a slot's pixel position was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionSource {
    /// Mapped from the boundary or claimed from a detected candidate.
    Direct,
    /// Estimated from neighboring resolved slots.
    Interpolated,
    /// Supplied by a user click.
    Manual,
}

/// A resolved slot position together with its provenance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPosition {
    pub point: Point,
    pub source: PositionSource,
}

/// One logical grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LedSlot {
    pub row: usize,
    pub col: usize,
    /// Pixel position, absent until the slot is resolved.
    pub resolved: Option<ResolvedPosition>,
}

impl LedSlot {
    pub fn is_resolved(&self) -> bool {
        self.resolved.is_some()
    }

    pub fn position(&self) -> Option<Point> {
        self.resolved.map(|r| r.point)
    }

    /// True when the position was estimated rather than directly obtained.
    pub fn is_interpolated(&self) -> bool {
        matches!(
            self.resolved,
            Some(ResolvedPosition {
                source: PositionSource::Interpolated,
                ..
            })
        )
    }
}

/// Row-major collection of all slots of one grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotGrid {
    rows: usize,
    cols: usize,
    slots: Vec<LedSlot>,
}

impl SlotGrid {
    /// All slots unresolved.
    pub fn empty(rows: usize, cols: usize) -> Self {
        let mut slots = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            for col in 0..cols {
                slots.push(LedSlot {
                    row,
                    col,
                    resolved: None,
                });
            }
        }
        Self { rows, cols, slots }
    }

    /// Every slot resolved directly from the boundary mapping.
    pub fn from_grid(spec: &GridSpec) -> Self {
        let mut grid = Self::empty(spec.rows(), spec.cols());
        for (slot, point) in grid.slots.iter_mut().zip(spec.positions()) {
            slot.resolved = Some(ResolvedPosition {
                point,
                source: PositionSource::Direct,
            });
        }
        grid
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&LedSlot> {
        if row < self.rows && col < self.cols {
            self.slots.get(row * self.cols + col)
        } else {
            None
        }
    }

    /// Row-major iteration over all slots.
    pub fn iter(&self) -> impl Iterator<Item = &LedSlot> {
        self.slots.iter()
    }

    pub fn n_resolved(&self) -> usize {
        self.slots.iter().filter(|s| s.is_resolved()).count()
    }

    /// Resolved slot nearest to `p` within `max_dist` pixels, if any.
    ///
    /// Supports click-to-adjust surfaces: a click near an LED selects it.
    pub fn nearest_slot(&self, p: Point, max_dist: f64) -> Option<(usize, usize)> {
        let mut best: Option<(usize, usize, f64)> = None;
        for slot in &self.slots {
            let Some(pos) = slot.position() else {
                continue;
            };
            let d = pos.distance_to(&p);
            if d <= max_dist && best.is_none_or(|(_, _, bd)| d < bd) {
                best = Some((slot.row, slot.col, d));
            }
        }
        best.map(|(r, c, _)| (r, c))
    }

    /// Override one slot's position with a manually chosen point.
    ///
    /// Returns `false` when (row, col) is outside the grid.
    pub fn set_position(&mut self, row: usize, col: usize, point: Point) -> bool {
        if row >= self.rows || col >= self.cols {
            return false;
        }
        self.slots[row * self.cols + col].resolved = Some(ResolvedPosition {
            point,
            source: PositionSource::Manual,
        });
        true
    }

    pub(crate) fn slots_mut(&mut self) -> &mut [LedSlot] {
        &mut self.slots
    }
}

/// Assignment controls.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct AssignConfig {
    /// Claiming tolerance as a fraction of the pitch (or of the nominal
    /// slot spacing when detection supplied no pitch).
    pub tolerance_frac: f64,
}

impl Default for AssignConfig {
    fn default() -> Self {
        Self {
            tolerance_frac: 0.5,
        }
    }
}

/// Bind candidates to the grid slots whose expected positions they match.
///
/// Expected positions come from the bilinear mapping over the same boundary
/// used for detection. Slots with no candidate within tolerance stay
/// unresolved. Deterministic: identical inputs give identical output, ties
/// broken by row-major slot order, then candidate order.
pub fn assign(
    candidates: &[Candidate],
    spec: &GridSpec,
    config: &AssignConfig,
    pitch: Option<&PitchEstimate>,
) -> SlotGrid {
    let expected = spec.positions();
    let spacing = pitch.map(|p| p.mean_px()).unwrap_or(spec.nominal_spacing());
    let tolerance = config.tolerance_frac * spacing;

    let mut pairs: Vec<(f64, usize, usize)> = Vec::new();
    for (slot_idx, exp) in expected.iter().enumerate() {
        for (cand_idx, cand) in candidates.iter().enumerate() {
            let d = exp.distance_to(&cand.position());
            if d <= tolerance {
                pairs.push((d, slot_idx, cand_idx));
            }
        }
    }
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)).then(a.2.cmp(&b.2)));

    let mut grid = SlotGrid::empty(spec.rows(), spec.cols());
    let mut slot_filled = vec![false; expected.len()];
    let mut cand_claimed = vec![false; candidates.len()];
    for (_, slot_idx, cand_idx) in pairs {
        if slot_filled[slot_idx] || cand_claimed[cand_idx] {
            continue;
        }
        slot_filled[slot_idx] = true;
        cand_claimed[cand_idx] = true;
        grid.slots_mut()[slot_idx].resolved = Some(ResolvedPosition {
            point: candidates[cand_idx].position(),
            source: PositionSource::Direct,
        });
    }

    tracing::info!(
        "Assigned {} of {} slots (tolerance {:.1}px)",
        grid.n_resolved(),
        spec.n_slots(),
        tolerance
    );
    grid
}

/// Estimate positions for unresolved slots from their resolved neighbors.
///
/// For each unresolved slot the nearest resolved slot in each index-space
/// quadrant is collected; with at least two such neighbors the position is
/// their inverse-distance weighted average — a convex combination, so the
/// estimate lies inside the neighbors' hull. Slots with fewer neighbors stay
/// unresolved. Only slots resolved before this pass act as donors.
///
/// Returns the number of slots interpolated.
pub fn interpolate_unresolved(grid: &mut SlotGrid) -> usize {
    let donors: Vec<(usize, usize, Point)> = grid
        .iter()
        .filter_map(|s| s.position().map(|p| (s.row, s.col, p)))
        .collect();
    if donors.len() < 2 {
        return 0;
    }

    let cols = grid.cols();
    let mut n_interpolated = 0;
    for idx in 0..grid.slots_mut().len() {
        if grid.slots_mut()[idx].is_resolved() {
            continue;
        }
        let row = idx / cols;
        let col = idx % cols;

        // Nearest donor per quadrant of the (dr, dc) index offset.
        let mut quadrant: [Option<(f64, Point)>; 4] = [None; 4];
        for &(drow, dcol, p) in &donors {
            let dr = drow as f64 - row as f64;
            let dc = dcol as f64 - col as f64;
            let q = usize::from(dr > 0.0) * 2 + usize::from(dc > 0.0);
            let d = (dr * dr + dc * dc).sqrt();
            if quadrant[q].is_none_or(|(bd, _)| d < bd) {
                quadrant[q] = Some((d, p));
            }
        }

        let neighbors: Vec<(f64, Point)> = quadrant.iter().flatten().copied().collect();
        if neighbors.len() < 2 {
            continue;
        }

        let mut wx = 0.0;
        let mut wy = 0.0;
        let mut wsum = 0.0;
        for (d, p) in &neighbors {
            let w = 1.0 / d;
            wx += w * p.x;
            wy += w * p.y;
            wsum += w;
        }
        grid.slots_mut()[idx].resolved = Some(ResolvedPosition {
            point: Point::new(wx / wsum, wy / wsum),
            source: PositionSource::Interpolated,
        });
        n_interpolated += 1;
    }

    if n_interpolated > 0 {
        tracing::info!("Interpolated {} unresolved slots", n_interpolated);
    }
    n_interpolated
}
