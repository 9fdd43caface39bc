//! The square cell grid the glyphs imprint on.
//!
//! Each tick every cell looks at the glyphs within `influence_radius`. With
//! enough influence it blends a small step toward their weighted state;
//! otherwise it drifts under its own tension and curvature. Both paths end
//! with a pull toward the global phase.

use std::f64::consts::TAU;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::constants::INFLUENCE_FALLOFF;
use crate::glyph::Glyph;
use crate::phase::{PhaseEntity, PhaseSupervisor, circular_distance, wrap_phase};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldCell {
    pub tension: f64,
    pub curvature: f64,
    pub phase: f64,
}

impl FieldCell {
    fn sanitized(self) -> Self {
        let finite = |v: f64| if v.is_finite() { v } else { 0.0 };
        Self {
            tension: finite(self.tension).clamp(0.0, 1.0),
            curvature: finite(self.curvature).max(0.0),
            phase: wrap_phase(self.phase),
        }
    }
}

impl PhaseEntity for FieldCell {
    /// Cells have no phase term in their energy.
    fn energy(&self) -> f64 {
        self.tension * (1.0 + self.curvature)
    }

    fn phase(&self) -> f64 {
        self.phase
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RelaxParams {
    pub influence_radius: f64,
    /// Total influence at or below this falls back to natural drift.
    pub influence_epsilon: f64,
    pub blend_factor: f64,
    pub field_dt: f64,
}

/// `size × size` cells, row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldGrid {
    size: usize,
    cells: Vec<FieldCell>,
}

impl FieldGrid {
    /// Radial start: curvature rises toward the edge, phase follows the
    /// polar angle around the centre offset by half a turn, tension is
    /// random in 0.3..0.5.
    pub fn new(size: usize, rng: &mut impl Rng) -> Self {
        let half = size as f64 / 2.0;
        let mut cells = Vec::with_capacity(size * size);
        for y in 0..size {
            for x in 0..size {
                let dx = x as f64 - half;
                let dy = y as f64 - half;
                let dist = (dx * dx + dy * dy).sqrt();
                cells.push(FieldCell {
                    tension: rng.random_range(0.3..0.5),
                    curvature: 0.5 * dist / half,
                    phase: wrap_phase(dy.atan2(dx) / TAU + 0.5),
                });
            }
        }
        Self { size, cells }
    }

    pub fn uniform(size: usize, cell: FieldCell) -> Self {
        Self {
            size,
            cells: vec![cell.sanitized(); size * size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, x: usize, y: usize) -> Option<&FieldCell> {
        if x >= self.size || y >= self.size {
            return None;
        }
        self.cells.get(y * self.size + x)
    }

    /// Row-major cell slice.
    pub fn cells(&self) -> &[FieldCell] {
        &self.cells
    }

    /// Cells with their `(x, y)` coordinates.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &FieldCell)> {
        let size = self.size;
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, cell)| (i % size, i / size, cell))
    }

    /// One relaxation pass over every cell. Returns how many cells were
    /// under glyph influence.
    pub fn relax<'a>(
        &mut self,
        glyphs: impl IntoIterator<Item = &'a Glyph>,
        supervisor: &PhaseSupervisor,
        params: &RelaxParams,
    ) -> usize {
        let glyphs: Vec<&Glyph> = glyphs.into_iter().collect();
        let blend = params.blend_factor;
        let mut influenced = 0;

        for (i, cell) in self.cells.iter_mut().enumerate() {
            let x = (i % self.size) as f64;
            let y = (i / self.size) as f64;

            let mut total = 0.0;
            let mut tension = 0.0;
            let mut curvature = 0.0;
            let (mut sin_sum, mut cos_sum) = (0.0, 0.0);
            for glyph in &glyphs {
                let dist = glyph.distance_to(x, y);
                if dist >= params.influence_radius {
                    continue;
                }
                let weight = glyph.energy / (1.0 + dist * INFLUENCE_FALLOFF);
                total += weight;
                tension += weight * glyph.tension;
                curvature += weight * glyph.curvature;
                let angle = glyph.phase * TAU;
                sin_sum += weight * angle.sin();
                cos_sum += weight * angle.cos();
            }

            if total > params.influence_epsilon {
                influenced += 1;
                cell.tension = (1.0 - blend) * cell.tension + blend * (tension / total);
                cell.curvature = (1.0 - blend) * cell.curvature + blend * (curvature / total);
                let target = wrap_phase(sin_sum.atan2(cos_sum) / TAU);
                cell.phase = wrap_phase(cell.phase + blend * circular_distance(target, cell.phase));
            } else {
                cell.phase =
                    wrap_phase(cell.phase + cell.tension * cell.curvature * params.field_dt);
            }
            cell.phase = supervisor.synchronize(cell.phase);
        }

        influenced
    }
}
