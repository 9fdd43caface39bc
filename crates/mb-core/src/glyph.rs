use serde::{Deserialize, Serialize};

use crate::phase::{PhaseEntity, wrap_phase};

/// Opaque glyph identity. Assigned in increasing order by the population
/// and never reused, so ordering by id is insertion order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GlyphId(pub u64);

/// Discrete type tag read by the driven evolution rule.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GlyphKind {
    /// Energy decays each tick.
    Implosion,
    /// Energy grows each tick.
    #[default]
    Expansion,
}

/// Requested state for a new glyph, before clamping.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlyphSeed {
    pub x: f64,
    pub y: f64,
    pub tension: f64,
    pub curvature: f64,
    pub phase: f64,
    pub kind: GlyphKind,
}

/// A single short-lived field particle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Glyph {
    pub id: GlyphId,
    pub x: f64,
    pub y: f64,
    /// ΔΦ in [0, 1].
    pub tension: f64,
    /// κ >= 0.
    pub curvature: f64,
    /// θ in [0, 1).
    pub phase: f64,
    pub energy: f64,
    /// Starts at 1.0; the glyph is culled once it reaches 0.
    pub lifetime: f64,
    pub kind: GlyphKind,
}

/// ΔΦ · (1 + κ) · |sin(π·θ)|
pub fn derived_energy(tension: f64, curvature: f64, phase: f64) -> f64 {
    tension * (1.0 + curvature) * (std::f64::consts::PI * phase).sin().abs()
}

impl Glyph {
    /// Build a glyph from a seed, clamping every attribute into range.
    pub fn new(id: GlyphId, seed: GlyphSeed) -> Self {
        let mut glyph = Self {
            id,
            x: finite_or_zero(seed.x),
            y: finite_or_zero(seed.y),
            tension: finite_or_zero(seed.tension).clamp(0.0, 1.0),
            curvature: finite_or_zero(seed.curvature).max(0.0),
            phase: wrap_phase(seed.phase),
            energy: 0.0,
            lifetime: 1.0,
            kind: seed.kind,
        };
        glyph.recompute_energy();
        glyph
    }

    pub fn recompute_energy(&mut self) {
        self.energy = derived_energy(self.tension, self.curvature, self.phase);
    }

    pub fn is_alive(&self) -> bool {
        self.lifetime > 0.0
    }

    /// Euclidean distance to a grid point.
    pub fn distance_to(&self, x: f64, y: f64) -> f64 {
        ((self.x - x).powi(2) + (self.y - y).powi(2)).sqrt()
    }
}

impl PhaseEntity for Glyph {
    fn energy(&self) -> f64 {
        self.energy
    }

    fn phase(&self) -> f64 {
        self.phase
    }
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() { v } else { 0.0 }
}
