use std::collections::BTreeMap;
use std::f64::consts::TAU;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::evolve::GlyphEvolution;
use crate::glyph::{Glyph, GlyphId, GlyphKind, GlyphSeed};
use crate::phase::{PhaseSupervisor, circular_distance, circular_mean};

/// Spawn-policy and capacity settings.
#[derive(Clone, Debug, PartialEq)]
pub struct PopulationParams {
    pub cap: usize,
    pub spawn_probability: f64,
    /// Spawn trials run only while the global phase is below this.
    pub spawn_window: f64,
    /// Spawned glyphs are placed around the centre of a grid this size.
    pub grid_size: usize,
}

/// What one `step` did to the population.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepReport {
    pub expired: usize,
    pub spawned: usize,
    pub evicted: usize,
}

/// Population-wide mean of (ΔΦ, κ, θ). Phase is a circular mean.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeanState {
    pub tension: f64,
    pub curvature: f64,
    pub phase: f64,
}

/// The set of live glyphs, ordered by insertion.
///
/// Ids grow monotonically, so the map's key order is insertion order and
/// capacity eviction is a pop from the front.
#[derive(Debug)]
pub struct Population {
    glyphs: BTreeMap<GlyphId, Glyph>,
    next_id: u64,
    params: PopulationParams,
    rule: Box<dyn GlyphEvolution>,
}

impl Population {
    /// A spawn probability outside `[0, 1]` is clamped; NaN disables spawning.
    pub fn new(mut params: PopulationParams, rule: Box<dyn GlyphEvolution>) -> Self {
        params.spawn_probability = if params.spawn_probability.is_nan() {
            0.0
        } else {
            params.spawn_probability.clamp(0.0, 1.0)
        };
        Self {
            glyphs: BTreeMap::new(),
            next_id: 0,
            params,
            rule,
        }
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    /// Live glyphs, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Glyph> {
        self.glyphs.values()
    }

    pub fn get(&self, id: GlyphId) -> Option<&Glyph> {
        self.glyphs.get(&id)
    }

    pub fn params(&self) -> &PopulationParams {
        &self.params
    }

    /// Insert a glyph. Never fails; the cap is enforced by `step`.
    pub fn spawn(&mut self, seed: GlyphSeed, rng: &mut impl Rng) -> GlyphId {
        let id = GlyphId(self.next_id);
        self.next_id += 1;

        let mut glyph = Glyph::new(id, seed);
        glyph.energy = self.rule.initial_energy(&glyph, rng);
        self.glyphs.insert(id, glyph);
        id
    }

    /// Initial seeding: `count` glyphs evenly spaced on a ring around the
    /// grid centre, phases stepping evenly around the circle.
    pub fn seed_ring(&mut self, count: usize, rng: &mut impl Rng) {
        let half = self.params.grid_size as f64 / 2.0;
        for i in 0..count {
            let fraction = i as f64 / count as f64;
            let angle = fraction * TAU;
            let radius = half * rng.random_range(0.5..0.75);
            let seed = GlyphSeed {
                x: half + angle.cos() * radius,
                y: half + angle.sin() * radius,
                tension: rng.random_range(0.3..0.8),
                curvature: rng.random_range(0.2..0.6),
                phase: fraction,
                kind: if i % 2 == 0 {
                    GlyphKind::Implosion
                } else {
                    GlyphKind::Expansion
                },
            };
            self.spawn(seed, rng);
        }
    }

    /// One tick: evolve and cull, maybe spawn near the cycle origin, then
    /// evict the oldest glyphs down to the cap.
    pub fn step(
        &mut self,
        dt: f64,
        supervisor: &PhaseSupervisor,
        rng: &mut impl Rng,
    ) -> StepReport {
        let mut report = StepReport::default();

        let before = self.glyphs.len();
        let rule = &self.rule;
        self.glyphs
            .retain(|_, glyph| rule.evolve(glyph, dt, supervisor, &mut *rng));
        report.expired = before - self.glyphs.len();

        if supervisor.global_phase() < self.params.spawn_window
            && rng.random_bool(self.params.spawn_probability)
        {
            let seed = self.random_seed(rng);
            self.spawn(seed, rng);
            report.spawned = 1;
        }

        while self.glyphs.len() > self.params.cap {
            self.glyphs.pop_first();
            report.evicted += 1;
        }

        if report != StepReport::default() {
            tracing::debug!(
                expired = report.expired,
                spawned = report.spawned,
                evicted = report.evicted,
                live = self.glyphs.len(),
                "population step"
            );
        }
        report
    }

    /// A renewal glyph at a random polar offset from the grid centre.
    fn random_seed(&self, rng: &mut impl Rng) -> GlyphSeed {
        let half = self.params.grid_size as f64 / 2.0;
        let angle = rng.random::<f64>() * TAU;
        let radius = half * rng.random_range(0.25..0.875);
        GlyphSeed {
            x: half + angle.cos() * radius,
            y: half + angle.sin() * radius,
            tension: rng.random_range(0.4..0.8),
            curvature: rng.random_range(0.3..0.6),
            phase: rng.random::<f64>(),
            kind: if rng.random_bool(0.5) {
                GlyphKind::Implosion
            } else {
                GlyphKind::Expansion
            },
        }
    }

    /// exp(-variance · scale) of the circular phase spread. 0 below two glyphs.
    pub fn coherence(&self, variance_scale: f64) -> f64 {
        if self.glyphs.len() < 2 {
            return 0.0;
        }
        let Some(mean) = circular_mean(self.glyphs.values().map(|g| g.phase)) else {
            return 0.0;
        };
        let variance = self
            .glyphs
            .values()
            .map(|g| circular_distance(g.phase, mean).powi(2))
            .sum::<f64>()
            / self.glyphs.len() as f64;
        (-variance * variance_scale).exp()
    }

    pub fn total_energy(&self) -> f64 {
        self.glyphs.values().map(|g| g.energy).sum()
    }

    pub fn consciousness(&self, variance_scale: f64, energy_normalizer: f64) -> f64 {
        consciousness(
            self.coherence(variance_scale),
            self.total_energy(),
            energy_normalizer,
        )
    }

    pub fn mean_state(&self) -> Option<MeanState> {
        let n = self.glyphs.len();
        if n == 0 {
            return None;
        }
        let phase = circular_mean(self.glyphs.values().map(|g| g.phase))?;
        Some(MeanState {
            tension: self.glyphs.values().map(|g| g.tension).sum::<f64>() / n as f64,
            curvature: self.glyphs.values().map(|g| g.curvature).sum::<f64>() / n as f64,
            phase,
        })
    }
}

/// coherence · min(1, total_energy / energy_normalizer)
pub fn consciousness(coherence: f64, total_energy: f64, energy_normalizer: f64) -> f64 {
    coherence * (total_energy / energy_normalizer).min(1.0)
}
