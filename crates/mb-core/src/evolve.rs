//! Per-tick glyph evolution rules.
//!
//! Two rules share one contract: realign the glyph's phase toward the global
//! oscillator, update its tension or energy, age it, and report whether it
//! survives. The field processor uses [`SpatialDiffusion`]; the kernel motor
//! uses [`DiscreteDrive`]. Which one runs is a configuration choice.

use std::fmt;

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::constants::{
    KERNEL_ENERGY_CEILING, KERNEL_ENERGY_FLOOR, KERNEL_ENERGY_MIN, KERNEL_ENERGY_SPAN,
    KERNEL_EXPANSION_GROWTH, KERNEL_IMPLOSION_DECAY, LIFETIME_DECAY, TENSION_DECAY, TENSION_FLOOR,
    TENSION_NOISE,
};
use crate::glyph::{Glyph, GlyphKind, derived_energy};
use crate::phase::{PhaseSupervisor, wrap_phase};

/// Capability interface for glyph evolution.
pub trait GlyphEvolution: fmt::Debug + Send + Sync {
    /// Energy assigned when a glyph enters the population.
    fn initial_energy(&self, glyph: &Glyph, rng: &mut dyn RngCore) -> f64;

    /// Advance one tick. Returns false when the glyph should be culled.
    fn evolve(
        &self,
        glyph: &mut Glyph,
        dt: f64,
        supervisor: &PhaseSupervisor,
        rng: &mut dyn RngCore,
    ) -> bool;
}

/// Configuration tag selecting an evolution rule.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvolutionRule {
    #[default]
    Spatial,
    Discrete,
}

impl EvolutionRule {
    pub fn build(self, lifetime_decay: f64) -> Box<dyn GlyphEvolution> {
        match self {
            EvolutionRule::Spatial => Box::new(SpatialDiffusion {
                lifetime_decay,
                ..SpatialDiffusion::default()
            }),
            EvolutionRule::Discrete => Box::new(DiscreteDrive {
                lifetime_decay,
                ..DiscreteDrive::default()
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spatial => "spatial",
            Self::Discrete => "discrete",
        }
    }
}

/// Phase advances at ΔΦ·κ, tension relaxes with noise, energy follows
/// ΔΦ·(1+κ)·|sin πθ|.
#[derive(Clone, Debug, PartialEq)]
pub struct SpatialDiffusion {
    pub tension_decay: f64,
    /// Half-width of the uniform noise added to tension.
    pub tension_noise: f64,
    pub tension_floor: f64,
    pub lifetime_decay: f64,
}

impl Default for SpatialDiffusion {
    fn default() -> Self {
        Self {
            tension_decay: TENSION_DECAY,
            tension_noise: TENSION_NOISE,
            tension_floor: TENSION_FLOOR,
            lifetime_decay: LIFETIME_DECAY,
        }
    }
}

impl GlyphEvolution for SpatialDiffusion {
    fn initial_energy(&self, glyph: &Glyph, _rng: &mut dyn RngCore) -> f64 {
        derived_energy(glyph.tension, glyph.curvature, glyph.phase)
    }

    fn evolve(
        &self,
        glyph: &mut Glyph,
        dt: f64,
        supervisor: &PhaseSupervisor,
        rng: &mut dyn RngCore,
    ) -> bool {
        glyph.phase = wrap_phase(glyph.phase + glyph.tension * glyph.curvature * dt);
        glyph.phase = supervisor.synchronize(glyph.phase);

        let noise = if self.tension_noise > 0.0 {
            rng.random_range(-self.tension_noise..self.tension_noise)
        } else {
            0.0
        };
        glyph.tension = (glyph.tension * self.tension_decay + noise).clamp(self.tension_floor, 1.0);

        glyph.recompute_energy();
        glyph.lifetime -= self.lifetime_decay;
        glyph.is_alive()
    }
}

/// Energy is a free quantity driven by the glyph's kind: implosion glyphs
/// decay, everything else grows. Exhausted glyphs are culled.
#[derive(Clone, Debug, PartialEq)]
pub struct DiscreteDrive {
    pub implosion_decay: f64,
    pub expansion_growth: f64,
    /// Energy below this snaps to exactly zero.
    pub energy_floor: f64,
    pub energy_ceiling: f64,
    pub lifetime_decay: f64,
    pub energy_min: f64,
    pub energy_span: f64,
}

impl Default for DiscreteDrive {
    fn default() -> Self {
        Self {
            implosion_decay: KERNEL_IMPLOSION_DECAY,
            expansion_growth: KERNEL_EXPANSION_GROWTH,
            energy_floor: KERNEL_ENERGY_FLOOR,
            energy_ceiling: KERNEL_ENERGY_CEILING,
            lifetime_decay: LIFETIME_DECAY,
            energy_min: KERNEL_ENERGY_MIN,
            energy_span: KERNEL_ENERGY_SPAN,
        }
    }
}

impl GlyphEvolution for DiscreteDrive {
    fn initial_energy(&self, _glyph: &Glyph, rng: &mut dyn RngCore) -> f64 {
        self.energy_min + rng.random::<f64>() * self.energy_span
    }

    fn evolve(
        &self,
        glyph: &mut Glyph,
        _dt: f64,
        supervisor: &PhaseSupervisor,
        _rng: &mut dyn RngCore,
    ) -> bool {
        glyph.phase = supervisor.synchronize(glyph.phase);

        let factor = match glyph.kind {
            GlyphKind::Implosion => self.implosion_decay,
            GlyphKind::Expansion => self.expansion_growth,
        };
        glyph.energy = (glyph.energy * factor).min(self.energy_ceiling);
        if glyph.energy < self.energy_floor {
            glyph.energy = 0.0;
        }

        glyph.lifetime -= self.lifetime_decay;
        glyph.energy > 0.0 && glyph.is_alive()
    }
}
