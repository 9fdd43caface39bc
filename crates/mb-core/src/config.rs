//! Constructor-time configuration.
//!
//! Every tunable lives here; nothing is adjusted per tick. The two presets
//! reproduce the constants of the field processor and of the kernel motor,
//! which differ slightly and are kept side by side rather than merged.

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::{ConfigError, Result};
use crate::evolve::EvolutionRule;
use crate::field::RelaxParams;
use crate::mode::ModeClassifier;
use crate::phase::ClockMode;
use crate::population::PopulationParams;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    /// Milliseconds per global-phase revolution.
    pub cycle_period: f64,
    pub coupling: f64,
    pub clock: ClockMode,
    pub grid_size: usize,
    pub population_cap: usize,
    pub initial_glyphs: usize,
    pub spawn_probability: f64,
    pub spawn_window: f64,
    pub variance_scale: f64,
    pub energy_normalizer: f64,
    pub lifetime_decay: f64,
    pub influence_radius: f64,
    pub influence_epsilon: f64,
    pub blend_factor: f64,
    pub glyph_dt: f64,
    pub field_dt: f64,
    pub evolution: EvolutionRule,
    pub thresholds: ModeClassifier,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self::moederbloem()
    }
}

impl FieldConfig {
    /// Spatial-diffusion field processor: slow cycle, gentle coupling.
    pub fn moederbloem() -> Self {
        Self {
            cycle_period: MB_CYCLE_PERIOD,
            coupling: MB_COUPLING,
            clock: ClockMode::Absolute,
            grid_size: MB_GRID_SIZE,
            population_cap: POPULATION_CAP,
            initial_glyphs: MB_INITIAL_GLYPHS,
            spawn_probability: SPAWN_PROBABILITY,
            spawn_window: SPAWN_WINDOW,
            variance_scale: MB_VARIANCE_SCALE,
            energy_normalizer: ENERGY_NORMALIZER,
            lifetime_decay: LIFETIME_DECAY,
            influence_radius: INFLUENCE_RADIUS,
            influence_epsilon: INFLUENCE_EPSILON,
            blend_factor: BLEND_FACTOR,
            glyph_dt: GLYPH_DT,
            field_dt: FIELD_DT,
            evolution: EvolutionRule::Spatial,
            thresholds: ModeClassifier::default(),
        }
    }

    /// Kernel motor: fast cycle, stronger coupling, typed energy drive,
    /// incrementally accumulated clock.
    pub fn kernel() -> Self {
        Self {
            cycle_period: KERNEL_CYCLE_PERIOD,
            coupling: KERNEL_COUPLING,
            clock: ClockMode::Incremental,
            variance_scale: KERNEL_VARIANCE_SCALE,
            evolution: EvolutionRule::Discrete,
            ..Self::moederbloem()
        }
    }

    /// Reject anything that would produce NaN/Infinity or an empty model.
    pub fn validate(&self) -> Result<()> {
        positive("cycle_period", self.cycle_period)?;
        unit_interval("coupling", self.coupling)?;
        if self.grid_size == 0 || self.grid_size > MAX_GRID_SIZE {
            return Err(ConfigError::OutOfRange {
                field: "grid_size",
                value: self.grid_size as f64,
                expected: "1..=256",
            });
        }
        if self.population_cap == 0 {
            return Err(ConfigError::OutOfRange {
                field: "population_cap",
                value: 0.0,
                expected: ">= 1",
            });
        }
        unit_interval("spawn_probability", self.spawn_probability)?;
        unit_interval("spawn_window", self.spawn_window)?;
        non_negative("variance_scale", self.variance_scale)?;
        positive("energy_normalizer", self.energy_normalizer)?;
        non_negative("lifetime_decay", self.lifetime_decay)?;
        if self.evolution == EvolutionRule::Discrete && self.lifetime_decay <= 0.0 {
            return Err(ConfigError::OutOfRange {
                field: "lifetime_decay",
                value: self.lifetime_decay,
                expected: "> 0 with discrete evolution",
            });
        }
        positive("influence_radius", self.influence_radius)?;
        non_negative("influence_epsilon", self.influence_epsilon)?;
        unit_interval("blend_factor", self.blend_factor)?;
        non_negative("glyph_dt", self.glyph_dt)?;
        non_negative("field_dt", self.field_dt)?;
        self.thresholds.validate()
    }

    pub fn population_params(&self) -> PopulationParams {
        PopulationParams {
            cap: self.population_cap,
            spawn_probability: self.spawn_probability,
            spawn_window: self.spawn_window,
            grid_size: self.grid_size,
        }
    }

    pub fn relax_params(&self) -> RelaxParams {
        RelaxParams {
            influence_radius: self.influence_radius,
            influence_epsilon: self.influence_epsilon,
            blend_factor: self.blend_factor,
            field_dt: self.field_dt,
        }
    }
}

pub(crate) fn finite(field: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ConfigError::NonFinite { field, value })
    }
}

fn positive(field: &'static str, value: f64) -> Result<()> {
    if finite(field, value)? > 0.0 {
        return Ok(());
    }
    Err(ConfigError::OutOfRange {
        field,
        value,
        expected: "> 0",
    })
}

fn non_negative(field: &'static str, value: f64) -> Result<()> {
    if finite(field, value)? >= 0.0 {
        return Ok(());
    }
    Err(ConfigError::OutOfRange {
        field,
        value,
        expected: ">= 0",
    })
}

pub(crate) fn unit_interval(field: &'static str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&finite(field, value)?) {
        return Ok(());
    }
    Err(ConfigError::OutOfRange {
        field,
        value,
        expected: "[0, 1]",
    })
}
