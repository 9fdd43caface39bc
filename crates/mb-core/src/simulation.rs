//! One tick of the whole field.
//!
//! Order per tick: queued injections, global phase, glyph population,
//! field relaxation, aggregates, mode. The caller owns the loop and the
//! clock; `tick(now)` is the only way time moves.

use std::collections::VecDeque;

use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};

use crate::config::FieldConfig;
use crate::constants::{INJECT_CURVATURE, INJECT_TENSION};
use crate::error::Result;
use crate::field::{FieldGrid, RelaxParams};
use crate::glyph::{GlyphId, GlyphKind, GlyphSeed};
use crate::phase::PhaseSupervisor;
use crate::population::Population;
use crate::snapshot::{CellSample, FieldSnapshot, GlyphSample, Snapshot};

/// An externally requested glyph. Values are clamped on entry, never rejected.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Injection {
    pub x: f64,
    pub y: f64,
    pub tension: f64,
    pub curvature: f64,
    /// None takes the global phase at the moment the injection is applied.
    pub phase: Option<f64>,
    pub kind: GlyphKind,
}

impl Injection {
    /// A high-tension pulse at `(x, y)`, in step with the global phase.
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            tension: INJECT_TENSION,
            curvature: INJECT_CURVATURE,
            phase: None,
            kind: GlyphKind::default(),
        }
    }
}

#[derive(Debug)]
pub struct Simulation {
    config: FieldConfig,
    relax: RelaxParams,
    supervisor: PhaseSupervisor,
    population: Population,
    field: FieldGrid,
    rng: SmallRng,
    pending: VecDeque<Injection>,
    ticks: u64,
    last_now: Option<f64>,
}

impl Simulation {
    /// Validate `config` and build the initial state: a ring of glyphs and
    /// a radial field. Equal seeds give equal runs for equal `now` sequences.
    pub fn new(config: FieldConfig, seed: u64) -> Result<Self> {
        config.validate()?;

        let mut rng = SmallRng::seed_from_u64(seed);
        let supervisor =
            PhaseSupervisor::new(config.cycle_period, config.coupling)?.with_clock(config.clock);
        let mut population = Population::new(
            config.population_params(),
            config.evolution.build(config.lifetime_decay),
        );
        population.seed_ring(config.initial_glyphs, &mut rng);
        let field = FieldGrid::new(config.grid_size, &mut rng);

        tracing::debug!(
            seed,
            glyphs = population.len(),
            grid = config.grid_size,
            evolution = config.evolution.as_str(),
            "simulation created"
        );

        Ok(Self {
            relax: config.relax_params(),
            config,
            supervisor,
            population,
            field,
            rng,
            pending: VecDeque::new(),
            ticks: 0,
            last_now: None,
        })
    }

    pub fn config(&self) -> &FieldConfig {
        &self.config
    }

    pub fn supervisor(&self) -> &PhaseSupervisor {
        &self.supervisor
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    pub fn field(&self) -> &FieldGrid {
        &self.field
    }

    /// Ticks completed so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn pending_injections(&self) -> usize {
        self.pending.len()
    }

    /// Queue a glyph for the start of the next tick.
    pub fn inject(&mut self, injection: Injection) {
        self.pending.push_back(injection);
    }

    pub fn tick(&mut self, now: f64) -> Snapshot {
        let now = self.monotone(now);

        let injected = self.apply_injections();
        let phase = self.supervisor.advance(now);
        let report = self
            .population
            .step(self.config.glyph_dt, &self.supervisor, &mut self.rng);
        self.field
            .relax(self.population.iter(), &self.supervisor, &self.relax);

        let coherence = self.population.coherence(self.config.variance_scale);
        let total_energy = self.population.total_energy();
        let consciousness = crate::population::consciousness(
            coherence,
            total_energy,
            self.config.energy_normalizer,
        );
        let mode = self.config.thresholds.classify(coherence);

        self.ticks += 1;
        if !injected.is_empty() {
            tracing::debug!(tick = self.ticks, injected = injected.len(), "injections applied");
        }

        Snapshot {
            tick: self.ticks,
            now,
            phase,
            mode,
            coherence,
            total_energy,
            consciousness,
            mean_state: self.population.mean_state(),
            report,
            glyphs: self.glyph_samples(),
            field: self.field_snapshot(),
        }
    }

    /// Clamp `now` so time never runs backwards. Non-finite input repeats
    /// the previous instant.
    fn monotone(&mut self, now: f64) -> f64 {
        let previous = self.last_now.unwrap_or(0.0);
        let now = if !now.is_finite() {
            tracing::warn!(now, previous, "non-finite tick time, reusing previous");
            previous
        } else if let Some(last) = self.last_now
            && now < last
        {
            tracing::warn!(now, previous = last, "tick time went backwards, clamping");
            last
        } else {
            now
        };
        self.last_now = Some(now);
        now
    }

    fn apply_injections(&mut self) -> Vec<GlyphId> {
        let mut ids = Vec::with_capacity(self.pending.len());
        while let Some(injection) = self.pending.pop_front() {
            let seed = self.seed_for(&injection);
            ids.push(self.population.spawn(seed, &mut self.rng));
        }
        ids
    }

    fn seed_for(&self, injection: &Injection) -> GlyphSeed {
        GlyphSeed {
            x: injection.x,
            y: injection.y,
            tension: injection.tension,
            curvature: injection.curvature,
            phase: injection
                .phase
                .unwrap_or_else(|| self.supervisor.global_phase()),
            kind: injection.kind,
        }
    }

    fn glyph_samples(&self) -> Vec<GlyphSample> {
        self.population
            .iter()
            .map(|glyph| GlyphSample {
                implosion: self.supervisor.implosion_score(glyph),
                bloom: self.supervisor.bloom_score(glyph),
                glyph: glyph.clone(),
            })
            .collect()
    }

    fn field_snapshot(&self) -> FieldSnapshot {
        FieldSnapshot {
            size: self.field.size(),
            cells: self
                .field
                .cells()
                .iter()
                .map(|cell| CellSample {
                    cell: *cell,
                    implosion: self.supervisor.implosion_score(cell),
                    bloom: self.supervisor.bloom_score(cell),
                })
                .collect(),
        }
    }
}
