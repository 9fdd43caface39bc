//! Moederbloem ΔΦ–κ–θ field engine.
//!
//! A population of short-lived glyphs, each carrying tension (ΔΦ), curvature
//! (κ) and phase (θ), evolves on a square grid under a single global phase
//! oscillator. Every local phase is pulled toward the global one; the grid
//! relaxes toward the glyphs near each cell; circular phase variance gives a
//! coherence that classifies the field as implosive, neutral or in bloom.
//!
//! Zero I/O. The caller owns the clock and drives `Simulation::tick(now)`.

pub mod config;
pub mod constants;
pub mod error;
pub mod evolve;
pub mod field;
pub mod glyph;
pub mod mode;
pub mod phase;
pub mod population;
pub mod simulation;
pub mod snapshot;

pub use config::FieldConfig;
pub use error::ConfigError;
pub use evolve::{DiscreteDrive, EvolutionRule, GlyphEvolution, SpatialDiffusion};
pub use field::{FieldCell, FieldGrid, RelaxParams};
pub use glyph::{Glyph, GlyphId, GlyphKind, GlyphSeed, derived_energy};
pub use mode::{Mode, ModeClassifier};
pub use phase::{
    ClockMode, PhaseEntity, PhaseSupervisor, circular_distance, circular_mean,
    weighted_circular_mean, wrap_phase,
};
pub use population::{MeanState, Population, PopulationParams, StepReport, consciousness};
pub use simulation::{Injection, Simulation};
pub use snapshot::{CellSample, FieldSnapshot, GlyphSample, Snapshot};
