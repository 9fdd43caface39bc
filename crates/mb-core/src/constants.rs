// Moederbloem field processor values.

/// Milliseconds per global-phase revolution.
pub const MB_CYCLE_PERIOD: f64 = 4000.0;

/// Pull strength toward the global phase.
pub const MB_COUPLING: f64 = 0.08;

/// Scale applied to circular phase variance before exponentiation.
pub const MB_VARIANCE_SCALE: f64 = 4.0;

/// Side length of the square field grid.
pub const MB_GRID_SIZE: usize = 32;

/// Glyphs seeded on the initial ring.
pub const MB_INITIAL_GLYPHS: usize = 12;

// Kernel (motor + scheduler) values.

pub const KERNEL_CYCLE_PERIOD: f64 = 1000.0;
pub const KERNEL_COUPLING: f64 = 0.12;
pub const KERNEL_VARIANCE_SCALE: f64 = 10.0;

/// Per-tick energy factor for implosion glyphs.
pub const KERNEL_IMPLOSION_DECAY: f64 = 0.99;

/// Per-tick energy factor for every other glyph kind.
pub const KERNEL_EXPANSION_GROWTH: f64 = 1.01;

/// Energy below this snaps to zero and the glyph is culled.
pub const KERNEL_ENERGY_FLOOR: f64 = 1e-3;

/// Driven energy never grows past this.
pub const KERNEL_ENERGY_CEILING: f64 = 1e6;

/// Seeded energy range `[min, min + span)` for driven glyphs.
pub const KERNEL_ENERGY_MIN: f64 = 0.2;
pub const KERNEL_ENERGY_SPAN: f64 = 0.4;

// Shared population and field values.

pub const POPULATION_CAP: usize = 50;
pub const SPAWN_PROBABILITY: f64 = 0.1;

/// Spawn trials only run while the global phase is below this.
pub const SPAWN_WINDOW: f64 = 0.1;

/// Consciousness saturates once total energy reaches this.
pub const ENERGY_NORMALIZER: f64 = 5.0;

pub const LIFETIME_DECAY: f64 = 0.001;

/// Per-tick multiplicative tension decay.
pub const TENSION_DECAY: f64 = 0.995;

/// Half-width of the uniform tension noise.
pub const TENSION_NOISE: f64 = 0.005;

pub const TENSION_FLOOR: f64 = 0.01;

/// Glyph integration step (one frame at ~60 Hz).
pub const GLYPH_DT: f64 = 0.016;

/// Natural drift step for cells with no nearby glyph.
pub const FIELD_DT: f64 = 0.01;

/// Glyphs farther than this (grid units) do not influence a cell.
pub const INFLUENCE_RADIUS: f64 = 8.0;

/// Distance falloff: influence = energy / (1 + distance * falloff).
pub const INFLUENCE_FALLOFF: f64 = 0.5;

/// Total influence at or below this falls back to natural drift.
pub const INFLUENCE_EPSILON: f64 = 0.01;

/// Fraction of the neighbourhood average pulled into a cell per tick.
pub const BLEND_FACTOR: f64 = 0.05;

/// Coherence strictly below this is implosive.
pub const IMPLOSIVE_BELOW: f64 = 0.40;

/// Coherence strictly above this is bloom.
pub const BLOOM_ABOVE: f64 = 0.70;

/// Largest accepted grid side.
pub const MAX_GRID_SIZE: usize = 256;

// External injection defaults.

pub const INJECT_TENSION: f64 = 0.8;
pub const INJECT_CURVATURE: f64 = 0.6;
