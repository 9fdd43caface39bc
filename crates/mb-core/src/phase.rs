use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::config::{finite, unit_interval};
use crate::error::{ConfigError, Result};

/// Wrap a phase onto the unit circle `[0, 1)`. Non-finite input maps to 0.
pub fn wrap_phase(theta: f64) -> f64 {
    if !theta.is_finite() {
        return 0.0;
    }
    let wrapped = theta.rem_euclid(1.0);
    // rem_euclid rounds tiny negatives up to exactly 1.0
    if wrapped >= 1.0 { 0.0 } else { wrapped }
}

/// Signed shortest distance from `b` to `a` on the unit circle.
/// Range: (-0.5, 0.5] for phases already in [0, 1).
pub fn circular_distance(a: f64, b: f64) -> f64 {
    let mut d = a - b;
    if d > 0.5 {
        d -= 1.0;
    }
    if d <= -0.5 {
        d += 1.0;
    }
    d
}

/// Weighted circular mean of `(phase, weight)` pairs, in [0, 1).
/// None when there is no positive total weight.
pub fn weighted_circular_mean(samples: impl IntoIterator<Item = (f64, f64)>) -> Option<f64> {
    let (mut sin_sum, mut cos_sum, mut weight_sum) = (0.0, 0.0, 0.0);
    for (phase, weight) in samples {
        let angle = phase * TAU;
        sin_sum += weight * angle.sin();
        cos_sum += weight * angle.cos();
        weight_sum += weight;
    }
    if weight_sum <= 0.0 {
        return None;
    }
    Some(wrap_phase(sin_sum.atan2(cos_sum) / TAU))
}

pub fn circular_mean(phases: impl IntoIterator<Item = f64>) -> Option<f64> {
    weighted_circular_mean(phases.into_iter().map(|p| (p, 1.0)))
}

/// Anything with an energy and a phase can be scored against the global phase.
pub trait PhaseEntity {
    fn energy(&self) -> f64;
    fn phase(&self) -> f64;
}

/// How the global phase is derived from the `now` sequence.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockMode {
    /// Recomputed from absolute elapsed time each tick. No accumulated error.
    #[default]
    Absolute,
    /// Advanced by the time delta since the previous call.
    Incremental,
}

/// Global phase oscillator. Every local phase in the system is pulled
/// toward it by a proportional controller of strength `coupling`.
#[derive(Clone, Debug)]
pub struct PhaseSupervisor {
    cycle_period: f64,
    coupling: f64,
    clock: ClockMode,
    start: f64,
    last: Option<f64>,
    global_phase: f64,
}

impl PhaseSupervisor {
    pub fn new(cycle_period: f64, coupling: f64) -> Result<Self> {
        if finite("cycle_period", cycle_period)? <= 0.0 {
            return Err(ConfigError::OutOfRange {
                field: "cycle_period",
                value: cycle_period,
                expected: "> 0",
            });
        }
        unit_interval("coupling", coupling)?;
        Ok(Self {
            cycle_period,
            coupling,
            clock: ClockMode::Absolute,
            start: 0.0,
            last: None,
            global_phase: 0.0,
        })
    }

    pub fn with_clock(mut self, clock: ClockMode) -> Self {
        self.clock = clock;
        self
    }

    /// Time origin; `advance(start)` yields phase 0.
    pub fn with_start(mut self, start: f64) -> Self {
        self.start = start;
        self
    }

    /// Recompute the global phase for `now` (milliseconds).
    pub fn advance(&mut self, now: f64) -> f64 {
        self.global_phase = match self.clock {
            ClockMode::Absolute => {
                wrap_phase((now - self.start).rem_euclid(self.cycle_period) / self.cycle_period)
            }
            ClockMode::Incremental => {
                let dt = now - self.last.unwrap_or(self.start);
                wrap_phase(self.global_phase + dt / self.cycle_period)
            }
        };
        self.last = Some(now);
        self.global_phase
    }

    pub fn global_phase(&self) -> f64 {
        self.global_phase
    }

    pub fn coupling(&self) -> f64 {
        self.coupling
    }

    pub fn cycle_period(&self) -> f64 {
        self.cycle_period
    }

    pub fn clock(&self) -> ClockMode {
        self.clock
    }

    /// Pull a local phase `coupling` of the way toward the global phase.
    /// coupling = 0 leaves it alone, coupling = 1 snaps it.
    pub fn synchronize(&self, local_phase: f64) -> f64 {
        let local = wrap_phase(local_phase);
        wrap_phase(local + self.coupling * circular_distance(self.global_phase, local))
    }

    /// Portion of energy attributable to misalignment with the global phase.
    pub fn bloom_score(&self, entity: &impl PhaseEntity) -> f64 {
        entity.energy() * circular_distance(self.global_phase, entity.phase()).abs()
    }

    /// Portion of energy attributable to alignment with the global phase.
    /// Together with `bloom_score` this partitions the entity's energy.
    pub fn implosion_score(&self, entity: &impl PhaseEntity) -> f64 {
        entity.energy() - self.bloom_score(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Point {
        energy: f64,
        phase: f64,
    }

    impl PhaseEntity for Point {
        fn energy(&self) -> f64 {
            self.energy
        }
        fn phase(&self) -> f64 {
            self.phase
        }
    }

    fn supervisor(cycle: f64, coupling: f64) -> PhaseSupervisor {
        PhaseSupervisor::new(cycle, coupling).unwrap()
    }

    #[test]
    fn test_wrap_phase() {
        assert_eq!(wrap_phase(0.25), 0.25);
        assert_eq!(wrap_phase(1.0), 0.0);
        assert!((wrap_phase(1.75) - 0.75).abs() < 1e-12);
        assert!((wrap_phase(-0.25) - 0.75).abs() < 1e-12);
        assert_eq!(wrap_phase(-1e-18), 0.0);
        assert_eq!(wrap_phase(f64::NAN), 0.0);
    }

    #[test]
    fn test_circular_distance_wraps_shortest_arc() {
        assert!((circular_distance(0.9, 0.1) - (-0.2)).abs() < 1e-12);
        assert!((circular_distance(0.1, 0.9) - 0.2).abs() < 1e-12);
        assert!((circular_distance(0.3, 0.1) - 0.2).abs() < 1e-12);
        assert_eq!(circular_distance(0.4, 0.4), 0.0);
    }

    #[test]
    fn test_circular_distance_half_turn_is_positive() {
        assert_eq!(circular_distance(0.75, 0.25), 0.5);
        assert_eq!(circular_distance(0.25, 0.75), 0.5);
        assert_eq!(circular_distance(0.0, 0.5), 0.5);
    }

    #[test]
    fn test_circular_mean_across_origin() {
        let mean = circular_mean([0.95, 0.05]).unwrap();
        assert!(circular_distance(mean, 0.0).abs() < 1e-9, "got {mean}");
        assert_eq!(circular_mean(std::iter::empty::<f64>()), None);
    }

    #[test]
    fn test_weighted_mean_leans_to_heavier() {
        let mean = weighted_circular_mean([(0.2, 3.0), (0.4, 1.0)]).unwrap();
        assert!(mean > 0.2 && mean < 0.3, "got {mean}");
        assert_eq!(weighted_circular_mean([(0.2, 0.0)]), None);
    }

    #[test]
    fn test_advance_scenario() {
        let mut s = supervisor(1000.0, 0.12);
        assert_eq!(s.advance(0.0), 0.0);
        assert_eq!(s.advance(500.0), 0.5);
        assert_eq!(s.global_phase(), 0.5);
    }

    #[test]
    fn test_advance_wraps_each_cycle() {
        let mut s = supervisor(1000.0, 0.12);
        assert!((s.advance(2250.0) - 0.25).abs() < 1e-12);
        assert_eq!(s.advance(3000.0), 0.0);
    }

    #[test]
    fn test_advance_respects_start() {
        let mut s = supervisor(1000.0, 0.12).with_start(200.0);
        assert_eq!(s.advance(200.0), 0.0);
        assert!((s.advance(450.0) - 0.25).abs() < 1e-12);
        // before the origin still lands on the circle
        assert!((s.advance(100.0) - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_incremental_matches_absolute_on_uniform_steps() {
        let mut abs = supervisor(1000.0, 0.12);
        let mut inc = supervisor(1000.0, 0.12).with_clock(ClockMode::Incremental);
        for i in 0..40 {
            let now = i as f64 * 125.0;
            let a = abs.advance(now);
            let b = inc.advance(now);
            assert!(
                circular_distance(a, b).abs() < 1e-9,
                "tick {i}: absolute {a} vs incremental {b}"
            );
        }
    }

    #[test]
    fn test_synchronize_pulls_toward_global() {
        let mut s = supervisor(1000.0, 0.5);
        s.advance(500.0);
        let pulled = s.synchronize(0.3);
        assert!((pulled - 0.4).abs() < 1e-12, "got {pulled}");
    }

    #[test]
    fn test_synchronize_crosses_origin() {
        let mut s = supervisor(1000.0, 0.5);
        s.advance(0.0);
        // 0.9 is 0.1 behind 0.0; half the gap puts it at 0.95
        let pulled = s.synchronize(0.9);
        assert!((pulled - 0.95).abs() < 1e-12, "got {pulled}");
    }

    #[test]
    fn test_synchronize_coupling_extremes() {
        let mut off = supervisor(1000.0, 0.0);
        off.advance(250.0);
        assert_eq!(off.synchronize(0.6), 0.6);

        let mut snap = supervisor(1000.0, 1.0);
        snap.advance(250.0);
        assert!((snap.synchronize(0.6) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_scores_partition_energy() {
        let mut s = supervisor(1000.0, 0.12);
        s.advance(100.0);
        for (energy, phase) in [(0.53, 0.25), (1.2, 0.1), (0.0, 0.7), (3.0, 0.6)] {
            let p = Point { energy, phase };
            let sum = s.implosion_score(&p) + s.bloom_score(&p);
            assert!((sum - energy).abs() < 1e-12, "{sum} vs {energy}");
        }
    }

    #[test]
    fn test_aligned_entity_is_all_implosion() {
        let mut s = supervisor(1000.0, 0.12);
        s.advance(250.0);
        let p = Point {
            energy: 2.0,
            phase: 0.25,
        };
        assert_eq!(s.implosion_score(&p), 2.0);
        assert_eq!(s.bloom_score(&p), 0.0);
    }

    #[test]
    fn test_rejects_bad_parameters() {
        assert!(PhaseSupervisor::new(0.0, 0.1).is_err());
        assert!(PhaseSupervisor::new(-5.0, 0.1).is_err());
        assert!(PhaseSupervisor::new(f64::NAN, 0.1).is_err());
        assert!(PhaseSupervisor::new(1000.0, 1.5).is_err());
    }
}
