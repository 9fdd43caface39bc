//! End-to-end runs of the field engine through its public API:
//! config → simulation → ticks → snapshots.

use approx::{assert_abs_diff_eq, assert_relative_eq};
use mb_core::{
    ClockMode, EvolutionRule, FieldConfig, GlyphKind, Injection, Mode, PhaseSupervisor,
    Simulation, circular_distance,
};

const FRAME_MS: f64 = 16.0;

fn run(sim: &mut Simulation, ticks: usize) -> mb_core::Snapshot {
    let start = sim.ticks() as f64 * FRAME_MS;
    let mut last = None;
    for i in 0..ticks {
        last = Some(sim.tick(start + i as f64 * FRAME_MS));
    }
    last.expect("at least one tick")
}

/// Cap holds even when every tick spawns and injections pile up.
#[test]
fn population_never_exceeds_cap() {
    let config = FieldConfig {
        population_cap: 20,
        spawn_probability: 1.0,
        spawn_window: 1.0,
        ..FieldConfig::default()
    };
    let mut sim = Simulation::new(config, 3).unwrap();
    for i in 0..300 {
        if i % 3 == 0 {
            sim.inject(Injection::at(10.0, 10.0));
            sim.inject(Injection::at(20.0, 20.0));
        }
        let snap = sim.tick(i as f64 * FRAME_MS);
        assert!(snap.glyphs.len() <= 20, "tick {i}: {} glyphs", snap.glyphs.len());
        assert!(sim.population().len() <= 20);
    }
}

/// Eviction keeps the newest glyphs.
#[test]
fn eviction_drops_oldest_first() {
    let config = FieldConfig {
        population_cap: 12,
        spawn_probability: 0.0,
        ..FieldConfig::default()
    };
    let mut sim = Simulation::new(config, 5).unwrap();
    let oldest = sim.population().iter().next().unwrap().id;
    sim.inject(Injection::at(1.0, 1.0));
    let snap = sim.tick(0.0);
    assert_eq!(snap.glyphs.len(), 12);
    assert_eq!(snap.report.evicted, 1);
    assert!(snap.glyphs.iter().all(|g| g.glyph.id != oldest));
}

/// A glyph whose lifetime runs out is gone in the snapshot of that tick.
#[test]
fn expired_glyphs_leave_the_same_tick() {
    let config = FieldConfig {
        lifetime_decay: 0.5,
        spawn_probability: 0.0,
        ..FieldConfig::default()
    };
    let mut sim = Simulation::new(config, 9).unwrap();

    let first = sim.tick(0.0);
    assert_eq!(first.glyphs.len(), 12);
    assert_eq!(first.report.expired, 0);

    let second = sim.tick(FRAME_MS);
    assert!(second.glyphs.is_empty());
    assert_eq!(second.report.expired, 12);
    assert_eq!(second.coherence, 0.0);
    assert_eq!(second.consciousness, 0.0);
    assert_eq!(second.total_energy, 0.0);
    assert_eq!(second.mode, Mode::Implosive);
    assert!(second.mean_state.is_none());
}

#[test]
fn same_seed_same_snapshots() {
    let snapshots = |seed| {
        let mut sim = Simulation::new(FieldConfig::default(), seed).unwrap();
        (0..120)
            .map(|i| {
                if i == 40 {
                    sim.inject(Injection::at(16.0, 16.0));
                }
                sim.tick(i as f64 * FRAME_MS)
            })
            .collect::<Vec<_>>()
    };
    assert_eq!(snapshots(11), snapshots(11));
    assert_ne!(snapshots(11), snapshots(12));
}

/// Injections never land mid-tick: the queue is drained at the next tick.
#[test]
fn injection_applies_at_next_tick() {
    let config = FieldConfig {
        spawn_probability: 0.0,
        ..FieldConfig::default()
    };
    let mut sim = Simulation::new(config, 1).unwrap();
    let before = sim.tick(0.0);

    sim.inject(Injection {
        kind: GlyphKind::Implosion,
        ..Injection::at(30.0, 2.0)
    });
    assert_eq!(sim.population().len(), before.glyphs.len());

    let after = sim.tick(FRAME_MS);
    assert_eq!(after.glyphs.len(), before.glyphs.len() + 1);
    let injected = after.glyphs.last().unwrap();
    assert_eq!((injected.glyph.x, injected.glyph.y), (30.0, 2.0));
    assert_eq!(injected.glyph.kind, GlyphKind::Implosion);
}

/// Out-of-range injections are clamped, never rejected.
#[test]
fn injection_values_are_clamped() {
    let mut sim = Simulation::new(FieldConfig::default(), 1).unwrap();
    sim.inject(Injection {
        tension: 4.0,
        curvature: -3.0,
        phase: Some(2.75),
        ..Injection::at(5.0, 5.0)
    });
    let snap = sim.tick(0.0);
    let g = &snap.glyphs.last().unwrap().glyph;
    assert!(g.tension <= 1.0);
    assert_eq!(g.curvature, 0.0);
    assert!((0.0..1.0).contains(&g.phase));
}

/// With full coupling every phase snaps to the global phase.
#[test]
fn full_coupling_blooms() {
    let config = FieldConfig {
        coupling: 1.0,
        spawn_probability: 0.0,
        ..FieldConfig::default()
    };
    let mut sim = Simulation::new(config, 21).unwrap();
    let snap = sim.tick(1000.0);
    assert_relative_eq!(snap.coherence, 1.0, epsilon = 1e-9);
    assert_eq!(snap.mode, Mode::Bloom);
    for sample in &snap.glyphs {
        assert_abs_diff_eq!(circular_distance(sample.glyph.phase, 0.25), 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(sample.bloom, 0.0, epsilon = 1e-9);
    }
    let mean = snap.mean_state.unwrap();
    assert_abs_diff_eq!(mean.phase, 0.25, epsilon = 1e-9);
}

/// Scores partition energy for glyphs and cells alike.
#[test]
fn scores_partition_energy_in_snapshots() {
    let mut sim = Simulation::new(FieldConfig::default(), 4).unwrap();
    let snap = run(&mut sim, 30);
    for sample in &snap.glyphs {
        assert_abs_diff_eq!(sample.implosion + sample.bloom, sample.glyph.energy, epsilon = 1e-12);
    }
    for sample in &snap.field.cells {
        let energy = sample.cell.tension * (1.0 + sample.cell.curvature);
        assert_abs_diff_eq!(sample.implosion + sample.bloom, energy, epsilon = 1e-12);
    }
}

#[test]
fn consciousness_is_coherence_times_normalized_energy() {
    let mut sim = Simulation::new(FieldConfig::default(), 8).unwrap();
    let snap = run(&mut sim, 25);
    let expected = snap.coherence * (snap.total_energy / 5.0).min(1.0);
    assert_relative_eq!(snap.consciousness, expected, epsilon = 1e-12);
    let total: f64 = snap.glyphs.iter().map(|g| g.glyph.energy).sum();
    assert_relative_eq!(snap.total_energy, total, epsilon = 1e-12);
}

/// Under the discrete rule implosion glyphs lose energy and expansion glyphs gain it.
#[test]
fn kernel_preset_drives_energy_by_kind() {
    let config = FieldConfig {
        spawn_probability: 0.0,
        ..FieldConfig::kernel()
    };
    assert_eq!(config.evolution, EvolutionRule::Discrete);
    let mut sim = Simulation::new(config, 13).unwrap();
    let start: Vec<_> = sim.population().iter().cloned().collect();
    let snap = sim.tick(10.0);

    for (before, after) in start.iter().zip(&snap.glyphs) {
        assert_eq!(before.id, after.glyph.id);
        assert!((0.2..0.6).contains(&before.energy));
        match before.kind {
            GlyphKind::Implosion => {
                assert_relative_eq!(after.glyph.energy, before.energy * 0.99, epsilon = 1e-12)
            }
            GlyphKind::Expansion => {
                assert_relative_eq!(after.glyph.energy, before.energy * 1.01, epsilon = 1e-12)
            }
        }
    }
}

/// Growing glyphs that barely age stay finite, and so does the field they
/// imprint on. Glyphs that never age are refused up front.
#[test]
fn long_lived_driven_glyphs_stay_finite() {
    let immortal = FieldConfig {
        lifetime_decay: 0.0,
        ..FieldConfig::kernel()
    };
    assert!(Simulation::new(immortal, 1).is_err());

    let config = FieldConfig {
        lifetime_decay: 1e-9,
        spawn_probability: 0.0,
        grid_size: 4,
        ..FieldConfig::kernel()
    };
    let mut sim = Simulation::new(config, 1).unwrap();
    let snap = run(&mut sim, 5_000);

    assert!(!snap.glyphs.is_empty());
    assert!(snap.total_energy.is_finite());
    assert!(snap.consciousness.is_finite());
    for sample in &snap.glyphs {
        assert_eq!(sample.glyph.kind, GlyphKind::Expansion);
        assert!(sample.glyph.energy.is_finite());
        assert!(sample.implosion.is_finite() && sample.bloom.is_finite());
    }
    for sample in &snap.field.cells {
        assert!(sample.cell.tension.is_finite());
        assert!(sample.cell.curvature.is_finite());
        assert!(sample.implosion.is_finite() && sample.bloom.is_finite());
    }
}

#[test]
fn incremental_clock_tracks_absolute_on_irregular_steps() {
    let times = [0.0, 13.0, 40.0, 41.5, 300.0, 999.0, 1750.25, 4100.0];
    let mut abs = PhaseSupervisor::new(1000.0, 0.12).unwrap();
    let mut inc = PhaseSupervisor::new(1000.0, 0.12)
        .unwrap()
        .with_clock(ClockMode::Incremental);
    for now in times {
        let a = abs.advance(now);
        let b = inc.advance(now);
        assert_abs_diff_eq!(circular_distance(a, b), 0.0, epsilon = 1e-9);
    }
}

#[test]
fn snapshot_json_exposes_state() {
    let mut sim = Simulation::new(FieldConfig::default(), 2).unwrap();
    let snap = run(&mut sim, 3);
    let json: serde_json::Value = serde_json::from_str(&snap.to_json().unwrap()).unwrap();
    assert_eq!(json["tick"], 3);
    assert_eq!(json["field"]["size"], 32);
    assert_eq!(json["field"]["cells"].as_array().unwrap().len(), 32 * 32);
    assert_eq!(json["glyphs"].as_array().unwrap().len(), snap.glyphs.len());
    assert!(json["mode"].is_string());
}
