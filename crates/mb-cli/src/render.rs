//! Terminal frame renderer.
//!
//! Each cell becomes one character picked by curvature band and phase
//! quadrant. Cells holding a glyph are overdrawn with an implosion or bloom
//! mark depending on which score dominates.

use mb_core::Snapshot;

const VERY_LOW: [char; 4] = ['.', '·', '˙', '°'];
const LOW: [char; 4] = ['-', '~', '=', '≈'];
const MEDIUM: [char; 4] = ['o', 'ø', '◦', '○'];
const HIGH: [char; 4] = ['+', '✦', '✧', '◊'];
const VERY_HIGH: [char; 4] = ['*', '⋆', '★', '✸'];
const IMPLOSION: [char; 4] = ['◉', '●', '◎', '⊛'];
const BLOOM: [char; 4] = ['✿', '❀', '✾', '❁'];

fn quadrant(phase: f64) -> usize {
    ((phase * 4.0).floor() as usize).min(3)
}

/// Symbol for a field cell.
pub fn cell_symbol(curvature: f64, phase: f64) -> char {
    let q = quadrant(phase);
    match curvature {
        k if k < 0.1 => VERY_LOW[q],
        k if k < 0.25 => LOW[q],
        k if k < 0.4 => MEDIUM[q],
        k if k < 0.6 => HIGH[q],
        k if k < 0.8 => VERY_HIGH[q],
        _ if phase < 0.3 => IMPLOSION[q],
        _ => BLOOM[q],
    }
}

/// Symbol for a glyph, by its dominant score.
pub fn glyph_symbol(phase: f64, implosion: f64, bloom: f64) -> char {
    let q = quadrant(phase);
    if implosion > bloom {
        IMPLOSION[q]
    } else {
        BLOOM[q]
    }
}

/// One-line summary of a snapshot.
pub fn status_line(snap: &Snapshot) -> String {
    format!(
        "tick={} phase={:.3} mode={} coherence={:.3} energy={:.3} consciousness={:.3} glyphs={}",
        snap.tick,
        snap.phase,
        snap.mode,
        snap.coherence,
        snap.total_energy,
        snap.consciousness,
        snap.glyph_count(),
    )
}

/// Full frame: the grid followed by the status line.
pub fn render(snap: &Snapshot) -> String {
    let size = snap.field.size;
    let mut rows: Vec<Vec<char>> = (0..size)
        .map(|y| {
            (0..size)
                .map(|x| {
                    snap.field
                        .get(x, y)
                        .map(|s| cell_symbol(s.cell.curvature, s.cell.phase))
                        .unwrap_or(' ')
                })
                .collect()
        })
        .collect();

    for sample in &snap.glyphs {
        let (gx, gy) = (sample.glyph.x.floor(), sample.glyph.y.floor());
        if gx < 0.0 || gy < 0.0 {
            continue;
        }
        let (gx, gy) = (gx as usize, gy as usize);
        if let Some(row) = rows.get_mut(gy)
            && let Some(ch) = row.get_mut(gx)
        {
            *ch = glyph_symbol(sample.glyph.phase, sample.implosion, sample.bloom);
        }
    }

    let mut out = String::with_capacity(size * (size + 1) * 3 + 128);
    for row in rows {
        out.extend(row);
        out.push('\n');
    }
    out.push_str(&status_line(snap));
    out
}
