use serde::{Deserialize, Serialize};

use crate::field::FieldCell;
use crate::glyph::Glyph;
use crate::mode::Mode;
use crate::population::{MeanState, StepReport};

/// A glyph as seen at the end of a tick, scored against the global phase.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GlyphSample {
    #[serde(flatten)]
    pub glyph: Glyph,
    pub implosion: f64,
    pub bloom: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CellSample {
    #[serde(flatten)]
    pub cell: FieldCell,
    pub implosion: f64,
    pub bloom: f64,
}

/// Row-major copy of the grid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldSnapshot {
    pub size: usize,
    pub cells: Vec<CellSample>,
}

impl FieldSnapshot {
    pub fn get(&self, x: usize, y: usize) -> Option<&CellSample> {
        if x >= self.size || y >= self.size {
            return None;
        }
        self.cells.get(y * self.size + x)
    }
}

/// Immutable result of one tick. Owned by the caller; the simulation never
/// touches it again.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// 1 for the first tick.
    pub tick: u64,
    /// The `now` actually used, after monotone clamping.
    pub now: f64,
    pub phase: f64,
    pub mode: Mode,
    pub coherence: f64,
    pub total_energy: f64,
    pub consciousness: f64,
    pub mean_state: Option<MeanState>,
    pub report: StepReport,
    pub glyphs: Vec<GlyphSample>,
    pub field: FieldSnapshot,
}

impl Snapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn glyph_count(&self) -> usize {
        self.glyphs.len()
    }
}
