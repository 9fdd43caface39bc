use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::finite;
use crate::constants::{BLOOM_ABOVE, IMPLOSIVE_BELOW};
use crate::error::{ConfigError, Result};

/// Coarse regime of the field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Implosive,
    Neutral,
    Bloom,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Implosive => "implosive",
            Self::Neutral => "neutral",
            Self::Bloom => "bloom",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps coherence onto a [`Mode`]. Both bounds are exclusive, so a value
/// exactly on either threshold is neutral.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModeClassifier {
    pub implosive_below: f64,
    pub bloom_above: f64,
}

impl Default for ModeClassifier {
    fn default() -> Self {
        Self {
            implosive_below: IMPLOSIVE_BELOW,
            bloom_above: BLOOM_ABOVE,
        }
    }
}

impl ModeClassifier {
    pub fn classify(&self, coherence: f64) -> Mode {
        if coherence < self.implosive_below {
            Mode::Implosive
        } else if coherence > self.bloom_above {
            Mode::Bloom
        } else {
            Mode::Neutral
        }
    }

    pub fn validate(&self) -> Result<()> {
        let implosive_below = finite("thresholds.implosive_below", self.implosive_below)?;
        let bloom_above = finite("thresholds.bloom_above", self.bloom_above)?;
        if implosive_below < 0.0 || implosive_below > bloom_above || bloom_above > 1.0 {
            return Err(ConfigError::Thresholds {
                implosive_below,
                bloom_above,
            });
        }
        Ok(())
    }
}
