// Transform Parameters
// The per-stimulus knobs drawn for every trial

use serde::{Deserialize, Serialize};

/// Per-band EQ gains in dB
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EqGains {
    pub low_db: f32,
    pub mid_db: f32,
    pub high_db: f32,
}

impl EqGains {
    pub fn new(low_db: f32, mid_db: f32, high_db: f32) -> Self {
        Self {
            low_db,
            mid_db,
            high_db,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.low_db == 0.0 && self.mid_db == 0.0 && self.high_db == 0.0
    }
}

/// Effects applied to one stimulus
/// Every field has an identity value, so any subset of 0-3 effects can be active
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformParams {
    /// Playback speed multiplier, 1.0 = unchanged
    pub tempo_ratio: f32,

    /// Pitch transposition, 0 = unchanged
    pub semitones: i32,

    pub eq: EqGains,
}

impl Default for TransformParams {
    fn default() -> Self {
        TransformParams {
            tempo_ratio: 1.0,
            semitones: 0,
            eq: EqGains::default(),
        }
    }
}

impl TransformParams {
    /// Number of effects that actually change the signal
    pub fn active_effects(&self) -> usize {
        let mut count = 0;
        if self.tempo_ratio != 1.0 {
            count += 1;
        }
        if self.semitones != 0 {
            count += 1;
        }
        if !self.eq.is_flat() {
            count += 1;
        }
        count
    }
}
