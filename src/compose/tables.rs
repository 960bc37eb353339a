// Progression and instrument tables for the loop generator

/// A named chord progression; chords are MIDI note numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progression {
    pub name: &'static str,
    pub chords: &'static [&'static [u8]],
}

/// General MIDI instrument (program numbers are 0-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instrument {
    pub name: &'static str,
    pub program: u8,
}

/// Drawn alongside the progressions: chord track stays empty
pub const SILENCE: &str = "silence";

pub const PROGRESSIONS: &[Progression] = &[
    Progression {
        name: "royal-road",
        chords: &[&[60, 64, 67], &[67, 71, 74], &[69, 72, 76], &[65, 69, 72]],
    },
    Progression {
        name: "canon",
        chords: &[
            &[60, 64, 67],
            &[67, 71, 74],
            &[69, 72, 76],
            &[64, 67, 71],
            &[65, 69, 72],
            &[60, 64, 67],
            &[65, 69, 72],
            &[67, 71, 74],
        ],
    },
    Progression {
        name: "circle",
        chords: &[&[60, 64, 67], &[69, 72, 76], &[62, 65, 69], &[67, 71, 74]],
    },
    Progression {
        name: "komuro",
        chords: &[&[69, 72, 76], &[65, 69, 72], &[67, 71, 74], &[60, 64, 67]],
    },
    Progression {
        name: "rock",
        chords: &[&[60, 64, 67], &[65, 69, 72], &[67, 71, 74], &[60, 64, 67]],
    },
    Progression {
        name: "melancholy",
        chords: &[&[69, 72, 76], &[65, 69, 72], &[60, 64, 67], &[67, 71, 74]],
    },
    Progression {
        name: "ii-v-i",
        chords: &[&[62, 65, 69, 72], &[67, 71, 74, 77], &[60, 64, 67, 71]],
    },
    Progression {
        name: "modal",
        chords: &[&[60, 64, 67, 71], &[62, 65, 69, 72], &[64, 67, 71, 74], &[65, 69, 72, 76]],
    },
];

pub const CHORD_INSTRUMENTS: &[Instrument] = &[
    Instrument { name: "Acoustic Grand Piano", program: 0 },
    Instrument { name: "Electric Piano 1", program: 4 },
    Instrument { name: "Acoustic Guitar (steel)", program: 25 },
    Instrument { name: "Electric Guitar (clean)", program: 27 },
    Instrument { name: "String Ensemble 1", program: 48 },
    Instrument { name: "Pad 1 (new age)", program: 88 },
];

pub const MELODY_INSTRUMENTS: &[Instrument] = &[
    Instrument { name: "Violin", program: 40 },
    Instrument { name: "Synth Brass 1", program: 62 },
    Instrument { name: "Flute", program: 73 },
    Instrument { name: "Lead 1 (square)", program: 80 },
    Instrument { name: "Lead 2 (sawtooth)", program: 81 },
    Instrument { name: "Pad 8 (sweep)", program: 95 },
];

/// C major scale degrees above middle C, including the octave
pub const SCALE_DEGREES: [u8; 8] = [0, 2, 4, 5, 7, 9, 11, 12];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_are_well_formed() {
        assert_eq!(PROGRESSIONS.len(), 8);
        for progression in PROGRESSIONS {
            assert!(!progression.chords.is_empty());
            assert!(progression.chords.iter().all(|c| c.len() >= 3));
        }
        for instrument in CHORD_INSTRUMENTS.iter().chain(MELODY_INSTRUMENTS) {
            assert!(instrument.program < 128);
        }
    }
}
