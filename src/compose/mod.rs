// Compose Module - Random chord/melody loop generator
// Writes standard MIDI files and optionally renders them with FluidSynth

pub mod midi;
pub mod synth;
pub mod tables;

use std::path::PathBuf;
use thiserror::Error;

pub use midi::{export_loop_midi, generate_loop, write_loop_midi, LoopSpec, MelodyNote};
pub use synth::render_with_fluidsynth;

#[derive(Error, Debug)]
pub enum ComposeError {
    #[error("Failed to write MIDI: {0}")]
    Midi(String),
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Soundfont not found: {0}")]
    MissingSoundfont(PathBuf),
    #[error("Failed to launch fluidsynth: {0}")]
    SynthLaunch(#[source] std::io::Error),
    #[error("fluidsynth exited with {status}: {stderr}")]
    SynthFailed { status: String, stderr: String },
}
