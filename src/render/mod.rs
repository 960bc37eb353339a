// Render Engine - Stimulus transformation pipeline
// Stem mixing, tempo stretching, pitch shifting and three-band EQ

pub mod effects;
pub mod mixer;
pub mod params;
pub mod resample;
pub mod stretch;

use thiserror::Error;

use crate::audio::AudioError;

// Re-export main types
pub use effects::{equalize, peak_normalize, pitch_shift};
pub use mixer::{apply_transforms, mix_stems, render_clip, RenderedClip};
pub use params::{EqGains, TransformParams};
pub use stretch::time_stretch;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("No stems to mix")]
    NoStems,

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("FFT failed: {0}")]
    Fft(String),

    #[error("Resampling failed: {0}")]
    Resample(String),
}
