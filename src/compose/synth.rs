// FluidSynth rendering for composed loops
use std::path::Path;
use std::process::Command;

use super::ComposeError;

pub const FLUIDSYNTH_BIN: &str = "fluidsynth";

/// Render a MIDI file to WAV with the fluidsynth CLI.
///
/// Runs `fluidsynth -ni <soundfont> <midi> -F <wav> -r <rate>` and waits
/// for it to finish.
pub fn render_with_fluidsynth(
    soundfont: &Path,
    midi_path: &Path,
    wav_path: &Path,
    sample_rate: u32,
) -> Result<(), ComposeError> {
    if !soundfont.is_file() {
        return Err(ComposeError::MissingSoundfont(soundfont.to_path_buf()));
    }

    let output = Command::new(FLUIDSYNTH_BIN)
        .arg("-ni")
        .arg(soundfont)
        .arg(midi_path)
        .arg("-F")
        .arg(wav_path)
        .arg("-r")
        .arg(sample_rate.to_string())
        .output()
        .map_err(ComposeError::SynthLaunch)?;

    if !output.status.success() {
        return Err(ComposeError::SynthFailed {
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    log::info!("Rendered {} -> {}", midi_path.display(), wav_path.display());
    Ok(())
}
