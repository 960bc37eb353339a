// Command line interface
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "melopref")]
#[command(about = "Music preference survey with procedurally varied stimuli")]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to ./melopref.toml when present)
    #[arg(short, long, global = true, env = "MELOPREF_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Run the survey web server (default)
    Serve {
        /// Override server.bind
        #[arg(long)]
        bind: Option<String>,
    },

    /// Mix WAV files, apply transforms and write the result
    Render {
        /// Input WAV files, mixed together
        #[arg(required = true)]
        sources: Vec<PathBuf>,

        #[arg(long, default_value_t = 1.0)]
        tempo: f32,

        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        semitones: i32,

        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        eq_low: f32,

        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        eq_mid: f32,

        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        eq_high: f32,

        #[arg(short, long)]
        out: PathBuf,
    },

    /// Generate a random chord/melody loop as MIDI
    Compose {
        #[arg(short, long, default_value = "loop.mid")]
        out: PathBuf,

        /// Also render to WAV with fluidsynth
        #[arg(long, requires = "soundfont")]
        render: bool,

        #[arg(long)]
        soundfont: Option<PathBuf>,

        /// WAV output (defaults to the MIDI path with a .wav extension)
        #[arg(long)]
        wav: Option<PathBuf>,

        /// Seed for a reproducible loop
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Print ledger rows as JSON lines, each worksheet led by its column header
    Export {
        /// Only rows of this worksheet
        #[arg(long)]
        worksheet: Option<String>,
    },

    /// Scan the dataset and print what was found
    Check,
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve { bind: None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_is_default() {
        let cli = Cli::try_parse_from(["melopref"]).unwrap();
        assert_eq!(cli.command(), Command::Serve { bind: None });
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_render_accepts_negative_values() {
        let cli = Cli::try_parse_from([
            "melopref", "render", "a.wav", "b.wav", "--semitones", "-3", "--eq-low", "-6", "--out", "x.wav",
        ])
        .unwrap();

        match cli.command() {
            Command::Render {
                sources,
                semitones,
                eq_low,
                tempo,
                ..
            } => {
                assert_eq!(sources.len(), 2);
                assert_eq!(semitones, -3);
                assert_eq!(eq_low, -6.0);
                assert_eq!(tempo, 1.0);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_compose_render_needs_soundfont() {
        assert!(Cli::try_parse_from(["melopref", "compose", "--render"]).is_err());
        assert!(Cli::try_parse_from(["melopref", "compose", "--render", "--soundfont", "gm.sf2"]).is_ok());
    }

    #[test]
    fn test_config_is_global() {
        let cli = Cli::try_parse_from(["melopref", "check", "--config", "survey.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("survey.toml")));
        assert_eq!(cli.command(), Command::Check);
    }
}
