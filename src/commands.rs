// Command implementations behind the CLI
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;
use std::path::{Path, PathBuf};

use crate::cli::{Cli, Command};
use crate::compose::{generate_loop, render_with_fluidsynth, write_loop_midi};
use crate::config::SurveyConfig;
use crate::dataset::scan_dataset;
use crate::render::{render_clip, EqGains, TransformParams};
use crate::state::{resolve_data_dir, ClipStore, Ledger, RemoteSheet, ResponseStore, LEDGER_FILE};
use crate::trial::record::{columns, participant_columns};
use crate::web::{build_router, AppState};

/// Sample rate for fluidsynth renders of composed loops
const COMPOSE_SAMPLE_RATE: u32 = 44100;

// Error type for commands; any displayable error converts into it
#[derive(Debug)]
pub struct CommandError {
    message: String,
}

impl CommandError {
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl<E: std::fmt::Display> From<E> for CommandError {
    fn from(error: E) -> Self {
        CommandError {
            message: error.to_string(),
        }
    }
}

pub type CommandResult<T> = Result<T, CommandError>;

pub async fn execute(cli: Cli) -> CommandResult<()> {
    match cli.command() {
        Command::Serve { bind } => {
            let mut config = SurveyConfig::load(cli.config.as_deref())?;
            if let Some(bind) = bind {
                config.server.bind = bind;
                config.validate()?;
            }
            serve(config).await
        }
        Command::Render {
            sources,
            tempo,
            semitones,
            eq_low,
            eq_mid,
            eq_high,
            out,
        } => {
            let params = TransformParams {
                tempo_ratio: tempo,
                semitones,
                eq: EqGains::new(eq_low, eq_mid, eq_high),
            };
            render_to_file(&sources, &params, &out)
        }
        Command::Compose {
            out,
            render,
            soundfont,
            wav,
            seed,
        } => {
            let soundfont = if render { soundfont } else { None };
            compose(&out, soundfont.as_deref(), wav, seed)
        }
        Command::Export { worksheet } => {
            let config = SurveyConfig::load(cli.config.as_deref())?;
            for line in export_lines(&config, worksheet.as_deref())? {
                println!("{}", line);
            }
            Ok(())
        }
        Command::Check => {
            let config = SurveyConfig::load(cli.config.as_deref())?;
            println!("{}", check_dataset(&config)?);
            Ok(())
        }
    }
}

// ==================== SERVE ====================

/// Open the ledger, remote sheet and clip directory for `config`
pub fn open_state(config: SurveyConfig) -> CommandResult<AppState> {
    let data_dir = resolve_data_dir(config.storage.data_dir.as_deref())?;
    log::info!("Data directory: {}", data_dir.display());

    let ledger = Ledger::open(&data_dir.join(LEDGER_FILE))?;
    let remote = RemoteSheet::from_config(&config.remote)?;
    match &remote {
        Some(remote) => log::info!("Appending rows to remote sheet at {}", remote.endpoint()),
        None => log::info!("No remote sheet configured, rows stay in the local ledger"),
    }

    let clips = ClipStore::new(data_dir.join("clips"))?;
    clips.purge()?;
    let store = ResponseStore::new(ledger, remote, config.storage.clone());

    Ok(AppState::new(config, store, clips))
}

async fn serve(config: SurveyConfig) -> CommandResult<()> {
    // Fail fast on a broken dataset instead of on the first trial
    let index = scan_dataset(
        &config.dataset.root,
        config.dataset.layout,
        &config.dataset.folders,
    )?;
    log::info!("Dataset {}: {}", config.dataset.root.display(), index.summary());

    let bind = config.server.bind.clone();
    let state = open_state(config)?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    log::info!("melopref listening on http://{}", bind);
    log::info!("Health check: http://{}/health", bind);

    axum::serve(listener, app).await?;
    Ok(())
}

// ==================== OFFLINE TOOLS ====================

pub fn render_to_file(sources: &[PathBuf], params: &TransformParams, out: &Path) -> CommandResult<()> {
    let clip = render_clip(sources, params)?;
    std::fs::write(out, &clip.wav_bytes)?;

    log::info!(
        "Wrote {} ({:.2}s, {} effect(s))",
        out.display(),
        clip.waveform.duration_secs(),
        params.active_effects()
    );
    Ok(())
}

/// Write a random loop to `out`, rendering it to WAV when a soundfont is given
pub fn compose(out: &Path, soundfont: Option<&Path>, wav: Option<PathBuf>, seed: Option<u64>) -> CommandResult<()> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let spec = generate_loop(&mut rng);
    write_loop_midi(&spec, out)?;

    log::info!(
        "Composed {} loop: chords on {}, melody on {} -> {}",
        spec.progression,
        spec.chord_instrument.name,
        spec.melody_instrument.name,
        out.display()
    );

    if let Some(soundfont) = soundfont {
        let wav = wav.unwrap_or_else(|| out.with_extension("wav"));
        render_with_fluidsynth(soundfont, out, &wav, COMPOSE_SAMPLE_RATE)?;
    }

    Ok(())
}

/// Ledger rows as JSON lines grouped by worksheet, oldest first
///
/// Each group opens with a `{"worksheet": .., "columns": [..]}` header line
/// when the worksheet is one the survey writes.
pub fn export_lines(config: &SurveyConfig, worksheet: Option<&str>) -> CommandResult<Vec<String>> {
    let data_dir = resolve_data_dir(config.storage.data_dir.as_deref())?;
    let ledger = Ledger::open(&data_dir.join(LEDGER_FILE))?;
    let rows = ledger.list_rows(worksheet)?;

    let mut worksheets: Vec<&str> = Vec::new();
    for row in &rows {
        if !worksheets.contains(&row.worksheet.as_str()) {
            worksheets.push(&row.worksheet);
        }
    }

    let mut lines = Vec::with_capacity(rows.len() + worksheets.len());
    for name in worksheets {
        if let Some(columns) = sheet_columns(config, name) {
            lines.push(json!({ "worksheet": name, "columns": columns }).to_string());
        }
        for row in rows.iter().filter(|row| row.worksheet == name) {
            lines.push(serde_json::to_string(row)?);
        }
    }
    Ok(lines)
}

fn sheet_columns(config: &SurveyConfig, worksheet: &str) -> Option<Vec<String>> {
    if worksheet == config.storage.participants_worksheet {
        Some(participant_columns())
    } else if worksheet == config.storage.responses_worksheet {
        Some(columns(&config.design))
    } else {
        None
    }
}

pub fn check_dataset(config: &SurveyConfig) -> CommandResult<String> {
    let index = scan_dataset(
        &config.dataset.root,
        config.dataset.layout,
        &config.dataset.folders,
    )?;
    Ok(format!("{}: {}", config.dataset.root.display(), index.summary()))
}
