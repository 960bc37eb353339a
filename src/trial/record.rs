// Sheet rows for participants and trial responses
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use super::models::{Participant, ResponseMode, Stimulus, Trial, TrialResponse};
use crate::config::DesignConfig;
use crate::dataset::{file_name, StimulusSource};

const STIMULUS_FIELDS: [&str; 14] = [
    "song",
    "key",
    "file_or_bass",
    "chord",
    "melody",
    "drum",
    "tempo_ratio",
    "semitones",
    "eq_low_db",
    "eq_mid_db",
    "eq_high_db",
    "price",
    "shifted_key",
    "tempo_bucket",
];

/// Pitch classes starting from C, indexed by semitone shift mod 12
const KEY_NAMES: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];

/// Header of the participants worksheet
pub fn participant_columns() -> Vec<String> {
    ["id", "gender", "age"].iter().map(|c| c.to_string()).collect()
}

pub fn participant_row(participant: &Participant) -> Vec<Value> {
    vec![
        json!(participant.id),
        json!(participant.gender.flag()),
        json!(participant.age),
    ]
}

/// Header of the responses worksheet for a design
pub fn columns(design: &DesignConfig) -> Vec<String> {
    let mut columns: Vec<String> = ["participant_id", "gender", "age", "trial", "recorded_at"]
        .iter()
        .map(|c| c.to_string())
        .collect();

    let answer: &[&str] = match design.response {
        ResponseMode::Rank => &["rank", "internal_pref", "external_pref"],
        ResponseMode::Choice => &["chosen"],
    };
    for index in 0..design.stimuli_per_trial {
        let suffix = stimulus_letter(index);
        for field in STIMULUS_FIELDS.iter().chain(answer) {
            columns.push(format!("{}_{}", field, suffix));
        }
    }

    columns.push(match design.response {
        ResponseMode::Rank => "opt_out_rank".to_string(),
        ResponseMode::Choice => "choice".to_string(),
    });
    columns
}

/// One responses row; lines up with `columns` for the same design
pub fn response_row(
    participant: &Participant,
    trial: &Trial,
    response: &TrialResponse,
    recorded_at: DateTime<Utc>,
) -> Vec<Value> {
    let mut row = vec![
        json!(participant.id),
        json!(participant.gender.flag()),
        json!(participant.age),
        json!(trial.number),
        json!(recorded_at.to_rfc3339()),
    ];

    for (index, stimulus) in trial.stimuli.iter().enumerate() {
        row.extend(stimulus_values(stimulus));
        match response {
            TrialResponse::Ranked { ranks, opt_out_rank } => {
                let rank = ranks.get(index).copied().unwrap_or(0);
                row.push(json!(rank));
                row.push(json!(u8::from(beats_other_stimuli(ranks, index))));
                row.push(json!(u8::from(rank < *opt_out_rank)));
            }
            TrialResponse::Choice { chosen } => row.push(json!(u8::from(*chosen == index))),
        }
    }

    row.push(match response {
        TrialResponse::Ranked { opt_out_rank, .. } => json!(opt_out_rank),
        TrialResponse::Choice { chosen } => json!(chosen + 1),
    });
    row
}

fn stimulus_values(stimulus: &Stimulus) -> Vec<Value> {
    let (first, chord, melody, drum) = match &stimulus.source {
        StimulusSource::File { path } => (file_name(path), String::new(), String::new(), String::new()),
        StimulusSource::Stems {
            bass,
            chord,
            melody,
            drum,
            ..
        } => (file_name(bass), file_name(chord), file_name(melody), file_name(drum)),
    };
    let params = &stimulus.params;

    vec![
        json!(stimulus.source.song()),
        json!(stimulus.source.key()),
        json!(first),
        json!(chord),
        json!(melody),
        json!(drum),
        json!(round3(params.tempo_ratio)),
        json!(params.semitones),
        json!(round3(params.eq.low_db)),
        json!(round3(params.eq.mid_db)),
        json!(round3(params.eq.high_db)),
        json!(stimulus.price),
        json!(key_name(params.semitones)),
        json!(tempo_bucket(params.tempo_ratio)),
    ]
}

/// Key reached by shifting C by `semitones`
pub fn key_name(semitones: i32) -> &'static str {
    KEY_NAMES[semitones.rem_euclid(12) as usize]
}

/// Tempo ratio as a whole percentage (1.25 -> 125)
pub fn tempo_bucket(tempo_ratio: f32) -> u32 {
    (tempo_ratio as f64 * 100.0).round() as u32
}

// Ranked strictly better (lower) than every other stimulus of the trial
fn beats_other_stimuli(ranks: &[u8], index: usize) -> bool {
    match ranks.get(index) {
        Some(&rank) => ranks
            .iter()
            .enumerate()
            .all(|(other, &other_rank)| other == index || rank < other_rank),
        None => false,
    }
}

fn stimulus_letter(index: usize) -> char {
    (b'a' + index as u8) as char
}

// f32 option values would otherwise print as 0.800000011920929
fn round3(value: f32) -> f64 {
    (value as f64 * 1000.0).round() / 1000.0
}
