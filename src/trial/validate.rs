// Form validation
// Registration age and trial answers, checked before anything is persisted
use std::collections::HashMap;
use thiserror::Error;

use super::models::{ResponseMode, TrialResponse};

/// Form field holding the opt-out rank
pub const OPT_OUT_FIELD: &str = "rank_none";
/// Form field holding the chosen stimulus index
pub const CHOICE_FIELD: &str = "choice";

/// Youngest and oldest accepted ages
pub const MIN_AGE: u32 = 1;
pub const MAX_AGE: u32 = 129;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("ranks must not repeat")]
    DuplicateRanks,

    #[error("every option needs a rank")]
    MissingRank,

    #[error("invalid rank: {0}")]
    InvalidRank(String),

    #[error("please choose one of the clips")]
    MissingChoice,

    #[error("invalid choice: {0}")]
    InvalidChoice(String),

    #[error("please enter your age as a number")]
    AgeNotNumeric,

    #[error("age must be between 1 and 129, got {0}")]
    AgeOutOfRange(u32),
}

/// Form field holding the rank of stimulus `index`
pub fn rank_field(index: usize) -> String {
    format!("rank_{}", index)
}

/// Check that `ranks` is a permutation of 1..=ranks.len()
pub fn check_ranks(ranks: &[u8]) -> Result<(), ValidationError> {
    let n = ranks.len();
    if let Some(bad) = ranks.iter().find(|&&r| r == 0 || r as usize > n) {
        return Err(ValidationError::InvalidRank(bad.to_string()));
    }

    let mut seen = vec![false; n + 1];
    for &rank in ranks {
        if seen[rank as usize] {
            return Err(ValidationError::DuplicateRanks);
        }
        seen[rank as usize] = true;
    }

    Ok(())
}

/// Turn submitted form fields into a trial response
pub fn parse_response(
    mode: ResponseMode,
    stimuli: usize,
    form: &HashMap<String, String>,
) -> Result<TrialResponse, ValidationError> {
    match mode {
        ResponseMode::Rank => {
            let mut all = Vec::with_capacity(stimuli + 1);
            for index in 0..stimuli {
                all.push(parse_rank(form.get(&rank_field(index)))?);
            }
            all.push(parse_rank(form.get(OPT_OUT_FIELD))?);

            check_ranks(&all)?;

            let opt_out_rank = all.pop().ok_or(ValidationError::MissingRank)?;
            Ok(TrialResponse::Ranked {
                ranks: all,
                opt_out_rank,
            })
        }
        ResponseMode::Choice => {
            let raw = form
                .get(CHOICE_FIELD)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .ok_or(ValidationError::MissingChoice)?;
            let chosen: usize = raw
                .parse()
                .map_err(|_| ValidationError::InvalidChoice(raw.to_string()))?;
            if chosen >= stimuli {
                return Err(ValidationError::InvalidChoice(raw.to_string()));
            }
            Ok(TrialResponse::Choice { chosen })
        }
    }
}

fn parse_rank(value: Option<&String>) -> Result<u8, ValidationError> {
    let value = value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .ok_or(ValidationError::MissingRank)?;
    value
        .parse()
        .map_err(|_| ValidationError::InvalidRank(value.to_string()))
}

/// Parse the registration age field
pub fn parse_age(input: &str) -> Result<u32, ValidationError> {
    let age: u32 = input
        .trim()
        .parse()
        .map_err(|_| ValidationError::AgeNotNumeric)?;
    if !(MIN_AGE..=MAX_AGE).contains(&age) {
        return Err(ValidationError::AgeOutOfRange(age));
    }
    Ok(age)
}
