// Data models for survey trials
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dataset::StimulusSource;
use crate::render::TransformParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    /// Numeric flag stored in the sheet (male = 1, female = 0)
    pub fn flag(&self) -> u8 {
        match self {
            Gender::Male => 1,
            Gender::Female => 0,
        }
    }

    pub fn from_form(value: &str) -> Option<Self> {
        match value {
            "male" => Some(Gender::Male),
            "female" => Some(Gender::Female),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }
}

/// A registered participant; immutable once created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: u32,
    pub gender: Gender,
    pub age: u32,
    pub registered_at: DateTime<Utc>,
}

/// How participants answer a trial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    /// Rank every stimulus plus the "buy none" option
    #[default]
    Rank,
    /// Pick the single preferred stimulus
    Choice,
}

/// One clip offered in a trial
#[derive(Debug, Clone, PartialEq)]
pub struct Stimulus {
    pub source: StimulusSource,
    pub params: TransformParams,
    pub price: u32,
    /// File name of the rendered clip inside the clip store
    pub clip_file: String,
}

/// A pending comparison, discarded once its response is persisted
#[derive(Debug, Clone, PartialEq)]
pub struct Trial {
    /// 1-based trial number for this participant
    pub number: u32,
    pub stimuli: Vec<Stimulus>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrialResponse {
    /// `ranks[i]` is the rank of stimulus `i`; together with `opt_out_rank`
    /// they form a permutation of 1..=N
    Ranked { ranks: Vec<u8>, opt_out_rank: u8 },
    /// Index of the chosen stimulus
    Choice { chosen: usize },
}
