// Trial Module - Presentation and collection logic
// Builds trials, validates answers and assembles sheet rows

pub mod builder;
pub mod models;
pub mod params;
pub mod record;
pub mod validate;

use thiserror::Error;

use crate::dataset::DatasetError;
use crate::render::RenderError;
use crate::state::StorageError;

pub use builder::{build_trial, discard_clips};
pub use models::{Gender, Participant, ResponseMode, Stimulus, Trial, TrialResponse};
pub use validate::ValidationError;

#[derive(Debug, Error)]
pub enum TrialError {
    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Clip storage error: {0}")]
    Storage(#[from] StorageError),
}
