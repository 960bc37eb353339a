// State management module
// Persists participant and response rows: remote sheet first, local ledger as fallback

pub mod ledger;
pub mod remote;
pub mod storage;

use chrono::Utc;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::config::StorageConfig;
use crate::trial::record::{participant_row, response_row};
use crate::trial::{Gender, Participant, Trial, TrialResponse};

pub use ledger::{Ledger, LedgerRow, RowOrigin};
pub use remote::RemoteSheet;
pub use storage::{calculate_sha256, resolve_data_dir, ClipStore, StorageError};

/// Ledger file name inside the data directory
pub const LEDGER_FILE: &str = "melopref.db";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Row serialization failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Remote sheet request failed: {0}")]
    Remote(#[from] reqwest::Error),
    #[error("Remote sheet returned {0}: {1}")]
    RemoteStatus(u16, String),
    #[error("Ledger lock poisoned")]
    LockPoisoned,
    #[error("Corrupt ledger row: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Where participant and response rows go
pub struct ResponseStore {
    ledger: Ledger,
    remote: Option<RemoteSheet>,
    sheets: StorageConfig,
    // Last id handed out by this process; held across count and append
    registration: Mutex<u32>,
}

impl ResponseStore {
    pub fn new(ledger: Ledger, remote: Option<RemoteSheet>, sheets: StorageConfig) -> Self {
        Self {
            ledger,
            remote,
            sheets,
            registration: Mutex::new(0),
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Id for the next participant: existing participant rows + 1
    ///
    /// With a reachable remote sheet the count is its rows plus the rows
    /// that fell back to the ledger, which the remote never saw. Otherwise
    /// every ledger row counts.
    pub async fn next_participant_id(&self) -> StoreResult<u32> {
        let spreadsheet = &self.sheets.spreadsheet;
        let worksheet = &self.sheets.participants_worksheet;

        if let Some(remote) = &self.remote {
            match remote.count_rows(spreadsheet, worksheet).await {
                Ok(rows) => {
                    let stranded =
                        self.ledger
                            .count_rows_with_origin(spreadsheet, worksheet, RowOrigin::Fallback)?;
                    return Ok(rows + stranded + 1);
                }
                Err(e) => log::warn!(
                    "Remote participant count failed, using local ledger count: {}",
                    e
                ),
            }
        }

        Ok(self.ledger.count_rows(spreadsheet, worksheet)? + 1)
    }

    /// Append a row remotely, falling back to the ledger on failure
    pub async fn append_row(&self, worksheet: &str, row: &[Value]) -> StoreResult<RowOrigin> {
        let spreadsheet = &self.sheets.spreadsheet;

        let origin = match &self.remote {
            None => RowOrigin::Local,
            Some(remote) => match remote.append_row(spreadsheet, worksheet, row).await {
                Ok(()) => return Ok(RowOrigin::Remote),
                Err(e) => {
                    log::warn!(
                        "Remote append to {} failed, keeping row in local ledger: {}",
                        worksheet,
                        e
                    );
                    RowOrigin::Fallback
                }
            },
        };

        self.ledger.append(spreadsheet, worksheet, row, origin)?;
        Ok(origin)
    }

    /// Assign an id and persist a new participant
    pub async fn register_participant(&self, gender: Gender, age: u32) -> StoreResult<Participant> {
        let mut last_id = self.registration.lock().await;

        // Never reuse an id this process already issued, whatever the counts say
        let id = self.next_participant_id().await?.max(*last_id + 1);
        let participant = Participant {
            id,
            gender,
            age,
            registered_at: Utc::now(),
        };

        self.append_row(&self.sheets.participants_worksheet, &participant_row(&participant))
            .await?;
        *last_id = id;

        log::info!(
            "Registered participant {} ({}, age {})",
            participant.id,
            participant.gender.label(),
            participant.age
        );
        Ok(participant)
    }

    /// Persist the answer to a trial
    pub async fn record_response(
        &self,
        participant: &Participant,
        trial: &Trial,
        response: &TrialResponse,
    ) -> StoreResult<RowOrigin> {
        let row = response_row(participant, trial, response, Utc::now());
        let origin = self.append_row(&self.sheets.responses_worksheet, &row).await?;

        log::info!(
            "Recorded trial {} for participant {} ({})",
            trial.number,
            participant.id,
            origin.as_str()
        );
        Ok(origin)
    }
}
