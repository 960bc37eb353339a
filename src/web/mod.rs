// Web Module - Survey HTTP server
// Registration, trial and completion pages, rendered clips and health

pub mod error;
pub mod handlers;
pub mod health;
pub mod pages;

use axum::routing::get;
use axum::Router;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::SurveyConfig;
use crate::session::SessionStore;
use crate::state::{ClipStore, ResponseStore};
use crate::trial::discard_clips;

pub use error::{WebError, WebResult};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<SurveyConfig>,
    pub store: Arc<ResponseStore>,
    pub clips: ClipStore,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(config: SurveyConfig, store: ResponseStore, clips: ClipStore) -> Self {
        Self {
            config: Arc::new(config),
            store: Arc::new(store),
            clips,
            sessions: SessionStore::new(),
        }
    }

    /// Drop sessions created before `cutoff` and delete their pending clips
    pub fn expire_sessions(&self, cutoff: DateTime<Utc>) -> usize {
        let expired = self.sessions.expire(cutoff);
        for session in &expired {
            if let Some(trial) = &session.pending {
                discard_clips(&self.clips, &trial.stimuli);
            }
        }
        expired.len()
    }

    /// Expire sessions older than `server.session_ttl_secs`
    pub fn expire_stale_sessions(&self) -> usize {
        let ttl = Duration::seconds(self.config.server.session_ttl_secs as i64);
        self.expire_sessions(Utc::now() - ttl)
    }
}

pub fn build_router(state: AppState) -> Router {
    let clips = ServeDir::new(state.clips.dir());

    Router::new()
        .route("/", get(handlers::start))
        .route(
            "/s/:session/register",
            get(handlers::show_register).post(handlers::submit_register),
        )
        .route(
            "/s/:session/trial",
            get(handlers::show_trial).post(handlers::submit_trial),
        )
        .route("/s/:session/done", get(handlers::show_done))
        .nest_service("/clips", clips)
        .merge(health::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
