// HTTP handlers for the survey flow
// register -> trial (repeated) -> done
use axum::extract::{Form, Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use serde::Deserialize;
use std::collections::HashMap;
use uuid::Uuid;

use super::error::WebResult;
use super::pages;
use super::AppState;
use crate::trial::validate::{parse_age, parse_response};
use crate::trial::{build_trial, discard_clips, Gender, Trial};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterForm {
    pub gender: String,
    pub age: String,
}

fn to_start() -> Response {
    Redirect::to("/").into_response()
}

fn to_page(session: &Uuid, page: &str) -> Response {
    Redirect::to(&format!("/s/{}/{}", session, page)).into_response()
}

/// GET / - start a session
pub async fn start(State(state): State<AppState>) -> Response {
    state.expire_stale_sessions();
    let session = state.sessions.create();
    to_page(&session, "register")
}

/// GET /s/:session/register
pub async fn show_register(State(state): State<AppState>, Path(session): Path<Uuid>) -> Response {
    let Some(current) = state.sessions.get(&session) else {
        return to_start();
    };
    let title = &state.config.server.title;

    match &current.participant {
        Some(participant) => Html(pages::already_registered(title, &session, participant)).into_response(),
        None => Html(pages::register_form(title, &session, None)).into_response(),
    }
}

/// POST /s/:session/register
pub async fn submit_register(
    State(state): State<AppState>,
    Path(session): Path<Uuid>,
    Form(form): Form<RegisterForm>,
) -> WebResult<Response> {
    let title = &state.config.server.title;

    let Some(gender) = Gender::from_form(&form.gender) else {
        let html = pages::register_form(title, &session, Some("please select a gender"));
        return Ok((StatusCode::UNPROCESSABLE_ENTITY, Html(html)).into_response());
    };
    let age = match parse_age(&form.age) {
        Ok(age) => age,
        Err(e) => {
            let html = pages::register_form(title, &session, Some(&e.to_string()));
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, Html(html)).into_response());
        }
    };

    // Claim the registration slot so a double submit cannot register twice
    let claimed = state.sessions.update(&session, |s| {
        if s.participant.is_some() || s.registering {
            false
        } else {
            s.registering = true;
            true
        }
    });
    match claimed {
        None => return Ok(to_start()),
        Some(false) => return Ok(to_page(&session, "register")),
        Some(true) => {}
    }

    let participant = match state.store.register_participant(gender, age).await {
        Ok(participant) => participant,
        Err(e) => {
            state.sessions.update(&session, |s| s.registering = false);
            return Err(e.into());
        }
    };

    state.sessions.update(&session, |s| {
        s.participant = Some(participant.clone());
        s.registering = false;
        s.trial_number = 1;
    });

    Ok(Html(pages::already_registered(title, &session, &participant)).into_response())
}

/// GET /s/:session/trial
pub async fn show_trial(State(state): State<AppState>, Path(session): Path<Uuid>) -> WebResult<Response> {
    let Some(current) = state.sessions.get(&session) else {
        return Ok(to_start());
    };
    if current.participant.is_none() {
        return Ok(to_page(&session, "register"));
    }
    if current.completed {
        return Ok(to_page(&session, "done"));
    }

    let trial = match current.pending {
        Some(trial) => trial,
        None => {
            let built = render_trial(&state, current.trial_number).await?;
            let kept = state.sessions.update(&session, |s| {
                // A concurrent request got there first; show its trial
                if let Some(existing) = &s.pending {
                    return (existing.clone(), Some(built));
                }
                s.pending = Some(built.clone());
                (built, None)
            });
            match kept {
                Some((shown, extra)) => {
                    if let Some(extra) = extra {
                        discard_clips(&state.clips, &extra.stimuli);
                    }
                    shown
                }
                None => return Ok(to_start()),
            }
        }
    };

    let html = pages::trial_page(&state.config.server.title, &session, &state.config.design, &trial, None);
    Ok(Html(html).into_response())
}

async fn render_trial(state: &AppState, number: u32) -> WebResult<Trial> {
    let config = state.config.clone();
    let clips = state.clips.clone();

    let trial = tokio::task::spawn_blocking(move || {
        build_trial(&config, number, &clips, &mut rand::thread_rng())
    })
    .await??;
    Ok(trial)
}

/// POST /s/:session/trial
pub async fn submit_trial(
    State(state): State<AppState>,
    Path(session): Path<Uuid>,
    Form(form): Form<HashMap<String, String>>,
) -> WebResult<Response> {
    let Some(current) = state.sessions.get(&session) else {
        return Ok(to_start());
    };
    let Some(participant) = current.participant else {
        return Ok(to_page(&session, "register"));
    };

    // Take the pending trial so a double submit records it only once
    let Some(trial) = state.sessions.update(&session, |s| s.pending.take()).flatten() else {
        return Ok(to_page(&session, "trial"));
    };

    let design = &state.config.design;
    let response = match parse_response(design.response, trial.stimuli.len(), &form) {
        Ok(response) => response,
        Err(e) => {
            let html = pages::trial_page(
                &state.config.server.title,
                &session,
                design,
                &trial,
                Some(&e.to_string()),
            );
            state.sessions.update(&session, |s| s.pending = Some(trial));
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, Html(html)).into_response());
        }
    };

    if let Err(e) = state.store.record_response(&participant, &trial, &response).await {
        state.sessions.update(&session, |s| s.pending = Some(trial));
        return Err(e.into());
    }
    discard_clips(&state.clips, &trial.stimuli);

    let total = design.trials_per_participant;
    let completed = state
        .sessions
        .update(&session, |s| {
            s.trial_number += 1;
            s.completed = s.trial_number > total;
            s.completed
        })
        .unwrap_or(false);

    if completed {
        log::info!("Participant {} completed all {} trials", participant.id, total);
        Ok(to_page(&session, "done"))
    } else {
        Ok(to_page(&session, "trial"))
    }
}

/// GET /s/:session/done
pub async fn show_done(State(state): State<AppState>, Path(session): Path<Uuid>) -> Response {
    let Some(current) = state.sessions.get(&session) else {
        return to_start();
    };
    if !current.completed {
        return to_page(&session, "trial");
    }

    let html = pages::done_page(
        &state.config.server.title,
        current.participant.as_ref(),
        state.config.design.trials_per_participant,
    );
    Html(html).into_response()
}
