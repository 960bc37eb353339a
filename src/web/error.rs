// Web error type
// Any displayable error becomes an HTML error page
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};

use super::pages;

#[derive(Debug)]
pub struct WebError {
    status: StatusCode,
    message: String,
}

impl WebError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl<E: std::fmt::Display> From<E> for WebError {
    fn from(error: E) -> Self {
        WebError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: error.to_string(),
        }
    }
}

pub type WebResult<T> = Result<T, WebError>;

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            log::error!("Request failed: {}", self.message);
        } else {
            log::warn!("Request rejected ({}): {}", self.status, self.message);
        }
        (
            self.status,
            Html(pages::error_page("Something went wrong", &self.message)),
        )
            .into_response()
    }
}
