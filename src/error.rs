use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use isahc::Error as IsahcError;
use isahc::http::Error as RequestError;
use serde::Serialize;
use tokio::task::JoinError;

use crate::lookup::Source;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to fetch data from {site}: {reason}")]
    Upstream { site: Source, reason: String },
    #[error("no source returned valid data")]
    AllSourcesFailed,
    #[error("invalid subject: {0:?}")]
    InvalidSubject(String),
    #[error("worker pool is shut down")]
    PoolClosed,
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },
    #[error("Isahc Error: {0}")]
    Isahc(#[from] IsahcError),
    #[error("Request Error: {0}")]
    Request(#[from] RequestError),
    #[error("Tokio JoinError: {0}")]
    Join(#[from] JoinError),
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    IOError(#[from] std::io::Error),
}

#[derive(Serialize)]
struct ErrorJson {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        error!("{}", self);

        let status = self.status_code();
        let code = self.code().map(str::to_owned);
        (
            status,
            Json(ErrorJson {
                error: self.to_string(),
                code,
            }),
        )
            .into_response()
    }
}

impl Error {
    pub fn upstream(site: Source, reason: impl ToString) -> Self {
        Self::Upstream {
            site,
            reason: reason.to_string(),
        }
    }

    pub fn selector(selector: impl Into<String>, message: impl ToString) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidSubject(_) => StatusCode::BAD_REQUEST,
            Error::PoolClosed => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> Option<&'static str> {
        match self {
            Error::Upstream { .. } => Some("upstream_error"),
            Error::AllSourcesFailed => Some("all_sources_failed"),
            Error::InvalidSubject(_) => Some("invalid_subject"),
            Error::PoolClosed => Some("shutting_down"),
            Error::Selector { .. } => Some("selector_error"),
            Error::Isahc(_) | Error::Request(_) => Some("http_client_error"),
            Error::Join(_) => Some("internal_error"),
            Error::Json(_) => Some("json_error"),
            Error::IOError(_) => Some("io_error"),
        }
    }
}
