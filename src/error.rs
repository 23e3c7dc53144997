use crate::repo::RepoError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::borrow::Cow;

#[derive(Debug)]
pub enum AppError {
    InternalServerError(anyhow::Error),
    ResponseStatusError(StatusCode, Cow<'static, str>),
}

pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct AppErrorResponse {
            status: u16,
            message: Cow<'static, str>,
        }

        match self {
            AppError::InternalServerError(err) => {
                tracing::error!(error = %format!("{err:#}"), "request failed");
                AppError::from(StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response()
            }
            AppError::ResponseStatusError(code, s) => (
                code,
                Json(AppErrorResponse {
                    status: code.as_u16(),
                    message: s,
                }),
            )
                .into_response(),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> AppError {
        AppError::InternalServerError(e)
    }
}

impl From<RepoError> for AppError {
    fn from(e: RepoError) -> AppError {
        match e {
            RepoError::NotFound(what) => AppError::from(StatusCode::NOT_FOUND, what),
            RepoError::Rejected(message) => AppError::from(StatusCode::BAD_REQUEST, message),
            RepoError::Unavailable(err) => AppError::InternalServerError(err),
        }
    }
}

impl AppError {
    pub fn from(code: StatusCode, s: impl Into<Cow<'static, str>>) -> AppError {
        AppError::ResponseStatusError(code, s.into())
    }
}

/// Returns the trimmed value of a required request field.
pub fn required(field: &'static str, value: Option<String>) -> AppResult<String> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AppError::from(
            StatusCode::BAD_REQUEST,
            format!("{field} is required"),
        )),
    }
}
