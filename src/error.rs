use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// AppError
///
/// Every failure a request can hit. The user-facing variants carry the exact text shown in a
/// flash message; the infrastructure variants are logged and answered with a generic 500.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found")]
    NotFound,

    #[error("Only the administrator can do that")]
    Forbidden,

    #[error("Email already in use, try logging in instead.")]
    DuplicateEmail,

    #[error("A post with this title already exists.")]
    DuplicateTitle,

    #[error("That email is not registered, please try again.")]
    UnknownEmail,

    #[error("Wrong password, please try again.")]
    WrongPassword,

    #[error("You need to log in or register to comment.")]
    AnonymousComment,

    #[error("Invalid form: {0}")]
    InvalidForm(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Session token error: {0}")]
    Session(#[from] jsonwebtoken::errors::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::DuplicateEmail | AppError::DuplicateTitle => StatusCode::CONFLICT,
            AppError::UnknownEmail | AppError::WrongPassword | AppError::AnonymousComment => {
                StatusCode::UNAUTHORIZED
            }
            AppError::InvalidForm(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Database(_) | AppError::Session(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("request failed: {}", self);
            return (status, "Internal server error").into_response();
        }

        (status, self.to_string()).into_response()
    }
}
