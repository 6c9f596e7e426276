use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde_json::json;
use tracing::error;

use crate::utils::assets::AssetError;
use crate::view::{Page, redirect};

/// Every failure a handler can surface. Messages are safe to show to the
/// caller; underlying causes are logged where the error is created.
#[derive(Debug, Display)]
pub enum AppError {
    /// Missing or malformed input.
    #[display(fmt = "{}", _0)]
    Validation(String),

    /// Uniqueness violation.
    #[display(fmt = "{}", _0)]
    Conflict(String),

    #[display(fmt = "{} not found", _0)]
    NotFound(&'static str),

    /// I/O or constraint failure not otherwise classified.
    #[display(fmt = "Something went wrong, please try again later")]
    Store,

    #[display(fmt = "Please log in to continue")]
    Unauthenticated,

    #[display(fmt = "You do not have permission to access this page")]
    Forbidden,
}

impl std::error::Error for AppError {}

impl AppError {
    fn template(&self) -> &'static str {
        match self {
            AppError::Forbidden => "forbidden",
            _ => "error",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Store => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Unauthenticated => StatusCode::SEE_OTHER,
            AppError::Forbidden => StatusCode::FORBIDDEN,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::Unauthenticated => redirect("/login"),
            _ => Page::new(self.template(), None, json!({}))
                .error(self.to_string())
                .render(self.status_code()),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        error!(error = %e, "Database operation failed");
        AppError::Store
    }
}

impl From<AssetError> for AppError {
    fn from(e: AssetError) -> Self {
        match e {
            AssetError::Io(io) => {
                error!(error = %io, "Profile image storage failed");
                AppError::Store
            }
            other => AppError::Validation(other.to_string()),
        }
    }
}

/// Maps a unique-constraint failure on `users.username` to a conflict.
pub fn username_conflict(e: sqlx::Error, username: &str) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return AppError::Conflict(format!("Username '{}' is already taken", username));
        }
    }
    AppError::from(e)
}
