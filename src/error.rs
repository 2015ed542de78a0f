//! Error types shared by the data layer and the web handlers.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

/// Result type alias using the crate error type.
pub type Result<T> = std::result::Result<T, Error>;

/// A required relational constraint was violated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntegrityError {
    /// A required column was not supplied. Raised before any storage round trip.
    #[error("NOT NULL constraint failed: {table}.{column}")]
    MissingField {
        table: &'static str,
        column: &'static str,
    },

    /// The store rejected a write (unique, foreign key, not-null or check constraint).
    #[error("constraint violation: {0}")]
    Constraint(String),
}

impl IntegrityError {
    pub(crate) fn missing(table: &'static str, column: &'static str) -> Self {
        IntegrityError::MissingField { table, column }
    }
}

/// A status code has no label.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("key not found: request status {0}")]
pub struct UnknownStatus(pub i64);

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Integrity(#[from] IntegrityError),

    #[error("unknown table: {0}")]
    UnknownTable(String),

    #[error("database error: {0}")]
    Database(sqlx::Error),

    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("password hashing failed: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),

    #[error("blocking task failed")]
    Blocking,
}

impl Error {
    pub fn is_integrity(&self) -> bool {
        matches!(self, Error::Integrity(_))
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        use sqlx::error::ErrorKind;

        if let sqlx::Error::Database(ref db_err) = err {
            match db_err.kind() {
                ErrorKind::UniqueViolation
                | ErrorKind::ForeignKeyViolation
                | ErrorKind::NotNullViolation
                | ErrorKind::CheckViolation => {
                    return Error::Integrity(IntegrityError::Constraint(db_err.message().to_owned()))
                }
                _ => {}
            }
        }
        Error::Database(err)
    }
}

/// Errors surfaced by route handlers.
#[derive(Error, Debug)]
pub enum WebError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Internal Server Error")]
    Internal(#[from] Error),

    #[error("Internal Server Error")]
    Render(#[from] std::fmt::Error),

    #[error("Internal Server Error")]
    Session(String),
}

impl From<sqlx::Error> for WebError {
    fn from(err: sqlx::Error) -> Self {
        WebError::Internal(err.into())
    }
}

impl ResponseError for WebError {
    fn status_code(&self) -> StatusCode {
        match self {
            WebError::BadRequest(_) => StatusCode::BAD_REQUEST,
            WebError::Internal(_) | WebError::Render(_) | WebError::Session(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            WebError::Internal(err) => log::error!("request failed: {}", err),
            WebError::Session(err) => log::error!("session update failed: {}", err),
            _ => {}
        }
        HttpResponse::build(self.status_code())
            .content_type("text/plain; charset=utf-8")
            .body(self.to_string())
    }
}
