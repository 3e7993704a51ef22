use rocket::http::Status;
use rocket::response::Responder;
use rocket::serde::json::Json;
use shared::error::{Error, ErrorCode};
use shared::validation::ValidationError;
use thiserror::Error;
use tracing::error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    NotFound(String),
    #[error("Storage error: {0}")]
    Storage(String),
}

impl ApiError {
    pub fn not_found(what: &str, id: i64) -> Self {
        ApiError::NotFound(format!("{what} {id} not found"))
    }

    pub fn status(&self) -> Status {
        match self {
            ApiError::Validation(_) => Status::BadRequest,
            ApiError::NotFound(_) => Status::NotFound,
            ApiError::Storage(_) => Status::InternalServerError,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ApiError::Validation(_) => ErrorCode::ValidationFailed,
            ApiError::NotFound(_) => ErrorCode::NotFound,
            ApiError::Storage(_) => ErrorCode::StorageError,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateVote => ValidationError::AlreadyVoted.into(),
            StoreError::DuplicateUsername => ValidationError::UsernameTaken.into(),
            StoreError::MissingReference(what) => ApiError::NotFound(format!("{what} not found")),
            StoreError::Database(msg) => ApiError::Storage(msg),
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for ApiError {
    fn respond_to(self, req: &'r rocket::Request<'_>) -> rocket::response::Result<'o> {
        let status = self.status();
        let message = match &self {
            ApiError::Storage(detail) => {
                error!(method = %req.method(), uri = %req.uri(), "storage failure: {detail}");
                "Internal storage error".to_string()
            }
            other => other.to_string(),
        };

        rocket::Response::build_from(Json(Error::new(self.code(), message)).respond_to(req)?)
            .status(status)
            .ok()
    }
}
