//! HTTP error responses
//!
//! The sync endpoint exposes exactly two failure bodies; details stay in the
//! server log.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::{error, warn};

use intake_core::{RelayError, SchemaError};

#[derive(Error, Debug)]
pub enum ApiError {
    /// Well-formed body that fails the relaxed schema
    #[error("Invalid data format: {0}")]
    InvalidData(#[source] SchemaError),

    /// Anything the caller cannot fix by changing field values
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidData(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> &'static str {
        match self {
            ApiError::InvalidData(_) => "Invalid data format",
            ApiError::Internal(_) => "Internal Server Error",
        }
    }
}

impl From<SchemaError> for ApiError {
    fn from(err: SchemaError) -> Self {
        // An unreadable body fails before validation
        if err.is_malformed() {
            ApiError::Internal(err.to_string())
        } else {
            ApiError::InvalidData(err)
        }
    }
}

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::InvalidData(e) => warn!("Rejected sync payload: {}", e),
            ApiError::Internal(e) => error!("Sync failed: {}", e),
        }

        let body = Json(serde_json::json!({
            "error": self.public_message()
        }));
        (self.status(), body).into_response()
    }
}
