//! Error handling.

use axum::{
    extract::rejection::JsonRejection,
    http::header,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::error::Error;
use thiserror::Error;
use tokio::sync::AcquireError;
use tokio::task::JoinError;
use tracing::{event, Level};

/// Sample analytics server error type
///
/// This type encapsulates the various errors that may occur.
/// Each variant may result in a different API error response.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// Error formatting a date for a store query
    #[error("error formatting date")]
    DateFormat(#[from] time::error::Format),

    /// Attempt to sign up with an email that is already registered
    #[error("email already exists")]
    EmailExists,

    /// Login with an unknown email or a wrong password
    #[error("invalid email or password")]
    InvalidCredentials,

    /// Query parameter that failed to parse as an ISO 8601 date
    #[error("invalid date for {field}, expected format YYYY-MM-DD")]
    InvalidDateFormat {
        field: &'static str,
        source: time::error::Parse,
    },

    /// Query parameter that failed to parse as a year
    #[error("invalid year for {field}, expected an integer")]
    InvalidYearFormat {
        field: &'static str,
        source: std::num::ParseIntError,
    },

    /// Mutex protecting the store connection was poisoned by a panic
    #[error("sample store lock poisoned")]
    LockPoisoned,

    /// Required query parameter that was not provided
    #[error("missing required query parameter {field}")]
    MissingParameter { field: &'static str },

    /// Query matched no sample records on an endpoint where an empty result
    /// is meaningful absence
    #[error("no data found for the specified {scope}")]
    NoData { scope: &'static str },

    /// Error hashing or parsing a stored password hash
    #[error("password hashing failed")]
    Password(#[from] argon2::password_hash::Error),

    /// Error deserialising JSON request data
    #[error("request data is not valid")]
    RequestDataJsonRejection(#[from] JsonRejection),

    /// Error validating request data
    #[error("request data is not valid")]
    RequestDataValidation(#[from] validator::ValidationErrors),

    /// Error acquiring a semaphore
    #[error("error acquiring resources")]
    SemaphoreAcquireError(#[from] AcquireError),

    /// Error querying or updating the sample store
    #[error("error accessing the sample store")]
    Store(#[from] rusqlite::Error),

    /// Error running a blocking store task to completion
    #[error("error executing store task")]
    TaskJoin(#[from] JoinError),
}

impl IntoResponse for AnalyticsError {
    /// Convert from an `AnalyticsError` into an [axum::response::Response].
    fn into_response(self) -> Response {
        ErrorResponse::from(self).into_response()
    }
}

/// Body of error response
///
/// Implements serde (de)serialise.
#[derive(Deserialize, Serialize)]
struct ErrorBody {
    /// Main error message
    message: String,

    /// Optional list of causes
    #[serde(skip_serializing_if = "Option::is_none")]
    caused_by: Option<Vec<String>>,
}

impl ErrorBody {
    /// Return a new ErrorBody
    ///
    /// # Arguments
    ///
    /// * `error`: The error that occurred
    fn new<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        let message = error.to_string();
        let mut caused_by = None;
        let mut current = error.source();
        while let Some(source) = current {
            let mut causes: Vec<String> = caused_by.unwrap_or_default();
            causes.push(source.to_string());
            caused_by = Some(causes);
            current = source.source();
        }
        // Remove duplicate entries.
        if let Some(caused_by) = caused_by.as_mut() {
            caused_by.dedup()
        }
        ErrorBody { message, caused_by }
    }
}

/// A response to send in error cases
///
/// Implements serde (de)serialise.
#[derive(Deserialize, Serialize)]
struct ErrorResponse {
    /// HTTP status of the response
    #[serde(skip)]
    status: StatusCode,

    /// Response body
    error: ErrorBody,
}

impl ErrorResponse {
    /// Return a new ErrorResponse
    ///
    /// # Arguments
    ///
    /// * `status`: HTTP status of the response
    /// * `error`: The error that occurred. This will be formatted into a suitable `ErrorBody`
    fn new<E>(status: StatusCode, error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        ErrorResponse {
            status,
            error: ErrorBody::new(error),
        }
    }

    /// Return a 400 bad request ErrorResponse
    fn bad_request<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        Self::new(StatusCode::BAD_REQUEST, error)
    }

    /// Return a 401 unauthorised ErrorResponse
    fn unauthorised<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        Self::new(StatusCode::UNAUTHORIZED, error)
    }

    /// Return a 404 not found ErrorResponse
    fn not_found<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        Self::new(StatusCode::NOT_FOUND, error)
    }

    /// Return a 409 conflict ErrorResponse
    fn conflict<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        Self::new(StatusCode::CONFLICT, error)
    }

    /// Return a 500 internal server error ErrorResponse
    fn internal_server_error<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, error)
    }
}

impl From<AnalyticsError> for ErrorResponse {
    /// Convert from an `AnalyticsError` into an `ErrorResponse`.
    fn from(error: AnalyticsError) -> Self {
        let response = match &error {
            // Bad request
            AnalyticsError::InvalidDateFormat {
                field: _,
                source: _,
            }
            | AnalyticsError::InvalidYearFormat {
                field: _,
                source: _,
            }
            | AnalyticsError::MissingParameter { field: _ }
            | AnalyticsError::RequestDataJsonRejection(_)
            | AnalyticsError::RequestDataValidation(_) => Self::bad_request(&error),

            // Unauthorised
            AnalyticsError::InvalidCredentials => Self::unauthorised(&error),

            // Not found
            AnalyticsError::NoData { scope: _ } => Self::not_found(&error),

            // Conflict
            AnalyticsError::EmailExists => Self::conflict(&error),

            // Internal server error
            AnalyticsError::DateFormat(_)
            | AnalyticsError::LockPoisoned
            | AnalyticsError::Password(_)
            | AnalyticsError::SemaphoreAcquireError(_)
            | AnalyticsError::Store(_)
            | AnalyticsError::TaskJoin(_) => Self::internal_server_error(&error),
        };

        // Log server errors.
        if response.status.is_server_error() {
            event!(Level::ERROR, "{}", error.to_string());
            let mut current = error.source();
            while let Some(source) = current {
                event!(Level::ERROR, "Caused by: {}", source.to_string());
                current = source.source();
            }
        }

        response
    }
}

impl IntoResponse for ErrorResponse {
    /// Convert from an `ErrorResponse` into an `axum::response::Response`.
    ///
    /// Renders the response as JSON.
    fn into_response(self) -> Response {
        let json_body = serde_json::to_string_pretty(&self);
        match json_body {
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to serialise error response: {}", err),
            )
                .into_response(),
            Ok(json_body) => (
                self.status,
                [(&header::CONTENT_TYPE, mime::APPLICATION_JSON.to_string())],
                json_body,
            )
                .into_response(),
        }
    }
}
