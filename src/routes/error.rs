//! HTTP error mapping.
//!
//! Every service error becomes a status code plus a user-facing notice,
//! rendered as `{"error": "...", "redirect": "/auth"?}`. Backend failures
//! are logged here, once, and shown with a generic notice.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;

use crate::backend::{BackendError, INSUFFICIENT_PRIVILEGE};
use crate::services::auth::AuthError;
use crate::services::booking::BookingError;
use crate::services::listing::ListingError;
use crate::services::review::ReviewError;

/// Where the browser is sent to sign in.
pub const SIGN_IN_PATH: &str = "/auth";

const GENERIC_NOTICE: &str = "Something went wrong. Please try again.";

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub notice: String,
    pub redirect: Option<&'static str>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    redirect: Option<&'a str>,
}

impl ApiError {
    pub fn new(status: StatusCode, notice: impl Into<String>) -> Self {
        Self { status, notice: notice.into(), redirect: None }
    }

    pub fn sign_in_required(notice: impl Into<String>) -> Self {
        Self { status: StatusCode::UNAUTHORIZED, notice: notice.into(), redirect: Some(SIGN_IN_PATH) }
    }

    /// Replace the generic backend notice with an operation-specific one.
    #[must_use]
    pub fn or_failure_notice(mut self, notice: &str) -> Self {
        if self.status == StatusCode::BAD_GATEWAY {
            notice.clone_into(&mut self.notice);
        }
        self
    }

    fn bad_request(err: &impl ToString) -> Self {
        Self::new(StatusCode::BAD_REQUEST, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody { error: &self.notice, redirect: self.redirect };
        (self.status, Json(body)).into_response()
    }
}

impl From<BackendError> for ApiError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Unauthenticated => Self::sign_in_required("Your session has expired. Please sign in again"),
            ref e if e.code() == Some(INSUFFICIENT_PRIVILEGE) => {
                tracing::warn!(error = %e, "backend policy rejected write");
                Self::new(StatusCode::FORBIDDEN, "You don't have permission to do that")
            }
            e => {
                tracing::error!(error = %e, "backend call failed");
                Self::new(StatusCode::BAD_GATEWAY, GENERIC_NOTICE)
            }
        }
    }
}

// Malformed bodies and query strings answer in the same JSON shape as
// every other error.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, rejection.body_text())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidEmail | AuthError::MissingPassword | AuthError::MissingFullName => {
                Self::bad_request(&err)
            }
            AuthError::InvalidCredentials => Self::new(StatusCode::UNAUTHORIZED, err.to_string()),
            AuthError::AlreadyRegistered => Self::new(StatusCode::CONFLICT, err.to_string()),
            AuthError::Backend(e) => Self::from(e),
        }
    }
}

impl From<ListingError> for ApiError {
    fn from(err: ListingError) -> Self {
        match err {
            ListingError::MissingField(_) | ListingError::InvalidPrice | ListingError::InvalidImageUrl => {
                Self::bad_request(&err)
            }
            ListingError::NotFound(_) => Self::new(StatusCode::NOT_FOUND, err.to_string()),
            ListingError::NotHost => Self::new(StatusCode::FORBIDDEN, err.to_string()),
            ListingError::Backend(e) => Self::from(e),
        }
    }
}

impl From<BookingError> for ApiError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::SignInRequired => Self::sign_in_required(err.to_string()),
            BookingError::MissingDates | BookingError::InvalidRange | BookingError::CheckInInPast => {
                Self::bad_request(&err)
            }
            BookingError::ListingNotFound(_) => Self::new(StatusCode::NOT_FOUND, err.to_string()),
            BookingError::Backend(e) => Self::from(e),
        }
    }
}

impl From<ReviewError> for ApiError {
    fn from(err: ReviewError) -> Self {
        match err {
            ReviewError::MissingRating | ReviewError::RatingOutOfRange(_) | ReviewError::StayNotFinished => {
                Self::bad_request(&err)
            }
            ReviewError::NotGuest => Self::new(StatusCode::FORBIDDEN, err.to_string()),
            ReviewError::AlreadyReviewed => Self::new(StatusCode::CONFLICT, err.to_string()),
            ReviewError::BookingNotFound(_) => Self::new(StatusCode::NOT_FOUND, err.to_string()),
            ReviewError::Backend(e) => Self::from(e).or_failure_notice("Failed to submit review"),
        }
    }
}
