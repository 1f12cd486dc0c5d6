//! Booking and review routes.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum_extra::extract::WithRejection;
use serde::Serialize;
use uuid::Uuid;

use super::auth::{AuthUser, MaybeUser};
use super::error::ApiError;
use super::LocalToday;
use crate::model::Booking;
use crate::services::booking::{self as booking_svc, BookingRequest, BookingSummary};
use crate::services::pricing::format_price;
use crate::services::review::{self as review_svc, ReviewError, ReviewInput, ReviewOutcome, ReviewTarget};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct BookingView {
    #[serde(flatten)]
    pub booking: Booking,
    pub total_label: String,
}

/// `POST /api/listings/{id}/bookings`: book a stay. Signed-out callers get
/// a 401 pointing at the sign-in page, whatever the body holds.
pub async fn create_booking(
    State(state): State<AppState>,
    viewer: MaybeUser,
    LocalToday(today): LocalToday,
    Path(listing_id): Path<Uuid>,
    body: Result<Json<BookingRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<BookingView>), ApiError> {
    if viewer.session().is_none() {
        return Err(booking_svc::BookingError::SignInRequired.into());
    }
    let Json(body) = body?;
    let booking = booking_svc::book_stay(state.store.as_ref(), viewer.session(), listing_id, &body, today)
        .await
        .map_err(|e| ApiError::from(e).or_failure_notice("Failed to create booking"))?;
    let total_label = format_price(booking.total_price, &state.config.currency_symbol);
    Ok((StatusCode::CREATED, Json(BookingView { booking, total_label })))
}

/// `GET /api/bookings`: the caller's bookings with listing and review.
pub async fn my_bookings(
    State(state): State<AppState>,
    viewer: MaybeUser,
    LocalToday(today): LocalToday,
) -> Result<Json<Vec<BookingSummary>>, ApiError> {
    let rows = booking_svc::list_my_bookings(state.store.as_ref(), viewer.session(), today)
        .await
        .map_err(|e| ApiError::from(e).or_failure_notice("Failed to load bookings"))?;
    Ok(Json(rows))
}

/// `POST /api/bookings/{id}/review`: write or overwrite the caller's review.
pub async fn submit_review(
    State(state): State<AppState>,
    AuthUser(session): AuthUser,
    LocalToday(today): LocalToday,
    Path(booking_id): Path<Uuid>,
    WithRejection(Json(body), _): WithRejection<Json<ReviewInput>, ApiError>,
) -> Result<(StatusCode, Json<ReviewOutcome>), ApiError> {
    // Reject an unset rating before the booking is fetched.
    review_svc::validate_rating(body.rating)?;

    let booking = state
        .store
        .get_booking(&session.access_token, booking_id)
        .await
        .map_err(ReviewError::from)?
        .ok_or(ReviewError::BookingNotFound(booking_id))?;

    let outcome =
        review_svc::submit_review(state.store.as_ref(), &session, &ReviewTarget::from(&booking), &body, today)
            .await?;
    let status = match outcome {
        ReviewOutcome::Created(_) => StatusCode::CREATED,
        ReviewOutcome::Updated(_) => StatusCode::OK,
    };
    Ok((status, Json(outcome)))
}
