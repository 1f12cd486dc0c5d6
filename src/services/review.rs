//! Review workflow: star rating plus optional comment, reconciled against
//! the one-review-per-booking constraint.
//!
//! Order of checks: acting user is the booking's guest, rating is 1-5,
//! the stay has ended. Only then is the store asked whether a review
//! already exists; an existing row is overwritten, otherwise a new row is
//! inserted. A failed lookup is a failure, never "absent".

use serde::{Deserialize, Serialize};
use time::Date;
use tracing::info;
use uuid::Uuid;

use crate::backend::{BackendError, DataStore};
use crate::model::{Booking, NewReview, Review, ReviewDraft, Session};

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    #[error("Please select a rating")]
    MissingRating,
    #[error("Rating must be between 1 and 5")]
    RatingOutOfRange(i64),
    #[error("Only the guest of this booking can review it")]
    NotGuest,
    #[error("You can review your stay after check-out")]
    StayNotFinished,
    #[error("You have already reviewed this booking")]
    AlreadyReviewed,
    #[error("Booking not found")]
    BookingNotFound(Uuid),
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}

/// Review form input. A missing or null rating, like 0, is "no selection".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewInput {
    #[serde(default)]
    pub rating: Option<i64>,
    #[serde(default)]
    pub comment: Option<String>,
}

/// The booking fields the workflow needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewTarget {
    pub booking_id: Uuid,
    pub guest_id: Uuid,
    pub check_out: Date,
}

impl From<&Booking> for ReviewTarget {
    fn from(booking: &Booking) -> Self {
        Self { booking_id: booking.id, guest_id: booking.guest_id, check_out: booking.check_out }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "review", rename_all = "snake_case")]
pub enum ReviewOutcome {
    Created(Review),
    Updated(Review),
}

/// # Errors
///
/// [`ReviewError::MissingRating`] for no rating or 0,
/// [`ReviewError::RatingOutOfRange`] for anything else outside 1-5.
pub fn validate_rating(rating: Option<i64>) -> Result<u8, ReviewError> {
    let rating = match rating {
        None | Some(0) => return Err(ReviewError::MissingRating),
        Some(r) => r,
    };
    u8::try_from(rating)
        .ok()
        .filter(|r| (MIN_RATING..=MAX_RATING).contains(r))
        .ok_or(ReviewError::RatingOutOfRange(rating))
}

/// Trimmed comment; blank becomes `None`.
#[must_use]
pub fn normalize_comment(comment: Option<&str>) -> Option<String> {
    comment
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_owned)
}

/// Insert or overwrite the acting guest's review of a finished stay.
///
/// # Errors
///
/// Validation failures (no backend call), [`ReviewError::AlreadyReviewed`]
/// when a concurrent insert wins the uniqueness race, or a backend failure.
pub async fn submit_review(
    store: &dyn DataStore,
    session: &Session,
    target: &ReviewTarget,
    input: &ReviewInput,
    today: Date,
) -> Result<ReviewOutcome, ReviewError> {
    if session.user.id != target.guest_id {
        return Err(ReviewError::NotGuest);
    }
    let rating = validate_rating(input.rating)?;
    if target.check_out >= today {
        return Err(ReviewError::StayNotFinished);
    }
    let draft = ReviewDraft { rating, comment: normalize_comment(input.comment.as_deref()) };

    let token = session.access_token.as_str();
    if let Some(existing) = store.find_review(token, target.booking_id).await? {
        let review = store.update_review(token, existing.id, &draft).await?;
        info!(review_id = %review.id, booking_id = %target.booking_id, rating, "review updated");
        return Ok(ReviewOutcome::Updated(review));
    }

    let review = store
        .insert_review(token, &NewReview { booking_id: target.booking_id, draft })
        .await
        .map_err(|e| {
            if e.is_unique_violation() {
                ReviewError::AlreadyReviewed
            } else {
                ReviewError::Backend(e)
            }
        })?;
    info!(review_id = %review.id, booking_id = %target.booking_id, rating, "review created");
    Ok(ReviewOutcome::Created(review))
}

#[cfg(test)]
#[path = "review_test.rs"]
mod tests;
