//! Booking workflow: date validation, pricing, persistence, and the
//! guest's "my bookings" view.
//!
//! Every check runs before the backend is touched. A signed-out caller
//! is turned away without any call at all.

use serde::{Deserialize, Serialize};
use time::Date;
use tracing::{info, warn};
use uuid::Uuid;

use super::pricing::{self, PricingError, StayQuote};
use crate::backend::{BackendError, DataStore};
use crate::model::{Booking, BookingStatus, ListingSummary, NewBooking, Review, Session};

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Please sign in to make a booking")]
    SignInRequired,
    #[error("Please select check-in and check-out dates")]
    MissingDates,
    #[error("Check-out date must be after check-in date")]
    InvalidRange,
    #[error("Check-in date cannot be in the past")]
    CheckInInPast,
    #[error("Listing not found")]
    ListingNotFound(Uuid),
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}

impl From<PricingError> for BookingError {
    fn from(err: PricingError) -> Self {
        match err {
            PricingError::InvalidRange { .. } => Self::InvalidRange,
        }
    }
}

/// Date range as picked on the booking form. Either end may be unset.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct BookingRequest {
    pub check_in: Option<Date>,
    pub check_out: Option<Date>,
}

/// Check that both dates are set, ordered, and that the stay does not
/// start before `today`.
///
/// # Errors
///
/// The first failing rule.
pub fn validate_dates(request: &BookingRequest, today: Date) -> Result<(Date, Date), BookingError> {
    let (Some(check_in), Some(check_out)) = (request.check_in, request.check_out) else {
        return Err(BookingError::MissingDates);
    };
    if check_out <= check_in {
        return Err(BookingError::InvalidRange);
    }
    if check_in < today {
        return Err(BookingError::CheckInInPast);
    }
    Ok((check_in, check_out))
}

/// Price a stay at a listing without booking it.
///
/// # Errors
///
/// Date failures, a missing listing, or a backend failure.
pub async fn quote_stay(
    store: &dyn DataStore,
    listing_id: Uuid,
    request: &BookingRequest,
    today: Date,
) -> Result<StayQuote, BookingError> {
    let (check_in, check_out) = validate_dates(request, today)?;
    let listing = store
        .get_listing(listing_id)
        .await?
        .ok_or(BookingError::ListingNotFound(listing_id))?;
    Ok(pricing::quote(check_in, check_out, listing.price_per_night)?)
}

/// Book a stay at a listing as the signed-in guest.
///
/// # Errors
///
/// [`BookingError::SignInRequired`] without a session, date failures, a
/// missing listing, or a backend failure.
pub async fn book_stay(
    store: &dyn DataStore,
    session: Option<&Session>,
    listing_id: Uuid,
    request: &BookingRequest,
    today: Date,
) -> Result<Booking, BookingError> {
    let session = session.ok_or(BookingError::SignInRequired)?;
    let quote = quote_stay(store, listing_id, request, today).await?;

    let booking = store
        .insert_booking(
            &session.access_token,
            &NewBooking {
                listing_id,
                guest_id: session.user.id,
                check_in: quote.check_in,
                check_out: quote.check_out,
                total_price: quote.total,
                status: BookingStatus::Confirmed,
            },
        )
        .await?;
    info!(
        booking_id = %booking.id,
        %listing_id,
        guest_id = %session.user.id,
        nights = quote.nights,
        total = quote.total,
        "booking created"
    );
    Ok(booking)
}

/// One row of the guest's bookings page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookingSummary {
    #[serde(flatten)]
    pub booking: Booking,
    pub listing: Option<ListingSummary>,
    pub review: Option<Review>,
    /// The stay has ended, so a review may be written or updated.
    pub can_review: bool,
}

/// The signed-in guest's bookings, newest first, each with its listing
/// and review. A failed review lookup leaves that booking without one.
///
/// # Errors
///
/// [`BookingError::SignInRequired`] without a session, or a failure of the
/// bookings query.
pub async fn list_my_bookings(
    store: &dyn DataStore,
    session: Option<&Session>,
    today: Date,
) -> Result<Vec<BookingSummary>, BookingError> {
    let session = session.ok_or(BookingError::SignInRequired)?;
    let rows = store
        .list_guest_bookings(&session.access_token, session.user.id)
        .await?;

    let mut summaries = Vec::with_capacity(rows.len());
    for row in rows {
        let review = match store.find_review(&session.access_token, row.booking.id).await {
            Ok(review) => review,
            Err(e) => {
                warn!(error = %e, booking_id = %row.booking.id, "review lookup failed");
                None
            }
        };
        let can_review = row.booking.check_out < today;
        summaries.push(BookingSummary { booking: row.booking, listing: row.listings, review, can_review });
    }
    Ok(summaries)
}

#[cfg(test)]
#[path = "booking_test.rs"]
mod tests;
