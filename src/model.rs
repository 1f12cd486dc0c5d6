//! Marketplace records as stored by the hosted backend.
//!
//! DESIGN
//! ======
//! These types mirror the `listings`, `bookings` and `reviews` tables and
//! the identity service's user object. They are request-scoped copies: the
//! backend owns every row and is the only source of truth.

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

// =============================================================================
// LISTINGS
// =============================================================================

/// A rentable property owned by a host. Mirrors the `listings` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub price_per_night: f64,
    pub location: String,
    pub image_url: String,
    pub host_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Host-editable listing fields, already validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingDraft {
    pub title: String,
    pub description: String,
    pub price_per_night: f64,
    pub location: String,
    pub image_url: String,
}

/// Insert body for the `listings` table.
#[derive(Debug, Clone, Serialize)]
pub struct NewListing {
    #[serde(flatten)]
    pub draft: ListingDraft,
    pub host_id: Uuid,
}

/// The listing columns embedded into a guest's booking rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingSummary {
    pub title: String,
    pub image_url: String,
    pub location: String,
}

// =============================================================================
// BOOKINGS
// =============================================================================

/// Booking lifecycle marker. Only `Confirmed` is ever written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    #[serde(other)]
    Unknown,
}

/// A guest's reservation of a listing. Mirrors the `bookings` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub guest_id: Uuid,
    pub check_in: Date,
    pub check_out: Date,
    pub total_price: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default)]
    pub status: Option<BookingStatus>,
}

/// Insert body for the `bookings` table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewBooking {
    pub listing_id: Uuid,
    pub guest_id: Uuid,
    pub check_in: Date,
    pub check_out: Date,
    pub total_price: f64,
    pub status: BookingStatus,
}

/// A booking row with its listing embedded (`select=*,listings(...)`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuestBooking {
    #[serde(flatten)]
    pub booking: Booking,
    #[serde(default)]
    pub listings: Option<ListingSummary>,
}

// =============================================================================
// REVIEWS
// =============================================================================

/// A guest's post-stay rating. Mirrors the `reviews` table, unique on `booking_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub rating: u8,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Rating and comment as written on insert or overwrite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewDraft {
    pub rating: u8,
    pub comment: Option<String>,
}

/// Insert body for the `reviews` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewReview {
    pub booking_id: Uuid,
    #[serde(flatten)]
    pub draft: ReviewDraft,
}

// =============================================================================
// IDENTITY
// =============================================================================

/// Authenticated user as reported by the identity service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: Option<String>,
    pub full_name: Option<String>,
}

/// Bearer token plus the user it was issued to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub user: User,
}

/// Result of a sign-up. `session` is `None` when the identity service
/// requires email confirmation before the first sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUp {
    pub user: User,
    pub session: Option<Session>,
}

#[cfg(test)]
#[path = "model_test.rs"]
mod tests;
