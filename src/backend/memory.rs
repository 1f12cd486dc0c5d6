//! In-process backend for local development and tests.
//!
//! DESIGN
//! ======
//! Tables live behind one `tokio::sync::RwLock`. The access rules mirror
//! the hosted project's policies closely enough for the services to be
//! exercised end to end:
//! - listings are world-readable; only the host may write them;
//! - bookings are visible to their guest and to the listing's host, and
//!   only the guest may create them;
//! - one review per booking (`23505` on a duplicate), written by the guest.
//!
//! Filtered writes come back empty, as they do over PostgREST.

use std::collections::HashMap;

use async_trait::async_trait;
use rand::Rng;
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{BackendError, DataStore, INSUFFICIENT_PRIVILEGE, Identity, UNIQUE_VIOLATION, USER_ALREADY_EXISTS};
use crate::model::{
    Booking, GuestBooking, Listing, ListingDraft, ListingSummary, NewBooking, NewListing, NewReview, Review,
    ReviewDraft, Session, SignUp, User,
};

struct Account {
    user: User,
    salt: String,
    password_digest: String,
}

#[derive(Default)]
struct Tables {
    /// Keyed by normalized email.
    accounts: HashMap<String, Account>,
    /// Access token -> user id.
    sessions: HashMap<String, Uuid>,
    /// Insertion order doubles as the creation tie-breaker.
    listings: Vec<Listing>,
    bookings: Vec<Booking>,
    reviews: Vec<Review>,
}

impl Tables {
    fn caller(&self, token: &str) -> Result<Uuid, BackendError> {
        self.sessions
            .get(token)
            .copied()
            .ok_or(BackendError::Unauthenticated)
    }

    fn listing(&self, id: Uuid) -> Option<&Listing> {
        self.listings.iter().find(|l| l.id == id)
    }

    fn booking_visible_to(&self, booking: &Booking, user_id: Uuid) -> bool {
        booking.guest_id == user_id
            || self
                .listing(booking.listing_id)
                .is_some_and(|l| l.host_id == user_id)
    }

    fn booking_guest(&self, booking_id: Uuid) -> Option<Uuid> {
        self.bookings
            .iter()
            .find(|b| b.id == booking_id)
            .map(|b| b.guest_id)
    }
}

#[derive(Default)]
pub struct MemoryBackend {
    tables: RwLock<Tables>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn generate_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    to_hex(&bytes)
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn digest_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    to_hex(&hasher.finalize())
}

fn denied(table: &str) -> BackendError {
    BackendError::Api {
        status: 403,
        code: Some(INSUFFICIENT_PRIVILEGE.into()),
        message: format!("new row violates row-level security policy for table \"{table}\""),
    }
}

// =============================================================================
// IDENTITY
// =============================================================================

#[async_trait]
impl Identity for MemoryBackend {
    async fn sign_up(&self, email: &str, password: &str, full_name: &str) -> Result<SignUp, BackendError> {
        let key = email.trim().to_ascii_lowercase();
        let mut tables = self.tables.write().await;
        if tables.accounts.contains_key(&key) {
            return Err(BackendError::Api {
                status: 422,
                code: Some(USER_ALREADY_EXISTS.into()),
                message: "User already registered".into(),
            });
        }

        let user = User { id: Uuid::new_v4(), email: Some(key.clone()), full_name: Some(full_name.to_owned()) };
        let salt = generate_token();
        let password_digest = digest_password(&salt, password);
        tables
            .accounts
            .insert(key, Account { user: user.clone(), salt, password_digest });

        let access_token = generate_token();
        tables.sessions.insert(access_token.clone(), user.id);
        Ok(SignUp { user: user.clone(), session: Some(Session { access_token, user }) })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, BackendError> {
        let key = email.trim().to_ascii_lowercase();
        let mut tables = self.tables.write().await;
        let user = match tables.accounts.get(&key) {
            Some(account) if account.password_digest == digest_password(&account.salt, password) => {
                account.user.clone()
            }
            _ => return Err(BackendError::InvalidCredentials),
        };
        let access_token = generate_token();
        tables.sessions.insert(access_token.clone(), user.id);
        Ok(Session { access_token, user })
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        self.tables.write().await.sessions.remove(access_token);
        Ok(())
    }

    async fn user(&self, access_token: &str) -> Result<Option<User>, BackendError> {
        let tables = self.tables.read().await;
        let Some(user_id) = tables.sessions.get(access_token) else {
            return Ok(None);
        };
        Ok(tables
            .accounts
            .values()
            .find(|a| a.user.id == *user_id)
            .map(|a| a.user.clone()))
    }
}

// =============================================================================
// DATA
// =============================================================================

#[async_trait]
impl DataStore for MemoryBackend {
    async fn list_listings(&self) -> Result<Vec<Listing>, BackendError> {
        let tables = self.tables.read().await;
        let mut listings = tables.listings.clone();
        listings.sort_by_key(|l| l.created_at);
        listings.reverse();
        Ok(listings)
    }

    async fn get_listing(&self, id: Uuid) -> Result<Option<Listing>, BackendError> {
        Ok(self.tables.read().await.listing(id).cloned())
    }

    async fn insert_listing(&self, token: &str, listing: &NewListing) -> Result<Listing, BackendError> {
        let mut tables = self.tables.write().await;
        if tables.caller(token)? != listing.host_id {
            return Err(denied("listings"));
        }
        let row = Listing {
            id: Uuid::new_v4(),
            title: listing.draft.title.clone(),
            description: listing.draft.description.clone(),
            price_per_night: listing.draft.price_per_night,
            location: listing.draft.location.clone(),
            image_url: listing.draft.image_url.clone(),
            host_id: listing.host_id,
            created_at: OffsetDateTime::now_utc(),
        };
        tables.listings.push(row.clone());
        Ok(row)
    }

    async fn update_listing(
        &self,
        token: &str,
        id: Uuid,
        draft: &ListingDraft,
    ) -> Result<Option<Listing>, BackendError> {
        let mut tables = self.tables.write().await;
        let caller = tables.caller(token)?;
        let Some(row) = tables
            .listings
            .iter_mut()
            .find(|l| l.id == id && l.host_id == caller)
        else {
            return Ok(None);
        };
        row.title.clone_from(&draft.title);
        row.description.clone_from(&draft.description);
        row.price_per_night = draft.price_per_night;
        row.location.clone_from(&draft.location);
        row.image_url.clone_from(&draft.image_url);
        Ok(Some(row.clone()))
    }

    async fn delete_listing(&self, token: &str, id: Uuid) -> Result<bool, BackendError> {
        let mut tables = self.tables.write().await;
        let caller = tables.caller(token)?;
        let before = tables.listings.len();
        tables
            .listings
            .retain(|l| !(l.id == id && l.host_id == caller));
        Ok(tables.listings.len() != before)
    }

    async fn insert_booking(&self, token: &str, booking: &NewBooking) -> Result<Booking, BackendError> {
        let mut tables = self.tables.write().await;
        if tables.caller(token)? != booking.guest_id {
            return Err(denied("bookings"));
        }
        if tables.listing(booking.listing_id).is_none() {
            return Err(BackendError::Api {
                status: 409,
                code: Some("23503".into()),
                message: "insert or update on table \"bookings\" violates foreign key constraint".into(),
            });
        }
        let row = Booking {
            id: Uuid::new_v4(),
            listing_id: booking.listing_id,
            guest_id: booking.guest_id,
            check_in: booking.check_in,
            check_out: booking.check_out,
            total_price: booking.total_price,
            created_at: OffsetDateTime::now_utc(),
            status: Some(booking.status),
        };
        tables.bookings.push(row.clone());
        Ok(row)
    }

    async fn get_booking(&self, token: &str, id: Uuid) -> Result<Option<Booking>, BackendError> {
        let tables = self.tables.read().await;
        let caller = tables.caller(token)?;
        Ok(tables
            .bookings
            .iter()
            .find(|b| b.id == id && tables.booking_visible_to(b, caller))
            .cloned())
    }

    async fn list_guest_bookings(&self, token: &str, guest_id: Uuid) -> Result<Vec<GuestBooking>, BackendError> {
        let tables = self.tables.read().await;
        let caller = tables.caller(token)?;
        let mut rows: Vec<GuestBooking> = tables
            .bookings
            .iter()
            .filter(|b| b.guest_id == guest_id && tables.booking_visible_to(b, caller))
            .map(|b| GuestBooking {
                booking: b.clone(),
                listings: tables.listing(b.listing_id).map(|l| ListingSummary {
                    title: l.title.clone(),
                    image_url: l.image_url.clone(),
                    location: l.location.clone(),
                }),
            })
            .collect();
        rows.sort_by_key(|r| r.booking.created_at);
        rows.reverse();
        Ok(rows)
    }

    async fn find_review(&self, token: &str, booking_id: Uuid) -> Result<Option<Review>, BackendError> {
        let tables = self.tables.read().await;
        tables.caller(token)?;
        Ok(tables
            .reviews
            .iter()
            .find(|r| r.booking_id == booking_id)
            .cloned())
    }

    async fn insert_review(&self, token: &str, review: &NewReview) -> Result<Review, BackendError> {
        let mut tables = self.tables.write().await;
        let caller = tables.caller(token)?;
        if tables.booking_guest(review.booking_id) != Some(caller) {
            return Err(denied("reviews"));
        }
        if tables.reviews.iter().any(|r| r.booking_id == review.booking_id) {
            return Err(BackendError::Api {
                status: 409,
                code: Some(UNIQUE_VIOLATION.into()),
                message: "duplicate key value violates unique constraint \"reviews_booking_id_key\"".into(),
            });
        }
        let row = Review {
            id: Uuid::new_v4(),
            booking_id: review.booking_id,
            rating: review.draft.rating,
            comment: review.draft.comment.clone(),
        };
        tables.reviews.push(row.clone());
        Ok(row)
    }

    async fn update_review(&self, token: &str, id: Uuid, draft: &ReviewDraft) -> Result<Review, BackendError> {
        let mut tables = self.tables.write().await;
        let caller = tables.caller(token)?;
        let owned_bookings: Vec<Uuid> = tables
            .bookings
            .iter()
            .filter(|b| b.guest_id == caller)
            .map(|b| b.id)
            .collect();
        let row = tables
            .reviews
            .iter_mut()
            .find(|r| r.id == id && owned_bookings.contains(&r.booking_id))
            .ok_or(BackendError::Api { status: 404, code: None, message: format!("review {id} not found") })?;
        row.rating = draft.rating;
        row.comment.clone_from(&draft.comment);
        Ok(row.clone())
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;
