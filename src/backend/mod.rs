//! Backend seam: identity and data calls against the hosted backend.
//!
//! ARCHITECTURE
//! ============
//! Every persistence, authentication and authorization concern lives in
//! the external backend-as-a-service. The rest of the crate talks to it
//! through two object-safe traits so handlers and services can run against
//! the real HTTP client or the in-process [`memory::MemoryBackend`].
//!
//! ERROR HANDLING
//! ==============
//! Backend failures carry the store's error code when one is returned.
//! Callers branch on [`BackendError::is_unique_violation`] to tell a
//! duplicate row apart from a generic failure; everything else is surfaced
//! as-is and never retried.

pub mod hosted;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::config::{AppConfig, BackendMode};
use crate::model::{
    Booking, GuestBooking, Listing, ListingDraft, NewBooking, NewListing, NewReview, Review, ReviewDraft, Session,
    SignUp, User,
};

/// Store error code for a unique-constraint violation.
pub const UNIQUE_VIOLATION: &str = "23505";
/// Store error code for a row-level-security rejection.
pub const INSUFFICIENT_PRIVILEGE: &str = "42501";
/// Identity error code for an email that is already registered.
pub const USER_ALREADY_EXISTS: &str = "user_already_exists";

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The request never produced a response (DNS, TLS, timeout, ...).
    #[error("backend request failed: {0}")]
    Request(String),

    /// The backend answered with a non-success status.
    #[error("backend error: status {status}: {message}")]
    Api { status: u16, code: Option<String>, message: String },

    /// A success response did not match the expected shape.
    #[error("backend response parse failed: {0}")]
    Parse(String),

    /// Email/password pair rejected by the identity service.
    #[error("invalid login credentials")]
    InvalidCredentials,

    /// The bearer token is missing, expired or revoked.
    #[error("not authenticated")]
    Unauthenticated,

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl BackendError {
    /// Store- or identity-specific error code, if the backend sent one.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_unique_violation(&self) -> bool {
        self.code() == Some(UNIQUE_VIOLATION)
    }
}

// =============================================================================
// TRAITS
// =============================================================================

/// Identity operations: sign-up, sign-in, sign-out, token introspection.
#[async_trait]
pub trait Identity: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str, full_name: &str) -> Result<SignUp, BackendError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, BackendError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError>;

    /// Resolve a bearer token. `Ok(None)` means the token is not (or no
    /// longer) valid; `Err` means the lookup itself failed.
    async fn user(&self, access_token: &str) -> Result<Option<User>, BackendError>;
}

/// Row access to the `listings`, `bookings` and `reviews` tables.
///
/// `token` is the caller's bearer token; the backend's access policies
/// decide what it may read or write. Reads that a policy filters out come
/// back empty rather than as errors.
#[async_trait]
pub trait DataStore: Send + Sync {
    /// All listings, newest first.
    async fn list_listings(&self) -> Result<Vec<Listing>, BackendError>;

    async fn get_listing(&self, id: Uuid) -> Result<Option<Listing>, BackendError>;

    async fn insert_listing(&self, token: &str, listing: &NewListing) -> Result<Listing, BackendError>;

    /// `Ok(None)` when no row matched (absent or filtered by policy).
    async fn update_listing(
        &self,
        token: &str,
        id: Uuid,
        draft: &ListingDraft,
    ) -> Result<Option<Listing>, BackendError>;

    /// Returns whether a row was deleted.
    async fn delete_listing(&self, token: &str, id: Uuid) -> Result<bool, BackendError>;

    async fn insert_booking(&self, token: &str, booking: &NewBooking) -> Result<Booking, BackendError>;

    async fn get_booking(&self, token: &str, id: Uuid) -> Result<Option<Booking>, BackendError>;

    /// A guest's bookings with their listing embedded, newest first.
    async fn list_guest_bookings(&self, token: &str, guest_id: Uuid) -> Result<Vec<GuestBooking>, BackendError>;

    async fn find_review(&self, token: &str, booking_id: Uuid) -> Result<Option<Review>, BackendError>;

    async fn insert_review(&self, token: &str, review: &NewReview) -> Result<Review, BackendError>;

    async fn update_review(&self, token: &str, id: Uuid, draft: &ReviewDraft) -> Result<Review, BackendError>;
}

// =============================================================================
// CONSTRUCTION
// =============================================================================

/// Identity and data handles sharing one underlying backend.
#[derive(Clone)]
pub struct Backends {
    pub identity: Arc<dyn Identity>,
    pub store: Arc<dyn DataStore>,
}

impl Backends {
    /// Build the backend selected by `config.mode`.
    ///
    /// # Errors
    ///
    /// Returns an error if hosted mode lacks its settings or the HTTP
    /// client cannot be built.
    pub fn from_config(config: &AppConfig) -> Result<Self, BackendError> {
        match config.mode {
            BackendMode::Memory => Ok(Self::shared(Arc::new(memory::MemoryBackend::new()))),
            BackendMode::Hosted => {
                let hosted = config
                    .hosted
                    .as_ref()
                    .ok_or_else(|| BackendError::HttpClientBuild("hosted backend is not configured".into()))?;
                Ok(Self::shared(Arc::new(hosted::HostedBackend::new(hosted)?)))
            }
        }
    }

    /// Use one value for both roles.
    pub fn shared<B>(backend: Arc<B>) -> Self
    where
        B: Identity + DataStore + 'static,
    {
        Self { identity: backend.clone(), store: backend }
    }
}
