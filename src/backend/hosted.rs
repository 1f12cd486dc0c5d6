//! Hosted backend client: PostgREST data API plus GoTrue identity API.
//!
//! Thin HTTP wrapper over `/rest/v1/{table}` and `/auth/v1/*`. Every call
//! sends the project's anon key as `apikey` and the caller's bearer token
//! (or the anon key when signed out) as `Authorization`. Pure parsing lives
//! in free functions for testability.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use super::{BackendError, DataStore, Identity};
use crate::config::HostedConfig;
use crate::model::{
    Booking, GuestBooking, Listing, ListingDraft, NewBooking, NewListing, NewReview, Review, ReviewDraft, Session,
    SignUp, User,
};

const REST_PATH: &str = "/rest/v1";
const AUTH_PATH: &str = "/auth/v1";
const RETURN_REPRESENTATION: &str = "return=representation";
const BOOKING_WITH_LISTING: &str = "*,listings(title,image_url,location)";

// =============================================================================
// CLIENT
// =============================================================================

pub struct HostedBackend {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
}

impl HostedBackend {
    /// Build a client for the configured project.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &HostedConfig) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| BackendError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: config.base_url.clone(), anon_key: config.anon_key.clone() })
    }

    fn table(&self, method: Method, table: &str, token: Option<&str>) -> RequestBuilder {
        let url = format!("{}{REST_PATH}/{table}", self.base_url);
        self.with_keys(self.http.request(method, url), token)
    }

    fn auth(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let url = format!("{}{AUTH_PATH}/{path}", self.base_url);
        self.with_keys(self.http.request(method, url), token)
    }

    fn with_keys(&self, request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(token.unwrap_or(&self.anon_key))
    }
}

async fn send(request: RequestBuilder) -> Result<(u16, String), BackendError> {
    let response = request
        .send()
        .await
        .map_err(|e| BackendError::Request(e.to_string()))?;
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .map_err(|e| BackendError::Request(e.to_string()))?;
    Ok((status, body))
}

async fn fetch_rows<T: DeserializeOwned>(request: RequestBuilder) -> Result<Vec<T>, BackendError> {
    let (status, body) = send(request).await?;
    match status {
        s if is_success(s) => parse_rows(&body),
        // Expired or revoked JWT (PGRST301 and friends).
        401 => Err(BackendError::Unauthenticated),
        s => Err(parse_error(s, &body)),
    }
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{value}")
}

fn single<T>(rows: Vec<T>, table: &str) -> Result<T, BackendError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| BackendError::Parse(format!("{table}: write returned no representation")))
}

// =============================================================================
// WIRE TYPES
// =============================================================================

/// Union of the PostgREST and GoTrue error bodies.
#[derive(Debug, Default, Deserialize)]
struct WireError {
    code: Option<serde_json::Value>,
    error_code: Option<String>,
    error: Option<String>,
    message: Option<String>,
    msg: Option<String>,
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUser {
    id: Uuid,
    email: Option<String>,
    user_metadata: Option<WireMetadata>,
}

#[derive(Debug, Deserialize)]
struct WireMetadata {
    full_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireSession {
    access_token: String,
    user: WireUser,
}

impl From<WireUser> for User {
    fn from(wire: WireUser) -> Self {
        Self { id: wire.id, email: wire.email, full_name: wire.user_metadata.and_then(|m| m.full_name) }
    }
}

// =============================================================================
// PARSING
// =============================================================================

/// Map a non-success response to [`BackendError::Api`], keeping the code.
pub(crate) fn parse_error(status: u16, body: &str) -> BackendError {
    let wire: WireError = serde_json::from_str(body).unwrap_or_default();
    let code = wire
        .error_code
        .or(match wire.code {
            Some(serde_json::Value::String(code)) => Some(code),
            _ => None,
        })
        .or(wire.error);
    let message = wire
        .message
        .or(wire.msg)
        .or(wire.error_description)
        .unwrap_or_else(|| body.trim().to_owned());
    BackendError::Api { status, code, message }
}

pub(crate) fn parse_rows<T: DeserializeOwned>(body: &str) -> Result<Vec<T>, BackendError> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(body).map_err(|e| BackendError::Parse(e.to_string()))
}

pub(crate) fn parse_user(body: &str) -> Result<User, BackendError> {
    serde_json::from_str::<WireUser>(body)
        .map(User::from)
        .map_err(|e| BackendError::Parse(e.to_string()))
}

pub(crate) fn parse_session(body: &str) -> Result<Session, BackendError> {
    let wire: WireSession = serde_json::from_str(body).map_err(|e| BackendError::Parse(e.to_string()))?;
    Ok(Session { access_token: wire.access_token, user: wire.user.into() })
}

/// Sign-up answers with a session when auto-confirm is on, and with the
/// bare user object when email confirmation is pending.
pub(crate) fn parse_sign_up(body: &str) -> Result<SignUp, BackendError> {
    let value: serde_json::Value = serde_json::from_str(body).map_err(|e| BackendError::Parse(e.to_string()))?;
    if value.get("access_token").is_some() {
        let session = parse_session(body)?;
        return Ok(SignUp { user: session.user.clone(), session: Some(session) });
    }
    let user_value = value.get("user").cloned().unwrap_or(value);
    let user = serde_json::from_value::<WireUser>(user_value)
        .map(User::from)
        .map_err(|e| BackendError::Parse(e.to_string()))?;
    Ok(SignUp { user, session: None })
}

// =============================================================================
// IDENTITY
// =============================================================================

#[async_trait]
impl Identity for HostedBackend {
    async fn sign_up(&self, email: &str, password: &str, full_name: &str) -> Result<SignUp, BackendError> {
        let request = self.auth(Method::POST, "signup", None).json(&serde_json::json!({
            "email": email,
            "password": password,
            "data": { "full_name": full_name },
        }));
        let (status, body) = send(request).await?;
        if !is_success(status) {
            return Err(parse_error(status, &body));
        }
        parse_sign_up(&body)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, BackendError> {
        let request = self
            .auth(Method::POST, "token", None)
            .query(&[("grant_type", "password")])
            .json(&serde_json::json!({ "email": email, "password": password }));
        let (status, body) = send(request).await?;
        match status {
            s if is_success(s) => parse_session(&body),
            400 => Err(BackendError::InvalidCredentials),
            s => Err(parse_error(s, &body)),
        }
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        let (status, body) = send(self.auth(Method::POST, "logout", Some(access_token))).await?;
        match status {
            s if is_success(s) => Ok(()),
            // Already expired or revoked: nothing left to sign out of.
            401 | 403 | 404 => Ok(()),
            s => Err(parse_error(s, &body)),
        }
    }

    async fn user(&self, access_token: &str) -> Result<Option<User>, BackendError> {
        let (status, body) = send(self.auth(Method::GET, "user", Some(access_token))).await?;
        match status {
            s if is_success(s) => parse_user(&body).map(Some),
            401 | 403 => Ok(None),
            s => Err(parse_error(s, &body)),
        }
    }
}

// =============================================================================
// DATA
// =============================================================================

#[async_trait]
impl DataStore for HostedBackend {
    async fn list_listings(&self) -> Result<Vec<Listing>, BackendError> {
        let request = self
            .table(Method::GET, "listings", None)
            .query(&[("select", "*"), ("order", "created_at.desc")]);
        fetch_rows(request).await
    }

    async fn get_listing(&self, id: Uuid) -> Result<Option<Listing>, BackendError> {
        let request = self
            .table(Method::GET, "listings", None)
            .query(&[("select", "*".to_owned()), ("id", eq(id))]);
        Ok(fetch_rows(request).await?.into_iter().next())
    }

    async fn insert_listing(&self, token: &str, listing: &NewListing) -> Result<Listing, BackendError> {
        let request = self
            .table(Method::POST, "listings", Some(token))
            .header("Prefer", RETURN_REPRESENTATION)
            .json(listing);
        single(fetch_rows(request).await?, "listings")
    }

    async fn update_listing(
        &self,
        token: &str,
        id: Uuid,
        draft: &ListingDraft,
    ) -> Result<Option<Listing>, BackendError> {
        let request = self
            .table(Method::PATCH, "listings", Some(token))
            .query(&[("id", eq(id))])
            .header("Prefer", RETURN_REPRESENTATION)
            .json(draft);
        Ok(fetch_rows(request).await?.into_iter().next())
    }

    async fn delete_listing(&self, token: &str, id: Uuid) -> Result<bool, BackendError> {
        let request = self
            .table(Method::DELETE, "listings", Some(token))
            .query(&[("id", eq(id))])
            .header("Prefer", RETURN_REPRESENTATION);
        let rows: Vec<serde_json::Value> = fetch_rows(request).await?;
        Ok(!rows.is_empty())
    }

    async fn insert_booking(&self, token: &str, booking: &NewBooking) -> Result<Booking, BackendError> {
        let request = self
            .table(Method::POST, "bookings", Some(token))
            .header("Prefer", RETURN_REPRESENTATION)
            .json(booking);
        single(fetch_rows(request).await?, "bookings")
    }

    async fn get_booking(&self, token: &str, id: Uuid) -> Result<Option<Booking>, BackendError> {
        let request = self
            .table(Method::GET, "bookings", Some(token))
            .query(&[("select", "*".to_owned()), ("id", eq(id))]);
        Ok(fetch_rows(request).await?.into_iter().next())
    }

    async fn list_guest_bookings(&self, token: &str, guest_id: Uuid) -> Result<Vec<GuestBooking>, BackendError> {
        let request = self.table(Method::GET, "bookings", Some(token)).query(&[
            ("select", BOOKING_WITH_LISTING.to_owned()),
            ("guest_id", eq(guest_id)),
            ("order", "created_at.desc".to_owned()),
        ]);
        fetch_rows(request).await
    }

    async fn find_review(&self, token: &str, booking_id: Uuid) -> Result<Option<Review>, BackendError> {
        let request = self
            .table(Method::GET, "reviews", Some(token))
            .query(&[("select", "*".to_owned()), ("booking_id", eq(booking_id))]);
        Ok(fetch_rows(request).await?.into_iter().next())
    }

    async fn insert_review(&self, token: &str, review: &NewReview) -> Result<Review, BackendError> {
        let request = self
            .table(Method::POST, "reviews", Some(token))
            .header("Prefer", RETURN_REPRESENTATION)
            .json(review);
        single(fetch_rows(request).await?, "reviews")
    }

    async fn update_review(&self, token: &str, id: Uuid, draft: &ReviewDraft) -> Result<Review, BackendError> {
        let request = self
            .table(Method::PATCH, "reviews", Some(token))
            .query(&[("id", eq(id))])
            .header("Prefer", RETURN_REPRESENTATION)
            .json(draft);
        fetch_rows(request)
            .await?
            .into_iter()
            .next()
            .ok_or(BackendError::Api { status: 404, code: None, message: format!("review {id} not found") })
    }
}

#[cfg(test)]
#[path = "hosted_test.rs"]
mod tests;
