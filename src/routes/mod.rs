//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! This module binds the JSON API the browser client talks to. Handlers
//! translate between HTTP and the services; the session cookie is turned
//! into a backend bearer token by the extractors in [`auth`].

pub mod auth;
pub mod bookings;
pub mod error;
pub mod listings;

use std::convert::Infallible;

use axum::Router;
use axum::extract::FromRequestParts;
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::routing::{get, post};
use time::macros::format_description;
use time::{Date, OffsetDateTime};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Header carrying the browser's calendar date as `YYYY-MM-DD`.
pub const LOCAL_DATE_HEADER: &str = "x-local-date";

/// Accept the caller's claimed date when it is within a day of the UTC
/// date. Every timezone's calendar date falls in that window.
pub(crate) fn clamp_today(utc_today: Date, claimed: Option<Date>) -> Date {
    let Some(claimed) = claimed else {
        return utc_today;
    };
    let earliest = utc_today.previous_day().unwrap_or(utc_today);
    let latest = utc_today.next_day().unwrap_or(utc_today);
    claimed.clamp(earliest, latest)
}

fn claimed_date(parts: &Parts) -> Option<Date> {
    let raw = parts.headers.get(LOCAL_DATE_HEADER)?.to_str().ok()?;
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]")).ok()
}

/// The date booking and review rules are checked against: the caller's local
/// date from [`LOCAL_DATE_HEADER`], or the UTC date when it is absent or
/// unparseable.
#[derive(Debug, Clone, Copy)]
pub struct LocalToday(pub Date);

impl<S: Send + Sync> FromRequestParts<S> for LocalToday {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let utc_today = OffsetDateTime::now_utc().date();
        Ok(Self(clamp_today(utc_today, claimed_date(parts))))
    }
}

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/auth/sign-up", post(auth::sign_up))
        .route("/api/auth/sign-in", post(auth::sign_in))
        .route("/api/auth/sign-out", post(auth::sign_out))
        .route("/api/auth/me", get(auth::me))
        .route("/api/listings", get(listings::list_listings).post(listings::create_listing))
        .route(
            "/api/listings/{id}",
            get(listings::get_listing)
                .patch(listings::update_listing)
                .delete(listings::delete_listing),
        )
        .route("/api/listings/{id}/quote", get(listings::quote))
        .route("/api/listings/{id}/bookings", post(bookings::create_booking))
        .route("/api/bookings", get(bookings::my_bookings))
        .route("/api/bookings/{id}/review", post(bookings::submit_review))
        .route("/healthz", get(healthz))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
