//! Listing routes: feed, detail, authoring and price quotes.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum_extra::extract::WithRejection;
use serde::Serialize;
use uuid::Uuid;

use super::auth::{AuthUser, MaybeUser};
use super::error::ApiError;
use super::LocalToday;
use crate::model::{Listing, User};
use crate::services::booking::{self, BookingRequest};
use crate::services::listing::{self as listing_svc, ListingInput};
use crate::services::pricing::{StayQuote, format_price};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ListingView {
    #[serde(flatten)]
    pub listing: Listing,
    pub price_label: String,
    /// Acting user owns this listing (edit/delete controls).
    pub is_host: bool,
}

fn to_view(listing: Listing, user: Option<&User>, symbol: &str) -> ListingView {
    let price_label = format_price(listing.price_per_night, symbol);
    let is_host = listing_svc::is_host(user, &listing);
    ListingView { listing, price_label, is_host }
}

#[derive(Debug, Serialize)]
pub struct QuoteView {
    #[serde(flatten)]
    pub quote: StayQuote,
    pub total_label: String,
}

/// `GET /api/listings`: all listings, newest first.
pub async fn list_listings(
    State(state): State<AppState>,
    viewer: MaybeUser,
) -> Result<Json<Vec<ListingView>>, ApiError> {
    let listings = listing_svc::list_listings(state.store.as_ref())
        .await
        .map_err(|e| ApiError::from(e).or_failure_notice("Failed to load listings"))?;
    let symbol = &state.config.currency_symbol;
    Ok(Json(listings.into_iter().map(|l| to_view(l, viewer.user(), symbol)).collect()))
}

/// `POST /api/listings`: create a listing hosted by the caller.
pub async fn create_listing(
    State(state): State<AppState>,
    AuthUser(session): AuthUser,
    WithRejection(Json(body), _): WithRejection<Json<ListingInput>, ApiError>,
) -> Result<(StatusCode, Json<ListingView>), ApiError> {
    let listing = listing_svc::create_listing(state.store.as_ref(), &session, &body)
        .await
        .map_err(|e| ApiError::from(e).or_failure_notice("Failed to create listing"))?;
    Ok((StatusCode::CREATED, Json(to_view(listing, Some(&session.user), &state.config.currency_symbol))))
}

/// `GET /api/listings/{id}`: listing detail.
pub async fn get_listing(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ListingView>, ApiError> {
    let listing = listing_svc::get_listing(state.store.as_ref(), id).await?;
    Ok(Json(to_view(listing, viewer.user(), &state.config.currency_symbol)))
}

/// `PATCH /api/listings/{id}`: host-only edit.
pub async fn update_listing(
    State(state): State<AppState>,
    AuthUser(session): AuthUser,
    Path(id): Path<Uuid>,
    WithRejection(Json(body), _): WithRejection<Json<ListingInput>, ApiError>,
) -> Result<Json<ListingView>, ApiError> {
    let listing = listing_svc::update_listing(state.store.as_ref(), &session, id, &body)
        .await
        .map_err(|e| ApiError::from(e).or_failure_notice("Failed to update listing"))?;
    Ok(Json(to_view(listing, Some(&session.user), &state.config.currency_symbol)))
}

/// `DELETE /api/listings/{id}`: host-only delete.
pub async fn delete_listing(
    State(state): State<AppState>,
    AuthUser(session): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    listing_svc::delete_listing(state.store.as_ref(), &session, id)
        .await
        .map_err(|e| ApiError::from(e).or_failure_notice("Failed to delete listing"))?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/listings/{id}/quote?check_in=..&check_out=..`: price a stay.
pub async fn quote(
    State(state): State<AppState>,
    LocalToday(today): LocalToday,
    Path(id): Path<Uuid>,
    WithRejection(Query(range), _): WithRejection<Query<BookingRequest>, ApiError>,
) -> Result<Json<QuoteView>, ApiError> {
    let quote = booking::quote_stay(state.store.as_ref(), id, &range, today).await?;
    let total_label = format_price(quote.total, &state.config.currency_symbol);
    Ok(Json(QuoteView { quote, total_label }))
}
