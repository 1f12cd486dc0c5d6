//! Listings feed, listing detail and listing authoring.
//!
//! Edit and delete are pre-checked against the listing's `host_id`; the
//! backend's access policies remain the final authority, so a write that
//! comes back empty is reported the same way as a missing listing.

use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::backend::{BackendError, DataStore};
use crate::model::{Listing, ListingDraft, NewListing, Session, User};

#[derive(Debug, thiserror::Error)]
pub enum ListingError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("Price per night must be a non-negative number")]
    InvalidPrice,
    #[error("Image URL must be an absolute http(s) URL")]
    InvalidImageUrl,
    #[error("Listing not found")]
    NotFound(Uuid),
    #[error("You don't have permission to edit this listing")]
    NotHost,
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}

/// Listing form as submitted by a host.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price_per_night: Option<f64>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub image_url: String,
}

impl ListingInput {
    /// Trim and check every field.
    ///
    /// # Errors
    ///
    /// Returns the first failing field.
    pub fn validate(&self) -> Result<ListingDraft, ListingError> {
        let title = required("Title", &self.title)?;
        let description = required("Description", &self.description)?;
        let price_per_night = match self.price_per_night {
            Some(price) if price.is_finite() && price >= 0.0 => price,
            Some(_) => return Err(ListingError::InvalidPrice),
            None => return Err(ListingError::MissingField("Price per night")),
        };
        let location = required("Location", &self.location)?;
        let image_url = required("Image URL", &self.image_url)?;
        if !is_http_url(&image_url) {
            return Err(ListingError::InvalidImageUrl);
        }
        Ok(ListingDraft { title, description, price_per_night, location, image_url })
    }
}

fn required(field: &'static str, value: &str) -> Result<String, ListingError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ListingError::MissingField(field));
    }
    Ok(trimmed.to_owned())
}

fn is_http_url(raw: &str) -> bool {
    reqwest::Url::parse(raw).is_ok_and(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
}

/// Whether `user` owns `listing` (edit/delete controls visible).
#[must_use]
pub fn is_host(user: Option<&User>, listing: &Listing) -> bool {
    user.is_some_and(|u| u.id == listing.host_id)
}

/// # Errors
///
/// Returns an error if the backend query fails.
pub async fn list_listings(store: &dyn DataStore) -> Result<Vec<Listing>, ListingError> {
    Ok(store.list_listings().await?)
}

/// # Errors
///
/// [`ListingError::NotFound`] when absent, or a backend failure.
pub async fn get_listing(store: &dyn DataStore, id: Uuid) -> Result<Listing, ListingError> {
    store
        .get_listing(id)
        .await?
        .ok_or(ListingError::NotFound(id))
}

/// Create a listing hosted by the acting user.
///
/// # Errors
///
/// Validation failures or a backend failure.
pub async fn create_listing(
    store: &dyn DataStore,
    session: &Session,
    input: &ListingInput,
) -> Result<Listing, ListingError> {
    let draft = input.validate()?;
    let listing = store
        .insert_listing(&session.access_token, &NewListing { draft, host_id: session.user.id })
        .await?;
    info!(listing_id = %listing.id, host_id = %listing.host_id, "listing created");
    Ok(listing)
}

/// Replace the editable fields of a listing the acting user hosts.
///
/// # Errors
///
/// Validation failures, a missing listing, a non-host caller, or a
/// backend failure.
pub async fn update_listing(
    store: &dyn DataStore,
    session: &Session,
    id: Uuid,
    input: &ListingInput,
) -> Result<Listing, ListingError> {
    let draft = input.validate()?;
    let existing = get_listing(store, id).await?;
    if !is_host(Some(&session.user), &existing) {
        return Err(ListingError::NotHost);
    }
    let listing = store
        .update_listing(&session.access_token, id, &draft)
        .await?
        .ok_or(ListingError::NotFound(id))?;
    info!(listing_id = %id, "listing updated");
    Ok(listing)
}

/// Delete a listing the acting user hosts.
///
/// # Errors
///
/// A missing listing, a non-host caller, or a backend failure.
pub async fn delete_listing(store: &dyn DataStore, session: &Session, id: Uuid) -> Result<(), ListingError> {
    let existing = get_listing(store, id).await?;
    if !is_host(Some(&session.user), &existing) {
        return Err(ListingError::NotHost);
    }
    if !store.delete_listing(&session.access_token, id).await? {
        return Err(ListingError::NotFound(id));
    }
    info!(listing_id = %id, "listing deleted");
    Ok(())
}

#[cfg(test)]
#[path = "listing_test.rs"]
mod tests;
