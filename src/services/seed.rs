//! Sample listings for a fresh project.

use tracing::{info, warn};

use crate::backend::{DataStore, Identity};
use crate::model::{ListingDraft, NewListing, Session};
use crate::services::auth::{self as auth_svc, AuthError, SignInInput, SignUpInput};

/// Display name given to a host account created for seeding.
pub const SEED_HOST_NAME: &str = "Sample Host";

/// (title, description, price per night, location, image URL)
pub const SAMPLE_LISTINGS: [(&str, &str, f64, &str, &str); 3] = [
    (
        "Luxury Mountain Cabin",
        "A beautiful cabin with stunning mountain views",
        250.0,
        "Aspen, Colorado",
        "https://images.unsplash.com/photo-1506744038136-46273834b3fb",
    ),
    (
        "Beachfront Paradise",
        "Modern villa right on the beach",
        350.0,
        "Maui, Hawaii",
        "https://images.unsplash.com/photo-1482881497185-d4a9ddbe4151",
    ),
    (
        "Urban Loft",
        "Stylish loft in the heart of the city",
        200.0,
        "New York City, NY",
        "https://images.unsplash.com/photo-1460925895917-afdab827c52f",
    ),
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub inserted: usize,
    pub failed: usize,
}

#[must_use]
pub fn sample_drafts() -> Vec<ListingDraft> {
    SAMPLE_LISTINGS
        .iter()
        .map(|&(title, description, price_per_night, location, image_url)| ListingDraft {
            title: title.to_owned(),
            description: description.to_owned(),
            price_per_night,
            location: location.to_owned(),
            image_url: image_url.to_owned(),
        })
        .collect()
}

/// Insert every sample listing as `host`. A failed insert is logged and
/// the rest still go in.
pub async fn seed_listings(store: &dyn DataStore, host: &Session) -> SeedReport {
    let mut report = SeedReport::default();
    for draft in sample_drafts() {
        let title = draft.title.clone();
        match store
            .insert_listing(&host.access_token, &NewListing { draft, host_id: host.user.id })
            .await
        {
            Ok(listing) => {
                info!(listing_id = %listing.id, %title, "sample listing inserted");
                report.inserted += 1;
            }
            Err(e) => {
                warn!(error = %e, %title, "sample listing insert failed");
                report.failed += 1;
            }
        }
    }
    report
}

/// Seed as the host named by `credentials`, signing out afterwards.
/// With `register` the account is created first; a fresh in-memory
/// backend has no accounts to sign in to.
///
/// # Errors
///
/// The host's sign-up or sign-in failure. Insert failures are counted in
/// the report instead.
pub async fn seed_as(
    identity: &dyn Identity,
    store: &dyn DataStore,
    credentials: &SignInInput,
    register: bool,
) -> Result<SeedReport, AuthError> {
    let registered = if register {
        let signup = SignUpInput {
            email: credentials.email.clone(),
            password: credentials.password.clone(),
            full_name: SEED_HOST_NAME.to_owned(),
        };
        auth_svc::sign_up(identity, &signup).await?.session
    } else {
        None
    };
    let host = match registered {
        Some(session) => session,
        None => auth_svc::sign_in(identity, credentials).await?,
    };

    let report = seed_listings(store, &host).await;
    info!(inserted = report.inserted, failed = report.failed, "seed finished");
    if let Err(e) = auth_svc::sign_out(identity, &host.access_token).await {
        warn!(error = %e, "seed sign-out failed");
    }
    Ok(report)
}

#[cfg(test)]
#[path = "seed_test.rs"]
mod tests;
