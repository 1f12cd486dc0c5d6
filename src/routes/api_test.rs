use super::*;
use crate::backend::{BackendError, DataStore};
use crate::model::{BookingStatus, NewBooking, Session};
use crate::state::test_helpers::{seed_listing, signed_up, test_app_state, test_app_state_recording};
use axum::body::Body;
use axum::http::{Request, header};
use serde_json::{Value, json};
use time::Duration;
use tower::ServiceExt;

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, body)
}

fn get_as(uri: &str, session: Option<&Session>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(s) = session {
        builder = builder.header(header::COOKIE, format!("{}={}", auth::COOKIE_NAME, s.access_token));
    }
    builder.body(Body::empty()).unwrap()
}

fn json_as(method: &str, uri: &str, session: Option<&Session>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(s) = session {
        builder = builder.header(header::COOKIE, format!("{}={}", auth::COOKIE_NAME, s.access_token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn iso(date: Date) -> String {
    date.to_string()
}

fn today() -> Date {
    OffsetDateTime::now_utc().date()
}

fn with_local_date(mut req: Request<Body>, date: Date) -> Request<Body> {
    req.headers_mut().insert(LOCAL_DATE_HEADER, iso(date).parse().unwrap());
    req
}

// =============================================================================
// LOCAL DATE
// =============================================================================

#[test]
fn local_date_within_a_day_of_utc_is_trusted() {
    let utc = time::macros::date!(2030 - 06 - 15);
    assert_eq!(clamp_today(utc, None), utc);
    assert_eq!(clamp_today(utc, Some(utc - Duration::days(1))), utc - Duration::days(1));
    assert_eq!(clamp_today(utc, Some(utc + Duration::days(1))), utc + Duration::days(1));
}

#[test]
fn local_date_far_from_utc_is_clamped() {
    let utc = time::macros::date!(2030 - 06 - 15);
    assert_eq!(clamp_today(utc, Some(utc - Duration::days(30))), utc - Duration::days(1));
    assert_eq!(clamp_today(utc, Some(utc + Duration::days(30))), utc + Duration::days(1));
}

#[test]
fn expired_backend_session_points_at_sign_in() {
    let err = error::ApiError::from(BackendError::Unauthenticated);
    assert_eq!(err.status, StatusCode::UNAUTHORIZED);
    assert_eq!(err.redirect, Some(error::SIGN_IN_PATH));
}

// =============================================================================
// BASICS
// =============================================================================

#[tokio::test]
async fn healthz_ok() {
    let (state, _) = test_app_state();
    let (status, _) = send(&app(state), get_as("/healthz", None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn sign_up_sets_session_cookie() {
    let (state, _) = test_app_state();
    let app = app(state);
    let req = json_as(
        "POST",
        "/api/auth/sign-up",
        None,
        &json!({ "email": "ann@example.com", "password": "pw", "full_name": "Ann Lee" }),
    );
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let cookie = resp
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_owned();
    assert!(cookie.starts_with("session_token="));
    assert!(cookie.contains("HttpOnly"));

    let pair = cookie.split(';').next().unwrap().to_owned();
    let me = Request::get("/api/auth/me").header(header::COOKIE, pair).body(Body::empty()).unwrap();
    let (status, body) = send(&app, me).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["full_name"], "Ann Lee");
}

#[tokio::test]
async fn me_without_cookie_points_at_sign_in() {
    let (state, _) = test_app_state();
    let (status, body) = send(&app(state), get_as("/api/auth/me", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["redirect"], "/auth");
}

#[tokio::test]
async fn bad_sign_in_is_unauthorized() {
    let (state, backend) = test_app_state();
    signed_up(&backend, "ann@example.com").await;
    let req = json_as("POST", "/api/auth/sign-in", None, &json!({ "email": "ann@example.com", "password": "x" }));
    let (status, body) = send(&app(state), req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid email or password");
}

// =============================================================================
// LISTINGS
// =============================================================================

#[tokio::test]
async fn feed_and_detail_carry_price_label_and_host_flag() {
    let (state, backend) = test_app_state();
    let host = signed_up(&backend, "host@example.com").await;
    let listing = seed_listing(&backend, &host).await;
    let app = app(state);

    let (status, body) = send(&app, get_as("/api/listings", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["price_label"], "$250");
    assert_eq!(body[0]["is_host"], false);

    let uri = format!("/api/listings/{}", listing.id);
    let (_, body) = send(&app, get_as(&uri, Some(&host))).await;
    assert_eq!(body["title"], "Luxury Mountain Cabin");
    assert_eq!(body["is_host"], true);
}

#[tokio::test]
async fn create_listing_requires_sign_in_and_valid_fields() {
    let (state, backend) = test_app_state();
    let host = signed_up(&backend, "host@example.com").await;
    let app = app(state);
    let body = json!({
        "title": "Beachfront Paradise",
        "description": "Modern villa right on the beach",
        "price_per_night": 350,
        "location": "Maui, Hawaii",
        "image_url": "https://images.example.com/villa.jpg"
    });

    let (status, _) = send(&app, json_as("POST", "/api/listings", None, &body)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, created) = send(&app, json_as("POST", "/api/listings", Some(&host), &body)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["host_id"], json!(host.user.id));

    let bad = json!({ "title": "x", "description": "y", "price_per_night": 1, "location": "z", "image_url": "nope" });
    let (status, err) = send(&app, json_as("POST", "/api/listings", Some(&host), &bad)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["error"], "Image URL must be an absolute http(s) URL");
}

#[tokio::test]
async fn non_host_edit_is_forbidden_without_write() {
    let (state, backend, recording) = test_app_state_recording();
    let host = signed_up(&backend, "host@example.com").await;
    let other = signed_up(&backend, "other@example.com").await;
    let listing = seed_listing(&backend, &host).await;
    let app = app(state);

    let body = json!({
        "title": "Mine now",
        "description": "d",
        "price_per_night": 1,
        "location": "l",
        "image_url": "https://images.example.com/x.jpg"
    });
    let uri = format!("/api/listings/{}", listing.id);
    let (status, err) = send(&app, json_as("PATCH", &uri, Some(&other), &body)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(err["error"], "You don't have permission to edit this listing");
    assert_eq!(recording.calls(), vec!["get_listing"]);
}

// =============================================================================
// BOOKINGS
// =============================================================================

#[tokio::test]
async fn signed_out_booking_redirects_without_backend_call() {
    let (state, backend, recording) = test_app_state_recording();
    let host = signed_up(&backend, "host@example.com").await;
    let listing = seed_listing(&backend, &host).await;
    let start = today() + Duration::days(1);
    let body = json!({ "check_in": iso(start), "check_out": iso(start + Duration::days(2)) });

    let uri = format!("/api/listings/{}/bookings", listing.id);
    let (status, err) = send(&app(state), json_as("POST", &uri, None, &body)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(err["error"], "Please sign in to make a booking");
    assert_eq!(err["redirect"], "/auth");
    assert!(recording.calls().is_empty());
}

#[tokio::test]
async fn booking_and_quote_price_the_same_stay() {
    let (state, backend) = test_app_state();
    let host = signed_up(&backend, "host@example.com").await;
    let guest = signed_up(&backend, "guest@example.com").await;
    let listing = seed_listing(&backend, &host).await;
    let app = app(state);
    let start = today() + Duration::days(7);
    let end = start + Duration::days(2);

    let quote_uri = format!("/api/listings/{}/quote?check_in={}&check_out={}", listing.id, iso(start), iso(end));
    let (status, quote) = send(&app, get_as(&quote_uri, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(quote["nights"], 2);
    assert_eq!(quote["total_label"], "$500");

    let uri = format!("/api/listings/{}/bookings", listing.id);
    let body = json!({ "check_in": iso(start), "check_out": iso(end) });
    let (status, booking) = send(&app, json_as("POST", &uri, Some(&guest), &body)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(booking["total_price"], 500.0);
    assert_eq!(booking["status"], "confirmed");
    assert_eq!(booking["check_in"], iso(start));

    let (status, mine) = send(&app, get_as("/api/bookings", Some(&guest))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine.as_array().unwrap().len(), 1);
    assert_eq!(mine[0]["listing"]["title"], "Luxury Mountain Cabin");
    assert_eq!(mine[0]["can_review"], false);
}

#[tokio::test]
async fn inverted_dates_are_rejected() {
    let (state, backend) = test_app_state();
    let host = signed_up(&backend, "host@example.com").await;
    let guest = signed_up(&backend, "guest@example.com").await;
    let listing = seed_listing(&backend, &host).await;
    let start = today() + Duration::days(5);
    let body = json!({ "check_in": iso(start), "check_out": iso(start - Duration::days(2)) });

    let uri = format!("/api/listings/{}/bookings", listing.id);
    let (status, err) = send(&app(state), json_as("POST", &uri, Some(&guest), &body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["error"], "Check-out date must be after check-in date");
}

#[tokio::test]
async fn guest_west_of_utc_can_book_their_today() {
    let (state, backend) = test_app_state();
    let host = signed_up(&backend, "host@example.com").await;
    let guest = signed_up(&backend, "guest@example.com").await;
    let listing = seed_listing(&backend, &host).await;
    let app = app(state);
    let local_today = today() - Duration::days(1);
    let body = json!({ "check_in": iso(local_today), "check_out": iso(local_today + Duration::days(2)) });
    let uri = format!("/api/listings/{}/bookings", listing.id);

    let (status, err) = send(&app, json_as("POST", &uri, Some(&guest), &body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["error"], "Check-in date cannot be in the past");

    let req = with_local_date(json_as("POST", &uri, Some(&guest), &body), local_today);
    let (status, booking) = send(&app, req).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(booking["check_in"], iso(local_today));
}

#[tokio::test]
async fn malformed_booking_dates_still_redirect_signed_out_callers() {
    let (state, backend, recording) = test_app_state_recording();
    let host = signed_up(&backend, "host@example.com").await;
    let listing = seed_listing(&backend, &host).await;
    let body = json!({ "check_in": "next tuesday", "check_out": "2030-13-45" });

    let uri = format!("/api/listings/{}/bookings", listing.id);
    let (status, err) = send(&app(state), json_as("POST", &uri, None, &body)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(err["redirect"], "/auth");
    assert!(recording.calls().is_empty());
}

#[tokio::test]
async fn malformed_booking_dates_are_a_json_bad_request() {
    let (state, backend, recording) = test_app_state_recording();
    let host = signed_up(&backend, "host@example.com").await;
    let guest = signed_up(&backend, "guest@example.com").await;
    let listing = seed_listing(&backend, &host).await;
    let body = json!({ "check_in": "next tuesday", "check_out": "2030-13-45" });

    let uri = format!("/api/listings/{}/bookings", listing.id);
    let (status, err) = send(&app(state), json_as("POST", &uri, Some(&guest), &body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(err["error"].as_str().is_some_and(|e| !e.is_empty()));
    assert!(recording.calls().is_empty());
}

#[tokio::test]
async fn malformed_quote_query_is_a_json_bad_request() {
    let (state, backend) = test_app_state();
    let host = signed_up(&backend, "host@example.com").await;
    let listing = seed_listing(&backend, &host).await;

    let uri = format!("/api/listings/{}/quote?check_in=soon&check_out=later", listing.id);
    let (status, err) = send(&app(state), get_as(&uri, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(err["error"].as_str().is_some_and(|e| !e.is_empty()));
}

// =============================================================================
// REVIEWS
// =============================================================================

#[tokio::test]
async fn unset_or_garbled_rating_is_rejected_before_any_lookup() {
    let (state, backend, recording) = test_app_state_recording();
    let host = signed_up(&backend, "host@example.com").await;
    let guest = signed_up(&backend, "guest@example.com").await;
    let listing = seed_listing(&backend, &host).await;
    let check_out = today() - Duration::days(3);
    let booking = backend
        .insert_booking(
            &guest.access_token,
            &NewBooking {
                listing_id: listing.id,
                guest_id: guest.user.id,
                check_in: check_out - Duration::days(2),
                check_out,
                total_price: 500.0,
                status: BookingStatus::Confirmed,
            },
        )
        .await
        .unwrap();
    let app = app(state);
    let uri = format!("/api/bookings/{}/review", booking.id);

    let (status, err) = send(&app, json_as("POST", &uri, Some(&guest), &json!({ "rating": null }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["error"], "Please select a rating");

    let (status, err) = send(&app, json_as("POST", &uri, Some(&guest), &json!({ "rating": "five" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(err["error"].as_str().is_some_and(|e| !e.is_empty()));
    assert!(recording.calls().is_empty());
}

#[tokio::test]
async fn review_is_created_then_updated() {
    let (state, backend, recording) = test_app_state_recording();
    let host = signed_up(&backend, "host@example.com").await;
    let guest = signed_up(&backend, "guest@example.com").await;
    let listing = seed_listing(&backend, &host).await;
    let check_out = today() - Duration::days(3);
    let booking = backend
        .insert_booking(
            &guest.access_token,
            &NewBooking {
                listing_id: listing.id,
                guest_id: guest.user.id,
                check_in: check_out - Duration::days(2),
                check_out,
                total_price: 500.0,
                status: BookingStatus::Confirmed,
            },
        )
        .await
        .unwrap();
    let app = app(state);
    let uri = format!("/api/bookings/{}/review", booking.id);

    let (status, err) = send(&app, json_as("POST", &uri, Some(&guest), &json!({ "rating": 0 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["error"], "Please select a rating");
    assert!(recording.calls().is_empty());

    let (status, created) =
        send(&app, json_as("POST", &uri, Some(&guest), &json!({ "rating": 5, "comment": " Lovely " }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["outcome"], "created");
    assert_eq!(created["review"]["comment"], "Lovely");

    let (status, updated) = send(&app, json_as("POST", &uri, Some(&guest), &json!({ "rating": 3 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["outcome"], "updated");
    assert_eq!(updated["review"]["id"], created["review"]["id"]);
    assert_eq!(updated["review"]["rating"], 3);
}

#[tokio::test]
async fn review_by_host_is_forbidden() {
    let (state, backend) = test_app_state();
    let host = signed_up(&backend, "host@example.com").await;
    let guest = signed_up(&backend, "guest@example.com").await;
    let listing = seed_listing(&backend, &host).await;
    let check_out = today() - Duration::days(1);
    let booking = backend
        .insert_booking(
            &guest.access_token,
            &NewBooking {
                listing_id: listing.id,
                guest_id: guest.user.id,
                check_in: check_out - Duration::days(1),
                check_out,
                total_price: 250.0,
                status: BookingStatus::Confirmed,
            },
        )
        .await
        .unwrap();

    // The host can read the booking but is not its guest.
    let uri = format!("/api/bookings/{}/review", booking.id);
    let (status, _) = send(&app(state), json_as("POST", &uri, Some(&host), &json!({ "rating": 4 }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
