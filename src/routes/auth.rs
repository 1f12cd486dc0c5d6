//! Auth routes: sign-up, sign-in, sign-out, current user, and the session
//! extractors the other routes use.

use axum::extract::{FromRef, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum_extra::extract::WithRejection;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Serialize;
use time::Duration;

use super::error::ApiError;
use crate::model::{Session, User};
use crate::services::auth::{self as auth_svc, SignInInput, SignUpInput};
use crate::state::AppState;

pub const COOKIE_NAME: &str = "session_token";

fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((COOKIE_NAME, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

fn cleared_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((COOKIE_NAME, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(Duration::ZERO)
        .build()
}

fn cookie_token(parts: &axum::http::request::Parts) -> Option<String> {
    let jar = CookieJar::from_headers(&parts.headers);
    jar.get(COOKIE_NAME)
        .map(Cookie::value)
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
}

async fn resolve_session(state: &AppState, token: String) -> Result<Option<Session>, ApiError> {
    let user = auth_svc::current_user(state.identity.as_ref(), &token).await?;
    Ok(user.map(|user| Session { access_token: token, user }))
}

// =============================================================================
// AUTH EXTRACTORS
// =============================================================================

/// Authenticated user extracted from the session cookie.
/// Use as a handler parameter to require authentication.
pub struct AuthUser(pub Session);

impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut axum::http::request::Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Some(token) = cookie_token(parts) else {
            return Err(ApiError::sign_in_required("Please sign in to continue"));
        };
        let app_state = AppState::from_ref(state);
        resolve_session(&app_state, token)
            .await?
            .map(Self)
            .ok_or_else(|| ApiError::sign_in_required("Please sign in to continue"))
    }
}

/// Session if the caller is signed in. Without a cookie no identity call
/// is made; an unknown or expired token reads as signed out.
pub struct MaybeUser(pub Option<Session>);

impl MaybeUser {
    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        self.0.as_ref()
    }

    #[must_use]
    pub fn user(&self) -> Option<&User> {
        self.0.as_ref().map(|s| &s.user)
    }
}

impl<S> axum::extract::FromRequestParts<S> for MaybeUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut axum::http::request::Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Some(token) = cookie_token(parts) else {
            return Ok(Self(None));
        };
        let app_state = AppState::from_ref(state);
        Ok(Self(resolve_session(&app_state, token).await?))
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

#[derive(Serialize)]
pub struct SignUpResponse {
    pub user: User,
    /// The identity service wants the email confirmed before sign-in.
    pub confirmation_required: bool,
}

/// `POST /api/auth/sign-up`: create an account; signs in when the identity
/// service issues a session straight away.
pub async fn sign_up(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(body), _): WithRejection<Json<SignUpInput>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let signup = auth_svc::sign_up(state.identity.as_ref(), &body).await?;
    let confirmation_required = signup.session.is_none();
    let jar = match signup.session {
        Some(session) => jar.add(session_cookie(session.access_token, state.config.cookie_secure)),
        None => jar,
    };
    Ok((StatusCode::CREATED, jar, Json(SignUpResponse { user: signup.user, confirmation_required })))
}

/// `POST /api/auth/sign-in`: exchange credentials for a session cookie.
pub async fn sign_in(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(body), _): WithRejection<Json<SignInInput>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let session = auth_svc::sign_in(state.identity.as_ref(), &body).await?;
    let jar = jar.add(session_cookie(session.access_token, state.config.cookie_secure));
    Ok((jar, Json(session.user)))
}

/// `POST /api/auth/sign-out`: revoke the session, clear the cookie.
pub async fn sign_out(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    if let Some(token) = jar.get(COOKIE_NAME).map(Cookie::value).filter(|t| !t.is_empty()) {
        if let Err(e) = auth_svc::sign_out(state.identity.as_ref(), token).await {
            tracing::warn!(error = %e, "sign-out failed; clearing cookie anyway");
        }
    }
    let jar = jar.add(cleared_cookie(state.config.cookie_secure));
    (jar, StatusCode::NO_CONTENT)
}

/// `GET /api/auth/me`: return current user.
pub async fn me(AuthUser(session): AuthUser) -> Json<User> {
    Json(session.user)
}
