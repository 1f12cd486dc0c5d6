//! Auth gate: sign-up, sign-in and sign-out against the identity service.
//!
//! Input is checked before any call goes out; identity failures are mapped
//! to user-facing notices.

use serde::Deserialize;
use tracing::info;

use crate::backend::{BackendError, Identity, USER_ALREADY_EXISTS};
use crate::model::{Session, SignUp, User};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Please enter a valid email address")]
    InvalidEmail,
    #[error("Please enter a password")]
    MissingPassword,
    #[error("Please enter your full name")]
    MissingFullName,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("An account with this email already exists")]
    AlreadyRegistered,
    #[error("identity service error: {0}")]
    Backend(#[from] BackendError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignInInput {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignUpInput {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub full_name: String,
}

#[must_use]
pub fn normalize_email(email: &str) -> Option<String> {
    let normalized = email.trim().to_ascii_lowercase();
    let (local, domain) = normalized.split_once('@')?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return None;
    }
    Some(normalized)
}

fn require_password(password: &str) -> Result<(), AuthError> {
    if password.is_empty() {
        return Err(AuthError::MissingPassword);
    }
    Ok(())
}

/// Create an account. The returned session is absent when the identity
/// service holds the account for email confirmation.
///
/// # Errors
///
/// Validation failures, a taken email, or an identity-service failure.
pub async fn sign_up(identity: &dyn Identity, input: &SignUpInput) -> Result<SignUp, AuthError> {
    let full_name = input.full_name.trim();
    if full_name.is_empty() {
        return Err(AuthError::MissingFullName);
    }
    let email = normalize_email(&input.email).ok_or(AuthError::InvalidEmail)?;
    require_password(&input.password)?;

    let signup = identity
        .sign_up(&email, &input.password, full_name)
        .await
        .map_err(|e| {
            if e.code() == Some(USER_ALREADY_EXISTS) {
                AuthError::AlreadyRegistered
            } else {
                AuthError::Backend(e)
            }
        })?;
    info!(user_id = %signup.user.id, confirmed = signup.session.is_some(), "account created");
    Ok(signup)
}

/// # Errors
///
/// Validation failures, rejected credentials, or an identity-service failure.
pub async fn sign_in(identity: &dyn Identity, input: &SignInInput) -> Result<Session, AuthError> {
    let email = normalize_email(&input.email).ok_or(AuthError::InvalidEmail)?;
    require_password(&input.password)?;

    let session = identity
        .sign_in(&email, &input.password)
        .await
        .map_err(|e| match e {
            BackendError::InvalidCredentials => AuthError::InvalidCredentials,
            other => AuthError::Backend(other),
        })?;
    info!(user_id = %session.user.id, "signed in");
    Ok(session)
}

/// # Errors
///
/// Returns an error if the identity service rejects the sign-out.
pub async fn sign_out(identity: &dyn Identity, access_token: &str) -> Result<(), AuthError> {
    identity.sign_out(access_token).await?;
    Ok(())
}

/// Resolve a bearer token to its user; `None` for unknown or expired tokens.
///
/// # Errors
///
/// Returns an error if the lookup itself fails.
pub async fn current_user(identity: &dyn Identity, access_token: &str) -> Result<Option<User>, AuthError> {
    if access_token.is_empty() {
        return Ok(None);
    }
    Ok(identity.user(access_token).await?)
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
