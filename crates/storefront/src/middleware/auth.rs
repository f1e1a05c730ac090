//! Bearer token guard.
//!
//! [`RequireAuth`] is the only way a handler learns who is calling. It reads
//! `Authorization: Bearer <token>`, verifies the token with the state's
//! [`TokenAuthority`](crate::services::tokens::TokenAuthority) and attaches
//! the resulting [`CurrentUser`] to the request extensions. Anything else
//! ends the request with `401` before the handler runs.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::debug;

use crate::error::{AppError, set_sentry_user};
use crate::models::CurrentUser;
use crate::state::AppState;

/// Extractor that requires a valid identity token.
///
/// # Example
///
/// ```rust,ignore
/// async fn profile(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Welcome {}", user.email)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Pull the token out of an `Authorization: Bearer` header value.
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

impl<S> FromRequestParts<S> for RequireAuth
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Already verified by an earlier extractor on this request.
        if let Some(user) = parts.extensions.get::<CurrentUser>() {
            return Ok(Self(user.clone()));
        }

        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AppError::Unauthorized)?;

        let token = header
            .to_str()
            .ok()
            .and_then(bearer_token)
            .ok_or_else(|| {
                debug!("authorization header is not a bearer token");
                AppError::Unauthorized
            })?;

        let state = AppState::from_ref(state);
        let user = state.tokens().verify(token).map_err(|e| {
            debug!(reason = %e, "rejected identity token");
            AppError::Unauthorized
        })?;

        set_sentry_user(&user);
        parts.extensions.insert(user.clone());

        Ok(Self(user))
    }
}
