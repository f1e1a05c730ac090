//! Account route handlers: sign-up, sign-in, profile, logout.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, instrument, warn};

use tradepost_core::UserId;

use crate::error::Result;
use crate::extract::ApiJson;
use crate::middleware::RequireAuth;
use crate::services::auth::{AuthError, AuthService};
use crate::state::AppState;

/// Sign-up request body.
#[derive(Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Sign-up response body.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupResponse {
    pub message: String,
    pub user_id: UserId,
}

/// Sign-in request body.
#[derive(Deserialize)]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

/// Sign-in response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct SigninResponse {
    pub message: String,
    pub token: String,
}

/// Register a new account.
#[instrument(skip_all)]
pub async fn signup(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>)> {
    let auth = AuthService::new(&state.repos().users, state.tokens());
    let user = auth
        .signup(&body.username, &body.email, &body.password)
        .await?;

    info!(user = %user.id, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            message: "User registered successfully".to_string(),
            user_id: user.id,
        }),
    ))
}

/// Exchange email and password for an identity token.
#[instrument(skip_all)]
pub async fn signin(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<SigninRequest>,
) -> Result<Json<SigninResponse>> {
    let auth = AuthService::new(&state.repos().users, state.tokens());

    let (user, token) = match auth.signin(&body.email, &body.password).await {
        Ok(ok) => ok,
        Err(e @ (AuthError::UserNotFound | AuthError::InvalidCredentials)) => {
            // Operators see which one; clients get the same 401 either way.
            warn!(reason = %e, "sign-in rejected");
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    };

    info!(user = %user.id, "user signed in");

    Ok(Json(SigninResponse {
        message: "Sign-in successful".to_string(),
        token,
    }))
}

/// Greet the caller named by the token.
pub async fn profile(RequireAuth(user): RequireAuth) -> Json<Value> {
    Json(json!({ "message": format!("Welcome {}", user.email) }))
}

/// Acknowledge a logout.
///
/// Tokens are not revocable; the client discards its copy and the token
/// dies at its expiry.
pub async fn logout(RequireAuth(user): RequireAuth) -> Json<Value> {
    info!(user = %user.id, "user logged out");
    Json(json!({ "message": "Logged out successfully" }))
}
