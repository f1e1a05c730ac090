//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use tradepost_core::{Email, UserId};

/// A registered shopper.
///
/// The password hash is deliberately absent; it only leaves the credential
/// store through `CredentialStore::get_password_hash`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Display name.
    pub username: String,
    /// Login email (unique, normalized).
    pub email: Email,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}
