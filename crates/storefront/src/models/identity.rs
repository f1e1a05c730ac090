//! Verified caller identity.

use serde::{Deserialize, Serialize};

use tradepost_core::{Email, UserId};

/// Identity attached to a request after its bearer token verified.
///
/// Handlers read the acting user from here and never from request bodies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
}
