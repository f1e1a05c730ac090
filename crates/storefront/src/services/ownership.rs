//! Ownership gate shared by every user-owned resource.

use thiserror::Error;

use tradepost_core::UserId;

use crate::models::CurrentUser;

/// A resource that belongs to exactly one user.
pub trait Owned {
    /// Human-readable resource kind, used in messages.
    const KIND: &'static str;

    /// The user allowed to mutate this resource.
    fn owner(&self) -> UserId;
}

/// The caller is authenticated but does not own the resource.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("user {actor} does not own {kind} owned by {owner}")]
pub struct NotOwner {
    pub kind: &'static str,
    pub owner: UserId,
    pub actor: UserId,
}

/// Allow the mutation only if `actor` owns `resource`.
///
/// The identity must come from the verified token, never from a request body.
///
/// # Errors
///
/// Returns `NotOwner` when the ids differ.
pub fn authorize_owner<R: Owned>(resource: &R, actor: &CurrentUser) -> Result<(), NotOwner> {
    let owner = resource.owner();
    if owner == actor.id {
        Ok(())
    } else {
        Err(NotOwner {
            kind: R::KIND,
            owner,
            actor: actor.id,
        })
    }
}
