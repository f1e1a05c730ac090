//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::db::Repositories;
use crate::services::tokens::TokenAuthority;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Holds the storage backends and the token
/// authority; nothing in here changes after startup.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    repos: Repositories,
    tokens: TokenAuthority,
}

impl AppState {
    /// Create state backed by `PostgreSQL`.
    #[must_use]
    pub fn new(config: &StorefrontConfig, pool: PgPool) -> Self {
        Self::from_parts(
            Repositories::postgres(pool),
            TokenAuthority::new(&config.jwt_secret),
        )
    }

    /// Create state from already-built parts (tests, alternative backends).
    #[must_use]
    pub fn from_parts(repos: Repositories, tokens: TokenAuthority) -> Self {
        Self {
            inner: Arc::new(AppStateInner { repos, tokens }),
        }
    }

    /// Storage backends.
    #[must_use]
    pub fn repos(&self) -> &Repositories {
        &self.inner.repos
    }

    /// Identity token issuer and verifier.
    #[must_use]
    pub fn tokens(&self) -> &TokenAuthority {
        &self.inner.tokens
    }
}
