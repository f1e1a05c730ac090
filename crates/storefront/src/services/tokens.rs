//! Identity tokens.
//!
//! Tokens are HS256 JWTs carrying `{id, email, iat, exp}` with a fixed one
//! hour validity window. Verification is a pure function of the token, the
//! signing key and the current time: there is no session table and no
//! revocation list.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tradepost_core::{Email, UserId};

use crate::models::CurrentUser;

/// How long an issued token stays valid.
pub const TOKEN_TTL: Duration = Duration::hours(1);

/// The only algorithm tokens are signed and accepted with.
const ALGORITHM: Algorithm = Algorithm::HS256;

/// Claims carried by an identity token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub id: UserId,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

/// Why a token was rejected.
///
/// Only logged; clients always see a plain 401.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is malformed: {0}")]
    Malformed(String),

    #[error("token expired")]
    Expired,

    #[error("token signature does not match")]
    BadSignature,

    #[error("token uses a disallowed algorithm")]
    WrongAlgorithm,

    #[error("failed to sign token: {0}")]
    Signing(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::InvalidSignature => Self::BadSignature,
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => Self::WrongAlgorithm,
            ErrorKind::ExpiredSignature => Self::Expired,
            _ => Self::Malformed(e.to_string()),
        }
    }
}

/// Issues and verifies identity tokens with a shared HMAC key.
#[derive(Clone)]
pub struct TokenAuthority {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl fmt::Debug for TokenAuthority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenAuthority")
            .field("algorithm", &ALGORITHM)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl TokenAuthority {
    /// Create an authority from the signing secret.
    #[must_use]
    pub fn new(secret: &SecretString) -> Self {
        let key = secret.expose_secret().as_bytes();

        // Expiry is checked by hand in `verify_at` so that a token is dead
        // exactly at `exp`, with no leeway, against an injectable clock.
        let mut validation = Validation::new(ALGORITHM);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding: EncodingKey::from_secret(key),
            decoding: DecodingKey::from_secret(key),
            validation,
        }
    }

    /// Issue a token for `user` valid for one hour from now.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Signing` if the token cannot be encoded.
    pub fn issue(&self, user: UserId, email: &Email) -> Result<String, TokenError> {
        self.issue_at(user, email, Utc::now())
    }

    /// Issue a token as if the current time were `now`.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Signing` if the token cannot be encoded.
    pub fn issue_at(
        &self,
        user: UserId,
        email: &Email,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            id: user,
            email: email.as_str().to_owned(),
            iat: now.timestamp(),
            exp: (now + TOKEN_TTL).timestamp(),
        };

        encode(&Header::new(ALGORITHM), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify a token against the current time.
    ///
    /// # Errors
    ///
    /// Returns the precise `TokenError` for logging.
    pub fn verify(&self, token: &str) -> Result<CurrentUser, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify a token as if the current time were `now`.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Expired` when `now >= exp`, and the matching
    /// variant for bad signatures, foreign algorithms or garbage input.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<CurrentUser, TokenError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation)?;
        let claims = data.claims;

        if now.timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }

        let email = Email::parse(&claims.email)
            .map_err(|e| TokenError::Malformed(format!("email claim: {e}")))?;

        Ok(CurrentUser {
            id: claims.id,
            email,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    use super::*;

    const SECRET: &str = "hX9#kQ2$vL7@nP4!wR8^tY3&zM6*bC1%";

    fn authority() -> TokenAuthority {
        TokenAuthority::new(&SecretString::from(SECRET))
    }

    fn alice() -> (UserId, Email) {
        (UserId::new(7), Email::parse("alice@example.com").unwrap())
    }

    fn forge(header: &serde_json::Value, claims: &serde_json::Value, sig: &str) -> String {
        let h = URL_SAFE_NO_PAD.encode(header.to_string());
        let c = URL_SAFE_NO_PAD.encode(claims.to_string());
        format!("{h}.{c}.{sig}")
    }

    #[test]
    fn test_round_trip_returns_identity() {
        let (id, email) = alice();
        let tokens = authority();

        let token = tokens.issue(id, &email).unwrap();
        let user = tokens.verify(&token).unwrap();

        assert_eq!(user, CurrentUser { id, email });
    }

    #[test]
    fn test_claims_span_exactly_one_hour() {
        let (id, email) = alice();
        let now = Utc::now();
        let token = authority().issue_at(id, &email, now).unwrap();

        let claims = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(SECRET.as_bytes()),
            &authority().validation,
        )
        .unwrap()
        .claims;

        assert_eq!(claims.exp - claims.iat, 3600);
        assert_eq!(claims.iat, now.timestamp());
    }

    #[test]
    fn test_valid_one_second_before_expiry() {
        let (id, email) = alice();
        let issued = Utc::now();
        let tokens = authority();
        let token = tokens.issue_at(id, &email, issued).unwrap();

        let just_before = issued + TOKEN_TTL - Duration::seconds(1);
        assert!(tokens.verify_at(&token, just_before).is_ok());
    }

    #[test]
    fn test_rejected_at_expiry() {
        let (id, email) = alice();
        let issued = Utc::now();
        let tokens = authority();
        let token = tokens.issue_at(id, &email, issued).unwrap();

        assert_eq!(
            tokens.verify_at(&token, issued + TOKEN_TTL).unwrap_err(),
            TokenError::Expired
        );
    }

    #[test]
    fn test_rejected_after_expiry() {
        let (id, email) = alice();
        let tokens = authority();
        let token = tokens
            .issue_at(id, &email, Utc::now() - Duration::hours(2))
            .unwrap();

        assert_eq!(tokens.verify(&token).unwrap_err(), TokenError::Expired);
    }

    #[test]
    fn test_rejects_token_signed_with_other_key() {
        let (id, email) = alice();
        let other = TokenAuthority::new(&SecretString::from("Zq8!mW3@rT6#yU1$iO9%pA4^sD7&fG2*"));
        let token = other.issue(id, &email).unwrap();

        assert_eq!(
            authority().verify(&token).unwrap_err(),
            TokenError::BadSignature
        );
    }

    #[test]
    fn test_rejects_algorithm_substitution() {
        let (id, email) = alice();
        let now = Utc::now();
        let claims = Claims {
            id,
            email: email.to_string(),
            iat: now.timestamp(),
            exp: (now + TOKEN_TTL).timestamp(),
        };
        // Same key, stronger HMAC: still not the algorithm we accept.
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert_eq!(
            authority().verify(&token).unwrap_err(),
            TokenError::WrongAlgorithm
        );
    }

    #[test]
    fn test_rejects_alg_none() {
        let now = Utc::now().timestamp();
        let token = forge(
            &serde_json::json!({"alg": "none", "typ": "JWT"}),
            &serde_json::json!({"id": 7, "email": "alice@example.com", "iat": now, "exp": now + 3600}),
            "",
        );

        assert!(authority().verify(&token).is_err());
    }

    #[test]
    fn test_rejects_tampered_payload() {
        let (id, email) = alice();
        let tokens = authority();
        let token = tokens.issue(id, &email).unwrap();
        let signature = token.rsplit('.').next().unwrap();

        let now = Utc::now().timestamp();
        let forged = forge(
            &serde_json::json!({"alg": "HS256", "typ": "JWT"}),
            &serde_json::json!({"id": 1, "email": "admin@example.com", "iat": now, "exp": now + 3600}),
            signature,
        );

        assert_eq!(tokens.verify(&forged).unwrap_err(), TokenError::BadSignature);
    }

    #[test]
    fn test_rejects_garbage() {
        let tokens = authority();
        for token in ["", "abc", "a.b", "a.b.c.d", "not.a.jwt"] {
            assert!(
                matches!(tokens.verify(token), Err(TokenError::Malformed(_))),
                "{token:?} should be malformed"
            );
        }
    }

    #[test]
    fn test_debug_redacts_key() {
        let rendered = format!("{:?}", authority());
        assert!(!rendered.contains(SECRET));
    }
}
