//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `tokens` - Identity token issuance and verification
//! - `auth` - Password sign-up and sign-in
//! - `ownership` - Owner-only mutation gate
//! - `purchases` - Stock reservation and purchase recording
//! - `reviews` - Review creation, listing, edit and delete

pub mod auth;
pub mod ownership;
pub mod purchases;
pub mod reviews;
pub mod tokens;
