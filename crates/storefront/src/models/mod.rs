//! Domain models for the storefront.
//!
//! These types represent validated domain objects separate from database
//! row types. Repositories convert rows into these after validation.

pub mod identity;
pub mod product;
pub mod purchase;
pub mod review;
pub mod user;

pub use identity::CurrentUser;
pub use product::{NewProduct, Product, StockFilter};
pub use purchase::Purchase;
pub use review::{NewReview, Review, ReviewPatch, ReviewWithAuthor};
pub use user::User;
