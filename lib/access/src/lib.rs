//! Identity resolution and session lifecycle for authgate.
//!
//! This crate provides:
//! - User records keyed by email across providers (`User`)
//! - Device-scoped login sessions (`Session`, `SessionMetadata`)
//! - The closed set of identity providers (`Provider`) and the normalized
//!   profile shape they produce (`ProviderProfile`)
//! - Store traits for the relational store (`UserStore`, `SessionStore`)
//!   and an in-memory implementation (`memory::InMemoryStore`)
//! - `IdentityResolver` and `SessionManager`, the lookup-or-create flows
//! - The error taxonomy surfaced to the HTTP boundary (`ErrorKind`)
//!
//! # Identity Model
//!
//! Email is the cross-provider identity key. A person who signs in through
//! Google and later through GitHub with the same address lands on one account,
//! and the first provider's profile data is never overwritten.
//!
//! # Example
//!
//! ```
//! use authgate_access::{Provider, ProviderProfile, User};
//!
//! let provider = Provider::parse("google").expect("supported provider");
//! let profile = ProviderProfile::new("10769150350006150715113082367", "bob@x.com")
//!     .with_name(Some("Bob".to_string()));
//!
//! let user = User::from_profile(&profile, provider);
//! assert_eq!(user.email(), "bob@x.com");
//! assert!(user.is_email_verified());
//! ```

pub mod auth;
pub mod error;
pub mod geo;
pub mod memory;
pub mod provider;
pub mod resolver;
pub mod session;
pub mod sessions;
pub mod store;
pub mod user;

// Re-export main types at crate root
pub use auth::AuthenticatedUser;
pub use error::{AuthenticationError, ErrorKind, GeoError, StoreError};
pub use geo::{Geolocator, UNKNOWN_LOCATION, format_location};
pub use provider::{Provider, ProviderProfile};
pub use resolver::IdentityResolver;
pub use session::{Session, SessionMetadata};
pub use sessions::SessionManager;
pub use store::{SessionStore, UserStore};
pub use user::User;
