//! Authentication module
//!
//! Supports: static Bearer (dev mode) and the OAuth2 refresh-token flow.
//!
//! The `Authenticator` applies credentials to outgoing requests and manages
//! the cached access token. Refreshed tokens can be written back to the
//! config file so the next run starts from the rotated credentials.

mod authenticator;
mod types;

pub use authenticator::Authenticator;
pub use types::{AuthConfig, CachedToken};
