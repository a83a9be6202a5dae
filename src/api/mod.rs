//! REST access to the provisioning server.
//!
//! - [`source`] - the [`RestSource`] seam and [`RemoteError`]
//! - [`http`] - reqwest implementation against a live server
//! - `mock` - in-memory implementation recording every request (tests and
//!   the `mock` feature)
//! - [`client`] - [`ApiClient`], a source plus the session credential
//! - [`auth`] - credentials, [`Session`] and the login probe

mod auth;
mod client;
mod http;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod source;

// Re-export public types and functions
pub use auth::{
    available_bootenvs, describe_status, login, spawn_login, AccessGrant, Credential, Session,
};
pub use client::ApiClient;
pub use http::HttpSource;
#[cfg(any(test, feature = "mock"))]
pub use mock::{MockRoute, MockSource};
pub use source::{ApiRequest, ErrorBody, RemoteError, RestSource};
