// cargo watch -x 'fmt' -x 'test'

//! Client library for the admin API of a DHCP/PXE provisioning server.
//!
//! - [`models`] - range derivation, entity kinds and records
//! - [`api`] - REST access, credentials and the login probe
//! - [`store`] - optimistic record caches per entity kind
//! - [`console`] - all stores sharing one session
//! - [`output`] - terminal rendering

pub mod api;
pub mod config;
pub mod console;
pub mod error;
pub mod models;
pub mod output;
pub mod store;

pub use api::{Credential, HttpSource, RemoteError, RestSource, Session};
#[cfg(any(test, feature = "mock"))]
pub use api::MockSource;
pub use config::Config;
pub use console::Console;
pub use error::{ConsoleError, Result};
pub use models::{derive_range, EntityKind, Record, RecordState};
pub use store::{Collection, Completion, PendingOp, RecordStore};

/// Build a console talking to the server named in `config`.
///
/// Does not log in; see [`Console::login`].
pub fn connect(config: &Config) -> Result<Console<HttpSource>> {
    let source = HttpSource::new(&config.base_url, config.accept_invalid_certs)?;
    log::info!("#connect {}", source.url(""));
    Ok(Console::new(source))
}
