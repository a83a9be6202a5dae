//! Configuration constants and environment settings.

use crate::api::Credential;
use crate::error::{ConsoleError, Result};
use regex::Regex;
use std::sync::OnceLock;

/// Path prefix of every REST endpoint.
pub const API_PREFIX: &str = "/api/v3";

/// Lifetime requested when exchanging a password for a token (8 hours).
pub const TOKEN_TTL_SECS: u64 = 8 * 60 * 60;

/// Server address used when `PROVISION_URL` is unset.
pub const DEFAULT_URL: &str = "https://127.0.0.1:8092";

/// `scheme://host[:port]`, nothing after the authority.
static BASE_URL_REGEX: OnceLock<Regex> = OnceLock::new();

fn base_url_regex() -> &'static Regex {
    BASE_URL_REGEX.get_or_init(|| {
        Regex::new(r"^https?://[A-Za-z0-9.\-]+(:[0-9]{1,5})?$").expect("Invalid Regex")
    })
}

/// Settings read from the environment (and `.env` via dotenv in `main.rs`).
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Server base URL without trailing slash, e.g. `https://10.0.0.1:8092`.
    pub base_url: String,
    pub credential: Option<Credential>,
    /// Accept self-signed server certificates.
    pub accept_invalid_certs: bool,
}

impl Config {
    /// Read the configuration from process environment variables.
    pub fn from_env() -> Result<Config> {
        Config::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from any variable lookup.
    ///
    /// `PROVISION_TOKEN` wins over `PROVISION_USER` / `PROVISION_PASSWORD`.
    pub fn from_lookup<F>(lookup: F) -> Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup("PROVISION_URL")
            .map(|u| u.trim().trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_URL.to_string());
        if !base_url_regex().is_match(&base_url) {
            return Err(ConsoleError::Config(format!(
                "PROVISION_URL must look like http://host[:port] or https://host[:port], got '{base_url}'"
            )));
        }

        let token = lookup("PROVISION_TOKEN").filter(|t| !t.is_empty());
        let user = lookup("PROVISION_USER").filter(|u| !u.is_empty());
        let password = lookup("PROVISION_PASSWORD");
        let credential = match (token, user, password) {
            (Some(token), _, _) => Some(Credential::Bearer(token)),
            (None, Some(user), Some(password)) => Some(Credential::Basic { user, password }),
            (None, Some(user), None) => {
                return Err(ConsoleError::Config(format!(
                    "PROVISION_USER={user} set without PROVISION_PASSWORD"
                )))
            }
            (None, None, _) => None,
        };

        let accept_invalid_certs = lookup("PROVISION_INSECURE")
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        log::debug!("config base_url={base_url} insecure={accept_invalid_certs}");
        Ok(Config {
            base_url,
            credential,
            accept_invalid_certs,
        })
    }
}
