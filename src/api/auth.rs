//! Credentials, the process-wide session and the login probe.
//!
//! The session holds the one credential every request is sent with. It is
//! changed only through [`Session::set_credential`] and
//! [`Session::clear_credential`]; each change starts a new generation, and a
//! probe only applies its outcome if its generation is still current.

use super::client::ApiClient;
use super::source::{RemoteError, RestSource};
use crate::config::TOKEN_TTL_SECS;
use crate::error::{ConsoleError, Result};
use crate::models::{decode, path_segment, EntityKind};
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::task::{AbortHandle, JoinHandle};

/// What the user typed into the login box.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    Bearer(String),
    Basic { user: String, password: String },
}

impl Credential {
    /// `user:password` when the input holds a colon, a token otherwise.
    ///
    /// Tokens are base64 and never contain a colon.
    pub fn parse(input: &str) -> Credential {
        match input.split_once(':') {
            Some((user, password)) => Credential::Basic {
                user: user.to_string(),
                password: password.to_string(),
            },
            None => Credential::Bearer(input.to_string()),
        }
    }

    /// Value for the `Authorization` header.
    pub fn header_value(&self) -> String {
        match self {
            Credential::Bearer(token) => format!("Bearer {token}"),
            Credential::Basic { user, password } => format!(
                "Basic {}",
                general_purpose::STANDARD.encode(format!("{user}:{password}"))
            ),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Bearer(_) => write!(f, "Bearer(***)"),
            Credential::Basic { user, .. } => write!(f, "Basic({user}:***)"),
        }
    }
}

/// Human label for the status of the last probe.
pub fn describe_status(code: u16) -> String {
    match code {
        0 => "API Unreachable".to_string(),
        200 => "Granted".to_string(),
        401 => "No Credentials/Token".to_string(),
        403 => "Invalid Credentials/Token".to_string(),
        other => format!("Code {other}"),
    }
}

/// Result of a successful login.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessGrant {
    /// Names of boot environments marked available.
    pub available_bootenvs: Vec<String>,
    /// Token obtained by exchanging a password, if any.
    pub token: Option<String>,
}

#[derive(Deserialize)]
struct UserToken {
    #[serde(rename = "Token")]
    token: String,
}

#[derive(Default)]
struct SessionState {
    credential: Option<Credential>,
    stored_token: Option<String>,
    access: bool,
    available_bootenvs: Vec<String>,
    authorized_at: Option<DateTime<Utc>>,
    last_status: Option<u16>,
}

/// Process-wide credential and access state.
#[derive(Default)]
pub struct Session {
    state: RwLock<SessionState>,
    generation: AtomicU64,
    probe: Mutex<Option<AbortHandle>>,
}

impl Session {
    pub fn new() -> Session {
        Session::default()
    }

    /// Use `credential` for every following request. Returns the new generation.
    pub fn set_credential(&self, credential: Credential) -> u64 {
        let mut state = self.state.write();
        if let Credential::Bearer(token) = &credential {
            state.stored_token = Some(token.clone());
        }
        log::info!("credential set: {credential:?}");
        state.credential = Some(credential);
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Drop the credential and stored token and revoke access.
    pub fn clear_credential(&self) -> u64 {
        let mut state = self.state.write();
        state.credential = None;
        state.stored_token = None;
        state.access = false;
        state.available_bootenvs.clear();
        log::info!("credential cleared");
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Current `Authorization` header value.
    pub fn authorization(&self) -> Option<String> {
        self.state.read().credential.as_ref().map(Credential::header_value)
    }

    pub fn credential(&self) -> Option<Credential> {
        self.state.read().credential.clone()
    }

    /// Token kept for the next start (bearer input or exchanged password).
    pub fn stored_token(&self) -> Option<String> {
        self.state.read().stored_token.clone()
    }

    pub fn has_access(&self) -> bool {
        self.state.read().access
    }

    pub fn available_bootenvs(&self) -> Vec<String> {
        self.state.read().available_bootenvs.clone()
    }

    pub fn set_available_bootenvs(&self, names: Vec<String>) {
        self.state.write().available_bootenvs = names;
    }

    pub fn authorized_at(&self) -> Option<DateTime<Utc>> {
        self.state.read().authorized_at
    }

    pub fn last_status(&self) -> Option<u16> {
        self.state.read().last_status
    }

    /// Remember the task of the newest probe, aborting the one it replaces.
    fn replace_probe(&self, handle: AbortHandle) {
        if let Some(previous) = self.probe.lock().replace(handle) {
            if !previous.is_finished() {
                log::debug!("aborting superseded login probe");
            }
            previous.abort();
        }
    }

    /// Apply a probe outcome if no newer credential was set meanwhile.
    fn settle(
        &self,
        generation: u64,
        outcome: Result<AccessGrant>,
    ) -> Result<AccessGrant> {
        let mut state = self.state.write();
        if self.generation.load(Ordering::SeqCst) != generation {
            log::debug!("dropping outcome of stale login probe (generation {generation})");
            return Err(ConsoleError::Superseded);
        }
        match outcome {
            Ok(grant) => {
                if let Some(token) = &grant.token {
                    state.credential = Some(Credential::Bearer(token.clone()));
                    state.stored_token = Some(token.clone());
                }
                state.access = true;
                state.available_bootenvs = grant.available_bootenvs.clone();
                state.authorized_at = Some(Utc::now());
                state.last_status = Some(200);
                log::info!(
                    "access granted, {} boot environments available",
                    grant.available_bootenvs.len()
                );
                Ok(grant)
            }
            Err(e) => {
                state.credential = None;
                state.stored_token = None;
                state.access = false;
                state.available_bootenvs.clear();
                if let ConsoleError::Auth(remote) = &e {
                    state.last_status = Some(remote.status);
                    log::warn!("access denied: {} {remote}", describe_status(remote.status));
                } else {
                    log::warn!("access denied: {e}");
                }
                Err(e)
            }
        }
    }
}

/// Names of boot environments with `Available == true`.
pub fn available_bootenvs(bootenvs: &Value) -> Vec<String> {
    bootenvs
        .as_array()
        .map(|list| {
            list.iter()
                .filter(|b| b.get("Available").and_then(Value::as_bool) == Some(true))
                .filter_map(|b| b.get("Name").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Set `credential` and probe it, applying the outcome to the session.
pub async fn login<S: RestSource>(client: &ApiClient<S>, credential: Credential) -> Result<AccessGrant> {
    let generation = client.session().set_credential(credential.clone());
    run_probe(client, credential, generation).await
}

/// Like [`login`] on a background task; a previous outstanding probe is aborted.
pub fn spawn_login<S>(client: &ApiClient<S>, credential: Credential) -> JoinHandle<Result<AccessGrant>>
where
    S: RestSource + 'static,
{
    let generation = client.session().set_credential(credential.clone());
    let task_client = client.clone();
    let handle =
        tokio::spawn(async move { run_probe(&task_client, credential, generation).await });
    client.session().replace_probe(handle.abort_handle());
    handle
}

async fn run_probe<S: RestSource>(
    client: &ApiClient<S>,
    credential: Credential,
    generation: u64,
) -> Result<AccessGrant> {
    let outcome = probe(client, &credential).await;
    client.session().settle(generation, outcome)
}

/// Fetch the boot environments with `credential`, then for `user:password`
/// exchange it for a token.
async fn probe<S: RestSource>(
    client: &ApiClient<S>,
    credential: &Credential,
) -> Result<AccessGrant> {
    let header = credential.header_value();
    let bootenvs = client
        .send_as(
            Method::GET,
            EntityKind::BootEnv.collection_path(),
            None,
            Some(header.clone()),
        )
        .await
        .map_err(ConsoleError::Auth)?;
    let available = available_bootenvs(&bootenvs);

    let token = match credential {
        Credential::Bearer(_) => None,
        Credential::Basic { user, .. } => {
            let path = format!("/users/{}/token?ttl={TOKEN_TTL_SECS}", path_segment(user)?);
            let body = client
                .send_as(Method::GET, &path, None, Some(header))
                .await
                .map_err(ConsoleError::Auth)?;
            let token: UserToken = decode(body)
                .map_err(|e| ConsoleError::Auth(RemoteError::malformed(200, &e)))?;
            Some(token.token)
        }
    };

    Ok(AccessGrant {
        available_bootenvs: available,
        token,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{MockRoute, MockSource};
    use serde_json::json;
    use std::time::Duration;

    const BASIC_ADMIN: &str = "Basic YWRtaW46c2VjcmV0";

    fn bootenvs() -> Value {
        json!([
            {"Name": "sledgehammer", "Available": true},
            {"Name": "centos-7", "Available": false},
            {"Name": "local", "Available": true}
        ])
    }

    #[test]
    fn test_credential_parse_and_header() {
        assert_eq!(
            Credential::parse("admin:secret").header_value(),
            BASIC_ADMIN
        );
        assert_eq!(
            Credential::parse("ops:pa:ss").header_value(),
            "Basic b3BzOnBhOnNz"
        );
        assert_eq!(Credential::parse("abc123").header_value(), "Bearer abc123");
        assert_eq!(
            format!("{:?}", Credential::parse("admin:secret")),
            "Basic(admin:***)"
        );
    }

    #[test]
    fn test_describe_status() {
        assert_eq!(describe_status(0), "API Unreachable");
        assert_eq!(describe_status(403), "Invalid Credentials/Token");
        assert_eq!(describe_status(418), "Code 418");
    }

    #[tokio::test]
    async fn test_login_with_token() {
        let client = ApiClient::new(MockSource::new());
        client.source().route(
            MockRoute::ok(Method::GET, "/bootenvs", bootenvs()).when_authorized("Bearer tok"),
        );

        let grant = login(&client, Credential::parse("tok")).await.unwrap();
        assert_eq!(grant.available_bootenvs, vec!["sledgehammer", "local"]);
        assert_eq!(grant.token, None);

        let session = client.session();
        assert!(session.has_access());
        assert_eq!(session.authorization().as_deref(), Some("Bearer tok"));
        assert_eq!(session.stored_token().as_deref(), Some("tok"));
        assert_eq!(session.last_status(), Some(200));
        assert!(session.authorized_at().is_some());
    }

    #[tokio::test]
    async fn test_login_with_password_exchanges_token() {
        let client = ApiClient::new(MockSource::new());
        let mock = client.source();
        mock.route(MockRoute::ok(Method::GET, "/bootenvs", bootenvs()).when_authorized(BASIC_ADMIN));
        mock.route(
            MockRoute::ok(Method::GET, "/users/admin/token?ttl=28800", json!({"Token": "jwt-1"}))
                .when_authorized(BASIC_ADMIN),
        );

        let grant = login(&client, Credential::parse("admin:secret")).await.unwrap();
        assert_eq!(grant.token.as_deref(), Some("jwt-1"));

        let session = client.session();
        assert_eq!(session.authorization().as_deref(), Some("Bearer jwt-1"));
        assert_eq!(session.stored_token().as_deref(), Some("jwt-1"));
        assert_eq!(session.available_bootenvs(), vec!["sledgehammer", "local"]);
    }

    #[tokio::test]
    async fn test_failed_login_clears_credential() {
        let client = ApiClient::new(MockSource::new());
        client
            .source()
            .fail(Method::GET, "/bootenvs", RemoteError::status_only(403));

        let err = login(&client, Credential::parse("stale")).await.unwrap_err();
        assert!(matches!(err, ConsoleError::Auth(RemoteError { status: 403, .. })));

        let session = client.session();
        assert!(!session.has_access());
        assert_eq!(session.authorization(), None);
        assert_eq!(session.stored_token(), None);
        assert_eq!(session.last_status(), Some(403));
    }

    #[tokio::test]
    async fn test_failed_token_exchange_denies_access() {
        let client = ApiClient::new(MockSource::new());
        let mock = client.source();
        mock.respond(Method::GET, "/bootenvs", bootenvs());
        mock.fail(
            Method::GET,
            "/users/admin/token?ttl=28800",
            RemoteError::new(403, &["not allowed"]),
        );

        let err = login(&client, Credential::parse("admin:secret")).await.unwrap_err();
        assert_eq!(err.to_string(), "authentication failed: (403): not allowed");
        assert!(!client.session().has_access());
        assert_eq!(client.session().credential(), None);
    }

    #[tokio::test]
    async fn test_user_name_is_one_path_segment() {
        let client = ApiClient::new(MockSource::new());
        let mock = client.source();
        mock.respond(Method::GET, "/bootenvs", bootenvs());
        mock.respond(Method::GET, "/users/ops%2Fteam%23a/token?ttl=28800", json!({"Token": "t"}));

        let grant = login(&client, Credential::parse("ops/team#a:pw")).await.unwrap();
        assert_eq!(grant.token.as_deref(), Some("t"));

        let err = login(&client, Credential::parse("..:pw")).await.unwrap_err();
        assert!(matches!(err, ConsoleError::InvalidInput(_)));
        assert_eq!(client.session().credential(), None);
        assert_eq!(mock.count(&Method::GET, "/users/../token?ttl=28800"), 0);
    }

    #[tokio::test]
    async fn test_only_newest_login_applies() {
        let client = ApiClient::new(MockSource::new());
        let mock = client.source();
        mock.route(
            MockRoute::err(Method::GET, "/bootenvs", RemoteError::status_only(403))
                .when_authorized("Bearer old")
                .delayed(Duration::from_millis(100)),
        );
        mock.route(MockRoute::ok(Method::GET, "/bootenvs", bootenvs()).when_authorized("Bearer new"));

        let (old, new) = tokio::join!(
            login(&client, Credential::parse("old")),
            async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                login(&client, Credential::parse("new")).await
            }
        );
        assert!(matches!(old, Err(ConsoleError::Superseded)));
        assert!(new.is_ok());

        // the late 403 for the old token did not revoke access
        let session = client.session();
        assert!(session.has_access());
        assert_eq!(session.authorization().as_deref(), Some("Bearer new"));
    }

    #[tokio::test]
    async fn test_spawn_login_aborts_previous_probe() {
        let client = ApiClient::new(MockSource::new());
        let mock = client.source();
        mock.route(
            MockRoute::ok(Method::GET, "/bootenvs", json!([]))
                .when_authorized("Bearer slow")
                .delayed(Duration::from_secs(5)),
        );
        mock.route(MockRoute::ok(Method::GET, "/bootenvs", bootenvs()).when_authorized("Bearer fast"));

        let first = spawn_login(&client, Credential::parse("slow"));
        let second = spawn_login(&client, Credential::parse("fast"));

        let grant = second.await.unwrap().unwrap();
        assert_eq!(grant.available_bootenvs.len(), 2);
        assert!(first.await.unwrap_err().is_cancelled());
        assert_eq!(client.session().authorization().as_deref(), Some("Bearer fast"));
    }

    #[test]
    fn test_clear_credential_bumps_generation() {
        let session = Session::new();
        let g1 = session.set_credential(Credential::parse("a"));
        let g2 = session.clear_credential();
        assert!(g2 > g1);
        assert_eq!(session.generation(), g2);
        assert_eq!(session.authorization(), None);
    }
}
