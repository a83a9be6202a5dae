//! reqwest-backed [`RestSource`].

use super::source::{ApiRequest, RemoteError, RestSource};
use crate::config;
use crate::error::{ConsoleError, Result};
use async_trait::async_trait;
use colored::Colorize;
use reqwest::header::AUTHORIZATION;
use serde_json::Value;

/// Talks to a live server at `base_url` + [`config::API_PREFIX`].
pub struct HttpSource {
    base_url: String,
    http: reqwest::Client,
}

impl HttpSource {
    pub fn new(base_url: &str, accept_invalid_certs: bool) -> Result<HttpSource> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()
            .map_err(|e| ConsoleError::Config(format!("building HTTP client: {e}")))?;
        Ok(HttpSource {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, config::API_PREFIX, path)
    }
}

#[async_trait]
impl RestSource for HttpSource {
    async fn send(&self, request: ApiRequest) -> std::result::Result<Value, RemoteError> {
        let url = self.url(&request.path);
        let mut builder = self.http.request(request.method.clone(), &url);
        if let Some(auth) = &request.authorization {
            builder = builder.header(AUTHORIZATION, auth);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            log::warn!(
                "{failed} {method} {url}: {e}",
                failed = "unreachable".on_red(),
                method = request.method
            );
            RemoteError::unreachable()
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            log::warn!("reading body of {} {url} failed: {e}", request.method);
            RemoteError::status_only(status.as_u16())
        })?;
        log::trace!("{} {url} => {status} len={}", request.method, text.len());

        if !status.is_success() {
            log::warn!(
                "{failed} {method} {url} status={status}",
                failed = "failed".on_red(),
                method = request.method
            );
            return Err(RemoteError::from_body(status.as_u16(), &text));
        }
        decode_body(status.as_u16(), &text)
    }
}

/// Parse a success body; empty bodies (e.g. some DELETE answers) are `null`.
fn decode_body(status: u16, text: &str) -> std::result::Result<Value, RemoteError> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    let mut deserializer = serde_json::Deserializer::from_str(text);
    serde_path_to_error::deserialize(&mut deserializer).map_err(|e| {
        log::error!("OUTPUT START:\n\n{text}\n\nOUTPUT END\n");
        RemoteError::malformed(status, &format!("path={} error={}", e.path(), e.inner()))
    })
}
