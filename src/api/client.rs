//! API client: a [`RestSource`] plus the session's credential.

use super::auth::Session;
use super::source::{ApiRequest, RemoteError, RestSource};
use colored::Colorize;
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;

/// Cheap to clone; clones share the source and the session.
pub struct ApiClient<S> {
    source: Arc<S>,
    session: Arc<Session>,
}

impl<S> Clone for ApiClient<S> {
    fn clone(&self) -> Self {
        ApiClient {
            source: Arc::clone(&self.source),
            session: Arc::clone(&self.session),
        }
    }
}

impl<S: RestSource> ApiClient<S> {
    /// Client with a fresh, credential-less session.
    pub fn new(source: S) -> ApiClient<S> {
        ApiClient::with_session(Arc::new(source), Arc::new(Session::new()))
    }

    pub fn with_session(source: Arc<S>, session: Arc<Session>) -> ApiClient<S> {
        ApiClient { source, session }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    pub async fn get(&self, path: &str) -> Result<Value, RemoteError> {
        self.request(Method::GET, path, None).await
    }

    /// Send with whatever credential the session holds right now.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, RemoteError> {
        let authorization = self.session.authorization();
        self.send_as(method, path, body, authorization).await
    }

    /// Send with an explicit `Authorization` header value.
    pub(crate) async fn send_as(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        authorization: Option<String>,
    ) -> Result<Value, RemoteError> {
        log::debug!("{} {path}", method.as_str().on_blue());
        self.source
            .send(ApiRequest {
                method,
                path: path.to_string(),
                body,
                authorization,
            })
            .await
    }
}
