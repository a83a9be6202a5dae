//! In-memory [`RestSource`] for tests and offline runs.
//!
//! Routes are matched newest first, so a later route overrides an earlier
//! one for the same method and path. Every request is recorded, including
//! its `Authorization` header.

use super::source::{ApiRequest, RemoteError, RestSource};
use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Method;
use serde_json::Value;
use std::time::Duration;

/// Canned answer for one method and path.
#[derive(Debug, Clone)]
pub struct MockRoute {
    method: Method,
    path: String,
    authorization: Option<String>,
    delay: Option<Duration>,
    response: Result<Value, RemoteError>,
}

impl MockRoute {
    pub fn ok(method: Method, path: &str, body: Value) -> MockRoute {
        MockRoute {
            method,
            path: path.to_string(),
            authorization: None,
            delay: None,
            response: Ok(body),
        }
    }

    pub fn err(method: Method, path: &str, error: RemoteError) -> MockRoute {
        MockRoute {
            response: Err(error),
            ..MockRoute::ok(method, path, Value::Null)
        }
    }

    /// Only match requests carrying exactly this `Authorization` value.
    pub fn when_authorized(mut self, header: &str) -> MockRoute {
        self.authorization = Some(header.to_string());
        self
    }

    /// Answer after `delay`.
    pub fn delayed(mut self, delay: Duration) -> MockRoute {
        self.delay = Some(delay);
        self
    }

    fn matches(&self, request: &ApiRequest) -> bool {
        self.method == request.method
            && self.path == request.path
            && match &self.authorization {
                Some(expected) => request.authorization.as_deref() == Some(expected.as_str()),
                None => true,
            }
    }
}

#[derive(Default)]
pub struct MockSource {
    routes: Mutex<Vec<MockRoute>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl MockSource {
    pub fn new() -> MockSource {
        MockSource::default()
    }

    pub fn route(&self, route: MockRoute) {
        self.routes.lock().push(route);
    }

    pub fn respond(&self, method: Method, path: &str, body: Value) {
        self.route(MockRoute::ok(method, path, body));
    }

    pub fn fail(&self, method: Method, path: &str, error: RemoteError) {
        self.route(MockRoute::err(method, path, error));
    }

    /// Every request received so far, oldest first.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().clone()
    }

    /// Number of requests received for `method` and `path`.
    pub fn count(&self, method: &Method, path: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| &r.method == method && r.path == path)
            .count()
    }

    pub fn clear_requests(&self) {
        self.requests.lock().clear();
    }
}

#[async_trait]
impl RestSource for MockSource {
    async fn send(&self, request: ApiRequest) -> Result<Value, RemoteError> {
        self.requests.lock().push(request.clone());
        let matched = {
            let routes = self.routes.lock();
            routes
                .iter()
                .rev()
                .find(|r| r.matches(&request))
                .map(|r| (r.delay, r.response.clone()))
        };
        match matched {
            Some((delay, response)) => {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                response
            }
            None => {
                log::debug!("mock has no route for {} {}", request.method, request.path);
                Err(RemoteError::new(
                    404,
                    &[&format!("no route for {} {}", request.method, request.path)],
                ))
            }
        }
    }
}
