//! Scripted in-memory transport for tests

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};

use super::{ApiClient, ApiRequest, Body, Method, RawResponse, Transport};
use crate::error::ApiError;
use crate::nav::RecordingNavigator;

/// A request as the mock saw it
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub body: Body,
    pub retried: bool,
}

impl Recorded {
    pub fn json(&self) -> Value {
        match &self.body {
            Body::Json(value) => value.clone(),
            _ => Value::Null,
        }
    }

    /// All text values sent under a multipart field name
    pub fn form_values(&self, name: &str) -> Vec<String> {
        match &self.body {
            Body::Multipart(parts) => parts
                .iter()
                .filter(|part| part.name == name)
                .filter_map(|part| part.as_text().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn has_part(&self, name: &str) -> bool {
        matches!(&self.body, Body::Multipart(parts) if parts.iter().any(|p| p.name == name))
    }
}

/// Responses are queued per `(method, path)`; an empty queue answers 404
#[derive(Default)]
pub struct MockTransport {
    scripts: Mutex<HashMap<(Method, String), VecDeque<RawResponse>>>,
    log: Mutex<Vec<Recorded>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, method: Method, path: &str, response: RawResponse) {
        self.scripts
            .lock()
            .unwrap()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(response);
    }

    pub fn calls(&self, method: Method, path: &str) -> usize {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.log.lock().unwrap().clone()
    }

    pub fn last(&self, method: Method, path: &str) -> Option<Recorded> {
        self.requests()
            .into_iter()
            .rev()
            .find(|r| r.method == method && r.path == path)
    }

    pub fn total_calls(&self) -> usize {
        self.log.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: &ApiRequest) -> Result<RawResponse, ApiError> {
        self.log.lock().unwrap().push(Recorded {
            method: request.method,
            path: request.path.clone(),
            body: request.body.clone(),
            retried: request.retried(),
        });

        if let Some(progress) = &request.progress {
            progress(1, 1);
        }

        let next = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&(request.method, request.path.clone()))
            .and_then(VecDeque::pop_front);

        Ok(next.unwrap_or_else(|| json_response(404, json!({"detail": "Not found."}))))
    }
}

pub fn json_response(status: u16, body: Value) -> RawResponse {
    RawResponse {
        status,
        retry_after: None,
        body: serde_json::to_vec(&body).unwrap(),
    }
}

pub fn ok(body: Value) -> RawResponse {
    json_response(200, body)
}

/// Client over a fresh mock plus the navigator it reports to
pub fn client() -> (ApiClient, Arc<MockTransport>, Arc<RecordingNavigator>) {
    let mock = Arc::new(MockTransport::new());
    let nav = Arc::new(RecordingNavigator::new());
    (ApiClient::new(mock.clone(), nav.clone()), mock, nav)
}
