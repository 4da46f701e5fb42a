//! Backend API client
//!
//! Every call goes through [`ApiClient::send`], which owns the session
//! rules: a 401 triggers one token refresh and one replay, a 429 sends the
//! user to the throttle screen. Endpoint groups live in submodules as
//! `impl ApiClient` blocks.

pub mod auth;
pub mod channels;
pub mod chat;
pub mod cookies;
pub mod http;
pub mod media;
pub mod posts;

#[cfg(test)]
pub(crate) mod mock;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::nav::{Navigator, Route};

pub use cookies::CookieJar;
pub use http::HttpTransport;

/// Refresh endpoint; rotates the access cookie using the refresh cookie
pub const REFRESH_PATH: &str = "/auth/token/refresh/";

/// Upload progress callback: `(bytes_sent, bytes_total)`
pub type ProgressFn = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// HTTP verbs the backend uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One multipart field
#[derive(Debug, Clone)]
pub struct FormPart {
    pub name: String,
    pub value: PartValue,
}

#[derive(Clone)]
pub enum PartValue {
    Text(String),
    /// File bytes are shared so a replay does not copy them
    File {
        file_name: String,
        mime: String,
        bytes: Arc<Vec<u8>>,
    },
}

impl fmt::Debug for PartValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::File {
                file_name, bytes, ..
            } => write!(f, "File({file_name}, {} bytes)", bytes.len()),
        }
    }
}

impl FormPart {
    pub fn text(name: &str, value: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            value: PartValue::Text(value.into()),
        }
    }

    pub fn file(name: &str, file_name: &str, mime: &str, bytes: Arc<Vec<u8>>) -> Self {
        Self {
            name: name.to_string(),
            value: PartValue::File {
                file_name: file_name.to_string(),
                mime: mime.to_string(),
                bytes,
            },
        }
    }

    /// Text value, if this is a text field
    pub fn as_text(&self) -> Option<&str> {
        match &self.value {
            PartValue::Text(text) => Some(text),
            PartValue::File { .. } => None,
        }
    }
}

/// Request body
#[derive(Debug, Clone, Default)]
pub enum Body {
    #[default]
    Empty,
    Json(Value),
    Multipart(Vec<FormPart>),
}

/// A request that can be sent again unchanged after a token refresh
#[derive(Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Body,
    /// Overrides the transport's default timeout
    pub timeout: Option<Duration>,
    /// Endpoints that work without a session; a 401 is not a refresh cue
    pub anonymous: bool,
    pub progress: Option<ProgressFn>,
    retried: bool,
}

impl fmt::Debug for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiRequest")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("body", &self.body)
            .field("timeout", &self.timeout)
            .field("anonymous", &self.anonymous)
            .field("retried", &self.retried)
            .finish_non_exhaustive()
    }
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: Body::Empty,
            timeout: None,
            anonymous: false,
            progress: None,
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    /// Attach a JSON body
    pub fn json<B: Serialize>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body).map_err(|e| ApiError::Decode(e.to_string()))?;
        self.body = Body::Json(value);
        Ok(self)
    }

    pub fn multipart(mut self, parts: Vec<FormPart>) -> Self {
        self.body = Body::Multipart(parts);
        self
    }

    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub const fn anonymous(mut self) -> Self {
        self.anonymous = true;
        self
    }

    pub fn on_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Whether this request has already been replayed after a refresh
    pub const fn retried(&self) -> bool {
        self.retried
    }
}

/// What the transport hands back; status handling is the client's job
#[derive(Debug, Clone, Default)]
pub struct RawResponse {
    pub status: u16,
    /// Parsed `Retry-After` seconds
    pub retry_after: Option<u64>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Sends one request over the wire, no retries, no status interpretation
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: &ApiRequest) -> Result<RawResponse, ApiError>;
}

/// Session-aware client shared by every view
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    navigator: Arc<dyn Navigator>,
    chat_timeout: Duration,
}

impl ApiClient {
    /// Default timeout for chat messages, which wait on the model
    pub const CHAT_TIMEOUT: Duration = Duration::from_secs(60);

    pub fn new(transport: Arc<dyn Transport>, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            transport,
            navigator,
            chat_timeout: Self::CHAT_TIMEOUT,
        }
    }

    pub const fn with_chat_timeout(mut self, timeout: Duration) -> Self {
        self.chat_timeout = timeout;
        self
    }

    pub const fn chat_timeout(&self) -> Duration {
        self.chat_timeout
    }

    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.navigator
    }

    /// Send a request and apply the 401 and 429 rules
    pub async fn send(&self, mut request: ApiRequest) -> Result<RawResponse, ApiError> {
        loop {
            debug!(method = %request.method, path = %request.path, retried = request.retried, "request");
            let response = self.transport.execute(&request).await?;

            match response.status {
                status if (200..300).contains(&status) => return Ok(response),
                429 => {
                    warn!(path = %request.path, wait = ?response.retry_after, "throttled");
                    self.navigator.navigate(Route::Throttle {
                        wait_secs: response.retry_after,
                    });
                    return Err(ApiError::Throttled {
                        wait_secs: response.retry_after,
                    });
                }
                401 if !request.anonymous => {
                    if request.retried {
                        warn!(path = %request.path, "rejected again after refresh");
                        return Err(self.expire_session());
                    }
                    request.retried = true;
                    if let Err(err) = self.refresh().await {
                        warn!(error = %err, "token refresh failed");
                        return Err(self.expire_session());
                    }
                }
                status => return Err(ApiError::from_body(status, &response.body)),
            }
        }
    }

    /// Refresh goes straight to the transport so it can never recurse
    async fn refresh(&self) -> Result<(), ApiError> {
        let request = ApiRequest::post(REFRESH_PATH).anonymous();
        let response = self.transport.execute(&request).await?;
        if response.is_success() {
            debug!("session refreshed");
            Ok(())
        } else {
            Err(ApiError::from_body(response.status, &response.body))
        }
    }

    fn expire_session(&self) -> ApiError {
        self.navigator.navigate(Route::Login);
        ApiError::SessionExpired
    }

    /// Send and decode the body as `T`
    pub async fn fetch<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let response = self.send(request).await?;
        decode(&response.body)
    }

    /// Send and ignore whatever body comes back
    pub async fn execute(&self, request: ApiRequest) -> Result<(), ApiError> {
        self.send(request).await.map(|_| ())
    }

    /// Send and decode a body, falling back to `T::default()` when empty or
    /// shaped differently
    pub async fn fetch_or_default<T: DeserializeOwned + Default>(
        &self,
        request: ApiRequest,
    ) -> Result<T, ApiError> {
        let response = self.send(request).await?;
        Ok(serde_json::from_slice(&response.body).unwrap_or_default())
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.fetch(ApiRequest::get(path)).await
    }
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    let body = if body.iter().all(u8::is_ascii_whitespace) {
        b"null".as_slice()
    } else {
        body
    };
    serde_json::from_slice(body).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Append a query string, skipping `None` values
pub(crate) fn with_query(path: &str, params: &[(&str, Option<String>)]) -> String {
    let query: Vec<String> = params
        .iter()
        .filter_map(|(key, value)| {
            value
                .as_ref()
                .map(|v| format!("{key}={}", urlencoding::encode(v)))
        })
        .collect();
    if query.is_empty() {
        path.to_string()
    } else {
        format!("{path}?{}", query.join("&"))
    }
}

#[cfg(test)]
mod tests {
    use super::mock::{MockTransport, json_response};
    use super::*;
    use crate::nav::RecordingNavigator;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    fn client(mock: &Arc<MockTransport>) -> (ApiClient, Arc<RecordingNavigator>) {
        let nav = Arc::new(RecordingNavigator::new());
        (ApiClient::new(mock.clone(), nav.clone()), nav)
    }

    #[tokio::test]
    async fn test_single_refresh_then_replay() {
        let mock = Arc::new(MockTransport::new());
        mock.on(Method::Get, "/auth/me/", json_response(401, json!({"detail": "expired"})));
        mock.on(Method::Post, REFRESH_PATH, json_response(200, json!({})));
        mock.on(Method::Get, "/auth/me/", json_response(200, json!({"email": "a@b.co"})));
        let (client, nav) = client(&mock);

        let user: Value = assert_ok!(client.get("/auth/me/").await);

        assert_eq!(user["email"], "a@b.co");
        assert_eq!(mock.calls(Method::Post, REFRESH_PATH), 1);
        assert_eq!(mock.calls(Method::Get, "/auth/me/"), 2);
        assert!(nav.routes().is_empty());
    }

    #[tokio::test]
    async fn test_second_401_logs_out_without_second_refresh() {
        let mock = Arc::new(MockTransport::new());
        mock.on(Method::Get, "/posts/", json_response(401, json!({})));
        mock.on(Method::Post, REFRESH_PATH, json_response(200, json!({})));
        mock.on(Method::Get, "/posts/", json_response(401, json!({})));
        mock.on(Method::Post, REFRESH_PATH, json_response(200, json!({})));
        let (client, nav) = client(&mock);

        let result: Result<Value, _> = client.get("/posts/").await;

        assert!(matches!(result, Err(ApiError::SessionExpired)));
        assert_eq!(mock.calls(Method::Post, REFRESH_PATH), 1);
        assert_eq!(mock.calls(Method::Get, "/posts/"), 2);
        assert_eq!(nav.routes(), vec![Route::Login]);
    }

    #[tokio::test]
    async fn test_failed_refresh_logs_out_without_replay() {
        let mock = Arc::new(MockTransport::new());
        mock.on(Method::Get, "/channels/", json_response(401, json!({})));
        mock.on(Method::Post, REFRESH_PATH, json_response(401, json!({"detail": "no refresh"})));
        let (client, nav) = client(&mock);

        let result = client.execute(ApiRequest::get("/channels/")).await;

        assert!(matches!(result, Err(ApiError::SessionExpired)));
        assert_eq!(mock.calls(Method::Get, "/channels/"), 1);
        assert_eq!(nav.last(), Some(Route::Login));
    }

    #[tokio::test]
    async fn test_429_navigates_to_throttle_without_retry() {
        let mock = Arc::new(MockTransport::new());
        let mut throttled = json_response(429, json!({"detail": "slow down"}));
        throttled.retry_after = Some(42);
        mock.on(Method::Post, "/posts/create/", throttled);
        let (client, nav) = client(&mock);

        let result = client.execute(ApiRequest::post("/posts/create/")).await;

        assert!(matches!(result, Err(ApiError::Throttled { wait_secs: Some(42) })));
        assert_eq!(mock.calls(Method::Post, "/posts/create/"), 1);
        assert_eq!(mock.calls(Method::Post, REFRESH_PATH), 0);
        assert_eq!(nav.routes(), vec![Route::Throttle { wait_secs: Some(42) }]);
    }

    #[tokio::test]
    async fn test_anonymous_401_is_plain_status() {
        let mock = Arc::new(MockTransport::new());
        mock.on(Method::Post, "/auth/login/", json_response(401, json!({"msg": "verify your email"})));
        let (client, nav) = client(&mock);

        let err = client
            .execute(ApiRequest::post("/auth/login/").anonymous())
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(401));
        assert_eq!(err.server_message().as_deref(), Some("verify your email"));
        assert_eq!(mock.calls(Method::Post, REFRESH_PATH), 0);
        assert!(nav.routes().is_empty());
    }

    #[tokio::test]
    async fn test_other_errors_pass_through() {
        let mock = Arc::new(MockTransport::new());
        mock.on(Method::Delete, "/posts/9/", json_response(404, json!({"detail": "Not found."})));
        let (client, _) = client(&mock);

        let err = assert_err!(client.execute(ApiRequest::delete("/posts/9/")).await);

        assert_eq!(err.status(), Some(404));
        assert_eq!(mock.calls(Method::Post, REFRESH_PATH), 0);
    }

    #[test]
    fn test_with_query_skips_missing() {
        let path = with_query(
            "/posts/",
            &[("page", Some("2".into())), ("status", None), ("q", Some("a b".into()))],
        );
        assert_eq!(path, "/posts/?page=2&q=a%20b");
    }

    #[test]
    fn test_decode_empty_body_as_unit() {
        let unit: () = decode(b"").unwrap();
        assert_eq!(unit, ());
    }
}
