//! `reqwest` transport

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{COOKIE, RETRY_AFTER, SET_COOKIE};
use reqwest::multipart::{Form, Part};
use tracing::debug;

use super::{ApiRequest, Body, CookieJar, FormPart, Method, PartValue, ProgressFn, RawResponse, Transport};
use crate::error::ApiError;

/// Upload chunk size; progress is reported once per chunk
const UPLOAD_CHUNK: usize = 64 * 1024;

pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
    cookies: Arc<CookieJar>,
}

impl HttpTransport {
    /// Create a transport for `base_url` (e.g. `https://api.example.com`)
    pub fn new(base_url: &str, timeout: Duration, cookies: Arc<CookieJar>) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("chapar/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            cookies,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The jar this transport reads and updates
    pub fn cookies(&self) -> &Arc<CookieJar> {
        &self.cookies
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => Self::GET,
            Method::Post => Self::POST,
            Method::Put => Self::PUT,
            Method::Patch => Self::PATCH,
            Method::Delete => Self::DELETE,
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: &ApiRequest) -> Result<RawResponse, ApiError> {
        let mut builder = self
            .client
            .request(request.method.into(), self.url(&request.path))
            .timeout(request.timeout.unwrap_or(self.timeout));

        if let Some(cookie) = self.cookies.header() {
            builder = builder.header(COOKIE, cookie);
        }

        builder = match &request.body {
            Body::Empty => builder,
            Body::Json(value) => builder.json(value),
            Body::Multipart(parts) => builder.multipart(build_form(parts, request.progress.as_ref())?),
        };

        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        for value in response.headers().get_all(SET_COOKIE) {
            if let Ok(value) = value.to_str() {
                self.cookies.store(value);
            }
        }
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse().ok());

        let body = response
            .bytes()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?
            .to_vec();

        debug!(method = %request.method, path = %request.path, status, bytes = body.len(), "response");

        Ok(RawResponse {
            status,
            retry_after,
            body,
        })
    }
}

fn build_form(parts: &[FormPart], progress: Option<&ProgressFn>) -> Result<Form, ApiError> {
    let mut form = Form::new();
    for part in parts {
        form = match &part.value {
            PartValue::Text(text) => form.text(part.name.clone(), text.clone()),
            PartValue::File {
                file_name,
                mime,
                bytes,
            } => {
                let length = bytes.len() as u64;
                let body = match progress {
                    Some(progress) => progress_body(bytes.clone(), progress.clone()),
                    None => reqwest::Body::from(bytes.as_ref().clone()),
                };
                let file = Part::stream_with_length(body, length)
                    .file_name(file_name.clone())
                    .mime_str(mime)
                    .map_err(|e| ApiError::Transport(e.to_string()))?;
                form.part(part.name.clone(), file)
            }
        };
    }
    Ok(form)
}

/// Stream the file in chunks, reporting bytes handed to the connection
fn progress_body(bytes: Arc<Vec<u8>>, progress: ProgressFn) -> reqwest::Body {
    let total = bytes.len() as u64;
    let chunks: Vec<Vec<u8>> = bytes.chunks(UPLOAD_CHUNK).map(<[u8]>::to_vec).collect();
    let mut sent = 0u64;
    let stream = futures_util::stream::iter(chunks.into_iter().map(move |chunk| {
        sent += chunk.len() as u64;
        progress(sent, total);
        Ok::<_, std::io::Error>(chunk)
    }));
    reqwest::Body::wrap_stream(stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let transport =
            HttpTransport::new("https://api.example.com/", Duration::from_secs(10), Arc::default())
                .unwrap();
        assert_eq!(transport.url("/auth/me/"), "https://api.example.com/auth/me/");
    }

    #[test]
    fn test_build_form_with_file() {
        let parts = vec![
            FormPart::text("content", "hello"),
            FormPart::file("file", "a.png", "image/png", Arc::new(vec![0; 10])),
        ];
        assert!(build_form(&parts, None).is_ok());
    }

    #[test]
    fn test_build_form_rejects_bad_mime() {
        let parts = vec![FormPart::file("file", "a", "not a mime", Arc::new(vec![1]))];
        assert!(build_form(&parts, None).is_err());
    }
}
