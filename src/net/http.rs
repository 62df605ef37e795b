//! Platform REST client.
//!
//! Thin wrapper over one shared `reqwest::Client`. Every platform response is
//! a `{ success, data?, message?, error? }` envelope; unwrapping it happens in
//! the pure `parse_envelope` so status and body handling are testable without
//! a server.
//!
//! ERROR HANDLING
//! ==============
//! A 401 always maps to [`ApiError::Unauthorized`], whatever the body says,
//! so callers can expire the session without inspecting messages. Every other
//! failed envelope becomes [`ApiError::Rejected`] carrying the platform's
//! reason when one was given.

use std::fmt;

use records::ApiResponse;
use reqwest::RequestBuilder;
use reqwest::header::CONTENT_DISPOSITION;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::PortalConfig;

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by platform REST calls.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The bearer token is missing, expired or revoked.
    #[error("unauthorized")]
    Unauthorized { message: Option<String> },

    /// The platform answered with a failed envelope or non-success status.
    #[error("request rejected: status {status}{}", detail(message.as_deref()))]
    Rejected { status: u16, message: Option<String> },

    /// The request never produced a response.
    #[error("request failed: {0}")]
    Transport(String),

    /// The response body could not be deserialized.
    #[error("response parse failed: {0}")]
    Decode(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    ClientBuild(String),
}

fn detail(message: Option<&str>) -> String {
    message.map(|m| format!(" ({m})")).unwrap_or_default()
}

/// Percent-encode a caller-supplied id for use as one path segment, so
/// `/`, `?` and `#` cannot change the endpoint.
#[must_use]
pub fn path_segment(raw: &str) -> String {
    urlencoding::encode(raw).into_owned()
}

impl ApiError {
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// Human-readable reason supplied by the platform, if any.
    #[must_use]
    pub fn platform_message(&self) -> Option<&str> {
        match self {
            Self::Unauthorized { message } | Self::Rejected { message, .. } => message.as_deref(),
            Self::Transport(_) | Self::Decode(_) | Self::ClientBuild(_) => None,
        }
    }
}

// =============================================================================
// CLIENT
// =============================================================================

/// A file fetched from the platform's download endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct Download {
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for Download {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Download")
            .field("file_name", &self.file_name)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Build a client bounded by the configured timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::ClientBuild`] if the TLS backend cannot start.
    pub fn new(config: &PortalConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeouts.request())
            .connect_timeout(config.timeouts.connect())
            .build()
            .map_err(|e| ApiError::ClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: config.api_base_url.clone() })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// `GET path`, unwrapping the envelope's `data`.
    pub async fn get<T: DeserializeOwned>(&self, path: &str, token: Option<&str>) -> Result<T, ApiError> {
        require_data(self.send(self.http.get(self.url(path)), token).await?)
    }

    /// `GET path?query`, unwrapping the envelope's `data`.
    pub async fn get_query<T, Q>(&self, path: &str, query: &Q, token: Option<&str>) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        require_data(self.send(self.http.get(self.url(path)).query(query), token).await?)
    }

    /// `POST path` with a JSON body, unwrapping the envelope's `data`.
    pub async fn post<T, B>(&self, path: &str, body: &B, token: Option<&str>) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        require_data(self.send(self.http.post(self.url(path)).json(body), token).await?)
    }

    /// `POST path` with no body where only success matters.
    pub async fn post_unit(&self, path: &str, token: Option<&str>) -> Result<(), ApiError> {
        self.send::<serde_json::Value>(self.http.post(self.url(path)), token)
            .await
            .map(|_| ())
    }

    /// `PUT path` with a JSON body, unwrapping the envelope's `data`.
    pub async fn put<T, B>(&self, path: &str, body: &B, token: Option<&str>) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        require_data(self.send(self.http.put(self.url(path)).json(body), token).await?)
    }

    /// `PUT path` with no body, unwrapping the envelope's `data`.
    pub async fn put_empty<T: DeserializeOwned>(&self, path: &str, token: Option<&str>) -> Result<T, ApiError> {
        require_data(self.send(self.http.put(self.url(path)), token).await?)
    }

    /// `PUT path` with no body where only success matters.
    pub async fn put_unit(&self, path: &str, token: Option<&str>) -> Result<(), ApiError> {
        self.send::<serde_json::Value>(self.http.put(self.url(path)), token)
            .await
            .map(|_| ())
    }

    /// `POST path` with a multipart form, unwrapping the envelope's `data`.
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
        token: Option<&str>,
    ) -> Result<T, ApiError> {
        require_data(self.send(self.http.post(self.url(path)).multipart(form), token).await?)
    }

    /// `GET path` returning raw bytes rather than an envelope.
    pub async fn download(&self, path: &str, token: Option<&str>) -> Result<Download, ApiError> {
        let response = authorize(self.http.get(self.url(path)), token)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let text = response.text().await.unwrap_or_default();
            return Err(parse_envelope::<serde_json::Value>(status, &text)
                .err()
                .unwrap_or(ApiError::Rejected { status, message: None }));
        }

        let file_name = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(attachment_filename);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(Download { file_name, bytes: bytes.to_vec() })
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        token: Option<&str>,
    ) -> Result<Option<T>, ApiError> {
        let response = authorize(request, token)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        parse_envelope(status, &text)
    }
}

fn authorize(request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token {
        Some(token) => request.bearer_auth(token),
        None => request,
    }
}

fn require_data<T>(data: Option<T>) -> Result<T, ApiError> {
    data.ok_or_else(|| ApiError::Decode("response carried no data".to_owned()))
}

// =============================================================================
// PARSING
// =============================================================================

/// Unwrap a platform envelope received with HTTP `status`.
///
/// Returns the envelope's `data` (which may be absent) when both the status
/// and the envelope report success.
pub fn parse_envelope<T: DeserializeOwned>(status: u16, body: &str) -> Result<Option<T>, ApiError> {
    let ok_status = (200..300).contains(&status);
    let envelope = match serde_json::from_str::<ApiResponse<T>>(body) {
        Ok(envelope) => envelope,
        Err(e) => {
            return Err(match status {
                401 => ApiError::Unauthorized { message: None },
                _ if ok_status => ApiError::Decode(e.to_string()),
                _ => ApiError::Rejected { status, message: None },
            });
        }
    };

    let message = envelope.failure_message().map(str::to_owned);
    if status == 401 {
        return Err(ApiError::Unauthorized { message });
    }
    if !ok_status || !envelope.success {
        return Err(ApiError::Rejected { status, message });
    }
    Ok(envelope.data)
}

/// File name from a `Content-Disposition: attachment; filename="..."` header.
fn attachment_filename(header: &str) -> Option<String> {
    header.split(';').map(str::trim).find_map(|part| {
        let value = part.strip_prefix("filename=")?;
        let value = value.trim_matches('"').trim();
        (!value.is_empty()).then(|| value.to_owned())
    })
}

#[cfg(test)]
#[path = "http_test.rs"]
mod tests;
