//! HTTP transport to the backend REST API.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{
    StatusCode,
    multipart::{Form, Part},
};
use serde::Deserialize;
use serde_json::{Value, json};

use super::{
    endpoints,
    errors::{BackendError, BackendResult},
    models::{ApiRequest, BackendReply, Envelope, RequestBody},
};
use crate::session::TokenPair;

/// A backend the proxy can forward requests to.
///
/// `send` resolves to `Ok` only for 2xx answers; every other status is a
/// [`BackendError::Status`] so callers can branch on it.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Send a request, optionally with a bearer credential.
    async fn send(&self, request: &ApiRequest, bearer: Option<&str>) -> BackendResult<BackendReply>;

    /// Exchange a refresh token for a new token pair.
    async fn refresh(&self, refresh_token: &str) -> BackendResult<TokenPair>;
}

/// Backend reached over HTTP with `reqwest`.
pub struct HttpBackend {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshGrant {
    access_token: String,
    refresh_token: Option<String>,
}

impl HttpBackend {
    /// Create a client for the backend at `base_url`.
    ///
    /// Every request is bounded by `timeout`; a timeout surfaces as a
    /// transport error and is never retried.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> BackendResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn send(&self, request: &ApiRequest, bearer: Option<&str>) -> BackendResult<BackendReply> {
        let url = format!("{}{}", self.base_url, request.target());
        let mut builder = self.client.request(request.method.clone(), &url);

        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }

        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(body) => builder.json(body),
            RequestBody::File(file) => {
                let part = Part::bytes(file.bytes.to_vec())
                    .file_name(file.file_name.clone())
                    .mime_str(&file.content_type)
                    .map_err(|e| BackendError::InvalidRequest(e.to_string()))?;
                builder.multipart(Form::new().part(file.field.clone(), part))
            }
        };

        let started = Instant::now();
        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        debug!(
            "{} {} -> {} in {}ms",
            request.method,
            request.path,
            status.as_u16(),
            started.elapsed().as_millis()
        );

        decode_reply(status, &body)
    }

    async fn refresh(&self, refresh_token: &str) -> BackendResult<TokenPair> {
        let request = ApiRequest::post(
            endpoints::REFRESH_TOKEN,
            json!({ "refreshToken": refresh_token }),
        );
        let reply = self.send(&request, None).await?;

        let grant: RefreshGrant = serde_json::from_value(reply.envelope.data)
            .map_err(|e| BackendError::Decode(format!("refresh grant: {}", e)))?;

        // The backend may rotate the refresh token or leave it unchanged.
        Ok(TokenPair::new(
            grant.access_token,
            grant
                .refresh_token
                .or_else(|| Some(refresh_token.to_string())),
        ))
    }
}

/// Turn a raw backend answer into a reply or a status error.
pub(crate) fn decode_reply(status: StatusCode, body: &[u8]) -> BackendResult<BackendReply> {
    if !status.is_success() {
        let message = error_message(body).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        });
        return Err(BackendError::Status {
            status: status.as_u16(),
            message,
        });
    }

    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(BackendReply {
            status: status.as_u16(),
            envelope: Envelope::default(),
        });
    }

    let value: Value = serde_json::from_slice(body).map_err(|e| {
        warn!("Backend sent a non-JSON success body: {}", e);
        BackendError::Decode(e.to_string())
    })?;

    Ok(BackendReply {
        status: status.as_u16(),
        envelope: into_envelope(value),
    })
}

/// Accept both enveloped (`{ data, message }`) and bare payloads.
fn into_envelope(value: Value) -> Envelope {
    let enveloped = matches!(
        &value,
        Value::Object(map) if map.contains_key("data") || map.contains_key("message")
    );

    if enveloped {
        if let Ok(envelope) = serde_json::from_value::<Envelope>(value.clone()) {
            return envelope;
        }
    }

    Envelope::new(value, "")
}

/// Extract the human-readable message from an error body.
///
/// Validation failures may carry a list of messages; they are joined.
fn error_message(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    match value.get("message")? {
        Value::String(message) if !message.is_empty() => Some(message.clone()),
        Value::Array(items) => {
            let parts: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        _ => None,
    }
}
