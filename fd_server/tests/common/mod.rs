//! Shared fixtures: a scripted in-memory backend and router construction.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response, header};
use fd_server::{
    api::{AppState, create_router},
    config::{ConfigOverrides, ServerConfig},
};
use fleetdesk::{
    Backend, BackendError, NotificationHub, TokenPair,
    backend::{ApiRequest, BackendReply, BackendResult, Envelope, RequestBody},
    notifications::{BrokerConnector, ChannelConnector},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// One request as the backend saw it.
#[derive(Debug, Clone)]
pub struct SeenCall {
    pub method: String,
    pub target: String,
    pub bearer: Option<String>,
    pub body: Value,
    /// `(file_name, content_type)` for multipart uploads
    pub file: Option<(String, String)>,
}

/// Backend double that answers from a fixed script and counts calls.
///
/// - access tokens listed in `expired` are rejected with 401
/// - `/auth/login` accepts any password except `wrong`
/// - `/users/7` is the signed-in super admin
/// - creating a car without a plate is a 422
/// - anything under `/trips` fails with 503
/// - listing companies answers without a message
/// - everything else echoes method and target
#[derive(Default)]
pub struct FakeBackend {
    pub calls: Mutex<Vec<SeenCall>>,
    pub refreshes: Mutex<Vec<String>>,
    pub expired: Mutex<HashSet<String>>,
    pub refresh_fails: Mutex<bool>,
}

impl FakeBackend {
    pub fn calls(&self) -> Vec<SeenCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn refresh_count(&self) -> usize {
        self.refreshes.lock().unwrap().len()
    }

    pub fn expire(&self, token: &str) {
        self.expired.lock().unwrap().insert(token.to_string());
    }

    pub fn fail_refresh(&self) {
        *self.refresh_fails.lock().unwrap() = true;
    }
}

pub fn user_record() -> Value {
    json!({
        "id": 7,
        "name": "Noor",
        "email": "noor@example.com",
        "role": "SUPER_ADMIN",
        "status": "ACTIVE",
        "company": null
    })
}

fn status(status: u16, message: &str) -> BackendError {
    BackendError::Status {
        status,
        message: message.to_string(),
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn send(&self, request: &ApiRequest, bearer: Option<&str>) -> BackendResult<BackendReply> {
        let (body, file) = match &request.body {
            RequestBody::Empty => (Value::Null, None),
            RequestBody::Json(body) => (body.clone(), None),
            RequestBody::File(file) => (
                Value::Null,
                Some((file.file_name.clone(), file.content_type.clone())),
            ),
        };

        self.calls.lock().unwrap().push(SeenCall {
            method: request.method.to_string(),
            target: request.target(),
            bearer: bearer.map(str::to_string),
            body: body.clone(),
            file,
        });

        if let Some(token) = bearer {
            if self.expired.lock().unwrap().contains(token) {
                return Err(status(401, "Token expired"));
            }
        }

        match (request.method.as_str(), request.path.as_str()) {
            ("POST", "/auth/login") => {
                if body["password"] == "wrong" {
                    return Err(status(401, "Invalid credentials"));
                }
                Ok(BackendReply::ok(
                    json!({
                        "accessToken": "a1",
                        "refreshToken": "r1",
                        "user": user_record(),
                    }),
                    "Logged in",
                ))
            }
            ("GET", "/users/7") => Ok(BackendReply::ok(user_record(), "User fetched")),
            ("POST", "/cars") if body.get("plate").is_none() => {
                Err(status(422, "Plate number is required"))
            }
            (_, path) if path.starts_with("/trips") => Err(status(503, "upstream unavailable")),
            ("POST", "/files/upload") => Ok(BackendReply {
                status: 201,
                envelope: Envelope::new(json!({ "url": "/files/1.pdf" }), "Uploaded"),
            }),
            ("GET", "/companies") => Ok(BackendReply {
                status: 200,
                envelope: Envelope::new(json!([{ "id": 3, "name": "Desert Cars" }]), ""),
            }),
            (method, _) => Ok(BackendReply::ok(
                json!({ "method": method, "target": request.target(), "body": body }),
                "ok",
            )),
        }
    }

    async fn refresh(&self, refresh_token: &str) -> BackendResult<TokenPair> {
        self.refreshes
            .lock()
            .unwrap()
            .push(refresh_token.to_string());

        if *self.refresh_fails.lock().unwrap() {
            return Err(status(401, "Refresh token revoked"));
        }
        Ok(TokenPair::new("a2", Some("r2".to_string())))
    }
}

/// Configuration for tests: broker disabled, default locales `en,ar`.
pub fn test_config() -> ServerConfig {
    ServerConfig::from_lookup(
        |key| match key {
            "BACKEND_URL" => Some("http://backend.test".to_string()),
            "BROKER_ENABLED" => Some("false".to_string()),
            "MAX_UPLOAD_BYTES" => Some("1024".to_string()),
            _ => None,
        },
        ConfigOverrides::default(),
    )
    .unwrap()
}

pub struct TestApp {
    pub router: axum::Router,
    pub backend: Arc<FakeBackend>,
    pub broker: Arc<ChannelConnector>,
    pub hub: Arc<NotificationHub>,
}

pub fn test_app() -> TestApp {
    let backend = Arc::new(FakeBackend::default());
    let broker = Arc::new(ChannelConnector::new());
    let connector: Arc<dyn BrokerConnector> = broker.clone();
    let hub = Arc::new(NotificationHub::new(connector));

    let state = AppState::new(backend.clone(), hub.clone(), test_config());

    TestApp {
        router: create_router(state),
        backend,
        broker,
        hub,
    }
}

/// Cookie header for a signed-in session.
pub const SIGNED_IN: &str = "id=7; accessToken=a1; refreshToken=r1";

pub fn get(uri: &str, cookies: Option<&str>) -> Request<Body> {
    request("GET", uri, cookies, None)
}

pub fn request(method: &str, uri: &str, cookies: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookies) = cookies {
        builder = builder.header(header::COOKIE, cookies);
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}
