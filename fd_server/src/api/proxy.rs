//! Authenticated pass-through to the backend REST API.
//!
//! Bodies and `data` payloads are opaque JSON; the proxy never interprets
//! business records. Every handler reads the token pair from the cookies,
//! so the browser only ever holds the HttpOnly cookies. A request without an
//! access token is answered 401 before anything else is looked at.
//!
//! # Examples
//!
//! List cars filtered by company:
//! ```bash
//! curl -b "accessToken=...; refreshToken=..." \
//!   "http://localhost:3000/api/cars?companyId=3&page=1"
//! ```
//!
//! Counter a trip offer:
//! ```bash
//! curl -X POST -b "accessToken=..." -H "Content-Type: application/json" \
//!   -d '{"price": 420, "note": "Includes airport pickup"}' \
//!   http://localhost:3000/api/trip-offers/17/counter
//! ```

use axum::{
    Json,
    body::Bytes,
    extract::{Path, RawQuery, State, rejection::JsonRejection},
    response::Response,
};
use fleetdesk::backend::{ApiRequest, OfferAction, Resource, endpoints};
use serde_json::Value;

use super::{
    AppState,
    errors::ApiError,
    session::{SessionCookies, call_backend, require_tokens, respond},
};

fn resolve(slug: &str) -> Result<Resource, ApiError> {
    Resource::from_slug(slug).ok_or_else(|| ApiError::NotFound(format!("Unknown resource '{}'", slug)))
}

async fn forward(
    state: &AppState,
    SessionCookies(session): SessionCookies,
    label: &str,
    request: ApiRequest,
) -> Result<Response, ApiError> {
    let outcome = call_backend(state, &session, label, &request).await?;
    Ok(respond(state, outcome))
}

/// `GET /api/{resource}`; the query string is passed through for filters
/// and pagination.
pub async fn list_resources(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    RawQuery(query): RawQuery,
    session: SessionCookies,
) -> Result<Response, ApiError> {
    require_tokens(&session.0)?;
    let resource = resolve(&slug)?;
    let request = ApiRequest::get(resource.collection_path()).with_query(query);
    forward(&state, session, resource.slug(), request).await
}

/// `POST /api/{resource}`
pub async fn create_resource(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    session: SessionCookies,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    require_tokens(&session.0)?;
    let resource = resolve(&slug)?;
    let Json(body) = payload?;
    let request = ApiRequest::post(resource.collection_path(), body);
    forward(&state, session, resource.slug(), request).await
}

/// `GET /api/{resource}/{id}`
pub async fn get_resource(
    State(state): State<AppState>,
    Path((slug, id)): Path<(String, String)>,
    session: SessionCookies,
) -> Result<Response, ApiError> {
    require_tokens(&session.0)?;
    let resource = resolve(&slug)?;
    let request = ApiRequest::get(resource.item_path(&id)?);
    forward(&state, session, resource.slug(), request).await
}

/// `PATCH /api/{resource}/{id}`
pub async fn update_resource(
    State(state): State<AppState>,
    Path((slug, id)): Path<(String, String)>,
    session: SessionCookies,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    require_tokens(&session.0)?;
    let resource = resolve(&slug)?;
    let Json(body) = payload?;
    let request = ApiRequest::patch(resource.item_path(&id)?, body);
    forward(&state, session, resource.slug(), request).await
}

/// `DELETE /api/{resource}/{id}`
pub async fn delete_resource(
    State(state): State<AppState>,
    Path((slug, id)): Path<(String, String)>,
    session: SessionCookies,
) -> Result<Response, ApiError> {
    require_tokens(&session.0)?;
    let resource = resolve(&slug)?;
    let request = ApiRequest::delete(resource.item_path(&id)?);
    forward(&state, session, resource.slug(), request).await
}

/// `POST /api/trip-offers/{id}/{accept|reject|counter}`
///
/// Accept and reject carry no body. A counter offer requires a JSON body
/// with a `price`; an optional `note` is passed along.
pub async fn offer_action(
    State(state): State<AppState>,
    Path((id, action)): Path<(String, String)>,
    session: SessionCookies,
    body: Bytes,
) -> Result<Response, ApiError> {
    require_tokens(&session.0)?;
    let action = OfferAction::from_slug(&action)
        .ok_or_else(|| ApiError::NotFound(format!("Unknown offer action '{}'", action)))?;

    let payload: Option<Value> = if body.is_empty() {
        None
    } else {
        Some(
            serde_json::from_slice(&body)
                .map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {}", e)))?,
        )
    };

    let path = action.path(&id)?;
    let request = match (action, payload) {
        (OfferAction::Counter, Some(payload)) if payload.get("price").is_some() => {
            ApiRequest::post(path, payload)
        }
        (OfferAction::Counter, _) => {
            return Err(ApiError::BadRequest(
                "A counter offer requires a price".to_string(),
            ));
        }
        (_, Some(payload)) => ApiRequest::post(path, payload),
        (_, None) => ApiRequest::new(axum::http::Method::POST, path),
    };

    forward(&state, session, Resource::TripOffers.slug(), request).await
}

/// `GET /api/statistics`; date range filters are passed through.
pub async fn statistics(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    session: SessionCookies,
) -> Result<Response, ApiError> {
    require_tokens(&session.0)?;
    let request = ApiRequest::get(endpoints::DASHBOARD_STATISTICS).with_query(query);
    forward(&state, session, "statistics", request).await
}
