//! Integration tests for the authenticated proxy, refresh handling and
//! session cookies.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use common::{SIGNED_IN, get, json_body, request, set_cookies, test_app};
use serde_json::json;
use tower::ServiceExt; // For `oneshot` method

#[tokio::test]
async fn test_missing_token_is_rejected_before_backend() {
    let app = test_app();

    let response = app
        .router
        .clone()
        .oneshot(get("/api/cars", Some("id=7")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["message"], "Unauthorized");
    assert!(app.backend.calls().is_empty());
}

#[tokio::test]
async fn test_list_passes_query_and_bearer() {
    let app = test_app();

    let response = app
        .router
        .clone()
        .oneshot(get("/api/cars?companyId=3&page=2", Some(SIGNED_IN)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookies(&response).is_empty());

    let body = json_body(response).await;
    assert_eq!(body["data"]["target"], "/cars?companyId=3&page=2");
    assert_eq!(body["message"], "ok");

    let calls = app.backend.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].bearer.as_deref(), Some("a1"));
}

#[tokio::test]
async fn test_crud_routes_map_to_backend_paths() {
    let app = test_app();

    let cases = [
        ("GET", "/api/bank-accounts/12", None, "/bank-accounts/12"),
        (
            "PATCH",
            "/api/drivers/4",
            Some(json!({ "status": "ACTIVE" })),
            "/drivers/4",
        ),
        ("DELETE", "/api/companies/9", None, "/companies/9"),
        (
            "POST",
            "/api/trip-offers",
            Some(json!({ "tripId": 2, "price": 300 })),
            "/trip-offers",
        ),
    ];

    for (method, uri, body, target) in cases {
        let response = app
            .router
            .clone()
            .oneshot(request(method, uri, Some(SIGNED_IN), body.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{} {}", method, uri);

        let calls = app.backend.calls();
        let last = calls.last().unwrap();
        assert_eq!(last.method, method);
        assert_eq!(last.target, target);
        if let Some(body) = body {
            assert_eq!(last.body, body);
        }
    }
}

#[tokio::test]
async fn test_unknown_resource_is_not_found() {
    let app = test_app();

    let response = app
        .router
        .clone()
        .oneshot(get("/api/invoices", Some(SIGNED_IN)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        json_body(response).await["message"],
        "Unknown resource 'invoices'"
    );
    assert!(app.backend.calls().is_empty());
}

#[tokio::test]
async fn test_expired_token_is_refreshed_once_and_cookies_rewritten() {
    let app = test_app();
    app.backend.expire("stale");

    let response = app
        .router
        .clone()
        .oneshot(get(
            "/api/cars",
            Some("id=7; accessToken=stale; refreshToken=r1"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let cookies = set_cookies(&response);
    assert!(cookies.iter().any(|c| c.starts_with("accessToken=a2")));
    assert!(cookies.iter().any(|c| c.starts_with("refreshToken=r2")));
    assert!(cookies.iter().all(|c| c.contains("HttpOnly")));

    assert_eq!(app.backend.refresh_count(), 1);
    let bearers: Vec<_> = app
        .backend
        .calls()
        .into_iter()
        .map(|c| c.bearer.unwrap())
        .collect();
    assert_eq!(bearers, vec!["stale", "a2"]);
}

#[tokio::test]
async fn test_failed_refresh_clears_session() {
    let app = test_app();
    app.backend.expire("stale");
    app.backend.fail_refresh();

    let response = app
        .router
        .clone()
        .oneshot(get(
            "/api/cars",
            Some("id=7; accessToken=stale; refreshToken=revoked"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 3);
    assert!(cookies.iter().all(|c| c.contains("Max-Age=0")));

    assert_eq!(app.backend.refresh_count(), 1);
    assert_eq!(app.backend.calls().len(), 1);
    assert_eq!(
        json_body(response).await["message"],
        "Session expired, please sign in again"
    );
}

#[tokio::test]
async fn test_expired_token_without_refresh_token_fails() {
    let app = test_app();
    app.backend.expire("stale");

    let response = app
        .router
        .clone()
        .oneshot(get("/api/cars", Some("id=7; accessToken=stale")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(app.backend.refresh_count(), 0);
}

#[tokio::test]
async fn test_validation_errors_pass_through() {
    let app = test_app();

    let response = app
        .router
        .clone()
        .oneshot(request(
            "POST",
            "/api/cars",
            Some(SIGNED_IN),
            Some(json!({ "model": "Corolla" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        json_body(response).await,
        json!({ "message": "Plate number is required" })
    );
    assert_eq!(app.backend.calls().len(), 1);
    assert_eq!(app.backend.refresh_count(), 0);
}

#[tokio::test]
async fn test_backend_outage_is_generic_500() {
    let app = test_app();

    let response = app
        .router
        .clone()
        .oneshot(get("/api/trips", Some(SIGNED_IN)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(response).await["message"], "Internal server error");
    assert_eq!(app.backend.calls().len(), 1);
}

#[tokio::test]
async fn test_malformed_json_body_is_bad_request() {
    let app = test_app();

    let request = Request::builder()
        .method("POST")
        .uri("/api/cars")
        .header(header::COOKIE, SIGNED_IN)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(response).await["message"].is_string());
    assert!(app.backend.calls().is_empty());
}

#[tokio::test]
async fn test_trip_offer_actions() {
    let app = test_app();

    let response = app
        .router
        .clone()
        .oneshot(request(
            "POST",
            "/api/trip-offers/17/accept",
            Some(SIGNED_IN),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.backend.calls()[0].target, "/trip-offers/17/accept");

    let response = app
        .router
        .clone()
        .oneshot(request(
            "POST",
            "/api/trip-offers/17/counter",
            Some(SIGNED_IN),
            Some(json!({ "price": 420, "note": "Airport pickup included" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let calls = app.backend.calls();
    assert_eq!(calls[1].target, "/trip-offers/17/counter");
    assert_eq!(calls[1].body["price"], 420);
}

#[tokio::test]
async fn test_counter_offer_requires_price() {
    let app = test_app();

    let response = app
        .router
        .clone()
        .oneshot(request(
            "POST",
            "/api/trip-offers/17/counter",
            Some(SIGNED_IN),
            Some(json!({ "note": "cheaper?" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.backend.calls().is_empty());

    let response = app
        .router
        .clone()
        .oneshot(request(
            "POST",
            "/api/trip-offers/17/haggle",
            Some(SIGNED_IN),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_statistics_passthrough() {
    let app = test_app();

    let response = app
        .router
        .clone()
        .oneshot(get(
            "/api/statistics?from=2026-01-01&to=2026-03-31",
            Some(SIGNED_IN),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        app.backend.calls()[0].target,
        "/statistics/dashboard?from=2026-01-01&to=2026-03-31"
    );
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = test_app();

    let response = app
        .router
        .clone()
        .oneshot(get("/health", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["subscriptions"], 0);
}

#[tokio::test]
async fn test_ids_cannot_escape_their_resource() {
    let app = test_app();

    for (method, uri) in [
        ("GET", "/api/cars/1%3Fowner%3Dall"),
        ("DELETE", "/api/cars/..%2Fusers%2F9"),
        ("PATCH", "/api/drivers/4%23notes"),
        ("POST", "/api/trip-offers/..%2F..%2Fusers/accept"),
    ] {
        let body = (method == "PATCH").then(|| json!({ "status": "ACTIVE" }));
        let response = app
            .router
            .clone()
            .oneshot(request(method, uri, Some(SIGNED_IN), body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{} {}", method, uri);
        assert!(
            json_body(response).await["message"]
                .as_str()
                .unwrap()
                .starts_with("Invalid identifier")
        );
    }

    assert!(app.backend.calls().is_empty());
}

#[tokio::test]
async fn test_token_is_checked_before_route_and_body() {
    let app = test_app();

    let malformed = Request::builder()
        .method("PATCH")
        .uri("/api/cars/1")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let requests = vec![
        request("POST", "/api/invoices", None, Some(json!({}))),
        malformed,
        get("/api/cars/..%2Fusers", Some("id=7")),
        request("POST", "/api/trip-offers/17/haggle", None, None),
    ];

    for request in requests {
        let uri = request.uri().to_string();
        let response = app.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
    }

    assert!(app.backend.calls().is_empty());
}

#[tokio::test]
async fn test_failure_after_refresh_still_rewrites_cookies() {
    let app = test_app();
    app.backend.expire("stale");

    let response = app
        .router
        .clone()
        .oneshot(request(
            "POST",
            "/api/cars",
            Some("id=7; accessToken=stale; refreshToken=r1"),
            Some(json!({ "model": "Corolla" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let cookies = set_cookies(&response);
    assert!(cookies.iter().any(|c| c.starts_with("accessToken=a2")));
    assert!(cookies.iter().any(|c| c.starts_with("refreshToken=r2")));
    assert!(cookies.iter().all(|c| !c.contains("Max-Age=0")));

    assert_eq!(
        json_body(response).await["message"],
        "Plate number is required"
    );
    assert_eq!(app.backend.refresh_count(), 1);
}

#[tokio::test]
async fn test_expired_session_ends_notification_subscription() {
    let app = test_app();

    app.router
        .clone()
        .oneshot(request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "noor@example.com", "password": "Pass123!" })),
        ))
        .await
        .unwrap();
    assert_eq!(app.hub.active_count().await, 1);

    // Someone else's expired token naming user 7 leaves the subscription alone
    app.backend.expire("bogus");
    let response = app
        .router
        .clone()
        .oneshot(get("/api/cars", Some("id=7; accessToken=bogus")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(app.hub.active_count().await, 1);

    app.backend.expire("a1");
    app.backend.fail_refresh();

    let response = app
        .router
        .clone()
        .oneshot(get("/api/cars", Some(SIGNED_IN)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(set_cookies(&response).len(), 3);
    assert_eq!(app.hub.active_count().await, 0);
    assert!(app.hub.subscriber("7").await.is_none());
}

#[tokio::test]
async fn test_success_always_carries_a_message() {
    let app = test_app();

    let response = app
        .router
        .clone()
        .oneshot(get("/api/companies", Some(SIGNED_IN)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"][0]["name"], "Desert Cars");
    assert_eq!(body["message"], "");
}
