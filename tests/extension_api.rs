//! End-to-end tests for the extension token endpoints.
//!
//! Each test drives the real axum router against the in-memory store and a
//! manual clock, so expiry can be stepped without sleeping.

mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use chrono::{DateTime, Duration, Utc};
use serde_json::json;

use common::Harness;
use extgate::clock::Clock;
use extgate::config::Config;
use extgate::models::token::ExtensionToken;
use extgate::tokens::codec;

const VALIDATE: &str = "/api/extension/validate";

// ═══════════════════════════════════════════════════════════════════
//  Validation
// ═══════════════════════════════════════════════════════════════════

/// Issue for U1, validate, then step past the one-hour TTL.
#[tokio::test]
async fn test_validate_then_expire_after_ttl() {
    let h = Harness::new();
    let u1 = h.add_user("u1@example.com");
    let issued = h.state.tokens.issue(u1.id).await.unwrap();

    let (status, body) = h.post_json(VALIDATE, json!({"token": issued.token})).await;
    assert_eq!(status, StatusCode::OK, "body: {}", body);
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["id"], u1.id.to_string());
    assert_eq!(body["user"]["email"], "u1@example.com");
    assert_eq!(body["tokenInfo"]["userId"], u1.id.to_string());

    let expires_at: DateTime<Utc> = body["tokenInfo"]["expiresAt"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(expires_at > h.clock.now());

    h.clock.advance(Duration::minutes(61));
    let (status, body) = h.post_json(VALIDATE, json!({"token": issued.token})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({"success": false, "error": "Expired"}));
}

#[tokio::test]
async fn test_validate_response_never_contains_token_material() {
    let h = Harness::new();
    let u1 = h.add_user("u1@example.com");
    let issued = h.state.tokens.issue(u1.id).await.unwrap();

    let (status, body) = h.post_json(VALIDATE, json!({"token": issued.token})).await;
    assert_eq!(status, StatusCode::OK);

    let text = body.to_string();
    assert!(!text.contains(&issued.token));
    assert!(!text.contains(&codec::hash(&issued.token)));
    assert!(body["tokenInfo"].get("token").is_none());
    assert!(body["tokenInfo"]["lastUsedAt"].is_string());
}

#[tokio::test]
async fn test_missing_token_is_400_without_store_access() {
    let h = Harness::new();

    for payload in [json!({}), json!({"token": ""}), json!({"token": null})] {
        let before = h.store.calls();
        let (status, body) = h.post_json(VALIDATE, payload.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "payload: {}", payload);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Token is required");
        assert_eq!(h.store.calls(), before, "store touched for {}", payload);
    }
}

#[tokio::test]
async fn test_unknown_token_is_401() {
    let h = Harness::new();
    let (status, body) = h
        .post_json(VALIDATE, json!({"token": codec::generate()}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({"success": false, "error": "Invalid token"}));
}

/// A revoked token that has not yet expired reports Revoked.
#[tokio::test]
async fn test_revoked_token_is_401_revoked() {
    let h = Harness::new();
    let u1 = h.add_user("u1@example.com");
    let issued = h.state.tokens.issue(u1.id).await.unwrap();
    h.state.tokens.revoke(&issued.token).await.unwrap();

    let (status, body) = h.post_json(VALIDATE, json!({"token": issued.token})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Revoked");
}

/// Expiry is reported even when the row is also revoked.
#[tokio::test]
async fn test_expired_reported_regardless_of_revocation() {
    let h = Harness::new();
    let u1 = h.add_user("u1@example.com");
    let now = h.clock.now();

    for revoked in [false, true] {
        let token = codec::generate();
        h.store.put_token(ExtensionToken {
            token_hash: codec::hash(&token),
            user_id: u1.id,
            issued_at: now - Duration::hours(2),
            expires_at: now,
            revoked,
            last_used_at: None,
        });

        let (status, body) = h.post_json(VALIDATE, json!({ "token": token })).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Expired", "revoked = {}", revoked);
    }
}

#[tokio::test]
async fn test_deleted_user_is_401() {
    let h = Harness::new();
    let u1 = h.add_user("u1@example.com");
    let issued = h.state.tokens.issue(u1.id).await.unwrap();
    h.store.remove_user(u1.id);

    let (status, body) = h.post_json(VALIDATE, json!({"token": issued.token})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "User no longer exists");
}

#[tokio::test]
async fn test_uniform_failure_messages_when_disclosure_disabled() {
    let h = Harness::with_config(Config {
        disclose_failure_reasons: false,
        ..Config::default()
    });
    let u1 = h.add_user("u1@example.com");
    let issued = h.state.tokens.issue(u1.id).await.unwrap();

    h.clock.advance(Duration::hours(2));
    let (status, body) = h.post_json(VALIDATE, json!({"token": issued.token})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid token");
}

#[tokio::test]
async fn test_store_outage_is_generic_500() {
    let h = Harness::new();
    h.store.set_unavailable(true);

    let (status, body) = h
        .post_json(VALIDATE, json!({"token": codec::generate()}))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        json!({"success": false, "error": "Internal server error"})
    );
}

#[tokio::test]
async fn test_malformed_body_is_generic_500() {
    let h = Harness::new();
    let (status, body) = h.post_raw(VALIDATE, "{\"token\": ").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Internal server error");
}

#[tokio::test]
async fn test_validate_rejects_other_methods_with_json_405() {
    let h = Harness::new();
    let req = Request::builder()
        .method(Method::GET)
        .uri(VALIDATE)
        .body(Body::empty())
        .unwrap();
    let (status, body) = h.send(req).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["success"], false);
}

/// Bodies over the size limit are rejected in the JSON envelope before any lookup.
#[tokio::test]
async fn test_oversized_body_is_json_413() {
    let h = Harness::new();
    let calls = h.store.calls();
    let huge = json!({"token": "a".repeat(70 * 1024)}).to_string();

    let (status, body) = h.post_raw(VALIDATE, &huge).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(
        body,
        json!({"success": false, "error": "Request body too large"})
    );

    let (status, body) = h.post_raw("/api/extension/revoke", &huge).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["success"], false);

    assert_eq!(h.store.calls(), calls);
}

/// Unknown routes answer with the same envelope as every other failure.
#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let h = Harness::new();
    for uri in ["/nope", "/api/extension/unknown"] {
        let req = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let (status, body) = h.send(req).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
        assert_eq!(body, json!({"success": false, "error": "Not found"}));
    }
}

// ═══════════════════════════════════════════════════════════════════
//  Issuance and revocation
// ═══════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_issue_from_session_then_validate() {
    let h = Harness::new();
    let u1 = h.add_user("u1@example.com");
    h.store.insert_session("sess_live", u1.id);

    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/extension/token")
        .header(header::AUTHORIZATION, "Bearer sess_live")
        .body(Body::empty())
        .unwrap();
    let (status, body) = h.send(req).await;
    assert_eq!(status, StatusCode::CREATED, "body: {}", body);
    assert_eq!(body["success"], true);
    assert_eq!(body["tokenInfo"]["userId"], u1.id.to_string());

    let token = body["token"].as_str().unwrap().to_string();
    assert!(codec::is_well_formed(&token));

    let (status, body) = h.post_json(VALIDATE, json!({ "token": token })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], u1.id.to_string());
}

#[tokio::test]
async fn test_issue_requires_a_known_session() {
    let h = Harness::new();

    let no_header = Request::builder()
        .method(Method::POST)
        .uri("/api/extension/token")
        .body(Body::empty())
        .unwrap();
    let (status, body) = h.send(no_header).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Not authenticated");

    let unknown = Request::builder()
        .method(Method::POST)
        .uri("/api/extension/token")
        .header(header::AUTHORIZATION, "Bearer sess_gone")
        .body(Body::empty())
        .unwrap();
    let (status, _) = h.send(unknown).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(h.store.token_count(), 0);
}

#[tokio::test]
async fn test_revoke_endpoint_is_idempotent() {
    let h = Harness::new();
    let u1 = h.add_user("u1@example.com");
    let issued = h.state.tokens.issue(u1.id).await.unwrap();

    for _ in 0..2 {
        let (status, body) = h
            .post_json("/api/extension/revoke", json!({"token": issued.token}))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"success": true}));
    }

    let row = h.store.token(&codec::hash(&issued.token)).unwrap();
    assert!(row.revoked);

    let (status, _) = h
        .post_json("/api/extension/revoke", json!({"token": codec::generate()}))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = h.post_json("/api/extension/revoke", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ═══════════════════════════════════════════════════════════════════
//  Plumbing
// ═══════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_health_and_security_headers() {
    let h = Harness::new();
    let req = Request::builder()
        .uri("/healthz")
        .body(Body::empty())
        .unwrap();
    let resp = tower::ServiceExt::oneshot(h.app(), req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get("cache-control").unwrap(), "no-store");
    assert_eq!(resp.headers().get("x-content-type-options").unwrap(), "nosniff");
    assert!(resp.headers().get("x-request-id").is_some());
}

#[tokio::test]
async fn test_readiness_follows_store() {
    let h = Harness::new();
    let ready = || Request::builder().uri("/readyz").body(Body::empty()).unwrap();

    let (status, _) = h.send(ready()).await;
    assert_eq!(status, StatusCode::OK);

    h.store.set_unavailable(true);
    let (status, _) = h.send(ready()).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_extension_origin_allowed_by_cors() {
    let h = Harness::new();
    let req = Request::builder()
        .method(Method::OPTIONS)
        .uri(VALIDATE)
        .header(header::ORIGIN, "chrome-extension://abcdefghijklmnop")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();
    let resp = tower::ServiceExt::oneshot(h.app(), req).await.unwrap();
    assert_eq!(
        resp.headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "chrome-extension://abcdefghijklmnop"
    );
}
