use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use storefront::{
    app::build_app,
    auth::jwt::JwtKeys,
    config::JwtConfig,
    products::seed::seed_products,
    state::AppState,
};
use time::{Duration, OffsetDateTime};
use tower::ServiceExt;
use uuid::Uuid;

async fn test_app() -> (Router, AppState) {
    let state = AppState::fake();
    seed_products(state.products.as_ref()).await.unwrap();
    (build_app(state.clone()), state)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    auth: Option<&str>,
) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(auth) = auth {
        req = req.header(header::AUTHORIZATION, auth);
    }
    let req = match body {
        Some(body) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn register(app: &Router, name: &str, email: &str, password: &str) -> (StatusCode, Value) {
    send(
        app,
        Method::POST,
        "/api/auth/register",
        Some(json!({ "name": name, "email": email, "password": password })),
        None,
    )
    .await
}

async fn login(app: &Router, email: &str, password: &str) -> (StatusCode, Value) {
    send(
        app,
        Method::POST,
        "/api/auth/login",
        Some(json!({ "email": email, "password": password })),
        None,
    )
    .await
}

#[tokio::test]
async fn alice_registers_logs_in_and_lists_products() {
    let (app, _) = test_app().await;

    let (status, body) = register(&app, "Alice", "a@x.com", "secret1").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert!(body["data"]["id"].is_string());
    assert_eq!(body["data"]["email"], "a@x.com");
    assert!(body["data"].get("password").is_none());
    assert!(body["data"].get("password_hash").is_none());

    let (status, body) = login(&app, "a@x.com", "secret1").await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["name"], "Alice");

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/products",
        None,
        Some(&format!("Bearer {token}")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 3);
    let products = body["data"].as_array().unwrap();
    assert_eq!(products.len(), 3);
    assert!(products.iter().any(|p| p["name"] == "Office Chair" && p["inStock"] == false));

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/auth/me",
        None,
        Some(&format!("Bearer {token}")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "a@x.com");
}

#[tokio::test]
async fn duplicate_email_in_any_case_is_conflict() {
    let (app, _) = test_app().await;
    register(&app, "Alice", "a@x.com", "secret1").await;
    let (status, body) = register(&app, "Alicia", "A@X.COM", "secret2").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn register_with_missing_field_is_bad_request() {
    let (app, _) = test_app().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        Some(json!({ "email": "a@x.com", "password": "secret1" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Name, email, and password are required");
}

async fn send_raw(app: &Router, uri: &str, content_type: Option<&str>, body: &str) -> (StatusCode, Value) {
    let mut req = Request::builder().method(Method::POST).uri(uri);
    if let Some(content_type) = content_type {
        req = req.header(header::CONTENT_TYPE, content_type);
    }
    let req = req.body(Body::from(body.to_string())).unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn unusable_bodies_get_the_error_envelope() {
    let (app, _) = test_app().await;
    let cases = [
        ("/api/auth/register", Some("application/json"), r#"{"name":"Alice","email":5,"password":"secret1"}"#),
        ("/api/auth/register", Some("application/json"), "{not json"),
        ("/api/auth/register", None, r#"{"name":"Alice","email":"a@x.com","password":"secret1"}"#),
        ("/api/auth/login", Some("text/plain"), r#"{"email":"a@x.com","password":"secret1"}"#),
        ("/api/auth/forgot-password", Some("application/json"), ""),
        ("/api/auth/reset-password/abc", Some("application/json"), r#"{"newPassword":["x"]}"#),
    ];
    for (uri, content_type, body) in cases {
        let (status, json) = send_raw(&app, uri, content_type, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri} {body}");
        assert_eq!(json["success"], false, "{uri} {body}");
        assert_eq!(json["message"], "Invalid request body", "{uri} {body}");
    }
}

#[tokio::test]
async fn login_failures_share_status_and_message() {
    let (app, _) = test_app().await;
    register(&app, "Alice", "a@x.com", "secret1").await;

    let (s1, b1) = login(&app, "a@x.com", "wrong").await;
    let (s2, b2) = login(&app, "ghost@x.com", "secret1").await;
    assert_eq!(s1, StatusCode::UNAUTHORIZED);
    assert_eq!(s2, StatusCode::UNAUTHORIZED);
    assert_eq!(b1, b2);
}

#[tokio::test]
async fn forgot_password_message_does_not_reveal_registration() {
    let (app, _) = test_app().await;
    register(&app, "Alice", "a@x.com", "secret1").await;

    let (s1, known) = send(
        &app,
        Method::POST,
        "/api/auth/forgot-password",
        Some(json!({ "email": "a@x.com" })),
        None,
    )
    .await;
    let (s2, unknown) = send(
        &app,
        Method::POST,
        "/api/auth/forgot-password",
        Some(json!({ "email": "ghost@x.com" })),
        None,
    )
    .await;

    assert_eq!(s1, StatusCode::OK);
    assert_eq!(s2, StatusCode::OK);
    assert_eq!(known["message"], unknown["message"]);
    assert!(known["resetToken"].is_string());
    assert!(unknown.get("resetToken").is_none());
}

#[tokio::test]
async fn reset_password_flow_over_http() {
    let (app, _) = test_app().await;
    register(&app, "Alice", "a@x.com", "secret1").await;

    let (_, body) = send(
        &app,
        Method::POST,
        "/api/auth/forgot-password",
        Some(json!({ "email": "a@x.com" })),
        None,
    )
    .await;
    let token = body["resetToken"].as_str().unwrap().to_string();
    let uri = format!("/api/auth/reset-password/{token}");

    let (status, _) = send(&app, Method::POST, &uri, Some(json!({})), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        Method::POST,
        &uri,
        Some(json!({ "newPassword": "secret2" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Password reset successful");

    let (status, _) = login(&app, "a@x.com", "secret2").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        Method::POST,
        &uri,
        Some(json!({ "newPassword": "secret3" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid or expired token");
}

#[tokio::test]
async fn products_require_a_valid_bearer_token() {
    let (app, state) = test_app().await;
    let (_, body) = register(&app, "Alice", "a@x.com", "secret1").await;
    let id: Uuid = body["data"]["id"].as_str().unwrap().parse().unwrap();

    let foreign = JwtKeys::from_config(&JwtConfig {
        secret: "some-other-secret".into(),
        issuer: state.config.jwt.issuer.clone(),
        audience: state.config.jwt.audience.clone(),
        ttl_minutes: 5,
    })
    .sign(id, "a@x.com")
    .unwrap();
    let expired = state
        .keys
        .sign_at(id, "a@x.com", OffsetDateTime::now_utc() - Duration::hours(1))
        .unwrap();

    let cases: Vec<(Option<String>, &str)> = vec![
        (None, "Not authorized, token missing"),
        (Some("Token abc".into()), "Not authorized, token missing"),
        (Some(format!("Bearer {foreign}")), "Not authorized, token invalid"),
        (Some(format!("Bearer {expired}")), "Not authorized, token invalid"),
        (Some("Bearer not-a-jwt".into()), "Not authorized, token invalid"),
    ];

    for (auth, expected) in cases {
        let (status, body) = send(&app, Method::GET, "/api/products", None, auth.as_deref()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{auth:?}");
        assert_eq!(body["message"], expected, "{auth:?}");
    }
}

#[tokio::test]
async fn token_for_unknown_user_is_rejected() {
    let (app, state) = test_app().await;
    let token = state.keys.sign(Uuid::new_v4(), "ghost@x.com").unwrap();
    let (status, body) = send(
        &app,
        Method::GET,
        "/api/products",
        None,
        Some(&format!("Bearer {token}")),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Not authorized, user not found");
}

#[tokio::test]
async fn health_and_root_respond() {
    let (app, _) = test_app().await;
    let (status, body) = send(&app, Method::GET, "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "OK");

    let res = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"Backend is running");
}
