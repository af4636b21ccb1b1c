//! Integration tests for the bondrisk server API endpoints.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::NaiveDate;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use bondrisk_core::{CurvePoint, YieldCurve};
use bondrisk_engine::{EngineConfig, EngineError, RiskService, RiskServiceBuilder};
use bondrisk_ext_file::{create_in_memory_stores, StaticCurveSource};
use bondrisk_server::routes::create_router;
use bondrisk_server::{Server, ServerConfig};

fn test_curve(front: f64) -> YieldCurve {
    YieldCurve::new(
        "USD",
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
        vec![
            CurvePoint::new(1.0, front),
            CurvePoint::new(5.0, 0.03),
            CurvePoint::new(10.0, 0.04),
        ],
    )
    .unwrap()
}

fn build_service(config: EngineConfig) -> Result<RiskService, EngineError> {
    let stores = create_in_memory_stores();
    RiskServiceBuilder::new()
        .with_config(config)
        .with_identity(stores.identity)
        .with_portfolios(stores.portfolios)
        .with_cache_backend(stores.cache)
        .with_curve(test_curve(0.02))
        .build()
}

/// Create a router over in-memory stores and a fixed curve.
fn create_test_app() -> Router {
    let service = build_service(EngineConfig::default()).expect("Failed to build service");
    create_router(Arc::new(service))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = match body {
        Some(body) => Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

/// Register alice and create her default portfolio. Returns (user id, portfolio id).
async fn seed(app: &Router) -> (i64, i64) {
    let (status, body) = send(
        app,
        "POST",
        "/api/auth/register",
        Some(json!({ "username": "alice", "password": "pw" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let user_id = body["data"]["userId"].as_i64().unwrap();

    let (status, body) = send(
        app,
        "POST",
        "/api/portfolio/create",
        Some(json!({ "userId": user_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let portfolio_id = body["data"]["id"].as_i64().unwrap();
    (user_id, portfolio_id)
}

fn five_year_bond() -> Value {
    json!({
        "name": "UST 3 2031",
        "coupon": "0.03",
        "maturity": "2031-03-02",
        "price": "100",
        "quantity": 10
    })
}

#[tokio::test]
async fn test_health_and_status() {
    let app = create_test_app();

    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = send(&app, "GET", "/api/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["healthy"], true);
    assert_eq!(body["data"]["curve_name"], "USD");
}

#[tokio::test]
async fn test_auth_flow() {
    let app = create_test_app();
    let (user_id, _) = seed(&app).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        Some(json!({ "username": "alice", "password": "pw" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["userId"], user_id);

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        Some(json!({ "username": "alice", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _) = send(
        &app,
        "PUT",
        "/api/auth/password",
        Some(json!({ "username": "alice", "password": "pw", "newPassword": "pw2" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/login",
        Some(json!({ "username": "alice", "password": "pw" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app, "GET", "/api/auth/user/alice/id", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["userId"], user_id);

    let (status, _) = send(
        &app,
        "DELETE",
        "/api/auth/delete",
        Some(json!({ "username": "alice", "password": "pw2" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "GET", "/api/auth/user/alice/id", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let app = create_test_app();
    seed(&app).await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/register",
        Some(json!({ "username": "alice", "password": "again" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_market_endpoints() {
    let app = create_test_app();

    let (status, body) = send(&app, "GET", "/api/market/current-rate", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["rate"], 0.02);
    assert_eq!(body["data"]["tenor"], 1.0);

    let (status, body) = send(&app, "GET", "/api/market/yield-curve", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["bond_name"], "US Treasury");
    assert_eq!(body["data"]["points"].as_array().unwrap().len(), 3);

    let (status, body) = send(
        &app,
        "GET",
        "/api/market/yield-curve?bondName=Acme%202030",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["bond_name"], "Acme 2030");

    let (status, body) = send(&app, "GET", "/api/market/last-update", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["lastUpdate"].is_string());
}

#[tokio::test]
async fn test_portfolio_flow() {
    let app = create_test_app();
    let (user_id, portfolio_id) = seed(&app).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/portfolio/{portfolio_id}/bonds"),
        Some(five_year_bond()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let bond_id = body["data"]["id"].as_i64().unwrap();

    let (status, body) = send(&app, "GET", &format!("/api/portfolio/user/{user_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["portfolio"]["bonds"].as_array().unwrap().len(), 1);
    assert!(body["data"]["valuation"]["total_value"].as_f64().unwrap() > 0.0);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/portfolio/{portfolio_id}/stress-test"),
        Some(json!({ "shockBps": 100, "shockDirection": "up" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["pnl"].as_f64().unwrap() < 0.0);
    assert_eq!(body["data"]["direction"], "up");

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/portfolio/{portfolio_id}/risk-analysis"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["var_99"].as_f64().unwrap() > body["data"]["var_95"].as_f64().unwrap());
    assert!(body["data"]["dv01"].as_f64().unwrap() > 0.0);

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/portfolio/{portfolio_id}/bonds/{bond_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "GET", &format!("/api/portfolio/user/{user_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["portfolio"]["bonds"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_portfolio_errors() {
    let app = create_test_app();
    let (user_id, portfolio_id) = seed(&app).await;

    // Empty portfolio has no VaR.
    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/portfolio/{portfolio_id}/risk-analysis"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/portfolio/{portfolio_id}/stress-test"),
        Some(json!({ "shockBps": -10, "shockDirection": "up" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/portfolio/{portfolio_id}/stress-test"),
        Some(json!({ "shockBps": 10, "shockDirection": "sideways" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "POST", "/api/portfolio/999/risk-analysis", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/portfolio/user/{user_id}?portfolioName=Missing"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "POST",
        "/api/portfolio/create",
        Some(json!({ "userId": user_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let mut bad = five_year_bond();
    bad["quantity"] = json!(0);
    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/portfolio/{portfolio_id}/bonds"),
        Some(bad),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_csv_export() {
    let app = create_test_app();
    let (user_id, portfolio_id) = seed(&app).await;
    send(
        &app,
        "POST",
        &format!("/api/portfolio/{portfolio_id}/bonds"),
        Some(five_year_bond()),
    )
    .await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/export/portfolio/{user_id}/csv"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/csv"));
    assert!(response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .contains(&format!("portfolio_{user_id}.csv")));

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "BondId,BondName,Coupon,Maturity,Price,Quantity");
    assert_eq!(lines.len(), 2);
    assert!(lines[1].ends_with(",UST 3 2031,0.03,2031-03-02,100,10"));
}

fn request_from(origin: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri("/health")
        .header(header::ORIGIN, origin)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_cors_follows_configured_origins() {
    let config = ServerConfig {
        cors_origins: vec!["https://desk.example.com".to_string()],
        ..ServerConfig::default()
    };
    let service = build_service(config.engine.clone()).unwrap();
    let app = Server::new(config, Arc::new(service)).router();

    let allowed = app
        .clone()
        .oneshot(request_from("https://desk.example.com"))
        .await
        .unwrap();
    assert_eq!(
        allowed.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://desk.example.com"
    );

    let other = app.oneshot(request_from("https://elsewhere.example.com")).await.unwrap();
    assert!(other
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}

#[tokio::test]
async fn test_cors_defaults_to_any_origin() {
    let config = ServerConfig::default();
    let service = build_service(config.engine.clone()).unwrap();
    let app = Server::new(config, Arc::new(service)).router();

    let response = app.oneshot(request_from("https://anywhere.example.com")).await.unwrap();
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}

#[test]
fn test_zero_refresh_interval_is_rejected() {
    let config = ServerConfig::from_toml("[engine.cache]\ncurve_refresh_secs = 0").unwrap();
    assert!(matches!(
        build_service(config.engine),
        Err(EngineError::Config(_))
    ));
}

#[tokio::test]
async fn test_server_refreshes_curve_from_source() {
    let mut config = ServerConfig::default();
    config.engine.cache.curve_refresh_secs = 1;
    let service = Arc::new(build_service(config.engine.clone()).unwrap());
    assert_eq!(service.get_current_rate().await.unwrap().rate, 0.02);

    let idle = Server::new(config.clone(), service.clone());
    assert!(idle.spawn_refresh().is_none());

    let server = Server::new(config, service.clone())
        .with_curve_source(Arc::new(StaticCurveSource::new(test_curve(0.035))));
    let handle = server.spawn_refresh().expect("refresh task");

    tokio::time::sleep(std::time::Duration::from_millis(1500)).await;
    handle.abort();

    assert_eq!(service.get_current_rate().await.unwrap().rate, 0.035);
}
