#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use rpa_api::auth::cookie::CookieConfig;
use rpa_api::auth::jwt::JwtConfig;
use rpa_api::auth::password::hash_password;
use rpa_api::config::{ExportConfig, ServerConfig};
use rpa_api::routes;
use rpa_api::services::export::ExportOrchestrator;
use rpa_api::state::AppState;
use rpa_core::execution_status::is_terminal;
use rpa_core::polling::PollPolicy;
use rpa_core::types::DbId;
use rpa_db::models::execution::Execution;
use rpa_db::models::user::{CreateUser, User};
use rpa_db::repositories::{ExecutionRepo, UserRepo};
use sqlx::PgPool;
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

pub const TEST_PASSWORD: &str = "test_password_123";

/// Export settings with no scripts and a short poll.
pub fn test_export_config(output_dir: &Path) -> ExportConfig {
    ExportConfig {
        purchasing_script: None,
        sales_script: None,
        output_dir: output_dir.to_path_buf(),
        timeout: Duration::from_secs(10),
        poll: PollPolicy::new(3, Duration::from_millis(50)).unwrap(),
        sap_system: Some("QAS".to_string()),
        machine: "test-runner".to_string(),
    }
}

pub fn test_config(export: ExportConfig) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "test-secret-for-integration-tests".to_string(),
            access_token_expiry_mins: 60,
            refresh_token_expiry_days: 7,
        },
        cookie: CookieConfig::default(),
        export,
    }
}

/// Full router with the production middleware stack and no export scripts.
pub fn build_test_app(pool: PgPool) -> Router {
    let export = test_export_config(&std::env::temp_dir().join("rpa-api-tests"));
    build_test_app_with_exports(pool, export)
}

/// Full router with the given export settings.
pub fn build_test_app_with_exports(pool: PgPool, export: ExportConfig) -> Router {
    let config = test_config(export);
    let exports = Arc::new(ExportOrchestrator::new(pool.clone(), config.export.clone()));

    let state = AppState {
        pool,
        config: Arc::new(config),
        exports,
    };

    let cors = CorsLayer::new()
        .allow_origin(["http://localhost:5173".parse().unwrap()])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600));

    let request_id_header = HeaderName::from_static("x-request-id");

    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1", routes::api_routes())
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(cors)
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Insert a user with [`TEST_PASSWORD`].
pub async fn create_user(pool: &PgPool, email: &str, role_id: DbId) -> User {
    let password_hash = hash_password(TEST_PASSWORD).expect("hashing should succeed");
    UserRepo::create(
        pool,
        &CreateUser {
            email: email.to_string(),
            name: None,
            password_hash,
            role_id,
        },
    )
    .await
    .expect("user creation should succeed")
}

/// Log in through the API and return the access token.
pub async fn login_token(app: Router, email: &str) -> String {
    let body = serde_json::json!({ "email": email, "password": TEST_PASSWORD });
    let response = post_json(app, "/api/v1/auth/login", body).await;
    assert_eq!(response.status(), StatusCode::OK, "login must succeed");
    let json = body_json(response).await;
    json["access_token"]
        .as_str()
        .expect("access_token must be a string")
        .to_string()
}

/// Create a user with `role_id` and return it with an access token.
pub async fn user_with_token(pool: &PgPool, app: Router, email: &str, role_id: DbId) -> (User, String) {
    let user = create_user(pool, email, role_id).await;
    let token = login_token(app, email).await;
    (user, token)
}

/// Poll the history row until the background run finishes.
pub async fn wait_for_execution(pool: &PgPool, id: DbId) -> Execution {
    for _ in 0..200 {
        let execution = ExecutionRepo::find_by_id(pool, id)
            .await
            .expect("query should succeed")
            .expect("execution should exist");
        if is_terminal(execution.status_id) {
            return execution;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("execution {id} did not finish in time");
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should be readable")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .expect("body should be readable")
        .to_bytes()
        .to_vec()
}

async fn send(app: Router, request: Request<Body>) -> Response {
    app.oneshot(request).await.expect("request should complete")
}

fn builder(method: Method, uri: &str, token: Option<&str>) -> axum::http::request::Builder {
    let builder = Request::builder().method(method).uri(uri);
    match token {
        Some(token) => builder.header(AUTHORIZATION, format!("Bearer {token}")),
        None => builder,
    }
}

pub async fn get(app: Router, uri: &str) -> Response {
    send(app, builder(Method::GET, uri, None).body(Body::empty()).unwrap()).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, builder(Method::GET, uri, Some(token)).body(Body::empty()).unwrap()).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    let request = builder(Method::POST, uri, None)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn post_json_auth(app: Router, uri: &str, body: serde_json::Value, token: &str) -> Response {
    let request = builder(Method::POST, uri, Some(token))
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn post_empty_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, builder(Method::POST, uri, Some(token)).body(Body::empty()).unwrap()).await
}

pub async fn post_text_auth(app: Router, uri: &str, body: &str, token: &str) -> Response {
    let request = builder(Method::POST, uri, Some(token))
        .header(CONTENT_TYPE, "text/plain")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn put_json_auth(app: Router, uri: &str, body: serde_json::Value, token: &str) -> Response {
    let request = builder(Method::PUT, uri, Some(token))
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, builder(Method::DELETE, uri, Some(token)).body(Body::empty()).unwrap()).await
}
