use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, HeaderValue, Method, StatusCode};
use axum::Router;
use sqlx::PgPool;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use rpa_api::config::ServerConfig;
use rpa_api::routes;
use rpa_api::services::export::ExportOrchestrator;
use rpa_api::state::AppState;
use rpa_core::process::Process;

const REQUEST_ID: &str = "x-request-id";

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = config.port,
        output_dir = %config.export.output_dir.display(),
        "Configuration loaded",
    );

    let pool = connect_database().await;
    let exports = start_exports(&pool, &config).await;

    let addr = SocketAddr::new(
        config.host.parse().expect("HOST must be an IP address"),
        config.port,
    );
    let state = AppState {
        pool,
        config: Arc::new(config),
        exports,
    };
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .unwrap_or_else(|e| panic!("Cannot bind {addr}: {e}"));
    tracing::info!(%addr, "RPA portal listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // Runs cut off here are failed by `recover_stale` on the next start.
    tracing::info!("Shut down");
}

/// `RUST_LOG` filters; `LOG_FORMAT=json` switches to one JSON object per line.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("rpa_api=debug,rpa_core=info,tower_http=debug"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn connect_database() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = rpa_db::create_pool(&url)
        .await
        .expect("Failed to connect to database");
    rpa_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    rpa_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database ready");
    pool
}

/// Build the orchestrator and fail the runs a previous process left open.
async fn start_exports(pool: &PgPool, config: &ServerConfig) -> Arc<ExportOrchestrator> {
    let exports = Arc::new(ExportOrchestrator::new(pool.clone(), config.export.clone()));
    if let Err(e) = exports.recover_stale().await {
        tracing::error!(error = %e, "Could not recover unfinished executions");
    }
    for process in Process::ALL {
        if exports.config().script_for(process).is_none() {
            tracing::warn!(%process, "No automation script configured; runs will be rejected");
        }
    }
    exports
}

fn build_app(state: AppState) -> Router {
    let config = Arc::clone(&state.config);
    let request_id = HeaderName::from_static(REQUEST_ID);

    // Layers run bottom-up: CORS sees the request first.
    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1", routes::api_routes())
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.request_timeout_secs),
        ))
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .layer(cors_layer(&config.cors_origins))
        .with_state(state)
}

/// Credentialed CORS for the portal front end. Panics on a malformed origin.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .map(|o| {
            o.parse()
                .unwrap_or_else(|e| panic!("Invalid CORS origin '{o}': {e}"))
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Ctrl-C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("SIGINT received, draining connections"),
        () = terminate => tracing::info!("SIGTERM received, draining connections"),
    }
}
