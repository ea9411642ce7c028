//! Lectorate API Gateway
//!
//! The entry point for all external API requests.
//! Handles:
//! - Authentication and authorization
//! - Transport-level rate limiting
//! - Request routing
//! - Observability (logging, metrics, tracing)

mod handlers;
mod middleware;

use axum::{
    extract::FromRef,
    routing::{delete, get, patch, post, put},
    Router,
};
use lectorate_common::{
    auth::JwtManager,
    config::AppConfig,
    db::DbPool,
    errors::AppError,
    metrics,
    notifier::AchievementNotifier,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DbPool,
    pub jwt: Arc<JwtManager>,
    pub notifier: Option<AchievementNotifier>,
}

impl FromRef<AppState> for Arc<JwtManager> {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    if config.observability.json_logging {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    info!("Starting Lectorate API Gateway v{}", lectorate_common::VERSION);

    // Initialize metrics
    metrics::register_metrics();
    if config.observability.metrics_port > 0 {
        let metrics_addr = SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
        PrometheusBuilder::new()
            .with_http_listener(metrics_addr)
            .set_buckets(metrics::LATENCY_BUCKETS)?
            .install()?;
        info!("Metrics exporter listening on {}", metrics_addr);
    }

    // Initialize database connection
    let db = DbPool::new(&config.database).await?;

    // Token validation for the identity collaborator
    let jwt_secret = config
        .auth
        .jwt_secret
        .as_deref()
        .ok_or_else(|| AppError::Configuration {
            message: "auth.jwt_secret is required".to_string(),
        })?;
    let jwt = Arc::new(JwtManager::new(jwt_secret, config.auth.jwt_expiration_secs));

    let notifier = AchievementNotifier::from_config(&config.achievements)?;

    let config = Arc::new(config);
    let state = AppState {
        config: config.clone(),
        db,
        jwt,
        notifier,
    };

    // Build the router
    let app = create_router(state, &config);

    // Start the server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
    });

    tokio::select! {
        joined = &mut server => joined??,
        _ = shutdown_signal() => {
            let _ = shutdown_tx.send(());
            // Bound the connection drain so a stuck client cannot hold
            // the process open past server.shutdown_timeout_secs
            match tokio::time::timeout(config.shutdown_timeout(), server).await {
                Ok(joined) => joined??,
                Err(_) => {
                    tracing::warn!("Graceful shutdown timed out, dropping open connections")
                }
            }
        }
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState, config: &AppConfig) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let mut router = Router::new()
        // Health endpoints (no auth)
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        // Comment endpoints
        .route("/comment", post(handlers::comments::create_comment))
        .route("/comment", get(handlers::comments::list_comments))
        .route("/comment/{uuid}", get(handlers::comments::get_comment))
        .route("/comment/{uuid}", patch(handlers::comments::update_comment))
        .route("/comment/{uuid}", delete(handlers::comments::delete_comment))
        .route("/comment/{uuid}/review", patch(handlers::comments::review_comment))
        // Reaction endpoints
        .route("/comment/{uuid}/like", put(handlers::reactions::like_comment))
        .route("/comment/{uuid}/dislike", put(handlers::reactions::dislike_comment))
        // Lecturer endpoints
        .route("/lecturer", post(handlers::lecturers::create_lecturer))
        .route("/lecturer", get(handlers::lecturers::list_lecturers))
        .route("/lecturer/{id}", get(handlers::lecturers::get_lecturer))
        .route("/lecturer/{id}", patch(handlers::lecturers::update_lecturer))
        .route("/lecturer/{id}", delete(handlers::lecturers::delete_lecturer));

    if config.rate_limit.enabled {
        let limiter = middleware::rate_limit::create_rate_limiter(
            config.rate_limit.requests_per_second,
            config.rate_limit.burst,
        );
        router = router.layer(axum::middleware::from_fn(move |req, next| {
            let limiter = limiter.clone();
            middleware::rate_limit::rate_limit_middleware(req, next, limiter)
        }));
    }

    router
        .layer(TimeoutLayer::new(config.request_timeout()))
        .layer(axum::middleware::from_fn(middleware::metrics::track_requests))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
