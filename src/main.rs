use axum::{
    routing::{get, post},
    Router,
};
use assessment_backend::{
    config::{get_config, init_config},
    database::pool::create_pool,
    middleware::{cors::permissive_cors, rate_limit},
    routes, AppState,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    init_config()?;
    let config = get_config();

    let pool = create_pool().await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let app_state = AppState::new(pool);

    let rps_state = rate_limit::new_rps_state(config.public_rps);

    let api = Router::new()
        .route("/api/attempts/:id/answers", post(routes::attempts::save_answers))
        .route("/api/attempts/:id/evaluate", post(routes::attempts::evaluate_attempt))
        .route("/api/attempts/:id/submit", post(routes::attempts::submit_attempt))
        .route("/api/coding-questions/:id/run", post(routes::submissions::run_code))
        .route("/api/coding-questions/:id/submit", post(routes::submissions::submit_code))
        .route("/api/coding-questions/:id/stats", get(routes::submissions::submission_stats))
        .layer(axum::middleware::from_fn_with_state(
            rps_state,
            rate_limit::rps_middleware,
        ));

    let app = Router::new()
        .route("/health", get(routes::health::health))
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .layer(permissive_cors())
        .with_state(app_state);

    let listener = TcpListener::bind(&config.server_address).await?;
    info!("Listening on {}", config.server_address);
    axum::serve(listener, app).await?;

    Ok(())
}
