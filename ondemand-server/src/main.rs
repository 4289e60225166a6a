//! On-Demand Dashboard Server
//!
//! Keeps dashboards in the hot or the archive tier according to the
//! configured rules, on a schedule and on user request.

mod api;
mod config;
mod error;
mod lifecycle;
mod models;
mod storage;

use std::sync::Arc;

use axum::{Router, http::Method};
use clap::Parser;
use ondemand::manager::DashboardManager;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::storage::sqlite::SqliteStore;

/// Application state shared across handlers
pub struct AppState {
    pub manager: DashboardManager,
    pub config: Config,
}

/// Build the HTTP application
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        // API routes
        .nest("/api/v1", api::dashboard::router())
        // Everything else goes through redirect path parsing
        .fallback(api::redirect::redirect)
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers(Any),
        )
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "ondemand_server=debug,ondemand_dashboard=info,tower_http=debug".into()
            }),
        )
        .init();

    // Parse CLI args; malformed rules stop the process here
    let config = Config::parse();
    let context = config.manager_context()?;
    info!(
        rules = context.rules.len(),
        on_demand = %context.on_demand_name,
        "Starting ondemand-server on {}:{}",
        config.host,
        config.port
    );

    // Initialize database
    let store = SqliteStore::new(&config.db_path).await?;
    store.run_migrations().await?;

    let manager = DashboardManager::new(context, Arc::new(store.hot()), Arc::new(store.archive()));

    // Build app state
    let state = Arc::new(AppState {
        manager,
        config: config.clone(),
    });

    // Start scheduled reconciliation task
    let job_state = Arc::clone(&state);
    tokio::spawn(async move {
        lifecycle::scheduled_job_task(job_state).await;
    });

    let router = app(state);

    // Start server
    let addr = format!("{}:{}", config.host, config.port);

    if let (Some(cert_path), Some(key_path)) = (&config.tls_cert, &config.tls_key) {
        // TLS enabled
        info!("TLS enabled with cert: {}", cert_path);
        let tls_config = config::load_tls_config(cert_path, key_path)?;
        let listener = tokio::net::TcpListener::bind(&addr).await?;

        axum_server::from_tcp_rustls(listener.into_std()?, tls_config)
            .serve(router.into_make_service())
            .await?;
    } else {
        // Plain HTTP
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!("Listening on http://{}", addr);
        axum::serve(listener, router).await?;
    }

    Ok(())
}
