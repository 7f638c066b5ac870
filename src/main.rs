//! budgetLedger - Personal Budgeting Consistency Pipeline
//!
//! Backend service keeping the budget ledger correct under two sources of
//! asynchronous change: domain events published through a transactional
//! outbox, and an external cursor-based bank transaction feed reconciled into
//! the ledger.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use budget_ledger::handlers::{
    BudgetExceededHandler, EventHandler, LogNotificationSink, TransactionRecordedHandler,
};
use budget_ledger::jobs::{PipelineScheduler, PipelineSchedulerConfig};
use budget_ledger::outbox::{OutboxPublisher, PgOutboxStore, PublisherConfig};
use budget_ledger::repository::{
    PgBankTransactionRepository, PgBudgetRepository, PgSyncCursorRepository,
};
use budget_ledger::sync::{SyncOutcome, SyncReconciler, SyncRequest, UnconfiguredFeed};
use budget_ledger::{db, AppError, Config};

/// Initialize tracing/logging
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "budget_ledger=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Shared state for the HTTP surface
#[derive(Clone)]
struct AppState {
    reconciler: Arc<SyncReconciler>,
}

/// Build the application router
fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/sync", post(trigger_sync))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Body for the sync trigger endpoint
#[derive(Debug, Deserialize)]
struct SyncTriggerRequest {
    user_id: Uuid,
    access_token: String,
    cursor: Option<String>,
    count: Option<i64>,
}

/// Run one page of feed reconciliation; the caller observes `has_more` and
/// keeps paging.
async fn trigger_sync(
    State(state): State<AppState>,
    Json(body): Json<SyncTriggerRequest>,
) -> Result<Json<SyncOutcome>, AppError> {
    let outcome = state
        .reconciler
        .run_sync_page(SyncRequest {
            user_id: body.user_id,
            access_token: body.access_token,
            cursor: body.cursor,
            count: body.count,
        })
        .await?;

    Ok(Json(outcome))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    init_tracing();

    let config = Config::from_env()?;
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!(environment = %config.environment, "Starting budgetLedger server");
    tracing::info!("Connecting to database...");

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;

    if !db::check_schema(&pool).await? {
        tracing::error!("Database schema is not complete. Please run migrations.");
        return Err(anyhow::anyhow!("Database schema incomplete"));
    }

    tracing::info!("Database connected successfully");

    // Collaborators
    let budgets = Arc::new(PgBudgetRepository::new(pool.clone()));
    let transactions = Arc::new(PgBankTransactionRepository::new(pool.clone()));
    let cursors = Arc::new(PgSyncCursorRepository::new(pool.clone()));
    let outbox = Arc::new(PgOutboxStore::new(pool.clone()));
    let notifier = Arc::new(LogNotificationSink);

    // Event handlers fed by the outbox publisher
    let handlers: Vec<Arc<dyn EventHandler>> = vec![
        Arc::new(TransactionRecordedHandler::new(
            budgets.clone(),
            notifier.clone(),
        )),
        Arc::new(BudgetExceededHandler::new(notifier.clone())),
    ];

    let publisher = Arc::new(OutboxPublisher::with_config(
        outbox,
        handlers,
        PublisherConfig {
            batch_size: config.outbox_batch_size,
        },
    ));

    // Feed reconciliation; the provider client is wired by the deployment
    let reconciler = Arc::new(
        SyncReconciler::new(Arc::new(UnconfiguredFeed), transactions, cursors)
            .with_page_size(config.sync_page_size),
    );

    // Background pipeline with shutdown wiring
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = PipelineScheduler::with_config(
        publisher,
        PipelineSchedulerConfig {
            publish_interval: config.outbox_tick_interval(),
        },
    );
    let scheduler_handle = scheduler.start(shutdown_rx);

    tracing::info!("Listening on http://{}", addr);

    let app = build_router(AppState { reconciler });

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Cleanup
    tracing::info!("Server shutting down...");
    let _ = shutdown_tx.send(true);
    let _ = scheduler_handle.await;
    pool.close().await;
    tracing::info!("Database connections closed. Goodbye!");

    Ok(())
}

/// Shutdown signal handler for graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}
