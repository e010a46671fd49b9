use std::sync::Arc;

use anyhow::Result;
use tokio::{net::TcpListener, signal};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use agro_analysis_worker::{
    analysis::TelemetryAnalyzer,
    api,
    config::{Config, HistoryBackend},
    consumer::QueueConsumer,
    db::{self, history::{HistoryStore, PgHistoryStore}},
    memory_store::InMemoryHistoryStore,
    metrics::MetricsRegistry,
    sqs::SqsQueue,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env (ignore error if file absent; env vars may be set externally)
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;

    let store: Arc<dyn HistoryStore> = match config.history_backend {
        HistoryBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is required for the postgres backend"))?;
            let pool = db::create_pool(database_url, config.database_max_connections).await?;
            db::run_migrations(&pool).await?;
            Arc::new(PgHistoryStore::new(pool))
        }
        HistoryBackend::Memory => {
            info!("Using in-memory history store; readings are lost on restart");
            Arc::new(InMemoryHistoryStore::new())
        }
    };

    let metrics = MetricsRegistry::new()?;
    let analyzer = Arc::new(TelemetryAnalyzer::new(store, metrics.clone()));

    let sqs = SqsQueue::connect(&config.sqs).await;
    info!(
        queue_url = %sqs.queue_url(),
        region = sqs.region().unwrap_or("unknown"),
        "SQS client ready"
    );

    let shutdown = CancellationToken::new();
    let consumer = QueueConsumer::new(Arc::new(sqs), analyzer, config.consumer_settings());
    let consumer_handle = {
        let token = shutdown.clone();
        tokio::spawn(async move { consumer.run(token).await })
    };

    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = TcpListener::bind(&addr).await?;
    info!(addr = %addr, "HTTP server listening");

    let serve_token = shutdown.clone();
    axum::serve(listener, api::router(metrics))
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            serve_token.cancel();
        })
        .await?;

    // The server can also stop on its own error path; make sure the consumer follows.
    shutdown.cancel();
    match consumer_handle.await {
        Ok(()) => info!("Consumer drained"),
        Err(e) => error!(error = %e, "Consumer task panicked"),
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
