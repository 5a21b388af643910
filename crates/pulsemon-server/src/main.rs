use anyhow::Result;
use pulsemon_notify::channels::email::EmailChannel;
use pulsemon_notify::channels::slack::SlackChannel;
use pulsemon_notify::channels::webhook::WebhookChannel;
use pulsemon_notify::dispatcher::NotificationDispatcher;
use pulsemon_server::app;
use pulsemon_server::config::ServerConfig;
use pulsemon_server::scheduler::EvaluationScheduler;
use pulsemon_server::state::AppState;
use pulsemon_storage::Store;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tokio::time::{interval, Duration};
use tracing_subscriber::EnvFilter;

#[allow(clippy::print_stderr)]
fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  pulsemon-server [config.toml]    Start the server");
}

#[tokio::main]
async fn main() -> Result<()> {
    pulsemon_common::id::init(1, 1);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("pulsemon=info".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(|s| s.as_str()) {
        Some("--help" | "-h") => {
            print_usage();
            Ok(())
        }
        arg => {
            let config_path = arg.unwrap_or("config/server.toml");
            run_server(config_path).await
        }
    }
}

fn build_dispatcher(config: &ServerConfig) -> NotificationDispatcher {
    let mut dispatcher = NotificationDispatcher::new();
    dispatcher.register(Box::new(WebhookChannel::new()));
    dispatcher.register(Box::new(SlackChannel));

    match &config.smtp {
        Some(smtp) => match EmailChannel::new(
            &smtp.host,
            smtp.port,
            smtp.username.as_deref(),
            smtp.password.as_deref(),
            &smtp.from,
        ) {
            Ok(channel) => dispatcher.register(Box::new(channel)),
            Err(e) => {
                tracing::error!(error = %e, "Failed to build email channel, email disabled");
            }
        },
        None => {
            tracing::info!("No [smtp] config, email channel disabled");
        }
    }

    dispatcher
}

async fn run_server(config_path: &str) -> Result<()> {
    let config = Arc::new(ServerConfig::load(config_path)?);

    tracing::info!(
        http_port = config.http_port,
        db = %config.database.url,
        "pulsemon-server starting"
    );

    std::fs::create_dir_all(&config.database.data_dir)?;
    let store = Arc::new(Store::new(&config.database.url).await?);

    let dispatcher = Arc::new(build_dispatcher(&config));
    tracing::info!(channels = ?dispatcher.channel_keys(), "Notification channels registered");

    let state = AppState::build(config.clone(), store.clone(), dispatcher);

    // HTTP/REST server
    let http_addr: SocketAddr = format!("0.0.0.0:{}", config.http_port).parse()?;
    let http_listener = tokio::net::TcpListener::bind(http_addr).await?;
    let http_server = axum::serve(http_listener, app::build_http_app(state.clone()));

    // Periodic metric-event cleanup task
    let retention_days = config.retention.metric_event_days;
    let cleanup_store = store.clone();
    let cleanup_handle = tokio::spawn(async move {
        let mut tick = interval(Duration::from_secs(3600)); // Every hour
        loop {
            tick.tick().await;
            match cleanup_store.cleanup_metric_events(retention_days).await {
                Ok(removed) if removed > 0 => {
                    tracing::info!(removed, "Cleaned up expired metric events")
                }
                Err(e) => tracing::error!(error = %e, "Metric event cleanup failed"),
                _ => {}
            }
        }
    });

    // Evaluation scheduler
    let scheduler_handle = if config.evaluation.enabled {
        let scheduler =
            EvaluationScheduler::new(state.evaluator.clone(), config.evaluation.tick_secs);
        Some(tokio::spawn(async move {
            scheduler.run().await;
        }))
    } else {
        tracing::info!("Evaluation scheduler disabled");
        None
    };

    tracing::info!(http = %http_addr, "Server started");

    tokio::select! {
        result = http_server.with_graceful_shutdown(async { signal::ctrl_c().await.ok(); }) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server error");
            }
        }
        _ = signal::ctrl_c() => {
            tracing::info!("Shutting down gracefully");
        }
    }

    cleanup_handle.abort();
    if let Some(handle) = scheduler_handle {
        handle.abort();
    }
    tracing::info!("Server stopped");

    Ok(())
}
