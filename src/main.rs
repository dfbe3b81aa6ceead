use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dashpulse::{
    config::{load_dotenv, AppConfig},
    notify::{
        AppriseClient, AppriseNotifier, AppriseSettings, NoopNotifier, NotificationPolicy,
        Notifier,
    },
    widget::ContentWatcher,
    AppState, EventHub,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dashpulse=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Env file values never override variables that are already set
    let dotenv_path = std::env::var("DOTENV_PATH").unwrap_or_else(|_| ".env".to_string());
    load_dotenv(&dotenv_path)?;
    let config = AppConfig::from_env()?;

    info!("Starting dashboard event server");

    let hub = if config.events_enabled {
        Some(EventHub::new(config.hub.clone()))
    } else {
        warn!("Events disabled, streams will be refused");
        None
    };

    let notifier: Arc<dyn Notifier> = match AppriseSettings::from_env() {
        Some(settings) => {
            info!(endpoint = %settings.notify_endpoint(), "Apprise notifications configured");
            Arc::new(AppriseNotifier::new(
                AppriseClient::new(settings)?,
                NotificationPolicy::from_env(),
            ))
        }
        None => Arc::new(NoopNotifier),
    };

    let watcher = Arc::new(ContentWatcher::new(notifier, NotificationPolicy::from_env()));

    let shutdown = CancellationToken::new();
    let app_state = AppState::new(
        hub.clone(),
        watcher,
        shutdown.clone(),
        config.keepalive_interval,
    );
    let app = dashpulse::app(app_state);

    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    info!(address = %config.bind_address(), "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    if let Some(hub) = hub {
        hub.shutdown();
    }
    info!("Graceful shutdown complete");
    Ok(())
}

/// Waits for SIGINT/SIGTERM, then cancels every open stream so the server can drain
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT, starting graceful shutdown"),
        _ = terminate => info!("Received SIGTERM, starting graceful shutdown"),
    }

    shutdown.cancel();
}
