use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use notify_dispatch::api::{ApiServer, AppState};
use notify_dispatch::config::AppConfig;
use notify_dispatch::database::repositories::{
    InMemoryJobRepository, InMemoryRecipientRepository, JobRepository, RecipientRepository,
};
use notify_dispatch::logging;
use notify_dispatch::notification::{DispatchWorkerPool, NotificationService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables before reading configuration
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env().context("Invalid configuration")?;

    let (logging_config, _log_guard) =
        logging::init_logging(&config.log_dir).context("Failed to initialize logging")?;
    let background_token = CancellationToken::new();
    logging_config.start_retention_cleanup(background_token.clone());

    let recipients: Arc<dyn RecipientRepository> = match &config.recipients_file {
        Some(path) => Arc::new(
            InMemoryRecipientRepository::load_from_file(path)
                .await
                .with_context(|| format!("Failed to load recipients from {}", path.display()))?,
        ),
        None => {
            warn!("NOTIFY_RECIPIENTS_FILE not set, using demo recipients");
            Arc::new(InMemoryRecipientRepository::with_demo_data())
        }
    };
    let jobs: Arc<dyn JobRepository> = Arc::new(InMemoryJobRepository::with_demo_data());

    let service = Arc::new(NotificationService::with_config(
        &config.notification,
        recipients.clone(),
        jobs.clone(),
    ));
    let pool = Arc::new(DispatchWorkerPool::start(
        service.clone(),
        config.notification.worker.clone(),
    ));

    let state = AppState::new(recipients, jobs, service, pool.clone())
        .with_logging_config(logging_config);
    let server = ApiServer::with_state(config.api.clone(), state);

    let server_token = server.cancel_token();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            // Keep serving; only a real Ctrl+C stops the server.
            error!(error = %e, "Failed to listen for Ctrl+C");
            return;
        }
        info!("Received Ctrl+C, shutting down");
        server_token.cancel();
    });

    let result = server.run().await;

    pool.shutdown().await;
    background_token.cancel();
    info!("notify-dispatch stopped");

    result.context("API server failed")
}
