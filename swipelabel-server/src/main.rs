use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use swipelabel_server::config::Config;
use swipelabel_server::repository::CatalogImport;
use swipelabel_server::{
    http, AppState, ReviewController, ReviewRepository, S3UrlSigner, SqliteRepository,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    info!(
        "Starting swipelabel review service ({})",
        swipelabel_core::service_version()
    );

    let config =
        Config::from_env().context("Failed to load configuration from environment variables")?;

    let db_path = config.database_path();
    info!("Using review database: {}", db_path.display());
    let repository =
        SqliteRepository::new(&db_path).context("Failed to initialize SQLite database")?;

    if let Some(path) = &config.catalog_import_path {
        let catalog = CatalogImport::load(path)?;
        info!(
            "Importing {} reviewers and {} images from {}",
            catalog.reviewers.len(),
            catalog.images.len(),
            path.display()
        );
        repository
            .import_catalog(&catalog)
            .await
            .context("Failed to import catalog")?;
    }

    let signer = S3UrlSigner::new(
        &config.aws_region,
        &config.s3_bucket,
        &config.aws_access_key,
        &config.aws_secret_key,
    )?;
    info!(
        "Signing image URLs for bucket {} in {}",
        config.s3_bucket, config.aws_region
    );

    let controller =
        ReviewController::new(Arc::new(repository), Arc::new(signer), config.timeouts);
    let app = http::app(Arc::new(AppState::new(controller)));

    let listener = TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .with_context(|| format!("Failed to bind port {}", config.port))?;
    info!("Server listening on port {}", config.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(http::shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}
