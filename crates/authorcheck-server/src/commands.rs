//! Subcommand implementations

use anyhow::{Context, Result};
use authorcheck_classifiers::harness;
use authorcheck_classifiers::{
    clean_dataset, AlgorithmRegistry, AuthorshipClassifier, Classifier, HarnessConfig,
    ModelFetcher, ServingConfig,
};
use authorcheck_core::EvaluationResult;
use metrics_exporter_prometheus::PrometheusHandle;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

use crate::routes::create_router;
use crate::state::AppState;

/// Make sure the configured artifact exists locally, downloading it if needed
pub async fn acquire_model(config: &ServingConfig) -> Result<bool> {
    let fetcher = ModelFetcher::new()?
        .with_drive_endpoint(config.drive_endpoint.clone())
        .with_sha256(config.model_sha256.clone());

    let downloaded = fetcher
        .ensure_url(&config.model_path, config.model_url.as_deref())
        .await
        .with_context(|| format!("Failed to acquire model at {}", config.model_path.display()))?;
    Ok(downloaded)
}

/// Startup phase: acquire then load the serving model
pub async fn load_classifier(config: &ServingConfig) -> Result<Arc<dyn Classifier>> {
    acquire_model(config).await?;
    let classifier = AuthorshipClassifier::from_artifact(&config.model_path)
        .with_context(|| format!("Failed to load model from {}", config.model_path.display()))?;
    Ok(Arc::new(classifier))
}

/// Run the prediction server until a shutdown signal arrives
pub async fn serve(config: ServingConfig, metrics_handle: PrometheusHandle) -> Result<()> {
    info!("Loading model...");
    let classifier = load_classifier(&config).await?;
    info!(model = classifier.name(), "Model ready");

    let state = AppState::new(classifier).with_metrics(metrics_handle);
    let app = create_router(state, &config.allowed_origins)?;

    let addr: SocketAddr = config
        .listen
        .parse()
        .with_context(|| format!("Invalid listen address '{}'", config.listen))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Run the harness on a blocking thread and print the comparison table
pub async fn train(config: HarnessConfig) -> Result<Vec<EvaluationResult>> {
    let results_path = config.results_path.clone();
    let results = tokio::task::spawn_blocking(move || {
        harness::run(&config, &AlgorithmRegistry::standard())
    })
    .await
    .context("Training task panicked")??;

    print_results(&results);
    println!("\nResults saved to {}", results_path.display());
    Ok(results)
}

/// Clean a raw dataset and report what was dropped
pub fn clean(input: &Path, output: &Path) -> Result<()> {
    let report = clean_dataset(input, output)?;
    println!("Rows read:                 {}", report.rows_read);
    println!("Rows dropped (missing):    {}", report.rows_dropped);
    println!("Rows written:              {}", report.rows_written);
    println!("Empty rows after cleaning: {}", report.empty_after_cleaning);
    println!("Cleaned dataset saved to {}", output.display());
    Ok(())
}

/// Acquire the model without serving it
pub async fn fetch(config: ServingConfig) -> Result<()> {
    if acquire_model(&config).await? {
        println!("Downloaded model to {}", config.model_path.display());
    } else {
        println!("Model already present at {}", config.model_path.display());
    }
    Ok(())
}

fn print_results(results: &[EvaluationResult]) {
    println!(
        "\n{:<22} {:>9} {:>9} {:>12} {:>10}",
        "model", "accuracy", "f1_score", "latency_sec", "retrained"
    );
    for r in results {
        println!(
            "{:<22} {:>9.4} {:>9.4} {:>12.2} {:>10}",
            r.model, r.accuracy, r.f1_score, r.latency_sec, r.retrained
        );
    }
}

/// Listen for shutdown signals (SIGTERM, SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    warn!("Shutdown signal received, stopping server...");
}
