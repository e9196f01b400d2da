//! authorcheck
//!
//! Classifies text as human-written or AI-generated. `train` compares the
//! registered algorithms on a labeled dataset, `serve` answers predictions
//! from one trained artifact.

use anyhow::Result;
use authorcheck_classifiers::{HarnessConfig, ServingConfig};
use authorcheck_server::cli::{Cli, Commands};
use authorcheck_server::commands;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusHandle;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Serve {
            config,
            model_path,
            model_url,
            listen,
        } => {
            info!("Starting authorcheck server");
            let mut config = ServingConfig::load(&config)?;
            if let Some(path) = model_path {
                config.model_path = path;
            }
            if let Some(url) = model_url {
                config.model_url = Some(url);
            }
            if let Some(listen) = listen {
                config.listen = listen;
            }
            info!("Model: {}", config.model_path.display());

            let metrics_handle = init_metrics()?;
            commands::serve(config, metrics_handle).await?;
        }
        Commands::Train {
            config,
            data,
            model_dir,
            results,
            algorithms,
        } => {
            let mut config = HarnessConfig::load(&config)?;
            if let Some(data) = data {
                config.data_path = data;
            }
            if let Some(model_dir) = model_dir {
                config.model_dir = model_dir;
            }
            if let Some(results) = results {
                config.results_path = results;
            }
            if !algorithms.is_empty() {
                config.algorithms = algorithms;
            }
            commands::train(config).await?;
        }
        Commands::Clean { input, output } => {
            commands::clean(&input, &output)?;
        }
        Commands::Fetch {
            config,
            model_path,
            model_url,
        } => {
            let mut config = ServingConfig::load(&config)?;
            if let Some(path) = model_path {
                config.model_path = path;
            }
            if let Some(url) = model_url {
                config.model_url = Some(url);
            }
            commands::fetch(config).await?;
        }
    }

    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("authorcheck=debug,authorcheck_classifiers=debug,authorcheck_server=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("authorcheck=info,authorcheck_classifiers=info,authorcheck_server=info")
        })
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Initialize metrics exporter and return handle for rendering
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    metrics::describe_counter!(
        "authorcheck_predictions_total",
        "Total number of predictions served, by label"
    );
    metrics::describe_histogram!(
        "authorcheck_prediction_latency_us",
        metrics::Unit::Microseconds,
        "Prediction latency in microseconds"
    );
    metrics::describe_counter!(
        "authorcheck_downloads_total",
        "Model artifacts downloaded, by source kind"
    );

    info!("Metrics exporter initialized");
    Ok(handle)
}
