use authorcheck_classifiers::Classifier;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Shared application state
///
/// Built once during startup, after the model has been acquired and loaded.
#[derive(Clone)]
pub struct AppState {
    /// Model answering `/predict`
    pub classifier: Arc<dyn Classifier>,

    /// Prometheus handle for rendering `/metrics`; absent when no recorder is installed
    pub metrics_handle: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        Self {
            classifier,
            metrics_handle: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }
}
