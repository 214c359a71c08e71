use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled || PROM_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);

    metrics::describe_counter!(
        "quiz_attempts_started_total",
        "Quiz attempts created by the start transition"
    );
    metrics::describe_counter!(
        "quiz_attempts_resumed_total",
        "Start calls that resumed an in-progress attempt"
    );
    metrics::describe_counter!(
        "quiz_attempts_closed_total",
        "Attempts moved to a terminal status, by status and trigger"
    );
    metrics::describe_counter!("content_completions_total", "Newly completed content units");
    metrics::describe_counter!("certificates_issued_total", "Certificates created");

    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}
