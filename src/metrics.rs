// src/metrics.rs
use axum::{routing::get, Router};
use metrics::describe_counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder. Call once, from the binary.
    pub fn init() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new().install_recorder()?;

        describe_counter!("punches_recorded_total", "Punches accepted by POST /punch");
        describe_counter!("gate_ticks_total", "Notification gate ticks started");
        describe_counter!("gate_tick_errors_total", "Gate ticks aborted by a store or send error");
        describe_counter!("texts_sent_total", "Reminder texts delivered, by reminder");
        describe_counter!("text_send_failures_total", "Reminder texts the provider rejected");
        describe_counter!("midnight_resets_total", "Midnight wipes of the in-memory store");

        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
