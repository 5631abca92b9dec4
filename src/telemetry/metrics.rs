use anyhow::{Context, Result};
use opentelemetry::metrics::MeterProvider;
use opentelemetry_prometheus::exporter;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use prometheus::{Encoder, Registry, TextEncoder};
use std::sync::Arc;
use tracing::info;

/// OTEL metrics with a Prometheus registry behind them
pub struct Metrics {
    registry: Registry,
    meter_provider: SdkMeterProvider,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}

impl Metrics {
    /// Create the OTEL → Prometheus pipeline and register the coreguard counters
    pub fn new() -> Result<Arc<Self>> {
        let registry = Registry::new();

        let exporter = exporter()
            .with_registry(registry.clone())
            .build()
            .context("failed to build prometheus exporter")?;

        let meter_provider = SdkMeterProvider::builder().with_reader(exporter).build();

        opentelemetry::global::set_meter_provider(meter_provider.clone());
        counters::init(&meter_provider.meter("coreguard"));

        info!("OTEL metrics configured with Prometheus exporter");

        Ok(Arc::new(Self {
            registry,
            meter_provider,
        }))
    }

    /// Render metrics in Prometheus text format
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let families = self.registry.gather();

        let mut buffer = Vec::new();
        encoder
            .encode(&families, &mut buffer)
            .context("failed to encode metrics")?;

        String::from_utf8(buffer).context("metrics output is not UTF-8")
    }

    /// Flush and stop the meter provider
    pub fn shutdown(&self) {
        if let Err(e) = self.meter_provider.shutdown() {
            tracing::warn!(error = %e, "meter provider shutdown failed");
        }
    }
}

/// Reload and monitor metrics with the `coreguard_` prefix.
///
/// Recording is a no-op until [`init`](counters::init) has run, so library
/// code can record unconditionally.
pub mod counters {
    use opentelemetry::metrics::{Counter, Gauge, Histogram};
    use opentelemetry::KeyValue;
    use std::sync::OnceLock;

    static RELOAD_ATTEMPTS_TOTAL: OnceLock<Counter<u64>> = OnceLock::new();
    static RELOAD_OUTCOMES_TOTAL: OnceLock<Counter<u64>> = OnceLock::new();
    static RELOAD_DURATION: OnceLock<Histogram<f64>> = OnceLock::new();
    static STATUS_POLLS_TOTAL: OnceLock<Counter<u64>> = OnceLock::new();
    static STATUS_CHECKS_TOTAL: OnceLock<Counter<u64>> = OnceLock::new();
    static SCHEMA_DRIFT_TOTAL: OnceLock<Counter<u64>> = OnceLock::new();
    static CORE_UP: OnceLock<Gauge<i64>> = OnceLock::new();

    fn kv(key: &'static str, value: &str) -> KeyValue {
        KeyValue::new(key, value.to_string())
    }

    fn result(success: bool) -> &'static str {
        if success {
            "success"
        } else {
            "failure"
        }
    }

    /// Register every instrument on the given meter
    pub fn init(meter: &opentelemetry::metrics::Meter) {
        let _ = RELOAD_ATTEMPTS_TOTAL.set(
            meter
                .u64_counter("coreguard_reload_attempts_total")
                .with_description("RELOAD attempts by core and result")
                .build(),
        );
        let _ = RELOAD_OUTCOMES_TOTAL.set(
            meter
                .u64_counter("coreguard_reload_outcomes_total")
                .with_description("Completed reload_core calls by core and result")
                .build(),
        );
        let _ = RELOAD_DURATION.set(
            meter
                .f64_histogram("coreguard_reload_duration_seconds")
                .with_description("Wall time of a reload_core call including backoff")
                .build(),
        );
        let _ = STATUS_POLLS_TOTAL.set(
            meter
                .u64_counter("coreguard_status_polls_total")
                .with_description("STATUS polls during verification by result")
                .build(),
        );
        let _ = STATUS_CHECKS_TOTAL.set(
            meter
                .u64_counter("coreguard_status_checks_total")
                .with_description("Monitor invocations by outcome")
                .build(),
        );
        let _ = SCHEMA_DRIFT_TOTAL.set(
            meter
                .u64_counter("coreguard_schema_drift_total")
                .with_description("Schema version mismatches detected")
                .build(),
        );
        let _ = CORE_UP.set(
            meter
                .i64_gauge("coreguard_core_up")
                .with_description("1 when the last check saw a responding core")
                .build(),
        );
    }

    pub fn reload_attempt(core: &str, success: bool) {
        if let Some(c) = RELOAD_ATTEMPTS_TOTAL.get() {
            c.add(1, &[kv("core", core), kv("result", result(success))]);
        }
    }

    pub fn reload_outcome(core: &str, success: bool, duration_secs: f64) {
        if let Some(c) = RELOAD_OUTCOMES_TOTAL.get() {
            c.add(1, &[kv("core", core), kv("result", result(success))]);
        }
        if let Some(h) = RELOAD_DURATION.get() {
            h.record(duration_secs, &[kv("core", core)]);
        }
    }

    pub fn status_poll(core: &str, confirmed: bool) {
        if let Some(c) = STATUS_POLLS_TOTAL.get() {
            c.add(1, &[kv("core", core), kv("result", result(confirmed))]);
        }
    }

    /// `outcome` is one of `skipped`, `validated` or `failed`
    pub fn status_check(outcome: &str) {
        if let Some(c) = STATUS_CHECKS_TOTAL.get() {
            c.add(1, &[kv("outcome", outcome)]);
        }
    }

    pub fn schema_drift() {
        if let Some(c) = SCHEMA_DRIFT_TOTAL.get() {
            c.add(1, &[]);
        }
    }

    pub fn core_up(core: &str, up: bool) {
        if let Some(g) = CORE_UP.get() {
            g.record(i64::from(up), &[kv("core", core)]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_exposes_recorded_counters() {
        let metrics = Metrics::new().unwrap();
        counters::reload_attempt("main", true);
        counters::status_check("validated");

        let text = metrics.render().unwrap();
        assert!(text.contains("coreguard_reload_attempts"));
        assert!(text.contains("coreguard_status_checks"));
    }

    #[test]
    fn test_recording_before_init_is_noop() {
        counters::schema_drift();
        counters::core_up("main", false);
    }
}
