//! Application metrics.
//!
//! Counters and histograms go through the `metrics` facade; `main` installs
//! the Prometheus recorder and `/metrics` renders it.

use metrics::{counter, histogram};

/// Count one API request by endpoint and outcome.
pub fn record_request(endpoint: &'static str, ok: bool) {
    let status = if ok { "ok" } else { "error" };
    counter!("radar_api_requests_total", "endpoint" => endpoint, "status" => status).increment(1);
}

/// Record one field render.
pub fn record_render(duration_ms: f64, features: usize, gridded: bool) {
    histogram!("render_duration_ms").record(duration_ms);
    counter!("features_rendered_total").increment(features as u64);
    if gridded {
        counter!("grid_fallback_total").increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::PrometheusBuilder;

    #[test]
    fn test_metrics_render_through_recorder() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            record_request("get", true);
            record_render(12.0, 40, true);
        });

        let text = handle.render();
        assert!(text.contains("radar_api_requests_total"));
        assert!(text.contains("features_rendered_total 40"));
        assert!(text.contains("grid_fallback_total 1"));
    }
}
