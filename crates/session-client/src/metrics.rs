//! Session metrics
//!
//! - `session_requests_total` (counter): label `outcome`
//! - `session_refresh_total` (counter): label `outcome`
//! - `session_refresh_batch_size` (histogram): requests resolved per refresh cycle
//!
//! Nothing here installs a recorder; without one these calls are no-ops.

/// Record the final outcome of one pipeline request.
pub fn record_request(outcome: &'static str) {
    metrics::counter!("session_requests_total", "outcome" => outcome).increment(1);
}

/// Record the end of one refresh cycle.
///
/// `outcome` is `success`, `failure` or `missing_credential`.
pub fn record_refresh(outcome: &'static str, batch_size: usize) {
    metrics::counter!("session_refresh_total", "outcome" => outcome).increment(1);
    metrics::histogram!("session_refresh_batch_size").record(batch_size as f64);
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle, PrometheusRecorder};

    fn isolated_recorder() -> (PrometheusRecorder, PrometheusHandle) {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        (recorder, handle)
    }

    #[test]
    fn record_functions_do_not_panic_without_recorder() {
        record_request("success");
        record_refresh("failure", 3);
    }

    #[test]
    fn request_outcomes_are_labelled() {
        let (recorder, handle) = isolated_recorder();
        let _guard = metrics::set_default_local_recorder(&recorder);

        record_request("success");
        record_request("network_error");

        let output = handle.render();
        assert!(output.contains("session_requests_total"), "got: {output}");
        assert!(output.contains("outcome=\"success\""));
        assert!(output.contains("outcome=\"network_error\""));
    }

    #[test]
    fn refresh_records_counter_and_batch_size() {
        let (recorder, handle) = isolated_recorder();
        let _guard = metrics::set_default_local_recorder(&recorder);

        record_refresh("success", 4);

        let output = handle.render();
        assert!(output.contains("session_refresh_total"), "got: {output}");
        assert!(output.contains("outcome=\"success\""));
        assert!(output.contains("session_refresh_batch_size"));
    }
}
