//! Session counters. Recorded through the `metrics` facade; without an
//! installed recorder they are no-ops.

use metrics::counter;

pub fn record_request(method: &str, status: u16) {
    counter!(
        "session_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_refresh(outcome: &'static str) {
    counter!("session_refresh_total", "outcome" => outcome).increment(1);
}

pub fn record_context_switch(outcome: &'static str) {
    counter!("session_context_switch_total", "outcome" => outcome).increment(1);
}

pub fn record_classified_error(code: Option<&str>) {
    counter!(
        "session_classified_errors_total",
        "code" => code.unwrap_or("none").to_string()
    )
    .increment(1);
}
