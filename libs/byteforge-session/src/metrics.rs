use lazy_static::lazy_static;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounterVec, Opts, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    pub static ref RUNS_TOTAL: IntCounterVec = {
        let c = IntCounterVec::new(
            Opts::new("byteforge_runs_total", "Settled runs by outcome"),
            &["outcome"],
        )
        .unwrap();
        REGISTRY.register(Box::new(c.clone())).ok();
        c
    };

    pub static ref RUNS_REJECTED: IntCounterVec = {
        let c = IntCounterVec::new(
            Opts::new("byteforge_runs_rejected_total", "Run triggers refused before dispatch"),
            &["reason"],
        )
        .unwrap();
        REGISTRY.register(Box::new(c.clone())).ok();
        c
    };

    pub static ref RUN_DURATION_MS: Histogram = {
        let h = Histogram::with_opts(
            HistogramOpts::new(
                "byteforge_run_duration_ms",
                "Wall time between dispatch and settlement of a run",
            )
            .buckets(vec![
                50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0, 30000.0,
            ]),
        )
        .unwrap();
        REGISTRY.register(Box::new(h.clone())).ok();
        h
    };
}

pub const OUTCOME_SUCCEEDED: &str = "succeeded";
pub const OUTCOME_PROGRAM_ERROR: &str = "program_error";
pub const OUTCOME_TRANSPORT_ERROR: &str = "transport_error";
pub const OUTCOME_CANCELLED: &str = "cancelled";

pub const REJECT_UNAUTHENTICATED: &str = "unauthenticated";
pub const REJECT_CONCURRENT: &str = "concurrent";

pub fn record_outcome(outcome: &str, elapsed_ms: u64) {
    RUNS_TOTAL.with_label_values(&[outcome]).inc();
    RUN_DURATION_MS.observe(elapsed_ms as f64);
}

pub fn record_rejection(reason: &str) {
    RUNS_REJECTED.with_label_values(&[reason]).inc();
}

/// Render all metrics in the Prometheus text format
pub fn gather() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if encoder.encode(&REGISTRY.gather(), &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gather_includes_recorded_series() {
        record_outcome(OUTCOME_SUCCEEDED, 42);
        record_rejection(REJECT_CONCURRENT);

        let text = gather();
        assert!(text.contains("byteforge_runs_total"));
        assert!(text.contains("outcome=\"succeeded\""));
        assert!(text.contains("byteforge_runs_rejected_total"));
        assert!(text.contains("byteforge_run_duration_ms"));
    }
}
