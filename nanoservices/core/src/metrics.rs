use once_cell::sync::Lazy;
use prometheus::{CounterVec, Encoder, HistogramVec, Opts, Registry, TextEncoder};

// Global registry and metrics are initialized lazily.
static REGISTRY: Lazy<Registry> =
    Lazy::new(|| Registry::new_custom(Some("starlift_core".to_string()), None).unwrap());

static TASK_SETTLEMENTS: Lazy<CounterVec> = Lazy::new(|| {
    let opts = Opts::new(
        "task_settlements_total",
        "Tasks settled, labelled by terminal state",
    );
    let c = CounterVec::new(opts, &["pipeline", "task", "state"]).unwrap();
    REGISTRY.register(Box::new(c.clone())).ok();
    c
});

static RUN_DURATION_MS: Lazy<HistogramVec> = Lazy::new(|| {
    let opts = Opts::new("run_duration_ms", "Run duration in milliseconds");
    let hist =
        HistogramVec::new(prometheus::HistogramOpts::from(opts), &["pipeline", "outcome"]).unwrap();
    REGISTRY.register(Box::new(hist.clone())).ok();
    hist
});

/// Count one settled task under its terminal state label.
pub fn inc_task(pipeline: &str, task: &str, state: &str) {
    TASK_SETTLEMENTS
        .with_label_values(&[pipeline, task, state])
        .inc();
}

/// Observe a run duration in milliseconds, labelled by outcome.
pub fn observe_run_duration(pipeline: &str, outcome: &str, duration_ms: f64) {
    RUN_DURATION_MS
        .with_label_values(&[pipeline, outcome])
        .observe(duration_ms);
}

/// Gather metrics as text in Prometheus exposition format. Useful for tests
/// or a custom exporter.
pub fn gather_text() -> String {
    let metric_families = REGISTRY.gather();
    let mut buffer = vec![];
    let encoder = TextEncoder::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settlements_appear_in_exposition_text() {
        inc_task("music_warehouse", "stage_events", "succeeded");
        inc_task("music_warehouse", "stage_events", "succeeded");
        let text = gather_text();
        assert!(text.contains("starlift_core_task_settlements_total"));
        assert!(text.contains("task=\"stage_events\""));
    }

    #[test]
    fn run_durations_are_recorded_per_outcome() {
        observe_run_duration("music_warehouse", "success", 125.0);
        let text = gather_text();
        assert!(text.contains("starlift_core_run_duration_ms"));
        assert!(text.contains("outcome=\"success\""));
    }
}
