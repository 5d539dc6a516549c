use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::path::Path;
use std::sync::Once;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref DELETIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("cleaner_deletions_total", "Objects deleted (or that would be in dry-run)."),
        &["kind", "mode"]
    )
    .expect("valid metric definition");
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("cleaner_errors_total", "Per-object failures that did not abort a sweep."),
        &["kind"]
    )
    .expect("valid metric definition");
    pub static ref SWEEPS_TOTAL: IntCounter =
        IntCounter::new("cleaner_sweeps_total", "Completed sweeps.").expect("valid metric definition");
    pub static ref LAST_SWEEP_TIMESTAMP: IntGauge = IntGauge::new(
        "cleaner_last_sweep_timestamp_seconds",
        "Unix time of the last completed sweep."
    )
    .expect("valid metric definition");
}

static REGISTER: Once = Once::new();

/// Registers all collectors with [`REGISTRY`]. Safe to call more than once.
pub fn register_metrics() {
    REGISTER.call_once(|| {
        let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
            Box::new(DELETIONS_TOTAL.clone()),
            Box::new(ERRORS_TOTAL.clone()),
            Box::new(SWEEPS_TOTAL.clone()),
            Box::new(LAST_SWEEP_TIMESTAMP.clone()),
        ];
        for collector in collectors {
            if let Err(e) = REGISTRY.register(collector) {
                tracing::warn!("Failed to register metric: {}", e);
            }
        }
    });
}

pub fn record_deletion(kind: &str, dry_run: bool) {
    let mode = if dry_run { "dry_run" } else { "live" };
    DELETIONS_TOTAL.with_label_values(&[kind, mode]).inc();
}

pub fn record_error(kind: &str) {
    ERRORS_TOTAL.with_label_values(&[kind]).inc();
}

// Function to gather metrics for exposition
pub fn gather_metrics() -> crate::Result<String> {
    let mut buffer = vec![];
    let encoder = TextEncoder::new();
    encoder.encode(&REGISTRY.gather(), &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Writes the exposition atomically so a textfile collector never reads a partial file.
pub fn write_metrics_file(path: &Path) -> crate::Result<()> {
    let body = gather_metrics()?;
    let tmp = path.with_extension("prom.tmp");
    std::fs::write(&tmp, body)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gather_includes_recorded_deletions() {
        register_metrics();
        register_metrics();
        record_deletion("orphan", true);
        let text = gather_metrics().unwrap();
        assert!(text.contains("cleaner_deletions_total"));
        assert!(text.contains("kind=\"orphan\""));
        assert!(text.contains("mode=\"dry_run\""));
    }

    #[test]
    fn test_write_metrics_file() {
        register_metrics();
        SWEEPS_TOTAL.inc();
        let path = std::env::temp_dir().join(format!("cleaner-metrics-{}.prom", std::process::id()));
        write_metrics_file(&path).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("cleaner_sweeps_total"));
        let _ = std::fs::remove_file(&path);
    }
}
