use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::Instant;

/// Pipeline stages that report per-frame timings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Decode,
    Gate,
    Faces,
    Metrics,
    Select,
    Write,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Decode => "decode",
            Stage::Gate => "gate",
            Stage::Faces => "faces",
            Stage::Metrics => "metrics",
            Stage::Select => "select",
            Stage::Write => "write",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observer for scan progress, stage timings and per-frame metrics.
///
/// The use case and executors only talk to this trait, so the CLI and tests
/// choose how much of it ends up anywhere.
pub trait ScanLogger: Send {
    /// `expected` is 0 when the source does not report its length.
    fn progress(&mut self, sampled: usize, expected: usize);

    fn timing(&mut self, stage: Stage, duration_ms: f64);

    fn metric(&mut self, name: &str, value: f64);

    fn info(&mut self, message: &str);

    fn summary(&self) {}
}

/// Discards everything.
pub struct NullScanLogger;

impl ScanLogger for NullScanLogger {
    fn progress(&mut self, _sampled: usize, _expected: usize) {}
    fn timing(&mut self, _stage: Stage, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Accumulates timings and metrics and reports through `log::info!`.
///
/// Progress lines are emitted every `throttle` samples and on the last one.
pub struct StdoutScanLogger {
    throttle: usize,
    timings: BTreeMap<Stage, Vec<f64>>,
    metrics: HashMap<String, Vec<f64>>,
    start_time: Instant,
    sampled: usize,
}

impl StdoutScanLogger {
    pub fn new(throttle: usize) -> Self {
        Self {
            throttle: throttle.max(1),
            timings: BTreeMap::new(),
            metrics: HashMap::new(),
            start_time: Instant::now(),
            sampled: 0,
        }
    }

    pub fn timings_for(&self, stage: Stage) -> Option<&[f64]> {
        self.timings.get(&stage).map(|v| v.as_slice())
    }

    pub fn metrics_for(&self, name: &str) -> Option<&[f64]> {
        self.metrics.get(name).map(|v| v.as_slice())
    }

    /// Per-stage averages and throughput, or `None` before any frame.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }
        let elapsed_s = self.start_time.elapsed().as_secs_f64();
        let mut lines = vec![format!(
            "Scan summary ({} sampled frames, {elapsed_s:.1}s):",
            self.sampled
        )];

        for (stage, durations) in &self.timings {
            let total_ms: f64 = durations.iter().sum();
            let avg_ms = total_ms / durations.len().max(1) as f64;
            lines.push(format!(
                "  {:8}: avg {avg_ms:6.1}ms  total {total_ms:7.0}ms  ({} calls)",
                stage.as_str(),
                durations.len()
            ));
        }

        let mut names: Vec<_> = self.metrics.keys().collect();
        names.sort();
        for name in names {
            let values = &self.metrics[name];
            let avg = values.iter().sum::<f64>() / values.len().max(1) as f64;
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            lines.push(format!("  {name}: avg {avg:.2}  max {max:.2}"));
        }

        if self.sampled > 0 && elapsed_s > 0.0 {
            lines.push(format!(
                "  Throughput: {:.1} samples/s",
                self.sampled as f64 / elapsed_s
            ));
        }
        Some(lines.join("\n"))
    }
}

impl Default for StdoutScanLogger {
    fn default() -> Self {
        Self::new(10)
    }
}

impl ScanLogger for StdoutScanLogger {
    fn progress(&mut self, sampled: usize, expected: usize) {
        self.sampled = sampled;
        let last = expected > 0 && sampled == expected;
        if sampled % self.throttle != 0 && !last {
            return;
        }
        if expected > 0 {
            let pct = sampled as f64 / expected as f64 * 100.0;
            log::info!("Scanning: {sampled}/{expected} samples ({pct:.1}%)");
        } else {
            log::info!("Scanning: {sampled} samples");
        }
    }

    fn timing(&mut self, stage: Stage, duration_ms: f64) {
        self.timings.entry(stage).or_default().push(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics
            .entry(name.to_string())
            .or_default()
            .push(value);
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_null_logger_accepts_everything() {
        let mut logger = NullScanLogger;
        logger.progress(1, 10);
        logger.timing(Stage::Gate, 5.0);
        logger.metric("score", 3.0);
        logger.info("hello");
        logger.summary();
    }

    #[test]
    fn test_timings_recorded_per_stage() {
        let mut logger = StdoutScanLogger::new(10);
        logger.timing(Stage::Faces, 20.0);
        logger.timing(Stage::Faces, 30.0);
        logger.timing(Stage::Write, 5.0);

        assert_eq!(logger.timings_for(Stage::Faces).unwrap(), &[20.0, 30.0]);
        assert_eq!(logger.timings_for(Stage::Write).unwrap(), &[5.0]);
        assert!(logger.timings_for(Stage::Decode).is_none());
    }

    #[test]
    fn test_summary_lists_stages_in_pipeline_order() {
        let mut logger = StdoutScanLogger::new(10);
        logger.progress(4, 4);
        logger.timing(Stage::Write, 1.0);
        logger.timing(Stage::Decode, 2.0);

        let summary = logger.summary_string().unwrap();
        assert!(summary.starts_with("Scan summary (4 sampled frames"));
        let decode = summary.find("decode").unwrap();
        let write = summary.find("write").unwrap();
        assert!(decode < write);
    }

    #[test]
    fn test_summary_reports_metric_average_and_max() {
        let mut logger = StdoutScanLogger::new(10);
        logger.metric("score", 3.0);
        logger.metric("score", 4.0);

        let values = logger.metrics_for("score").unwrap();
        assert_relative_eq!(values.iter().sum::<f64>() / values.len() as f64, 3.5);
        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("score: avg 3.50  max 4.00"));
    }

    #[test]
    fn test_empty_summary_returns_none() {
        assert!(StdoutScanLogger::default().summary_string().is_none());
    }

    #[test]
    fn test_progress_tracks_latest_sample_count() {
        let mut logger = StdoutScanLogger::new(3);
        for i in 1..=7 {
            logger.progress(i, 0);
        }
        assert_eq!(logger.sampled, 7);
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::Metrics.to_string(), "metrics");
        assert_eq!(Stage::Select.as_str(), "select");
    }
}
