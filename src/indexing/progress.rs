//! Statistics collected while building a batch

use std::time::{Duration, Instant};

/// Errors kept per batch; the count keeps going past this.
const MAX_RECORDED_ERRORS: usize = 100;

#[derive(Debug, Default, Clone)]
pub struct BuildStats {
    pub files_cached: usize,
    pub files_rebuilt: usize,
    pub files_failed: usize,
    pub files_removed: usize,

    /// Symbols across every unit handed to the resolver
    pub symbols_found: usize,

    pub elapsed: Duration,

    /// First errors of the batch as (file, message)
    pub errors: Vec<(String, String)>,

    start_time: Option<Instant>,
}

impl BuildStats {
    /// Create new stats and start timing
    pub fn new() -> Self {
        Self {
            start_time: Some(Instant::now()),
            ..Default::default()
        }
    }

    pub fn stop_timing(&mut self) {
        if let Some(start) = self.start_time {
            self.elapsed = start.elapsed();
            self.start_time = None;
        }
    }

    pub fn add_error(&mut self, path: &str, error: String) {
        if self.errors.len() < MAX_RECORDED_ERRORS {
            self.errors.push((path.to_string(), error));
        }
        self.files_failed += 1;
    }

    pub fn files_total(&self) -> usize {
        self.files_cached + self.files_rebuilt + self.files_failed + self.files_removed
    }

    /// One-line summary for logs and the CLI footer
    pub fn summary(&self) -> String {
        format!(
            "{} files: {} rebuilt, {} cached, {} failed, {} removed; {} symbols in {:.2}s",
            self.files_total(),
            self.files_rebuilt,
            self.files_cached,
            self.files_failed,
            self.files_removed,
            self.symbols_found,
            self.elapsed.as_secs_f64()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary() {
        let mut stats = BuildStats::new();
        stats.files_rebuilt = 9;
        stats.add_error("src/five.py", "syntax error".into());
        stats.symbols_found = 42;
        stats.stop_timing();

        let summary = stats.summary();
        assert!(summary.starts_with("10 files: 9 rebuilt"));
        assert!(summary.contains("1 failed"));
        assert!(summary.contains("42 symbols"));
    }

    #[test]
    fn test_error_limiting() {
        let mut stats = BuildStats::new();
        for i in 0..150 {
            stats.add_error(&format!("file{i}.py"), format!("Error {i}"));
        }
        assert_eq!(stats.errors.len(), 100);
        assert_eq!(stats.files_failed, 150);
    }
}
