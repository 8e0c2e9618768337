//! Rate-limited throughput reporting

use std::time::{Duration, Instant};
use tracing::info;

pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_secs(1);

/// One throughput report
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressReport {
    pub total: u64,
    pub since_last: u64,
    pub rows_per_sec: f64,
}

/// Counts rows for one table and reports at most once per interval
#[derive(Debug)]
pub struct ProgressMonitor {
    table: String,
    interval: Duration,
    count: u64,
    last_count: u64,
    last_report: Instant,
}

impl ProgressMonitor {
    pub fn new(table: impl Into<String>) -> Self {
        Self::with_interval(table, DEFAULT_PROGRESS_INTERVAL)
    }

    pub fn with_interval(table: impl Into<String>, interval: Duration) -> Self {
        Self::starting_at(table, interval, Instant::now())
    }

    pub fn starting_at(table: impl Into<String>, interval: Duration, now: Instant) -> Self {
        Self {
            table: table.into(),
            interval,
            count: 0,
            last_count: 0,
            last_report: now,
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Count one row, reporting if the interval has passed
    pub fn increment(&mut self) -> Option<ProgressReport> {
        self.increment_at(Instant::now())
    }

    pub fn increment_at(&mut self, now: Instant) -> Option<ProgressReport> {
        self.count += 1;
        if now.duration_since(self.last_report) > self.interval {
            Some(self.report(now))
        } else {
            None
        }
    }

    /// Final report, emitted regardless of the interval
    pub fn finish(&mut self) -> ProgressReport {
        self.finish_at(Instant::now())
    }

    pub fn finish_at(&mut self, now: Instant) -> ProgressReport {
        self.report(now)
    }

    fn report(&mut self, now: Instant) -> ProgressReport {
        let elapsed = now.duration_since(self.last_report).as_secs_f64();
        let since_last = self.count - self.last_count;
        let rows_per_sec = if elapsed > 0.0 {
            since_last as f64 / elapsed
        } else {
            0.0
        };

        let report = ProgressReport {
            total: self.count,
            since_last,
            rows_per_sec,
        };

        info!(
            table = %self.table,
            total = report.total,
            since_last = report.since_last,
            rows_per_sec = report.rows_per_sec.round(),
            "Saved {} items ({:.0} items/s)",
            report.total,
            report.rows_per_sec
        );

        self.last_count = self.count;
        self.last_report = now;
        report
    }
}
