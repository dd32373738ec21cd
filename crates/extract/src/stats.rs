// ABOUTME: Running tallies of extraction outcomes kept by whoever drives a batch.

use std::fmt;

use serde::Serialize;

use crate::record::Status;

/// Counts of pages processed by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExtractionStats {
    pub total: usize,
    pub success: usize,
    pub partial: usize,
    pub failed: usize,
}

impl ExtractionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, status: Status) {
        self.total += 1;
        match status {
            Status::Success => self.success += 1,
            Status::Partial => self.partial += 1,
            Status::Failed => self.failed += 1,
        }
    }

    /// A page that never reached extraction counts as failed.
    pub fn record_fetch_failure(&mut self) {
        self.record(Status::Failed);
    }

    /// Fraction of pages classified as success, 0.0 when nothing was processed.
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.success as f64 / self.total as f64
    }
}

impl fmt::Display for ExtractionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "total={} success={} partial={} failed={}",
            self.total, self.success, self.partial, self.failed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tallies_by_status() {
        let mut stats = ExtractionStats::new();
        stats.record(Status::Success);
        stats.record(Status::Partial);
        stats.record(Status::Failed);
        stats.record_fetch_failure();
        assert_eq!(
            stats,
            ExtractionStats {
                total: 4,
                success: 1,
                partial: 1,
                failed: 2
            }
        );
        assert_eq!(stats.success_rate(), 0.25);
        assert_eq!(stats.to_string(), "total=4 success=1 partial=1 failed=2");
    }

    #[test]
    fn empty_rate_is_zero() {
        assert_eq!(ExtractionStats::new().success_rate(), 0.0);
    }
}
