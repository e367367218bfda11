//! Batches job outcomes into one digest per burst of work.

use std::fmt;

use apart_logging::apart_warn;

use crate::FinishedJob;

/// Outcome counts since the previous digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Digest {
    pub successes: u32,
    pub failures: u32,
}

impl Digest {
    pub const TITLE: &'static str = "Apart";
}

impl fmt::Display for Digest {
    /// Failures first: `1 job failed, 2 jobs finished`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let failed = (self.failures > 0).then(|| format!("{} failed", jobs(self.failures)));
        let finished = (self.successes > 0).then(|| format!("{} finished", jobs(self.successes)));
        match (failed, finished) {
            (Some(failed), Some(finished)) => write!(f, "{failed}, {finished}"),
            (Some(only), None) | (None, Some(only)) => f.write_str(&only),
            (None, None) => f.write_str("No jobs finished"),
        }
    }
}

fn jobs(count: u32) -> String {
    if count == 1 {
        "1 job".to_owned()
    } else {
        format!("{count} jobs")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationAggregator {
    successes: u32,
    failures: u32,
    disabled: bool,
}

impl NotificationAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts the outcome; user-cancelled jobs are not counted.
    pub fn record(&mut self, job: &FinishedJob) {
        if job.is_cancelled() {
            return;
        }
        if job.is_success() {
            self.successes += 1;
        } else {
            self.failures += 1;
        }
    }

    /// Emits the accumulated digest once nothing is running, then resets.
    pub fn flush_if_idle(&mut self, running_jobs: usize) -> Option<Digest> {
        if running_jobs > 0 {
            return None;
        }
        let digest = Digest {
            successes: std::mem::take(&mut self.successes),
            failures: std::mem::take(&mut self.failures),
        };
        if self.disabled || (digest.successes == 0 && digest.failures == 0) {
            return None;
        }
        Some(digest)
    }

    /// `record` followed by `flush_if_idle`.
    pub fn on_job_finished(&mut self, job: &FinishedJob, running_jobs: usize) -> Option<Digest> {
        self.record(job);
        self.flush_if_idle(running_jobs)
    }

    /// Stops all future digests for the rest of the process.
    pub fn disable(&mut self) {
        if !self.disabled {
            apart_warn!("Desktop notifications unavailable, disabling job digests");
            self.disabled = true;
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.disabled
    }

    /// `(successes, failures)` not yet flushed.
    pub fn pending(&self) -> (u32, u32) {
        (self.successes, self.failures)
    }
}
