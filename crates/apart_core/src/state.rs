use chrono::{DateTime, Utc};

use crate::view_model::{AppViewModel, FinishedJobView, RunningJobView};
use crate::{
    FinishedJob, FinishedSet, JobTracker, NotificationAggregator, Partition, StatusReport,
    WorkerStatus,
};
use crate::timefmt::format_clock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Waiting for the worker's `started` status.
    #[default]
    Loading,
    Ready,
    ShuttingDown,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    phase: Phase,
    partitions: Vec<Partition>,
    compression_options: Vec<String>,
    tracker: JobTracker,
    finished: FinishedSet,
    notifications: NotificationAggregator,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn tracker(&self) -> &JobTracker {
        &self.tracker
    }

    pub(crate) fn tracker_mut(&mut self) -> &mut JobTracker {
        &mut self.tracker
    }

    pub fn finished(&self) -> &FinishedSet {
        &self.finished
    }

    pub(crate) fn finished_mut(&mut self) -> &mut FinishedSet {
        &mut self.finished
    }

    pub fn notifications(&self) -> &NotificationAggregator {
        &self.notifications
    }

    pub(crate) fn notifications_mut(&mut self) -> &mut NotificationAggregator {
        &mut self.notifications
    }

    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    pub fn compression_options(&self) -> &[String] {
        &self.compression_options
    }

    /// Records to persist on shutdown, newest first.
    pub fn finished_snapshot(&self) -> Vec<FinishedJob> {
        self.finished.iter().cloned().collect()
    }

    pub(crate) fn apply_status(&mut self, report: StatusReport) {
        match report.status {
            WorkerStatus::Started => {
                self.phase = Phase::Ready;
                self.partitions = report.partitions;
                if let Some(options) = report.compression_options {
                    self.compression_options = options;
                }
            }
            WorkerStatus::Running => {
                if self.phase == Phase::Ready && self.partitions != report.partitions {
                    self.partitions = report.partitions;
                } else {
                    return;
                }
            }
            WorkerStatus::Dying => self.phase = Phase::ShuttingDown,
        }
        self.mark_dirty();
    }

    /// Returns false when already shutting down.
    pub(crate) fn begin_shutdown(&mut self) -> bool {
        if self.phase == Phase::ShuttingDown {
            return false;
        }
        self.phase = Phase::ShuttingDown;
        self.mark_dirty();
        true
    }

    pub fn view(&self) -> AppViewModel {
        self.view_at(Utc::now())
    }

    pub fn view_at(&self, now: DateTime<Utc>) -> AppViewModel {
        let mut running: Vec<_> = self
            .tracker
            .running()
            .map(|job| RunningJobView {
                job_id: job.id().to_owned(),
                kind: job.kind(),
                title: job.title(),
                fraction: job.fraction_complete(),
                rate: job.rate_label().to_owned(),
                elapsed: format_clock(job.elapsed(now)),
                remaining: job.remaining(now),
                cancelling: job.is_cancelling(),
                started_at: job.started_at(),
            })
            .collect();
        running.sort_by_key(|job| job.started_at);

        let finished = self
            .finished
            .entries()
            .map(|(key, job)| FinishedJobView {
                key,
                job_id: job.id().to_owned(),
                kind: job.kind(),
                success: job.is_success(),
                title: job.purpose(),
                finished: job.finished_label(now),
                runtime: format_clock(job.runtime()),
                error: job.error().map(str::to_owned),
                image_file: job.image_file().map(str::to_owned),
            })
            .collect();

        AppViewModel {
            phase: self.phase,
            partitions: self.partitions.clone(),
            compression_options: self.compression_options.clone(),
            running,
            finished,
            dirty: self.dirty,
        }
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Returns whether a render is due and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}
