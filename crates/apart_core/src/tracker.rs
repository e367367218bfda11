//! Folds the worker's job messages into per-job state machines.
//!
//! A job is created by the first progress message for an unseen id, updated
//! by later ones, and finished by a progress message carrying `finish` or by
//! a `*-failed` message. Cancelling is a local, sticky flag: the job stays
//! tracked until the worker confirms termination.

use std::collections::{BTreeMap, HashSet};

use apart_logging::{apart_debug, apart_warn};

use crate::{Command, FinishedJob, JobId, JobReport, Message, RunningJob};

/// What a single message did to the tracked jobs.
#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    Created(JobId),
    Updated(JobId),
    /// Raised exactly once per job id.
    Finished(FinishedJob),
    /// Malformed, not a job message, or about an already finished job.
    Ignored,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobTracker {
    running: BTreeMap<JobId, RunningJob>,
    finished: HashSet<JobId>,
}

impl JobTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle_message(&mut self, message: &Message) -> JobEvent {
        let report = match JobReport::parse(message) {
            Ok(report) => report,
            Err(err) => {
                apart_warn!(
                    "Ignoring malformed {} message: {}",
                    message.message_type(),
                    err
                );
                return JobEvent::Ignored;
            }
        };

        if self.finished.contains(&report.id) {
            apart_warn!(
                "Ignoring {} message for finished job {}",
                message.message_type(),
                report.id
            );
            return JobEvent::Ignored;
        }

        let created = match self.running.get_mut(&report.id) {
            Some(job) => {
                job.apply(&report, message);
                false
            }
            None => {
                apart_debug!("Tracking new {} job {}", report.kind.job_kind().label(), report.id);
                self.running
                    .insert(report.id.clone(), RunningJob::start(&report, message));
                true
            }
        };

        if report.is_terminal() {
            return self.finish(&report.id, message);
        }
        if created {
            JobEvent::Created(report.id)
        } else {
            JobEvent::Updated(report.id)
        }
    }

    fn finish(&mut self, id: &str, message: &Message) -> JobEvent {
        self.running.remove(id);
        self.finished.insert(id.to_owned());
        match FinishedJob::from_message(message.clone()) {
            Ok(job) => JobEvent::Finished(job),
            Err(err) => {
                apart_warn!("Could not record finished job {}: {}", id, err);
                JobEvent::Ignored
            }
        }
    }

    /// Marks the job as cancelling and returns the request to send. The job
    /// is only removed once the worker's terminal message arrives.
    pub fn request_cancel(&mut self, id: &str) -> Option<Command> {
        let job = self.running.get_mut(id)?;
        Some(job.mark_cancelling())
    }

    pub fn get(&self, id: &str) -> Option<&RunningJob> {
        self.running.get(id)
    }

    pub fn running(&self) -> impl Iterator<Item = &RunningJob> {
        self.running.values()
    }

    pub fn running_count(&self) -> usize {
        self.running.len()
    }

    pub fn is_idle(&self) -> bool {
        self.running.is_empty()
    }

    pub fn has_finished(&self, id: &str) -> bool {
        self.finished.contains(id)
    }
}
