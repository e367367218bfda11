use chrono::{DateTime, Utc};

use crate::{HistoryKey, JobId, JobKind, Partition, Phase};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppViewModel {
    pub phase: Phase,
    pub partitions: Vec<Partition>,
    pub compression_options: Vec<String>,
    /// Oldest first.
    pub running: Vec<RunningJobView>,
    /// Newest first.
    pub finished: Vec<FinishedJobView>,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunningJobView {
    pub job_id: JobId,
    pub kind: JobKind,
    pub title: String,
    pub fraction: f64,
    pub rate: String,
    pub elapsed: String,
    /// `None` while cancelling or before the worker sends an estimate.
    pub remaining: Option<String>,
    pub cancelling: bool,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishedJobView {
    pub key: HistoryKey,
    pub job_id: JobId,
    pub kind: JobKind,
    pub success: bool,
    pub title: String,
    pub finished: String,
    pub runtime: String,
    pub error: Option<String>,
    pub image_file: Option<String>,
}
