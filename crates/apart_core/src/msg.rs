#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// A message routed from the worker channel.
    Worker(crate::Message),
    /// The worker process is gone.
    WorkerExited { code: Option<i32> },
    /// Finished jobs loaded from the history file.
    RestoreHistory(Vec<crate::FinishedJob>),
    /// User asked to clone a partition into a directory.
    StartClone {
        source: String,
        directory: String,
        name: String,
        compression: Option<String>,
    },
    /// User confirmed restoring an image onto a partition.
    StartRestore { image: String, device: String },
    /// User clicked Cancel on a running job.
    CancelClicked { job_id: crate::JobId },
    /// User clicked Rerun on a finished job.
    RerunClicked { key: crate::HistoryKey },
    /// User clicked Clear on a finished job.
    ForgetClicked { key: crate::HistoryKey },
    /// User asked to delete the image of a successful clone.
    DeleteImageClicked { key: crate::HistoryKey },
    /// User asked for a fresh source listing.
    RefreshSources,
    /// Notification delivery failed.
    NotificationsUnavailable,
    /// User closed the application.
    QuitRequested,
    /// UI/render tick to refresh elapsed and remaining times.
    Tick,
    /// Input that changes nothing, e.g. an empty console line.
    NoOp,
}
