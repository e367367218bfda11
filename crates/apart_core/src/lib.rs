//! Apart core: message model, job state machines and history, plus the pure
//! `update` function driven by the presentation loop.
mod command;
mod effect;
mod finished;
mod history;
mod job;
mod message;
mod msg;
mod notify;
pub mod paths;
mod sources;
mod state;
pub mod timefmt;
mod tracker;
mod update;
mod view_model;

pub use command::Command;
pub use effect::Effect;
pub use finished::{FinishedJob, Outcome};
pub use history::{reconcile, FinishedSet, HistoryKey};
pub use job::{is_job_message, JobId, JobKind, JobMessageKind, JobReport, RunningJob};
pub use message::{Message, MessageBuilder, MessageError, Timestamp, Value, TIMESTAMP_FIELDS};
pub use msg::Msg;
pub use notify::{Digest, NotificationAggregator};
pub use sources::{clonable_partitions, Partition, StatusReport, WorkerStatus, MIN_PARTITION_BYTES};
pub use state::{AppState, Phase};
pub use tracker::{JobEvent, JobTracker};
pub use update::update;
pub use view_model::{AppViewModel, FinishedJobView, RunningJobView};
