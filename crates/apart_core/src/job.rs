use apart_logging::apart_warn;
use chrono::{DateTime, TimeDelta, Utc};

use crate::paths::{extract_directory, file_name, rm_dev};
use crate::timefmt::{natural_delta, round_to_second};
use crate::{Command, Message, MessageError};

/// Opaque id assigned by the worker; unique for the worker's lifetime.
pub type JobId = String;

/// Below this the remaining-time display reads "a few seconds".
const FEW_SECONDS: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    Clone,
    Restore,
}

impl JobKind {
    pub fn label(self) -> &'static str {
        match self {
            JobKind::Clone => "clone",
            JobKind::Restore => "restore",
        }
    }
}

/// What a job-related message means for the job's state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobMessageKind {
    /// `clone` / `restore`: progress, or success when `finish` is set.
    Progress(JobKind),
    /// `clone-failed` / `restore-failed`.
    Failed(JobKind),
}

impl JobMessageKind {
    pub fn classify(message_type: &str) -> Option<Self> {
        let (kind, rest) = if let Some(rest) = message_type.strip_prefix("clone") {
            (JobKind::Clone, rest)
        } else if let Some(rest) = message_type.strip_prefix("restore") {
            (JobKind::Restore, rest)
        } else {
            return None;
        };
        match rest {
            "" => Some(JobMessageKind::Progress(kind)),
            "-failed" => Some(JobMessageKind::Failed(kind)),
            _ => None,
        }
    }

    pub fn job_kind(self) -> JobKind {
        match self {
            JobMessageKind::Progress(kind) | JobMessageKind::Failed(kind) => kind,
        }
    }
}

/// Router predicate: messages the job tracker consumes.
pub fn is_job_message(message: &Message) -> bool {
    JobMessageKind::classify(message.message_type()).is_some()
}

/// Typed view over the fields of a job message.
#[derive(Debug, Clone, PartialEq)]
pub struct JobReport {
    pub kind: JobMessageKind,
    pub id: JobId,
    pub source: String,
    pub destination: String,
    pub start: DateTime<Utc>,
    pub finish: Option<DateTime<Utc>>,
    pub complete: Option<f64>,
    pub rate: Option<String>,
    pub estimated_finish: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl JobReport {
    pub fn parse(message: &Message) -> Result<Self, MessageError> {
        let kind = JobMessageKind::classify(message.message_type())
            .ok_or_else(|| MessageError::NotAJobMessage(message.message_type().to_owned()))?;
        Ok(Self {
            kind,
            id: job_id(message)?,
            source: message.require_str("source")?.to_owned(),
            destination: message.require_str("destination")?.to_owned(),
            start: message.require_timestamp("start")?,
            finish: message.timestamp_field("finish"),
            complete: message.f64_field("complete"),
            rate: message.str_field("rate").map(str::to_owned),
            estimated_finish: message.timestamp_field("estimated_finish"),
            error: message.str_field("error").map(str::to_owned),
        })
    }

    /// Success (progress carrying `finish`) or explicit failure.
    pub fn is_terminal(&self) -> bool {
        match self.kind {
            JobMessageKind::Progress(_) => self.finish.is_some(),
            JobMessageKind::Failed(_) => true,
        }
    }
}

/// Ids are normally strings, but numeric ids are accepted as text.
pub(crate) fn job_id(message: &Message) -> Result<JobId, MessageError> {
    match message.get("id") {
        Some(crate::Value::Str(id)) => Ok(id.clone()),
        Some(crate::Value::Int(id)) => Ok(id.to_string()),
        _ => Err(MessageError::Field("id".to_owned())),
    }
}

/// Running-job title for either kind.
pub(crate) fn job_title(kind: JobKind, source: &str, destination: &str) -> String {
    match kind {
        JobKind::Clone => format!("{} -> {}", rm_dev(source), extract_directory(destination)),
        JobKind::Restore => format!("{} -> {}", file_name(source), rm_dev(destination)),
    }
}

/// A clone or restore the worker is still running.
#[derive(Debug, Clone, PartialEq)]
pub struct RunningJob {
    id: JobId,
    kind: JobKind,
    source: String,
    destination: String,
    fraction_complete: f64,
    rate: Option<String>,
    estimated_finish: Option<DateTime<Utc>>,
    started_at: DateTime<Utc>,
    cancelling: bool,
    last_message: Message,
}

impl RunningJob {
    pub(crate) fn start(report: &JobReport, message: &Message) -> Self {
        let mut job = Self {
            id: report.id.clone(),
            kind: report.kind.job_kind(),
            source: report.source.clone(),
            destination: report.destination.clone(),
            fraction_complete: 0.0,
            rate: None,
            estimated_finish: None,
            started_at: report.start,
            cancelling: false,
            last_message: message.clone(),
        };
        job.apply(report, message);
        job
    }

    pub(crate) fn apply(&mut self, report: &JobReport, message: &Message) {
        if let Some(complete) = report.complete {
            let complete = complete.clamp(0.0, 1.0);
            if complete < self.fraction_complete {
                apart_warn!(
                    "Job {} progress went backwards ({} -> {}), keeping {}",
                    self.id,
                    self.fraction_complete,
                    complete,
                    self.fraction_complete
                );
            } else {
                self.fraction_complete = complete;
            }
        }
        self.rate = report.rate.clone();
        self.estimated_finish = report.estimated_finish;
        self.source = report.source.clone();
        self.destination = report.destination.clone();
        self.last_message = message.clone();
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn fraction_complete(&self) -> f64 {
        self.fraction_complete
    }

    pub fn rate(&self) -> Option<&str> {
        self.rate.as_deref()
    }

    pub fn estimated_finish(&self) -> Option<DateTime<Utc>> {
        self.estimated_finish
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn is_cancelling(&self) -> bool {
        self.cancelling
    }

    pub fn last_message(&self) -> &Message {
        &self.last_message
    }

    pub fn title(&self) -> String {
        job_title(self.kind, &self.source, &self.destination)
    }

    /// Rate text, `Initializing` until the worker reports one.
    pub fn rate_label(&self) -> &str {
        self.rate.as_deref().unwrap_or("Initializing")
    }

    /// Sticky until the worker sends a terminal message.
    pub(crate) fn mark_cancelling(&mut self) -> Command {
        self.cancelling = true;
        Command::cancel(self.kind, self.id.clone())
    }

    pub fn elapsed(&self, now: DateTime<Utc>) -> TimeDelta {
        round_to_second(now - self.started_at)
    }

    /// Remaining-time text; suppressed while cancelling.
    pub fn remaining(&self, now: DateTime<Utc>) -> Option<String> {
        if self.cancelling {
            return None;
        }
        let remaining = self.estimated_finish? - now;
        if remaining < TimeDelta::seconds(FEW_SECONDS) {
            Some("a few seconds".to_owned())
        } else {
            Some(natural_delta(remaining))
        }
    }
}
