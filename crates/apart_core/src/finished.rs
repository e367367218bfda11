use chrono::{DateTime, TimeDelta, Utc};

use crate::job::{job_title, JobMessageKind};
use crate::paths::{
    extract_compression_option, extract_directory, extract_filename, extract_name, file_name,
    rm_dev,
};
use crate::timefmt::{natural_time, round_to_second};
use crate::{Command, JobId, JobKind, JobReport, Message, MessageError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failed { error: String },
}

/// A job that reached a terminal message; keeps that message verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct FinishedJob {
    id: JobId,
    kind: JobKind,
    outcome: Outcome,
    source: String,
    destination: String,
    start: DateTime<Utc>,
    finish: DateTime<Utc>,
    message: Message,
}

impl FinishedJob {
    /// Accepts a `clone`/`restore` message carrying `finish`, or a
    /// `*-failed` message.
    pub fn from_message(message: Message) -> Result<Self, MessageError> {
        let report = JobReport::parse(&message)?;
        let outcome = match report.kind {
            JobMessageKind::Progress(_) if report.finish.is_some() => Outcome::Success,
            JobMessageKind::Progress(_) => {
                return Err(MessageError::NotTerminal(message.message_type().to_owned()))
            }
            JobMessageKind::Failed(_) => Outcome::Failed {
                error: report.error.clone().unwrap_or_else(|| "unknown error".to_owned()),
            },
        };
        // A failure reported before any finish time is stamped at its start.
        let finish = report.finish.unwrap_or(report.start);
        Ok(Self {
            id: report.id,
            kind: report.kind.job_kind(),
            outcome,
            source: report.source,
            destination: report.destination,
            start: report.start,
            finish,
            message,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }

    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Success
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Failed { error } => Some(error),
            Outcome::Success => None,
        }
    }

    /// Failures the user asked for by cancelling.
    pub fn is_cancelled(&self) -> bool {
        self.error()
            .is_some_and(|error| error.trim().eq_ignore_ascii_case("cancelled"))
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn finish(&self) -> DateTime<Utc> {
        self.finish
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    pub fn into_message(self) -> Message {
        self.message
    }

    /// Run time rounded to the nearest second, half up.
    pub fn runtime(&self) -> TimeDelta {
        round_to_second(self.finish - self.start)
    }

    pub fn title(&self) -> String {
        job_title(self.kind, &self.source, &self.destination)
    }

    /// What the job was for: source device and backup directory for clones,
    /// target device for restores.
    pub fn purpose(&self) -> String {
        match self.kind {
            JobKind::Clone => format!(
                "{} -> {}",
                rm_dev(&self.source),
                extract_directory(&self.destination)
            ),
            JobKind::Restore => rm_dev(&self.destination).to_owned(),
        }
    }

    /// True when both records describe the same intent and only one of them
    /// needs to stay in the history.
    ///
    /// A successful clone occupies an image file, so it is only superseded by
    /// another record for the same file.
    pub fn is_similar_to(&self, other: &FinishedJob) -> bool {
        let same_shape = self.kind == other.kind && self.is_success() == other.is_success();
        if !same_shape || self.purpose() != other.purpose() {
            return false;
        }
        if self.kind == JobKind::Clone && self.is_success() {
            return self.destination == other.destination;
        }
        true
    }

    /// `just now` within a minute of finishing, then `<n> <unit> ago`.
    pub fn finished_label(&self, now: DateTime<Utc>) -> String {
        let ago = now - self.finish;
        if ago < TimeDelta::minutes(1) {
            "just now".to_owned()
        } else {
            natural_time(ago)
        }
    }

    /// Image file name of a successful clone.
    pub fn image_file(&self) -> Option<&str> {
        if self.kind != JobKind::Clone || !self.is_success() {
            return None;
        }
        Some(extract_filename(&self.destination).unwrap_or_else(|| file_name(&self.destination)))
    }

    /// Successful clones keep their record when rerun; failures are replaced.
    pub fn forget_on_rerun(&self) -> bool {
        !self.is_success()
    }

    /// The command that runs this job again.
    pub fn rerun_command(&self) -> Command {
        match self.kind {
            JobKind::Clone => Command::Clone {
                source: self.source.clone(),
                destination: extract_directory(&self.destination).to_owned(),
                name: extract_name(&self.destination)
                    .unwrap_or_else(|| rm_dev(&self.source))
                    .to_owned(),
                compression: extract_compression_option(&self.destination).map(str::to_owned),
            },
            JobKind::Restore => Command::Restore {
                source: self.source.clone(),
                destination: self.destination.clone(),
            },
        }
    }

    /// Only successful clones have an image worth deleting.
    pub fn delete_command(&self) -> Option<Command> {
        (self.kind == JobKind::Clone && self.is_success()).then(|| Command::DeleteClone {
            file: self.destination.clone(),
        })
    }
}
