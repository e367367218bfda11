use crate::{Command, Digest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Write a command to the worker channel.
    Send(Command),
    /// Deliver a desktop notification digest.
    Notify(Digest),
    /// Show a blocking error prompt.
    ReportFailure { title: String, detail: String },
    /// Persist history and stop the worker.
    Shutdown,
}
