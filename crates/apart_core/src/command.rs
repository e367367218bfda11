use serde::Serialize;

use crate::{JobId, JobKind};

/// Requests sent from the UI to the worker.
///
/// Serializes as a flat mapping whose `type` is the kebab-case variant name,
/// e.g. `type: cancel-clone` followed by `id: ...`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Command {
    Clone {
        source: String,
        destination: String,
        name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        compression: Option<String>,
    },
    Restore {
        source: String,
        destination: String,
    },
    CancelClone {
        id: JobId,
    },
    CancelRestore {
        id: JobId,
    },
    DeleteClone {
        file: String,
    },
    StatusRequest,
    /// Only sent while shutting down.
    KillRequest,
}

impl Command {
    pub fn cancel(kind: JobKind, id: JobId) -> Self {
        match kind {
            JobKind::Clone => Command::CancelClone { id },
            JobKind::Restore => Command::CancelRestore { id },
        }
    }

    /// The wire `type` of this command.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Clone { .. } => "clone",
            Command::Restore { .. } => "restore",
            Command::CancelClone { .. } => "cancel-clone",
            Command::CancelRestore { .. } => "cancel-restore",
            Command::DeleteClone { .. } => "delete-clone",
            Command::StatusRequest => "status-request",
            Command::KillRequest => "kill-request",
        }
    }
}
