use std::io;
use std::process::{Command, Stdio};

use apart_core::Digest;
use apart_logging::apart_debug;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("could not run `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("`{program}` exited with code {code:?}")]
    Failed { program: String, code: Option<i32> },
}

/// Desktop notification delivery.
pub trait Notifier: Send {
    fn notify(&self, title: &str, body: &str) -> Result<(), NotifyError>;

    fn notify_digest(&self, digest: &Digest) -> Result<(), NotifyError> {
        self.notify(Digest::TITLE, &digest.to_string())
    }
}

/// Delivers notifications through `notify-send`.
#[derive(Debug, Clone)]
pub struct CommandNotifier {
    program: String,
}

impl CommandNotifier {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for CommandNotifier {
    fn default() -> Self {
        Self::new("notify-send")
    }
}

impl Notifier for CommandNotifier {
    fn notify(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        apart_debug!("Notifying: {} / {}", title, body);
        let status = Command::new(&self.program)
            .arg("--app-name=Apart")
            .arg(title)
            .arg(body)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .status()
            .map_err(|source| NotifyError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        if status.success() {
            Ok(())
        } else {
            Err(NotifyError::Failed {
                program: self.program.clone(),
                code: status.code(),
            })
        }
    }
}
