//! Finished jobs persisted across restarts as a YAML sequence of their
//! terminal messages.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use apart_core::FinishedJob;
use apart_logging::{apart_debug, apart_info, apart_warn};
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::codec::{decode_messages, encode_messages, CodecError};

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("history file {path} is unreadable: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: CodecError,
    },
    #[error("history path {0} has no file name")]
    InvalidPath(PathBuf),
    #[error(transparent)]
    Encode(#[from] CodecError),
    #[error("could not write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the persisted records in file order. A missing file is an empty
    /// history; entries that fail to parse are skipped with a warning.
    pub fn load(&self) -> Result<Vec<FinishedJob>, HistoryError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                apart_debug!("No history at {}", self.path.display());
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(HistoryError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        let items = decode_messages(&text).map_err(|source| HistoryError::Parse {
            path: self.path.clone(),
            source,
        })?;

        let mut jobs = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            let job = item
                .map_err(|err| err.to_string())
                .and_then(|message| FinishedJob::from_message(message).map_err(|e| e.to_string()));
            match job {
                Ok(job) => jobs.push(job),
                Err(err) => apart_warn!("Skipping history entry {}: {}", index, err),
            }
        }
        apart_info!("Loaded {} history records from {}", jobs.len(), self.path.display());
        Ok(jobs)
    }

    /// Overwrites the history file with `jobs`, creating the directory on
    /// first write. The old history stays in place until the new one is
    /// fully on disk.
    pub fn save(&self, jobs: &[FinishedJob]) -> Result<(), HistoryError> {
        let dir = match self.path.parent() {
            Some(dir) if self.path.file_name().is_some() => dir,
            _ => return Err(HistoryError::InvalidPath(self.path.clone())),
        };
        let text = encode_messages(jobs.iter().map(FinishedJob::message))?;
        self.replace_with(dir, &text)
            .map_err(|source| HistoryError::Write {
                path: self.path.clone(),
                source,
            })?;
        apart_info!("Saved {} history records to {}", jobs.len(), self.path.display());
        Ok(())
    }

    /// Stages `text` next to the history file and renames it over the file.
    fn replace_with(&self, dir: &Path, text: &str) -> io::Result<()> {
        fs::create_dir_all(dir)?;
        let mut staged = NamedTempFile::new_in(dir)?;
        staged.write_all(text.as_bytes())?;
        staged.as_file().sync_all()?;
        staged.persist(&self.path).map_err(|err| err.error)?;
        Ok(())
    }
}
