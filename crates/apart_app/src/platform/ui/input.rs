//! Console commands mapped to core messages.

use apart_core::paths::rm_dev;
use apart_core::{HistoryKey, Msg};
use thiserror::Error;

pub const USAGE: &str = "\
commands:
  clone <partition> <directory> [name] [compression]
  restore <image> <partition>
  cancel <job>
  rerun <record>  forget <record>  delete <record>
  refresh         help           quit";

#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Msg(Msg),
    Help,
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("unknown command `{0}`")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
}

const RECORD_USAGE: &str = "<rerun|forget|delete> <record>, e.g. `rerun #3`";

pub fn parse_line(line: &str) -> Result<Input, InputError> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some((&command, args)) = words.split_first() else {
        return Ok(Input::Empty);
    };

    let msg = match (command, args) {
        ("clone", [partition, directory, rest @ ..]) if rest.len() <= 2 => {
            let source = device_path(partition);
            let name = rest
                .first()
                .map(|name| (*name).to_owned())
                .unwrap_or_else(|| rm_dev(&source).to_owned());
            Msg::StartClone {
                source,
                directory: (*directory).to_owned(),
                name,
                compression: rest.get(1).map(|option| (*option).to_owned()),
            }
        }
        ("clone", _) => {
            return Err(InputError::Usage(
                "clone <partition> <directory> [name] [compression]",
            ))
        }
        ("restore", [image, partition]) => Msg::StartRestore {
            image: (*image).to_owned(),
            device: device_path(partition),
        },
        ("restore", _) => return Err(InputError::Usage("restore <image> <partition>")),
        ("cancel", [job]) => Msg::CancelClicked {
            job_id: (*job).to_owned(),
        },
        ("cancel", _) => return Err(InputError::Usage("cancel <job>")),
        ("rerun", [record]) => Msg::RerunClicked {
            key: history_key(record)?,
        },
        ("forget", [record]) => Msg::ForgetClicked {
            key: history_key(record)?,
        },
        ("delete", [record]) => Msg::DeleteImageClicked {
            key: history_key(record)?,
        },
        ("rerun" | "forget" | "delete", _) => return Err(InputError::Usage(RECORD_USAGE)),
        ("refresh", []) => Msg::RefreshSources,
        ("quit" | "exit", []) => Msg::QuitRequested,
        ("help" | "?", _) => return Ok(Input::Help),
        (other, _) => return Err(InputError::Unknown(other.to_owned())),
    };
    Ok(Input::Msg(msg))
}

fn history_key(record: &str) -> Result<HistoryKey, InputError> {
    record.parse().map_err(|_| InputError::Usage(RECORD_USAGE))
}

/// `sda1` and `/dev/sda1` both name the same partition.
fn device_path(partition: &str) -> String {
    if partition.starts_with('/') {
        partition.to_owned()
    } else {
        format!("/dev/{partition}")
    }
}
