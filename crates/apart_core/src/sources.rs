use crate::{Message, MessageError, Value};

/// Partitions this small or smaller are not offered for cloning.
pub const MIN_PARTITION_BYTES: u64 = 1024 * 1024;

const TITLE_LABEL_MAX: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerStatus {
    Started,
    Running,
    Dying,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub name: String,
    pub size: u64,
    pub fstype: Option<String>,
    pub label: Option<String>,
    pub mounted: bool,
}

impl Partition {
    fn from_value(value: &Value) -> Option<Self> {
        Some(Self {
            name: value.get("name")?.as_str()?.to_owned(),
            size: value.get("size")?.as_u64()?,
            fstype: value.get("fstype").and_then(Value::as_str).map(str::to_owned),
            label: value.get("label").and_then(Value::as_str).map(str::to_owned),
            mounted: value.get("mounted").and_then(Value::as_bool).unwrap_or(false),
        })
    }

    pub fn dev_name(&self) -> String {
        format!("/dev/{}", self.name)
    }

    /// Name plus a label shortened to fit a sidebar: `sda1 Windows...`.
    pub fn title(&self) -> String {
        let label = self.label.as_deref().unwrap_or_default().trim();
        let label = if label.chars().count() > TITLE_LABEL_MAX {
            let short: String = label.chars().take(TITLE_LABEL_MAX - 3).collect();
            format!("{}...", short.trim_end())
        } else {
            label.to_owned()
        };
        format!("{} {}", self.name, label).trim_end().to_owned()
    }

    /// Default backup name: label if present, otherwise the device name.
    pub fn default_backup_name(&self) -> String {
        self.label
            .as_deref()
            .filter(|label| !label.trim().is_empty())
            .unwrap_or(self.name.as_str())
            .replace(' ', "_")
    }
}

/// A parsed `type: status` message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub status: WorkerStatus,
    pub partitions: Vec<Partition>,
    /// Only sent with `started`.
    pub compression_options: Option<Vec<String>>,
}

impl StatusReport {
    pub fn parse(message: &Message) -> Result<Self, MessageError> {
        let status = match message.require_str("status")? {
            "started" => WorkerStatus::Started,
            "running" => WorkerStatus::Running,
            "dying" => WorkerStatus::Dying,
            _ => return Err(MessageError::Field("status".to_owned())),
        };
        let partitions = message
            .get("sources")
            .and_then(Value::as_seq)
            .map(clonable_partitions)
            .unwrap_or_default();
        let compression_options = message
            .get("compression_options")
            .and_then(Value::as_seq)
            .map(|options| {
                options
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_owned)
                    .collect()
            });
        Ok(Self {
            status,
            partitions,
            compression_options,
        })
    }
}

/// Flattens the partitions of every source, skipping tiny ones.
pub fn clonable_partitions(sources: &[Value]) -> Vec<Partition> {
    sources
        .iter()
        .filter_map(|source| source.get("parts").and_then(Value::as_seq))
        .flatten()
        .filter_map(Partition::from_value)
        .filter(|part| part.size > MIN_PARTITION_BYTES)
        .collect()
}
