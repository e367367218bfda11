//! Apart engine: worker channel, message routing, settings and persistence.
mod codec;
mod history_store;
mod notifier;
mod router;
mod settings;
mod transport;

pub use codec::{
    decode_message, decode_messages, encode_command, encode_message, encode_messages,
    parse_message, CodecError,
};
pub use history_store::{HistoryError, HistoryStore};
pub use notifier::{CommandNotifier, Notifier, NotifyError};
pub use router::{Listener, MessageRouter, Subscription};
pub use settings::{
    Elevation, Settings, TransportConfig, WorkerSpec, CONFIG_DIR_VAR, CORE_CMD_VAR, SUDO_VAR,
};
pub use transport::{Channel, Received, Transport, TransportError, WorkerExit};
