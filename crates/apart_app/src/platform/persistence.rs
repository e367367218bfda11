use std::sync::mpsc;

use apart_core::{FinishedJob, Msg};
use apart_engine::HistoryStore;
use apart_logging::{apart_error, apart_warn};

/// Queues the persisted finished jobs for the presentation loop. A history
/// that cannot be read is logged and treated as empty.
pub(crate) fn restore_history(store: &HistoryStore, msg_tx: &mpsc::Sender<Msg>) {
    match store.load() {
        Ok(records) if records.is_empty() => {}
        Ok(records) => {
            let _ = msg_tx.send(Msg::RestoreHistory(records));
        }
        Err(err) => apart_warn!("Ignoring history: {}", err),
    }
}

pub(crate) fn save_history(store: &HistoryStore, finished: &[FinishedJob]) {
    if let Err(err) = store.save(finished) {
        apart_error!(
            "Failed to save history to {}: {}",
            store.path().display(),
            err
        );
    }
}
