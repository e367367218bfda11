use std::io::Write;
use std::sync::mpsc;

use apart_core::{Command, Effect, Msg};
use apart_engine::{Notifier, Transport, TransportError};
use apart_logging::{apart_error, apart_info, apart_warn};

use super::ui::render;

/// Where worker commands go; the transport in production.
pub trait CommandSink {
    fn send_command(&self, command: &Command) -> Result<(), TransportError>;
}

impl CommandSink for Transport {
    fn send_command(&self, command: &Command) -> Result<(), TransportError> {
        Transport::send_command(self, command)
    }
}

impl<T: CommandSink + ?Sized> CommandSink for &T {
    fn send_command(&self, command: &Command) -> Result<(), TransportError> {
        (**self).send_command(command)
    }
}

pub struct EffectRunner<S, N, W> {
    sink: S,
    notifier: N,
    prompt: W,
    msg_tx: mpsc::Sender<Msg>,
}

impl<S: CommandSink, N: Notifier, W: Write> EffectRunner<S, N, W> {
    pub fn new(sink: S, notifier: N, prompt: W, msg_tx: mpsc::Sender<Msg>) -> Self {
        Self {
            sink,
            notifier,
            prompt,
            msg_tx,
        }
    }

    /// Executes effects in order. Returns true once shutdown was requested.
    pub fn run(&mut self, effects: Vec<Effect>) -> bool {
        let mut shutdown = false;
        for effect in effects {
            match effect {
                Effect::Send(command) => {
                    if let Err(err) = self.sink.send_command(&command) {
                        apart_error!("Could not send {}: {}", command.name(), err);
                    }
                }
                Effect::Notify(digest) => {
                    if let Err(err) = self.notifier.notify_digest(&digest) {
                        apart_warn!("Notification failed: {}", err);
                        let _ = self.msg_tx.send(Msg::NotificationsUnavailable);
                    }
                }
                Effect::ReportFailure { title, detail } => {
                    apart_info!("{}: {}", title, detail);
                    if let Err(err) = render::report_failure(&mut self.prompt, &title, &detail) {
                        apart_warn!("Could not show failure: {}", err);
                    }
                }
                Effect::Shutdown => shutdown = true,
            }
        }
        shutdown
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}
