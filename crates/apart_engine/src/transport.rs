//! Local channel to the worker process and the worker's lifecycle.
//!
//! The UI binds a ZeroMQ PAIR socket on an `ipc://` address and spawns the
//! worker with that address as its last argument; the worker connects back.
//! Every frame is one YAML document. A dedicated `apart-core-runner` thread
//! owns the socket, polls it with a short timeout, dispatches every decoded
//! message through the [`MessageRouter`], and finally reaps the worker.

use std::collections::VecDeque;
use std::io;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::process::{Child, Command as ProcessCommand, ExitStatus};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, TryRecvError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use apart_core::{Command, Message};
use apart_logging::{apart_debug, apart_error, apart_info, apart_trace, apart_warn};
use thiserror::Error;

use crate::codec::{decode_message, encode_command, CodecError};
use crate::router::{Listener, MessageRouter, Subscription};
use crate::settings::{Elevation, TransportConfig};

/// Exit codes pkexec uses when authentication is dismissed or refused.
const ELEVATION_DECLINED_CODES: [i32; 2] = [126, 127];
const DRAIN_TIMEOUT: Duration = Duration::from_millis(10);
/// How long a closing worker end keeps trying to deliver queued frames.
const WORKER_LINGER_MS: i32 = 1000;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("worker binary `{program}` not found: {source}")]
    WorkerNotFound {
        program: String,
        #[source]
        source: which::Error,
    },
    #[error("privilege escalation helper `{helper}` is not available: {source}")]
    ElevationUnavailable {
        helper: String,
        #[source]
        source: which::Error,
    },
    #[error("failed to spawn worker: {0}")]
    Spawn(#[source] io::Error),
    #[error("channel error: {0}")]
    Channel(#[from] zmq::Error),
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Passed to the completion callback once the worker is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerExit {
    /// `None` when the worker was terminated by a signal.
    pub code: Option<i32>,
    /// Whether the worker ever sent anything over the channel.
    pub connected: bool,
}

impl WorkerExit {
    /// The elevation helper exited before the worker spoke, with the codes
    /// used for a dismissed or refused authentication.
    pub fn elevation_declined(&self) -> bool {
        !self.connected
            && self
                .code
                .is_some_and(|code| ELEVATION_DECLINED_CODES.contains(&code))
    }
}

/// Outcome of one [`Channel::receive`] poll.
#[derive(Debug, Clone, PartialEq)]
pub enum Received {
    Message(Message),
    /// Nothing arrived within the timeout; not an error.
    Timeout,
}

/// One end of the PAIR channel.
pub struct Channel {
    socket: zmq::Socket,
}

impl Channel {
    /// Binds the UI end at `address`. Frames still queued when it closes
    /// are dropped.
    pub fn bind(address: &str) -> Result<Self, TransportError> {
        let socket = zmq::Context::new().socket(zmq::PAIR)?;
        socket.set_linger(0)?;
        socket.bind(address)?;
        Ok(Self { socket })
    }

    /// Connects the worker end to `address`.
    pub fn connect(address: &str) -> Result<Self, TransportError> {
        let socket = zmq::Context::new().socket(zmq::PAIR)?;
        socket.set_linger(WORKER_LINGER_MS)?;
        socket.connect(address)?;
        Ok(Self { socket })
    }

    /// Waits at most `wait` for the next message. A frame that fails to
    /// decode is consumed and reported as [`TransportError::Codec`]; the
    /// channel stays usable.
    pub fn receive(&self, wait: Duration) -> Result<Received, TransportError> {
        let timeout_ms = i64::try_from(wait.as_millis()).unwrap_or(i64::MAX);
        if self.socket.poll(zmq::POLLIN, timeout_ms)? == 0 {
            return Ok(Received::Timeout);
        }
        let frame = self.socket.recv_bytes(0)?;
        Ok(Received::Message(decode_message(&frame)?))
    }

    /// Blocks until the peer is there to take the frame.
    pub fn send(&self, text: &str) -> Result<(), TransportError> {
        self.socket.send(text, 0)?;
        Ok(())
    }

    /// `Ok(false)` while no peer is connected to take the frame.
    pub fn try_send(&self, text: &str) -> Result<bool, TransportError> {
        match self.socket.send(text, zmq::DONTWAIT) {
            Ok(()) => Ok(true),
            Err(zmq::Error::EAGAIN) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    /// Dispatches frames until none arrives within `wait`, skipping frames
    /// that fail to decode. Returns the number of messages dispatched.
    pub fn drain_into(&self, router: &MessageRouter, wait: Duration) -> usize {
        let mut dispatched = 0;
        loop {
            match self.receive(wait) {
                Ok(Received::Message(message)) => {
                    router.dispatch(&message);
                    dispatched += 1;
                }
                Ok(Received::Timeout) => return dispatched,
                Err(TransportError::Codec(err)) => {
                    apart_warn!("Dropping malformed message from worker: {}", err);
                }
                Err(err) => {
                    apart_error!("Channel failed while draining: {}", err);
                    return dispatched;
                }
            }
        }
    }
}

enum Outgoing {
    Text(String),
    Shutdown,
}

pub struct Transport {
    address: String,
    socket_path: PathBuf,
    router: MessageRouter,
    outgoing: mpsc::Sender<Outgoing>,
    open: Arc<AtomicBool>,
    runner: Mutex<Option<JoinHandle<()>>>,
    debug_listener: Subscription,
}

impl Transport {
    /// Binds the channel, spawns the worker and starts the runner thread.
    ///
    /// Listeners that must see the worker's first messages are registered on
    /// `router` before calling this. `on_exit` runs on the runner thread once
    /// the worker has been reaped.
    pub fn start(
        config: TransportConfig,
        router: MessageRouter,
        on_exit: impl FnOnce(WorkerExit) + Send + 'static,
    ) -> Result<Self, TransportError> {
        let mut command = worker_command(&config)?;

        let socket_path = config
            .socket_dir
            .join(format!("apart-gtk-{}.ipc", uuid::Uuid::new_v4()));
        let address = format!("ipc://{}", socket_path.display());
        let channel = Channel::bind(&address)?;

        command.args(&config.worker.args).arg(&address);
        apart_info!("Starting worker: {:?}", command);
        let child = match command.spawn() {
            Ok(child) => child,
            Err(err) => {
                drop(channel);
                remove_socket(&socket_path);
                return Err(TransportError::Spawn(err));
            }
        };

        let debug_listener = router.register(Listener::all(|message| {
            apart_trace!("apart-core -> {:?}", message);
            ControlFlow::Continue(())
        }));

        let (outgoing, outgoing_rx) = mpsc::channel();
        let open = Arc::new(AtomicBool::new(true));
        let runner = {
            let router = router.clone();
            let open = Arc::clone(&open);
            let socket_path = socket_path.clone();
            thread::Builder::new()
                .name("apart-core-runner".to_owned())
                .spawn(move || {
                    let mut worker = WorkerProcess::new(child);
                    let connected =
                        run_channel(&channel, &mut worker, &router, &outgoing_rx, &config);
                    open.store(false, Ordering::SeqCst);
                    drop(channel);
                    remove_socket(&socket_path);
                    let code = worker.reap(config.exit_grace, config.poll_interval);
                    apart_info!("Worker exited with code {:?}", code);
                    on_exit(WorkerExit { code, connected });
                })
                .map_err(TransportError::Spawn)?
        };

        Ok(Self {
            address,
            socket_path,
            router,
            outgoing,
            open,
            runner: Mutex::new(Some(runner)),
            debug_listener,
        })
    }

    /// The address handed to the worker, `ipc://<socket path>`.
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    pub fn router(&self) -> &MessageRouter {
        &self.router
    }

    /// False once the receive loop has stopped.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Fire-and-forget. Text queued before the worker connects is delivered
    /// once it does; text sent after the loop stopped is dropped.
    pub fn send(&self, raw: impl Into<String>) {
        let raw = raw.into();
        if !self.is_open() {
            apart_warn!("Channel closed, dropping: {}", raw.trim_end());
            return;
        }
        apart_debug!("apart-core <- {}", raw.trim_end());
        if self.outgoing.send(Outgoing::Text(raw)).is_err() {
            apart_warn!("Runner thread gone, message dropped");
        }
    }

    pub fn send_command(&self, command: &Command) -> Result<(), TransportError> {
        self.send(encode_command(command)?);
        Ok(())
    }

    /// Sends `kill-request` if the channel is still open and waits for the
    /// runner thread, which is bounded by the exit grace period.
    pub fn shutdown(&self) {
        let handle = self
            .runner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(handle) = handle else {
            return;
        };
        if self.is_open() {
            apart_debug!("Requesting worker shutdown");
            let _ = self.outgoing.send(Outgoing::Shutdown);
        }
        self.debug_listener.remove();
        if handle.join().is_err() {
            apart_error!("apart-core-runner thread panicked");
        }
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_command(config: &TransportConfig) -> Result<ProcessCommand, TransportError> {
    let program = &config.worker.program;
    let worker = which::which(program).map_err(|source| TransportError::WorkerNotFound {
        program: program.clone(),
        source,
    })?;
    Ok(match &config.worker.elevation {
        Elevation::Direct => ProcessCommand::new(worker),
        Elevation::Helper(helper) => {
            let helper_path =
                which::which(helper).map_err(|source| TransportError::ElevationUnavailable {
                    helper: helper.clone(),
                    source,
                })?;
            let mut command = ProcessCommand::new(helper_path);
            command.arg(worker);
            command
        }
    })
}

fn remove_socket(path: &Path) {
    if let Err(err) = std::fs::remove_file(path) {
        if err.kind() != io::ErrorKind::NotFound {
            apart_warn!("Could not remove {}: {}", path.display(), err);
        }
    }
}

struct WorkerProcess {
    child: Child,
    status: Option<ExitStatus>,
}

impl WorkerProcess {
    fn new(child: Child) -> Self {
        Self {
            child,
            status: None,
        }
    }

    fn has_exited(&mut self) -> bool {
        if self.status.is_none() {
            match self.child.try_wait() {
                Ok(status) => self.status = status,
                Err(err) => apart_warn!("Could not poll worker: {}", err),
            }
        }
        self.status.is_some()
    }

    /// Waits up to `grace` for the worker to exit, then kills it.
    fn reap(&mut self, grace: Duration, poll: Duration) -> Option<i32> {
        let deadline = Instant::now() + grace;
        while !self.has_exited() && Instant::now() < deadline {
            thread::sleep(poll);
        }
        if self.status.is_none() {
            apart_warn!("Worker still running after {:?}, killing it", grace);
            if let Err(err) = self.child.kill() {
                apart_error!("Could not kill worker: {}", err);
            }
            match self.child.wait() {
                Ok(status) => self.status = Some(status),
                Err(err) => apart_error!("Could not wait for worker: {}", err),
            }
        }
        self.status.and_then(|status| status.code())
    }
}

/// Runs until the worker exits, reports `dying`, the channel fails, or the
/// worker ignores a kill request for longer than the exit grace period.
/// Returns whether the worker ever sent anything.
fn run_channel(
    channel: &Channel,
    worker: &mut WorkerProcess,
    router: &MessageRouter,
    outgoing: &mpsc::Receiver<Outgoing>,
    config: &TransportConfig,
) -> bool {
    let mut pending = VecDeque::new();
    let mut heard_from_worker = false;
    let mut kill_deadline: Option<Instant> = None;
    loop {
        if worker.has_exited() {
            apart_info!("Worker exited, draining channel");
            let drained = channel.drain_into(router, DRAIN_TIMEOUT);
            return heard_from_worker || drained > 0;
        }
        if kill_deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            apart_warn!("Worker did not acknowledge the kill request");
            return heard_from_worker;
        }

        loop {
            match outgoing.try_recv() {
                Ok(Outgoing::Text(text)) => pending.push_back(text),
                Ok(Outgoing::Shutdown) | Err(TryRecvError::Disconnected) => {
                    if kill_deadline.is_none() {
                        match encode_command(&Command::KillRequest) {
                            Ok(text) => pending.push_back(text),
                            Err(err) => apart_error!("Could not encode kill request: {}", err),
                        }
                        kill_deadline = Some(Instant::now() + config.exit_grace);
                    }
                    break;
                }
                Err(TryRecvError::Empty) => break,
            }
        }
        flush_pending(channel, &mut pending);

        match channel.receive(config.poll_interval) {
            Ok(Received::Timeout) => {}
            Ok(Received::Message(message)) => {
                heard_from_worker = true;
                let dying = message.is_status("dying");
                router.dispatch(&message);
                if dying {
                    apart_info!("Worker is dying, stopping receive loop");
                    return true;
                }
            }
            Err(TransportError::Codec(err)) => {
                heard_from_worker = true;
                apart_warn!("Dropping malformed message from worker: {}", err);
            }
            Err(err) => {
                apart_error!("Channel failed: {}", err);
                return heard_from_worker;
            }
        }
    }
}

/// Sends queued text in order until the worker end stops taking frames.
fn flush_pending(channel: &Channel, pending: &mut VecDeque<String>) {
    while let Some(text) = pending.front() {
        match channel.try_send(text) {
            Ok(true) => {}
            Ok(false) => return,
            Err(err) => apart_warn!("Failed to send to worker: {}", err),
        }
        pending.pop_front();
    }
}
