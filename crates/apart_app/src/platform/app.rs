use std::io::{self, BufRead, Write};
use std::ops::ControlFlow;
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context};
use apart_core::{is_job_message, update, AppState, Message, Msg};
use apart_engine::{
    CommandNotifier, HistoryStore, Listener, MessageRouter, Settings, Subscription, Transport,
    WorkerExit,
};
use apart_logging::{apart_debug, apart_info, apart_warn};

use super::effects::EffectRunner;
use super::logging::{self, LogDestination};
use super::persistence;
use super::ui::{input, render};

const TICK_INTERVAL: Duration = Duration::from_secs(1);

pub fn run_app(log_destination: LogDestination) -> anyhow::Result<()> {
    let settings = Settings::from_env();
    if let Err(err) = settings.ensure_config_dir() {
        eprintln!(
            "Warning: could not create {}: {err}",
            settings.config_dir().display()
        );
    }
    logging::initialize(log_destination, &settings.log_path());
    apart_info!("apart {} starting", env!("CARGO_PKG_VERSION"));

    // Injection queue: everything that touches UI state arrives here, in order.
    let (msg_tx, msg_rx) = mpsc::channel::<Msg>();

    let history = HistoryStore::new(settings.history_path());
    persistence::restore_history(&history, &msg_tx);

    let router = MessageRouter::new();
    let subscriptions = subscribe_worker_messages(&router, &msg_tx);

    let worker_exit = Arc::new(Mutex::new(None::<WorkerExit>));
    let transport = {
        let exit_tx = msg_tx.clone();
        let worker_exit = Arc::clone(&worker_exit);
        Transport::start(settings.transport_config(), router, move |exit| {
            *worker_exit.lock().unwrap_or_else(PoisonError::into_inner) = Some(exit);
            let _ = exit_tx.send(Msg::WorkerExited { code: exit.code });
        })
        .context("could not start apart-core")?
    };
    apart_debug!("Worker channel at {}", transport.address());

    spawn_console_input(msg_tx.clone());
    spawn_ticker(msg_tx.clone());

    let state = run_loop(&transport, msg_tx, &msg_rx)?;

    for subscription in &subscriptions {
        subscription.remove();
    }
    transport.shutdown();
    persistence::save_history(&history, &state.finished_snapshot());

    let exit = *worker_exit.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(exit) = exit.filter(WorkerExit::elevation_declined) {
        bail!(
            "apart-core needs root privileges; authentication was declined (exit code {:?})",
            exit.code
        );
    }
    apart_info!("apart exiting");
    Ok(())
}

/// Drains the injection queue through `update` until shutdown is requested.
fn run_loop(
    transport: &Transport,
    msg_tx: mpsc::Sender<Msg>,
    msg_rx: &mpsc::Receiver<Msg>,
) -> anyhow::Result<AppState> {
    let stdout = io::stdout();
    let mut runner = EffectRunner::new(transport, CommandNotifier::default(), io::stderr(), msg_tx);
    let mut state = AppState::new();
    render::render(&mut stdout.lock(), &state.view()).context("could not write to stdout")?;

    while let Ok(msg) = msg_rx.recv() {
        let (next, effects) = update(state, msg);
        state = next;
        let shutdown = runner.run(effects);
        if state.consume_dirty() {
            render::render(&mut stdout.lock(), &state.view())
                .context("could not write to stdout")?;
        }
        if shutdown {
            break;
        }
    }
    Ok(state)
}

/// Forwards the worker messages the core consumes into the injection queue.
/// A listener whose queue is gone deregisters itself.
fn subscribe_worker_messages(
    router: &MessageRouter,
    msg_tx: &mpsc::Sender<Msg>,
) -> Vec<Subscription> {
    let forward = |predicate: fn(&Message) -> bool| {
        let tx = msg_tx.clone();
        router.register(Listener::new(predicate, move |message| {
            match tx.send(Msg::Worker(message.clone())) {
                Ok(()) => ControlFlow::Continue(()),
                Err(_) => ControlFlow::Break(()),
            }
        }))
    };
    vec![
        forward(|message| message.message_type() == "status"),
        forward(is_job_message),
        forward(|message| {
            matches!(
                message.message_type(),
                "deleted-clone" | "delete-clone-failed"
            )
        }),
    ]
}

fn spawn_console_input(msg_tx: mpsc::Sender<Msg>) {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    apart_warn!("Console input failed: {}", err);
                    break;
                }
            };
            let msg = match input::parse_line(&line) {
                Ok(input::Input::Msg(msg)) => msg,
                Ok(input::Input::Help) => {
                    println!("{}", input::USAGE);
                    continue;
                }
                Ok(input::Input::Empty) => Msg::NoOp,
                Err(err) => {
                    println!("{err}");
                    continue;
                }
            };
            if msg_tx.send(msg).is_err() {
                return;
            }
        }
        let _ = msg_tx.send(Msg::QuitRequested);
        let _ = io::stdout().flush();
    });
}

fn spawn_ticker(msg_tx: mpsc::Sender<Msg>) {
    thread::spawn(move || {
        while msg_tx.send(Msg::Tick).is_ok() {
            thread::sleep(TICK_INTERVAL);
        }
    });
}
