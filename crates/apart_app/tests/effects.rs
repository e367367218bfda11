use std::cell::RefCell;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};

use apart_app::platform::{CommandSink, EffectRunner};
use apart_core::{Command, Digest, Effect, Msg};
use apart_engine::{Notifier, NotifyError, TransportError};

#[derive(Default)]
struct RecordingSink {
    sent: RefCell<Vec<Command>>,
}

impl CommandSink for RecordingSink {
    fn send_command(&self, command: &Command) -> Result<(), TransportError> {
        self.sent.borrow_mut().push(command.clone());
        Ok(())
    }
}

#[derive(Clone, Default)]
struct FakeNotifier {
    fail: bool,
    shown: Arc<Mutex<Vec<(String, String)>>>,
}

impl Notifier for FakeNotifier {
    fn notify(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        if self.fail {
            return Err(NotifyError::Failed {
                program: "notify-send".to_owned(),
                code: Some(1),
            });
        }
        self.shown
            .lock()
            .unwrap()
            .push((title.to_owned(), body.to_owned()));
        Ok(())
    }
}

#[test]
fn effects_run_in_order_and_report_shutdown() {
    let (tx, rx) = mpsc::channel();
    let notifier = FakeNotifier::default();
    let shown = Arc::clone(&notifier.shown);
    let mut prompt = Vec::new();
    let mut runner = EffectRunner::new(RecordingSink::default(), notifier, &mut prompt, tx);

    let shutdown = runner.run(vec![
        Effect::Send(Command::StatusRequest),
        Effect::Notify(Digest {
            successes: 2,
            failures: 1,
        }),
        Effect::ReportFailure {
            title: "Clone failed".to_owned(),
            detail: "sda1 -> /mnt/b: read error".to_owned(),
        },
        Effect::Send(Command::CancelClone { id: "3".to_owned() }),
    ]);
    assert!(!shutdown);
    assert_eq!(
        *runner.sink().sent.borrow(),
        vec![
            Command::StatusRequest,
            Command::CancelClone { id: "3".to_owned() }
        ]
    );
    assert!(runner.run(vec![Effect::Shutdown]));
    drop(runner);

    assert_eq!(
        *shown.lock().unwrap(),
        vec![("Apart".to_owned(), "1 job failed, 2 jobs finished".to_owned())]
    );
    assert_eq!(
        String::from_utf8(prompt).unwrap(),
        "!! Clone failed\n!! sda1 -> /mnt/b: read error\n"
    );
    assert!(rx.try_recv().is_err());
}

#[test]
fn failed_notification_disables_digests() {
    let (tx, rx) = mpsc::channel();
    let notifier = FakeNotifier {
        fail: true,
        ..FakeNotifier::default()
    };
    let mut runner = EffectRunner::new(RecordingSink::default(), notifier, Vec::new(), tx);

    runner.run(vec![Effect::Notify(Digest {
        successes: 1,
        failures: 0,
    })]);
    assert_eq!(rx.try_recv().unwrap(), Msg::NotificationsUnavailable);
}
