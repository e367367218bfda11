use std::ops::ControlFlow;
use std::sync::{Arc, Mutex};

use apart_core::Message;
use apart_engine::{Listener, MessageRouter, Subscription};

fn msg(message_type: &str) -> Message {
    Message::build(message_type).finish()
}

fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) -> Box<dyn FnMut(&Message) -> ControlFlow<()> + Send>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    let make = move |name: &str| {
        let sink = Arc::clone(&sink);
        let name = name.to_owned();
        Box::new(move |message: &Message| {
            sink.lock()
                .unwrap()
                .push(format!("{name}:{}", message.message_type()));
            ControlFlow::Continue(())
        }) as Box<dyn FnMut(&Message) -> ControlFlow<()> + Send>
    };
    (log, make)
}

#[test]
fn dispatches_in_registration_order_to_matching_listeners() {
    let router = MessageRouter::new();
    let (log, make) = recorder();
    router.register(Listener::all(make("a")));
    router.register(Listener::new(|m| m.message_type() == "clone", make("b")));
    router.register(Listener::all(make("c")));

    assert_eq!(router.dispatch(&msg("clone")), 3);
    assert_eq!(router.dispatch(&msg("status")), 2);
    assert_eq!(
        *log.lock().unwrap(),
        vec!["a:clone", "b:clone", "c:clone", "a:status", "c:status"]
    );
}

#[test]
fn remove_is_idempotent() {
    let router = MessageRouter::new();
    let (log, make) = recorder();
    let first = router.register(Listener::all(make("a")));
    let _second = router.register(Listener::all(make("b")));

    assert!(first.remove());
    assert!(!first.remove());
    assert!(!first.is_active());
    assert_eq!(router.len(), 1);

    router.dispatch(&msg("status"));
    assert_eq!(*log.lock().unwrap(), vec!["b:status"]);
}

#[test]
fn one_shot_listener_runs_exactly_once() {
    let router = MessageRouter::new();
    let (log, make) = recorder();
    let once = router.register(Listener::new(|m| m.message_type() == "clone", make("once")).once());

    router.dispatch(&msg("status"));
    assert!(once.is_active());
    for _ in 0..10 {
        router.dispatch(&msg("clone"));
    }

    assert_eq!(*log.lock().unwrap(), vec!["once:clone"]);
    assert!(router.is_empty());
    assert!(!once.remove());
}

#[test]
fn break_deregisters_the_listener() {
    let router = MessageRouter::new();
    let count = Arc::new(Mutex::new(0));
    let seen = Arc::clone(&count);
    router.register(Listener::all(move |_| {
        let mut seen = seen.lock().unwrap();
        *seen += 1;
        if *seen == 2 {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }));

    for _ in 0..5 {
        router.dispatch(&msg("status"));
    }
    assert_eq!(*count.lock().unwrap(), 2);
    assert!(router.is_empty());
}

#[test]
fn listener_removed_mid_dispatch_is_skipped() {
    let router = MessageRouter::new();
    let (log, make) = recorder();
    let victim: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

    let slot = Arc::clone(&victim);
    let mut first = make("first");
    router.register(Listener::all(move |message| {
        if let Some(subscription) = slot.lock().unwrap().as_ref() {
            subscription.remove();
        }
        first(message)
    }));
    let second = router.register(Listener::all(make("second")));
    *victim.lock().unwrap() = Some(second);

    assert_eq!(router.dispatch(&msg("status")), 1);
    router.dispatch(&msg("clone"));
    assert_eq!(*log.lock().unwrap(), vec!["first:status", "first:clone"]);
}

#[test]
fn listener_may_remove_itself() {
    let router = MessageRouter::new();
    let own: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
    let count = Arc::new(Mutex::new(0));

    let slot = Arc::clone(&own);
    let seen = Arc::clone(&count);
    let subscription = router.register(Listener::all(move |_| {
        *seen.lock().unwrap() += 1;
        if let Some(subscription) = slot.lock().unwrap().as_ref() {
            subscription.remove();
        }
        ControlFlow::Continue(())
    }));
    *own.lock().unwrap() = Some(subscription);

    router.dispatch(&msg("status"));
    router.dispatch(&msg("status"));
    assert_eq!(*count.lock().unwrap(), 1);
}

#[test]
fn listener_registered_mid_dispatch_waits_for_next_message() {
    let router = MessageRouter::new();
    let (log, make) = recorder();
    let make = Arc::new(Mutex::new(make));

    let inner_router = router.clone();
    let factory = Arc::clone(&make);
    router.register(
        Listener::all(move |_| {
            let callback = (*factory.lock().unwrap())("late");
            inner_router.register(Listener::all(callback));
            ControlFlow::Continue(())
        })
        .once(),
    );

    assert_eq!(router.dispatch(&msg("first")), 1);
    assert_eq!(router.dispatch(&msg("second")), 1);
    assert_eq!(*log.lock().unwrap(), vec!["late:second"]);
}

#[test]
fn subscription_outliving_router_is_inert() {
    let router = MessageRouter::new();
    let subscription = router.register(Listener::all(|_| ControlFlow::Continue(())));
    drop(router);
    assert!(!subscription.remove());
    assert!(!subscription.is_active());
}
