//! Publish/subscribe over messages received from the worker.
//!
//! Dispatch snapshots the registry before invoking anything, so callbacks
//! may register or remove listeners (themselves included) while a message is
//! being delivered. A listener removed mid-pass is skipped for the rest of
//! that pass; a listener registered mid-pass first sees the next message.

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use apart_core::Message;
use apart_logging::apart_trace;

type Predicate = Box<dyn Fn(&Message) -> bool + Send>;
type Callback = Box<dyn FnMut(&Message) -> ControlFlow<()> + Send>;

/// A predicate-filtered callback. `ControlFlow::Break` from the callback
/// deregisters the listener.
pub struct Listener {
    predicate: Predicate,
    callback: Callback,
    one_shot: bool,
}

impl Listener {
    pub fn new(
        predicate: impl Fn(&Message) -> bool + Send + 'static,
        callback: impl FnMut(&Message) -> ControlFlow<()> + Send + 'static,
    ) -> Self {
        Self {
            predicate: Box::new(predicate),
            callback: Box::new(callback),
            one_shot: false,
        }
    }

    /// Matches every message.
    pub fn all(callback: impl FnMut(&Message) -> ControlFlow<()> + Send + 'static) -> Self {
        Self::new(|_| true, callback)
    }

    /// Deregisters after the first matching message.
    pub fn once(mut self) -> Self {
        self.one_shot = true;
        self
    }
}

struct Entry {
    id: u64,
    listener: Arc<Mutex<Listener>>,
    removed: Arc<AtomicBool>,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    entries: Vec<Entry>,
}

impl Registry {
    fn remove(&mut self, id: u64) -> bool {
        let Some(pos) = self.entries.iter().position(|entry| entry.id == id) else {
            return false;
        };
        let entry = self.entries.remove(pos);
        entry.removed.store(true, Ordering::SeqCst);
        true
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Clone, Default)]
pub struct MessageRouter {
    registry: Arc<Mutex<Registry>>,
}

impl MessageRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a listener; dispatch order is registration order.
    pub fn register(&self, listener: Listener) -> Subscription {
        let mut registry = lock(&self.registry);
        let id = registry.next_id;
        registry.next_id += 1;
        registry.entries.push(Entry {
            id,
            listener: Arc::new(Mutex::new(listener)),
            removed: Arc::new(AtomicBool::new(false)),
        });
        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Delivers `message` to every matching listener and returns how many
    /// callbacks ran.
    pub fn dispatch(&self, message: &Message) -> usize {
        let snapshot: Vec<_> = lock(&self.registry)
            .entries
            .iter()
            .map(|entry| (entry.id, entry.listener.clone(), entry.removed.clone()))
            .collect();

        let mut delivered = 0;
        for (id, listener, removed) in snapshot {
            if removed.load(Ordering::SeqCst) {
                continue;
            }
            let mut listener = lock(&listener);
            if !(listener.predicate)(message) {
                continue;
            }
            delivered += 1;
            let flow = (listener.callback)(message);
            if listener.one_shot || flow.is_break() {
                drop(listener);
                lock(&self.registry).remove(id);
            }
        }
        apart_trace!(
            "Dispatched {} message to {} listeners",
            message.message_type(),
            delivered
        );
        delivered
    }

    pub fn len(&self) -> usize {
        lock(&self.registry).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Capability to remove exactly one registered listener.
///
/// Dropping a subscription leaves the listener registered; its owner calls
/// [`Subscription::remove`] on teardown.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    /// Returns whether this call removed the listener. Later calls, or calls
    /// after the listener deregistered itself, do nothing.
    pub fn remove(&self) -> bool {
        match self.registry.upgrade() {
            Some(registry) => lock(&registry).remove(self.id),
            None => false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| lock(&registry).entries.iter().any(|e| e.id == self.id))
    }
}
