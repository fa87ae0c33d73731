//! Event distribution.

use super::types::Event;
use crossbeam_channel::{bounded, Sender, TrySendError};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

/// Maximum number of undelivered events before the engine considers itself
/// broken. Listeners are expected to keep up; a full queue means one of them
/// stopped consuming.
pub const MAX_QUEUE_SIZE: usize = 10_000;

/// Receives engine lifecycle events.
///
/// Listeners run on the bus's dispatch thread, one event at a time, in
/// publication order. A panicking listener is contained and logged; it does
/// not take the bus down.
pub trait EventListener: Send + Sync {
    fn on_event(&self, event: &Event);
}

impl<T: EventListener + ?Sized> EventListener for Arc<T> {
    fn on_event(&self, event: &Event) {
        (**self).on_event(event);
    }
}

/// Publishes lifecycle events to registered listeners.
///
/// Publication is fire-and-forget: events go into a bounded queue and a
/// dedicated thread delivers them, so publishing never blocks on listener
/// work. Listener registration is static for the run. The dispatch thread
/// stops after delivering [`Event::BatchEnded`].
pub struct EventBus {
    tx: Sender<Event>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl EventBus {
    /// Creates a bus delivering to the given listeners.
    pub fn new(listeners: Vec<Box<dyn EventListener>>) -> Self {
        let (tx, rx) = bounded::<Event>(MAX_QUEUE_SIZE);
        let dispatcher = std::thread::Builder::new()
            .name("heurlab-events".to_string())
            .spawn(move || {
                for event in rx {
                    for listener in &listeners {
                        if catch_unwind(AssertUnwindSafe(|| listener.on_event(&event))).is_err() {
                            tracing::error!(kind = event.kind(), "event listener panicked");
                        }
                    }
                    if matches!(event, Event::BatchEnded { .. }) {
                        tracing::debug!("stopping event dispatch thread");
                        return;
                    }
                }
            })
            .expect("failed to spawn event dispatch thread");
        Self {
            tx,
            dispatcher: Mutex::new(Some(dispatcher)),
        }
    }

    /// Publishes an event.
    ///
    /// Never blocks. Publishing after the bus has stopped drops the event
    /// with a log line.
    ///
    /// # Panics
    /// Panics if the queue is full, which means a listener stopped
    /// consuming; that is an engine bug, not a recoverable condition.
    pub fn publish(&self, event: Event) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                panic!(
                    "maximum event queue capacity ({MAX_QUEUE_SIZE}) reached while publishing {}, cannot keep up? probably a bug",
                    event.kind()
                );
            }
            Err(TrySendError::Disconnected(event)) => {
                tracing::debug!(kind = event.kind(), "event bus already stopped, dropping event");
            }
        }
    }

    /// Waits for the dispatch thread to deliver everything and stop.
    ///
    /// Only returns once [`Event::BatchEnded`] has been delivered (publish
    /// it first). Idempotent.
    pub fn join(&self) {
        let handle = self
            .dispatcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                tracing::error!("event dispatch thread panicked");
            }
        }
    }
}
