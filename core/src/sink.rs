use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;

use crate::event::{Event, TaskView};

/// Consumer of outbound events. Fire and forget: emitting never blocks and
/// never fails from the emitter's point of view.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: Event);
}

pub type SharedSink = Arc<dyn EventSink>;

impl EventSink for mpsc::UnboundedSender<Event> {
    fn emit(&self, event: Event) {
        if self.send(event).is_err() {
            tracing::trace!("event receiver dropped");
        }
    }
}

/// Adapts a closure into an [`EventSink`].
pub struct FnSink<F>(pub F);

impl<F> EventSink for FnSink<F>
where
    F: Fn(Event) + Send + Sync,
{
    fn emit(&self, event: Event) {
        (self.0)(event)
    }
}

/// Keeps every emitted event in memory, in emission order.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<Event>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn view(&self) -> TaskView {
        let events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        TaskView::from_events(events.iter())
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: Event) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl<S: EventSink + ?Sized> EventSink for Arc<S> {
    fn emit(&self, event: Event) {
        (**self).emit(event)
    }
}
