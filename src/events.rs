//! Event kinds and listener dispatch.
//!
//! Every mutating engine operation fans out to the listeners registered for
//! its event kind, synchronously and in registration order, after the state
//! mutation and the persistence write. A panicking listener is isolated and
//! logged; it never aborts the remaining listeners or unwinds into the
//! caller of the mutating operation.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::error::Error;

/// The six notification channels of the engine.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum EventKind {
    Start,
    Stop,
    Restart,
    AddLap,
    RemoveLap,
    ClearLaps,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Start => "start",
            EventKind::Stop => "stop",
            EventKind::Restart => "restart",
            EventKind::AddLap => "add_lap",
            EventKind::RemoveLap => "remove_lap",
            EventKind::ClearLaps => "clear_laps",
        }
    }
}

impl FromStr for EventKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "start" => Ok(EventKind::Start),
            "stop" => Ok(EventKind::Stop),
            "restart" => Ok(EventKind::Restart),
            "add_lap" => Ok(EventKind::AddLap),
            "remove_lap" => Ok(EventKind::RemoveLap),
            "clear_laps" => Ok(EventKind::ClearLaps),
            other => Err(Error::UnknownEventKind(other.to_string())),
        }
    }
}

/// Payload delivered to listeners. Timestamps are the monotonic reading the
/// operation observed; dates are wall-clock stamps for display only.
#[derive(Clone, Debug)]
pub enum Event {
    Start { mono_ms: u64, started_at: DateTime<Utc> },
    Stop { mono_ms: u64, stopped_at: DateTime<Utc> },
    Restart,
    LapAdded { index: usize, time_ms: u64 },
    LapRemoved { index: usize, time_ms: u64 },
    LapsCleared,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Start { .. } => EventKind::Start,
            Event::Stop { .. } => EventKind::Stop,
            Event::Restart => EventKind::Restart,
            Event::LapAdded { .. } => EventKind::AddLap,
            Event::LapRemoved { .. } => EventKind::RemoveLap,
            Event::LapsCleared => EventKind::ClearLaps,
        }
    }
}

/// Handle returned by `subscribe`, used to remove the listener later.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&Event)>;

struct Entry {
    id: ListenerId,
    listener: Listener,
}

/// Ordered multi-listener registry, one list per event kind.
pub(crate) struct ListenerHub {
    next_id: u64,
    slots: HashMap<EventKind, Vec<Entry>>,
}

impl ListenerHub {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            slots: HashMap::new(),
        }
    }

    pub fn subscribe(&mut self, kind: EventKind, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.slots.entry(kind).or_default().push(Entry { id, listener });
        id
    }

    /// Removing an id that was never registered (or already removed) is a
    /// no-op.
    pub fn unsubscribe(&mut self, id: ListenerId) {
        for entries in self.slots.values_mut() {
            entries.retain(|e| e.id != id);
        }
    }

    pub fn emit(&mut self, event: &Event) {
        let Some(entries) = self.slots.get_mut(&event.kind()) else {
            return;
        };
        for entry in entries.iter_mut() {
            let call = AssertUnwindSafe(|| (entry.listener)(event));
            if catch_unwind(call).is_err() {
                log::error!(
                    "listener {:?} for {:?} panicked; continuing dispatch",
                    entry.id,
                    event.kind()
                );
            }
        }
    }
}
