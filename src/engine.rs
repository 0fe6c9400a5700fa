//! The stopwatch engine: elapsed-time accounting, lap bookkeeping, event
//! fan-out, and durable-state write-through.
//!
//! Every mutating operation follows the same sequence: mutate in-memory
//! state, write through to the state store, then notify listeners. Methods
//! take `&mut self`, so ownership already serializes mutation; a host with
//! real threads wraps the engine in a `Mutex` and gets the same guarantee.

use chrono::{DateTime, Utc};
use stopwatch_core::ElapsedCore;

use crate::clock::{MonotonicClock, SystemClock, SystemWallClock, WallClock};
use crate::error::Error;
use crate::events::{Event, EventKind, ListenerHub, ListenerId};
use crate::snapshot::{SessionDates, Snapshot, TimedValue};
use crate::storage::{PersistedState, StateStore, STATE_VERSION};

pub struct Stopwatch<M: MonotonicClock, W: WallClock> {
    core: ElapsedCore,
    laps: Vec<u64>,
    started_at: Option<DateTime<Utc>>,
    stopped_at: Option<DateTime<Utc>>,
    mono: M,
    wall: W,
    hub: ListenerHub,
    store: Option<Box<dyn StateStore>>,
}

impl Stopwatch<SystemClock, SystemWallClock> {
    /// Engine on the system clocks, without durable state.
    pub fn system() -> Self {
        Self::new(SystemClock::new(), SystemWallClock)
    }

    /// Engine on the system clocks, rehydrating from `store`.
    pub fn system_with_store(store: Box<dyn StateStore>) -> Self {
        Self::with_store(SystemClock::new(), SystemWallClock, store)
    }
}

impl<M: MonotonicClock, W: WallClock> Stopwatch<M, W> {
    pub fn new(mono: M, wall: W) -> Self {
        Self {
            core: ElapsedCore::new(),
            laps: Vec::new(),
            started_at: None,
            stopped_at: None,
            mono,
            wall,
            hub: ListenerHub::new(),
            store: None,
        }
    }

    /// Construct with a durable state slot. If the slot holds a usable
    /// record with nonzero elapsed time, the engine adopts it as paused
    /// state; an explicit `start` resumes ticking. Anything unusable is
    /// logged and ignored - construction never fails.
    pub fn with_store(mono: M, wall: W, store: Box<dyn StateStore>) -> Self {
        let mut engine = Self::new(mono, wall);
        engine.store = Some(store);
        engine.rehydrate();
        engine
    }

    fn rehydrate(&mut self) {
        let Some(store) = &self.store else { return };
        let state = match store.load() {
            Ok(Some(state)) => state,
            Ok(None) => return,
            Err(e) => {
                log::warn!("failed to load durable state, starting fresh: {e}");
                return;
            }
        };
        if state.version != STATE_VERSION {
            log::warn!("ignoring state slot with unsupported version {}", state.version);
            return;
        }
        if state.elapsed_time == 0 {
            return;
        }
        self.core.set_base(state.elapsed_time);
        self.started_at = state.started_date;
        self.stopped_at = state.stopped_date;
        self.laps = state.laps;
        log::debug!(
            "rehydrated {} ms and {} laps from durable state",
            state.elapsed_time,
            self.laps.len()
        );
    }

    /// Serialize the current state into the slot. Best-effort: a failed
    /// write is logged and the in-memory mutation stands.
    fn persist(&self) {
        let Some(store) = &self.store else { return };
        let state = PersistedState {
            version: STATE_VERSION,
            started_date: self.started_at,
            stopped_date: self.stopped_at,
            elapsed_time: self.current_elapsed(),
            laps: self.laps.clone(),
        };
        if let Err(e) = store.save(&state) {
            log::error!("failed to persist stopwatch state: {e}");
        }
    }

    /// Start (or resume) the watch. Idempotent while running. The wall
    /// clock start stamp is taken once per session and survives
    /// pause/resume; only `restart` clears it.
    pub fn start(&mut self) {
        if self.core.is_running() {
            return;
        }
        let now = self.mono.now_ms();
        let started_at = match self.started_at {
            Some(at) => at,
            None => {
                let at = self.wall.now();
                self.started_at = Some(at);
                at
            }
        };
        self.core.start(now);
        self.persist();
        self.hub.emit(&Event::Start { mono_ms: now, started_at });
    }

    /// Freeze the watch. No-op while stopped.
    pub fn stop(&mut self) {
        if !self.core.is_running() {
            return;
        }
        let now = self.mono.now_ms();
        let stopped_at = self.wall.now();
        self.core.stop(now);
        self.stopped_at = Some(stopped_at);
        self.persist();
        self.hub.emit(&Event::Stop { mono_ms: now, stopped_at });
    }

    /// Reset everything and immediately begin a fresh session: elapsed
    /// time back to zero, laps emptied, new start stamp. Listeners see
    /// `Restart` followed by the `Start` of the new session.
    pub fn restart(&mut self) {
        self.core.reset();
        self.laps.clear();
        self.started_at = None;
        self.stopped_at = None;
        self.persist();
        self.hub.emit(&Event::Restart);
        self.start();
    }

    /// Record the current elapsed time as a lap. Suppressed when elapsed
    /// time is zero, or when it equals the last recorded lap - the guard
    /// against double-registration from rapid repeated triggers.
    pub fn add_lap(&mut self) {
        let elapsed = self.current_elapsed();
        if elapsed == 0 || self.laps.last() == Some(&elapsed) {
            return;
        }
        self.laps.push(elapsed);
        let index = self.laps.len() - 1;
        self.persist();
        self.hub.emit(&Event::LapAdded { index, time_ms: elapsed });
    }

    /// Remove the lap at `index`; later laps shift down by one. An
    /// out-of-range index is rejected: logged, no persistence write, no
    /// event.
    pub fn remove_lap(&mut self, index: usize) -> Result<u64, Error> {
        if index >= self.laps.len() {
            let err = Error::LapIndexOutOfRange { index, len: self.laps.len() };
            log::warn!("{err}");
            return Err(err);
        }
        let removed = self.laps.remove(index);
        self.persist();
        self.hub.emit(&Event::LapRemoved { index, time_ms: removed });
        Ok(removed)
    }

    /// Drop all laps.
    pub fn clear_laps(&mut self) {
        self.laps.clear();
        self.persist();
        self.hub.emit(&Event::LapsCleared);
    }

    /// Total elapsed time in milliseconds. Pure read: never mutates,
    /// never persists.
    pub fn current_elapsed(&self) -> u64 {
        self.core.elapsed_ms(self.mono.now_ms())
    }

    pub fn is_running(&self) -> bool {
        self.core.is_running()
    }

    /// Cumulative lap times in capture order.
    pub fn laps(&self) -> &[u64] {
        &self.laps
    }

    /// Immutable export view. While running, the stop date reports the
    /// current wall-clock time.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            laps: self.laps.iter().map(|&ms| TimedValue::from_ms(ms)).collect(),
            time: TimedValue::from_ms(self.current_elapsed()),
            date: SessionDates {
                start: self.started_at,
                stop: if self.core.is_running() {
                    Some(self.wall.now())
                } else {
                    self.stopped_at
                },
            },
        }
    }

    /// Register a listener for one event kind. Listeners for the same
    /// kind run in registration order.
    pub fn subscribe(
        &mut self,
        kind: EventKind,
        listener: impl FnMut(&Event) + 'static,
    ) -> ListenerId {
        self.hub.subscribe(kind, Box::new(listener))
    }

    /// String-keyed registration for callers driven by the wire names
    /// ("start", "add_lap", ...). An unrecognized name is logged and
    /// rejected, never fatal.
    pub fn subscribe_named(
        &mut self,
        kind: &str,
        listener: impl FnMut(&Event) + 'static,
    ) -> Result<ListenerId, Error> {
        match kind.parse::<EventKind>() {
            Ok(kind) => Ok(self.subscribe(kind, listener)),
            Err(e) => {
                log::warn!("{e}");
                Err(e)
            }
        }
    }

    /// Remove a listener. Unknown ids are a no-op.
    pub fn unsubscribe(&mut self, id: ListenerId) {
        self.hub.unsubscribe(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::clock::{ManualClock, ManualWallClock};
    use crate::storage::MemoryStore;

    fn wall_at(iso: &str) -> ManualWallClock {
        ManualWallClock::new(iso.parse().unwrap())
    }

    fn engine() -> (Stopwatch<ManualClock, ManualWallClock>, ManualClock) {
        let clock = ManualClock::new();
        let engine = Stopwatch::new(clock.clone(), wall_at("2024-01-01T00:00:00Z"));
        (engine, clock)
    }

    #[test]
    fn test_fresh_engine_is_zero() {
        let (engine, _clock) = engine();
        assert_eq!(engine.current_elapsed(), 0);
        assert!(!engine.is_running());
        assert!(engine.laps().is_empty());
    }

    #[test]
    fn test_start_is_idempotent() {
        let (mut engine, clock) = engine();
        engine.start();
        clock.advance(500);
        engine.start(); // Must not re-anchor
        clock.advance(500);
        assert_eq!(engine.current_elapsed(), 1000);
    }

    #[test]
    fn test_pause_resume_continuity() {
        let (mut engine, clock) = engine();
        engine.start();
        clock.advance(1000);
        engine.stop();
        assert_eq!(engine.current_elapsed(), 1000);

        clock.advance(60_000); // Pause gap must not count
        engine.start();
        clock.advance(500);
        assert_eq!(engine.current_elapsed(), 1500);
    }

    #[test]
    fn test_started_at_survives_pause_resume() {
        let (mut engine, clock) = engine();
        engine.start();
        let first_start = engine.snapshot().date.start;
        clock.advance(1000);
        engine.stop();
        engine.start();
        assert_eq!(engine.snapshot().date.start, first_start);
    }

    #[test]
    fn test_duplicate_lap_suppressed() {
        let (mut engine, clock) = engine();
        engine.start();
        clock.advance(1500);
        engine.add_lap();
        engine.add_lap(); // Same elapsed reading: suppressed
        assert_eq!(engine.laps(), &[1500]);

        clock.advance(2500);
        engine.add_lap();
        assert_eq!(engine.laps(), &[1500, 4000]);
    }

    #[test]
    fn test_lap_at_zero_suppressed() {
        let (mut engine, _clock) = engine();
        engine.start();
        engine.add_lap();
        assert!(engine.laps().is_empty());
    }

    #[test]
    fn test_laps_non_decreasing() {
        let (mut engine, clock) = engine();
        engine.start();
        for step in [300, 700, 700, 1] {
            clock.advance(step);
            engine.add_lap();
        }
        let laps = engine.laps();
        assert!(laps.windows(2).all(|w| w[0] <= w[1]), "laps {laps:?}");
    }

    #[test]
    fn test_remove_lap_shifts_indices() {
        let (mut engine, clock) = engine();
        engine.start();
        for _ in 0..3 {
            clock.advance(1000);
            engine.add_lap();
        }
        assert_eq!(engine.remove_lap(1).unwrap(), 2000);
        assert_eq!(engine.laps(), &[1000, 3000]);
    }

    #[test]
    fn test_remove_lap_out_of_range_rejected() {
        let (mut engine, clock) = engine();
        engine.start();
        clock.advance(1000);
        engine.add_lap();

        let events = Rc::new(RefCell::new(0u32));
        let e = events.clone();
        engine.subscribe(EventKind::RemoveLap, move |_| *e.borrow_mut() += 1);

        let err = engine.remove_lap(5).unwrap_err();
        assert!(matches!(err, Error::LapIndexOutOfRange { index: 5, len: 1 }));
        assert_eq!(engine.laps(), &[1000]);
        assert_eq!(*events.borrow(), 0); // Rejection emits nothing
    }

    #[test]
    fn test_clear_laps() {
        let (mut engine, clock) = engine();
        engine.start();
        clock.advance(1000);
        engine.add_lap();
        engine.clear_laps();
        assert!(engine.laps().is_empty());
    }

    #[test]
    fn test_restart_yields_fresh_running_session() {
        let (mut engine, clock) = engine();
        engine.start();
        clock.advance(4000);
        engine.add_lap();
        engine.stop();

        engine.restart();
        assert!(engine.is_running());
        assert_eq!(engine.current_elapsed(), 0);
        assert!(engine.laps().is_empty());
    }

    #[test]
    fn test_restart_emits_restart_then_start() {
        let (mut engine, _clock) = engine();
        let order = Rc::new(RefCell::new(Vec::new()));
        for kind in [EventKind::Restart, EventKind::Start] {
            let order = order.clone();
            engine.subscribe(kind, move |event| order.borrow_mut().push(event.kind()));
        }
        engine.restart();
        assert_eq!(*order.borrow(), vec![EventKind::Restart, EventKind::Start]);
    }

    #[test]
    fn test_subscribe_named_unknown_kind() {
        let (mut engine, _clock) = engine();
        let err = engine.subscribe_named("explode", |_| {}).unwrap_err();
        assert!(matches!(err, Error::UnknownEventKind(_)));
    }

    #[test]
    fn test_unsubscribed_listener_not_called() {
        let (mut engine, clock) = engine();
        let hits = Rc::new(RefCell::new(0u32));
        let h = hits.clone();
        let id = engine.subscribe(EventKind::AddLap, move |_| *h.borrow_mut() += 1);

        engine.start();
        clock.advance(100);
        engine.add_lap();
        engine.unsubscribe(id);
        clock.advance(100);
        engine.add_lap();
        assert_eq!(*hits.borrow(), 1);
    }

    #[test]
    fn test_persist_happens_before_notify() {
        let clock = ManualClock::new();
        let store = Rc::new(MemoryStore::new());
        let mut engine = Stopwatch::with_store(
            clock.clone(),
            wall_at("2024-01-01T00:00:00Z"),
            Box::new(store.clone()),
        );

        let seen = Rc::new(RefCell::new(None));
        let s = seen.clone();
        let observer = store.clone();
        engine.subscribe(EventKind::AddLap, move |_| {
            *s.borrow_mut() = observer.contents();
        });

        engine.start();
        clock.advance(1500);
        engine.add_lap();

        // The listener must have observed the lap already written through.
        let state = seen.borrow().clone().unwrap();
        assert_eq!(state.laps, vec![1500]);
    }

    #[test]
    fn test_snapshot_stop_date_is_now_while_running() {
        let (mut engine, clock) = engine();
        engine.start();
        clock.advance(1000);
        let snap = engine.snapshot();
        assert_eq!(snap.date.stop, snap.date.start); // Manual wall clock is fixed
        engine.stop();
        assert!(engine.snapshot().date.stop.is_some());
    }
}
