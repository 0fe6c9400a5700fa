//! Stopwatch engine.
//!
//! Tracks elapsed time with pause/resume continuity, records cumulative
//! lap splits, fans out state-change notifications to registered
//! listeners, and writes through to a durable state slot after every
//! mutation. Rendering, input wiring, and share/download integrations are
//! collaborators that subscribe to events; they live outside this crate.
//!
//! ```
//! use stopwatch::{EventKind, Stopwatch};
//!
//! let mut watch = Stopwatch::system();
//! watch.subscribe(EventKind::AddLap, |event| println!("{event:?}"));
//! watch.start();
//! watch.add_lap();
//! watch.stop();
//! let export = serde_json::to_string(&watch.snapshot()).unwrap();
//! # drop(export);
//! ```

pub mod cache;
pub mod clock;
mod engine;
mod error;
mod events;
mod snapshot;
pub mod storage;

pub use engine::Stopwatch;
pub use error::Error;
pub use events::{Event, EventKind, ListenerId};
pub use snapshot::{SessionDates, Snapshot, TimedValue};
pub use storage::{JsonFileStore, MemoryStore, PersistedState, StateStore};

// Digit formatting re-exported from the pure core for renderers.
pub use stopwatch_core::{format_hms, format_hms_ms, TimeDigits, TimeParts};
