//! Durable state slot.
//!
//! The engine writes through after every mutating operation and tries to
//! rehydrate from the slot at construction. Durability is best-effort: a
//! failed save is logged and the in-memory mutation stands; unparseable
//! stored content falls back to a fresh zero state and is never fatal.

use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

pub const STATE_VERSION: u32 = 1;

/// The JSON record held in the slot. Field names match the original
/// export format of the widget.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    pub version: u32,
    pub started_date: Option<DateTime<Utc>>,
    pub stopped_date: Option<DateTime<Utc>>,
    pub elapsed_time: u64,
    pub laps: Vec<u64>,
}

impl PersistedState {
    pub fn empty() -> Self {
        Self {
            version: STATE_VERSION,
            started_date: None,
            stopped_date: None,
            elapsed_time: 0,
            laps: Vec::new(),
        }
    }
}

/// One named key-value slot of durable state.
pub trait StateStore {
    /// `Ok(None)` means "nothing usable stored": absent, or present but
    /// unreadable as a state record (the implementation logs the details).
    fn load(&self) -> Result<Option<PersistedState>, Error>;
    fn save(&self, state: &PersistedState) -> Result<(), Error>;
}

/// File-backed slot: `<dir>/<slot>.json`. Writes go through a temp file
/// and a rename so a crash mid-write cannot leave a torn record.
pub struct JsonFileStore {
    path: PathBuf,
    tmp_path: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>, slot: &str) -> Self {
        let dir = dir.into();
        Self {
            path: dir.join(format!("{slot}.json")),
            tmp_path: dir.join(format!("{slot}.json.tmp")),
        }
    }
}

impl StateStore for JsonFileStore {
    fn load(&self) -> Result<Option<PersistedState>, Error> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&raw) {
            Ok(state) => Ok(Some(state)),
            Err(e) => {
                log::warn!("discarding corrupt state slot {}: {}", self.path.display(), e);
                Ok(None)
            }
        }
    }

    fn save(&self, state: &PersistedState) -> Result<(), Error> {
        let raw = serde_json::to_string(state)?;
        fs::write(&self.tmp_path, raw)?;
        fs::rename(&self.tmp_path, &self.path)?;
        Ok(())
    }
}

/// In-process slot for tests and embedders without a filesystem.
#[derive(Default)]
pub struct MemoryStore {
    slot: RefCell<Option<PersistedState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: PersistedState) -> Self {
        Self { slot: RefCell::new(Some(state)) }
    }

    pub fn contents(&self) -> Option<PersistedState> {
        self.slot.borrow().clone()
    }
}

impl StateStore for MemoryStore {
    fn load(&self) -> Result<Option<PersistedState>, Error> {
        Ok(self.slot.borrow().clone())
    }

    fn save(&self, state: &PersistedState) -> Result<(), Error> {
        *self.slot.borrow_mut() = Some(state.clone());
        Ok(())
    }
}

/// Lets an embedder hand the engine a store while keeping a handle to it,
/// e.g. `Rc<MemoryStore>` shared between an engine and an inspector.
impl<S: StateStore + ?Sized> StateStore for std::rc::Rc<S> {
    fn load(&self) -> Result<Option<PersistedState>, Error> {
        (**self).load()
    }

    fn save(&self, state: &PersistedState) -> Result<(), Error> {
        (**self).save(state)
    }
}
