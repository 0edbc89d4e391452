use crate::entry::TimetableEntry;
use crate::entry_validation;
use crate::template::ScheduleTemplate;
use polars::prelude::PolarsError;
use serde::{Deserialize, Serialize};
use serde_json::Error as SerdeJsonError;
use std::io;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("serialization error: {0}")]
    Serialization(#[from] SerdeJsonError),
    #[error("dataframe conversion error: {0}")]
    DataFrame(#[from] PolarsError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[cfg(feature = "sqlite")]
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error("invalid storage key '{0}'")]
    InvalidKey(String),
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Durable blob storage the timetable is saved into.
pub trait KeyValueStore {
    fn load(&self, key: &str) -> PersistenceResult<Option<Vec<u8>>>;
    fn save(&self, key: &str, value: &[u8]) -> PersistenceResult<()>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn load(&self, key: &str) -> PersistenceResult<Option<Vec<u8>>> {
        (**self).load(key)
    }

    fn save(&self, key: &str, value: &[u8]) -> PersistenceResult<()> {
        (**self).save(key, value)
    }
}

pub const ENTRIES_KEY: &str = "timetable.entries";
pub const TEMPLATES_KEY: &str = "timetable.templates";

#[derive(Serialize, Deserialize)]
struct EntriesSnapshot {
    #[serde(default)]
    revision: u64,
    entries: Vec<TimetableEntry>,
}

#[derive(Serialize, Deserialize)]
struct TemplatesSnapshot {
    templates: Vec<ScheduleTemplate>,
}

pub fn validate_entries(entries: &[TimetableEntry]) -> PersistenceResult<()> {
    entry_validation::validate_entry_collection(entries)
        .map_err(|err| PersistenceError::InvalidData(err.to_string()))
}

pub fn save_entries(
    kv: &dyn KeyValueStore,
    entries: &[TimetableEntry],
    revision: u64,
) -> PersistenceResult<()> {
    validate_entries(entries)?;
    let snapshot = EntriesSnapshot {
        revision,
        entries: entries.to_vec(),
    };
    kv.save(ENTRIES_KEY, &serde_json::to_vec(&snapshot)?)
}

/// Returns the stored entries and the revision they were saved at, or
/// `None` when nothing has been saved yet.
pub fn load_entries(kv: &dyn KeyValueStore) -> PersistenceResult<Option<(Vec<TimetableEntry>, u64)>> {
    let Some(bytes) = kv.load(ENTRIES_KEY)? else {
        return Ok(None);
    };
    let snapshot: EntriesSnapshot = serde_json::from_slice(&bytes)?;
    validate_entries(&snapshot.entries)?;
    Ok(Some((snapshot.entries, snapshot.revision)))
}

pub fn save_templates<'t, I>(kv: &dyn KeyValueStore, templates: I) -> PersistenceResult<()>
where
    I: IntoIterator<Item = &'t ScheduleTemplate>,
{
    let snapshot = TemplatesSnapshot {
        templates: templates.into_iter().cloned().collect(),
    };
    for template in &snapshot.templates {
        validate_entries(&template.entries)?;
    }
    kv.save(TEMPLATES_KEY, &serde_json::to_vec(&snapshot)?)
}

pub fn load_templates(kv: &dyn KeyValueStore) -> PersistenceResult<Vec<ScheduleTemplate>> {
    let Some(bytes) = kv.load(TEMPLATES_KEY)? else {
        return Ok(Vec::new());
    };
    let snapshot: TemplatesSnapshot = serde_json::from_slice(&bytes)?;
    for template in &snapshot.templates {
        validate_entries(&template.entries)?;
    }
    Ok(snapshot.templates)
}

pub mod file;
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use file::{FileKeyValueStore, load_entries_from_csv, save_entries_to_csv};
pub use memory::MemoryKeyValueStore;
