use super::{KeyValueStore, PersistenceError, PersistenceResult};
use crate::entry::{CurriculumType, TimetableEntry};
use crate::week::parse_day;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// One file per key under a directory: `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    root: PathBuf,
}

impl FileKeyValueStore {
    pub fn new<P: AsRef<Path>>(root: P) -> PersistenceResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> PersistenceResult<PathBuf> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
        if !valid {
            return Err(PersistenceError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn load(&self, key: &str) -> PersistenceResult<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Writes next to the target and renames, so a crash never leaves a
    /// half-written value behind.
    fn save(&self, key: &str, value: &[u8]) -> PersistenceResult<()> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

#[derive(Default, Serialize, Deserialize)]
struct EntryCsvRecord {
    id: String,
    class_id: String,
    day: String,
    period_id: u8,
    subject_id: String,
    teacher_id: String,
    #[serde(default)]
    curriculum_type: String,
}

impl From<&TimetableEntry> for EntryCsvRecord {
    fn from(entry: &TimetableEntry) -> Self {
        Self {
            id: entry.id.to_string(),
            class_id: entry.class_id.clone(),
            day: entry.day.to_string(),
            period_id: entry.period_id,
            subject_id: entry.subject_id.clone(),
            teacher_id: entry.teacher_id.clone(),
            curriculum_type: entry.curriculum_type.as_str().to_string(),
        }
    }
}

impl EntryCsvRecord {
    fn into_entry(self) -> PersistenceResult<TimetableEntry> {
        let day = parse_day(&self.day)
            .ok_or_else(|| PersistenceError::InvalidData(format!("invalid day '{}'", self.day)))?;
        let curriculum_type = if self.curriculum_type.trim().is_empty() {
            CurriculumType::default()
        } else {
            CurriculumType::from_str(&self.curriculum_type).ok_or_else(|| {
                PersistenceError::InvalidData(format!(
                    "invalid curriculum_type '{}'",
                    self.curriculum_type
                ))
            })?
        };
        Ok(TimetableEntry {
            id: self.id.trim().into(),
            class_id: self.class_id.trim().to_string(),
            day,
            period_id: self.period_id,
            subject_id: self.subject_id.trim().to_string(),
            teacher_id: self.teacher_id.trim().to_string(),
            curriculum_type,
        })
    }
}

pub fn save_entries_to_csv<P: AsRef<Path>>(
    entries: &[TimetableEntry],
    path: P,
) -> PersistenceResult<()> {
    super::validate_entries(entries)?;
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);
    for entry in entries {
        writer.serialize(EntryCsvRecord::from(entry))?;
    }
    writer.flush()?;
    Ok(())
}

/// Reads entries written by [`save_entries_to_csv`] or by hand. Rows must
/// still satisfy one lesson per class slot.
pub fn load_entries_from_csv<P: AsRef<Path>>(path: P) -> PersistenceResult<Vec<TimetableEntry>> {
    let file = File::open(path)?;
    let mut reader = csv::Reader::from_reader(file);
    let mut entries = Vec::new();
    for record in reader.deserialize::<EntryCsvRecord>() {
        entries.push(record?.into_entry()?);
    }
    super::validate_entries(&entries)?;
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_keys_that_escape_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        let kv = FileKeyValueStore::new(dir.path()).unwrap();
        assert!(matches!(
            kv.save("../evil", b"x"),
            Err(PersistenceError::InvalidKey(_))
        ));
        assert!(matches!(kv.load(""), Err(PersistenceError::InvalidKey(_))));
    }

    #[test]
    fn save_overwrites_previous_value() {
        let dir = tempfile::tempdir().unwrap();
        let kv = FileKeyValueStore::new(dir.path()).unwrap();
        assert!(kv.load("timetable.entries").unwrap().is_none());
        kv.save("timetable.entries", b"one").unwrap();
        kv.save("timetable.entries", b"two").unwrap();
        assert_eq!(
            kv.load("timetable.entries").unwrap().as_deref(),
            Some(&b"two"[..])
        );
        assert!(!dir.path().join("timetable.entries.json.tmp").exists());
    }
}
