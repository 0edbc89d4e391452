use chrono::Weekday;
use tracing::debug;

use crate::entry::{EntryId, TimeSlot, TimetableEntry};
use crate::entry_validation;
use crate::error::{TimetableError, TimetableResult};
use crate::week::PeriodId;

/// Canonical collection of scheduled lessons.
///
/// Every write goes through [`upsert`](Self::upsert), [`remove`](Self::remove)
/// or [`replace_for_class`](Self::replace_for_class), which keep
/// (class, day, period) unique. Reads return entries in insertion order.
#[derive(Debug, Clone, Default)]
pub struct TimetableStore {
    entries: Vec<TimetableEntry>,
    revision: u64,
}

impl TimetableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from a persisted collection, rejecting duplicate ids
    /// and double-filled class slots.
    pub fn from_entries(entries: Vec<TimetableEntry>) -> TimetableResult<Self> {
        entry_validation::validate_entry_collection(&entries)
            .map_err(|err| TimetableError::invalid(err.to_string()))?;
        Ok(Self {
            entries,
            revision: 0,
        })
    }

    /// Continues revision numbering from a persisted value.
    pub fn at_revision(mut self, revision: u64) -> Self {
        self.revision = revision;
        self
    }

    /// Bumped by every successful write.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get_all(&self) -> &[TimetableEntry] {
        &self.entries
    }

    pub fn get(&self, id: &EntryId) -> Option<&TimetableEntry> {
        self.entries.iter().find(|e| &e.id == id)
    }

    pub fn get_by_class(&self, class_id: &str) -> Vec<TimetableEntry> {
        self.entries
            .iter()
            .filter(|e| e.class_id == class_id)
            .cloned()
            .collect()
    }

    pub fn get_by_teacher(&self, teacher_id: &str) -> Vec<TimetableEntry> {
        self.entries
            .iter()
            .filter(|e| e.teacher_id == teacher_id)
            .cloned()
            .collect()
    }

    pub fn get_by_slot(&self, day: Weekday, period_id: PeriodId) -> Vec<TimetableEntry> {
        let slot = TimeSlot::new(day, period_id);
        self.entries
            .iter()
            .filter(|e| e.slot() == slot)
            .cloned()
            .collect()
    }

    /// The lesson a class has in a slot, if any.
    pub fn find_in_slot(&self, class_id: &str, slot: TimeSlot) -> Option<&TimetableEntry> {
        self.entries.iter().find(|e| e.occupies(class_id, slot))
    }

    /// Inserts a new entry or replaces the one with the same id.
    pub fn upsert(&mut self, entry: TimetableEntry) -> TimetableResult<()> {
        entry_validation::validate_entry(&entry)
            .map_err(|err| TimetableError::invalid(err.to_string()))?;
        if let Some(other) = self
            .entries
            .iter()
            .find(|e| e.id != entry.id && e.occupies(&entry.class_id, entry.slot()))
        {
            return Err(TimetableError::SlotOccupied {
                class_id: entry.class_id.clone(),
                day: entry.day,
                period_id: entry.period_id,
                occupied_by: other.id.clone(),
            });
        }

        match self.entries.iter_mut().find(|e| e.id == entry.id) {
            Some(existing) => {
                debug!(entry = %entry.id, class = %entry.class_id, "updating timetable entry");
                *existing = entry;
            }
            None => {
                debug!(entry = %entry.id, class = %entry.class_id, "inserting timetable entry");
                self.entries.push(entry);
            }
        }
        self.revision += 1;
        Ok(())
    }

    pub fn remove(&mut self, id: &EntryId) -> Option<TimetableEntry> {
        let idx = self.entries.iter().position(|e| &e.id == id)?;
        let removed = self.entries.remove(idx);
        self.revision += 1;
        debug!(entry = %id, class = %removed.class_id, "removed timetable entry");
        Some(removed)
    }

    /// Swaps out the whole week of one class.
    ///
    /// The replacement must belong to `class_id`, carry ids unused by other
    /// classes, and fill each slot at most once. On error nothing changes.
    /// Returns the entries that were dropped.
    pub fn replace_for_class(
        &mut self,
        class_id: &str,
        replacement: Vec<TimetableEntry>,
    ) -> TimetableResult<Vec<TimetableEntry>> {
        if let Some(stray) = replacement.iter().find(|e| e.class_id != class_id) {
            return Err(TimetableError::invalid(format!(
                "entry {} belongs to class {}, not {}",
                stray.id, stray.class_id, class_id
            )));
        }

        let (removed, mut next): (Vec<TimetableEntry>, Vec<TimetableEntry>) = self
            .entries
            .iter()
            .cloned()
            .partition(|e| e.class_id == class_id);
        next.extend(replacement);
        entry_validation::validate_entry_collection(&next)
            .map_err(|err| TimetableError::invalid(err.to_string()))?;

        self.entries = next;
        self.revision += 1;
        debug!(
            class = class_id,
            removed = removed.len(),
            total = self.entries.len(),
            "replaced class timetable"
        );
        Ok(removed)
    }
}
