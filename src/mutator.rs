use chrono::Weekday;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::catalog::CatalogReference;
use crate::conflict::{ConflictDetector, ConflictWarning};
use crate::entry::{EntryId, EntryPatch, NewEntry, TimeSlot, TimetableEntry};
use crate::entry_validation::require;
use crate::error::{TimetableError, TimetableResult};
use crate::ids::IdGenerator;
use crate::store::TimetableStore;
use crate::week::{PeriodId, WeekGrid};

/// A committed change plus the double-bookings it caused. Warnings are
/// advisory; the caller decides whether to keep or undo the change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mutation {
    pub entry: TimetableEntry,
    pub warnings: Vec<ConflictWarning>,
}

impl Mutation {
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

pub struct SlotMutator<'a> {
    store: &'a mut TimetableStore,
    catalog: &'a dyn CatalogReference,
    grid: &'a WeekGrid,
    ids: &'a mut dyn IdGenerator,
}

impl<'a> SlotMutator<'a> {
    pub fn new(
        store: &'a mut TimetableStore,
        catalog: &'a dyn CatalogReference,
        grid: &'a WeekGrid,
        ids: &'a mut dyn IdGenerator,
    ) -> Self {
        Self {
            store,
            catalog,
            grid,
            ids,
        }
    }

    pub fn assign(
        &mut self,
        class_id: &str,
        day: Weekday,
        period_id: PeriodId,
        subject_id: &str,
        teacher_id: &str,
    ) -> TimetableResult<Mutation> {
        let request = NewEntry::new(class_id, TimeSlot::new(day, period_id), subject_id, teacher_id);
        self.assign_with(request)
    }

    pub fn assign_with(&mut self, request: NewEntry) -> TimetableResult<Mutation> {
        let class_id = require(Some(request.class_id.as_str()), "class_id")
            .map_err(|err| TimetableError::invalid(err.to_string()))?;
        let subject_id = require(request.subject_id.as_deref(), "subject_id")
            .map_err(|err| TimetableError::invalid(err.to_string()))?;
        let teacher_id = require(request.teacher_id.as_deref(), "teacher_id")
            .map_err(|err| TimetableError::invalid(err.to_string()))?;
        let slot = request.slot();
        self.check_slot(slot)?;
        self.ensure_free(&class_id, slot, None)?;

        let id = self.ids.next_id();
        if self.store.get(&id).is_some() {
            return Err(TimetableError::invalid(format!(
                "generated entry id {id} is already in use"
            )));
        }
        let mut entry = TimetableEntry::new(id, class_id, slot, subject_id, teacher_id);
        entry.curriculum_type = request.curriculum_type;
        self.store.upsert(entry.clone())?;
        info!(entry = %entry.id, class = %entry.class_id, slot = %slot, "assigned lesson");
        Ok(self.committed(entry))
    }

    /// Moves a lesson to another slot of the same class. Identity, class,
    /// subject and teacher are kept.
    pub fn move_entry(
        &mut self,
        entry_id: &EntryId,
        day: Weekday,
        period_id: PeriodId,
    ) -> TimetableResult<Mutation> {
        let mut entry = self
            .store
            .get(entry_id)
            .cloned()
            .ok_or_else(|| TimetableError::entry_not_found(entry_id))?;
        let slot = TimeSlot::new(day, period_id);
        self.check_slot(slot)?;
        self.ensure_free(&entry.class_id, slot, Some(entry_id))?;

        let from = entry.slot();
        entry.day = day;
        entry.period_id = period_id;
        self.store.upsert(entry.clone())?;
        info!(entry = %entry.id, class = %entry.class_id, from = %from, to = %slot, "moved lesson");
        Ok(self.committed(entry))
    }

    pub fn update(&mut self, entry_id: &EntryId, patch: EntryPatch) -> TimetableResult<Mutation> {
        let mut entry = self
            .store
            .get(entry_id)
            .cloned()
            .ok_or_else(|| TimetableError::entry_not_found(entry_id))?;
        if let Some(subject) = patch.subject_id.as_deref() {
            entry.subject_id = require(Some(subject), "subject_id")
                .map_err(|err| TimetableError::invalid(err.to_string()))?;
        }
        if let Some(teacher) = patch.teacher_id.as_deref() {
            entry.teacher_id = require(Some(teacher), "teacher_id")
                .map_err(|err| TimetableError::invalid(err.to_string()))?;
        }
        if let Some(curriculum) = patch.curriculum_type {
            entry.curriculum_type = curriculum;
        }
        self.store.upsert(entry.clone())?;
        info!(entry = %entry.id, class = %entry.class_id, "updated lesson");
        Ok(self.committed(entry))
    }

    pub fn delete(&mut self, entry_id: &EntryId) -> TimetableResult<TimetableEntry> {
        let removed = self
            .store
            .remove(entry_id)
            .ok_or_else(|| TimetableError::entry_not_found(entry_id))?;
        info!(entry = %removed.id, class = %removed.class_id, "deleted lesson");
        Ok(removed)
    }

    /// Warnings a lesson would raise without committing anything.
    pub fn preview(
        &self,
        class_id: &str,
        slot: TimeSlot,
        teacher_id: &str,
        exclude: Option<&EntryId>,
    ) -> Vec<ConflictWarning> {
        ConflictDetector::new(&*self.store, self.catalog)
            .warnings_for(class_id, slot, teacher_id, exclude)
    }

    fn check_slot(&self, slot: TimeSlot) -> TimetableResult<()> {
        if !self.grid.is_school_day(slot.day) {
            return Err(TimetableError::invalid(format!(
                "{} is not a school day",
                slot.day
            )));
        }
        if !self.grid.has_period(slot.period_id) {
            return Err(TimetableError::invalid(format!(
                "period {} is not part of the week grid",
                slot.period_id
            )));
        }
        Ok(())
    }

    fn ensure_free(
        &self,
        class_id: &str,
        slot: TimeSlot,
        moving: Option<&EntryId>,
    ) -> TimetableResult<()> {
        match self.store.find_in_slot(class_id, slot) {
            Some(existing) if Some(&existing.id) != moving => Err(TimetableError::SlotOccupied {
                class_id: class_id.to_string(),
                day: slot.day,
                period_id: slot.period_id,
                occupied_by: existing.id.clone(),
            }),
            _ => Ok(()),
        }
    }

    fn committed(&self, entry: TimetableEntry) -> Mutation {
        let warnings = self.preview(&entry.class_id, entry.slot(), &entry.teacher_id, Some(&entry.id));
        for warning in &warnings {
            warn!(entry = %entry.id, kind = warning.kind.as_str(), "{}", warning.message);
        }
        Mutation { entry, warnings }
    }
}
