use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::trace;

use crate::catalog::CatalogReference;
use crate::entry::{ClassId, EntryId, TimeSlot, TimetableEntry};
use crate::store::TimetableStore;
use crate::week::PeriodId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    Teacher,
    Room,
}

impl ConflictKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ConflictKind::Teacher => "teacher",
            ConflictKind::Room => "room",
        }
    }
}

/// Double-booking status of one entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictInfo {
    pub teacher_conflict: bool,
    pub room_conflict: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflicting_teacher_class: Option<ClassId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflicting_room_class: Option<ClassId>,
}

impl ConflictInfo {
    fn from_classes(teacher: Option<ClassId>, room: Option<ClassId>) -> Self {
        Self {
            teacher_conflict: teacher.is_some(),
            room_conflict: room.is_some(),
            conflicting_teacher_class: teacher,
            conflicting_room_class: room,
        }
    }

    pub fn has_conflict(&self) -> bool {
        self.teacher_conflict || self.room_conflict
    }
}

/// Advisory notice attached to a mutation that double-books a teacher or
/// room. The mutation itself has already been applied (or would be, for a
/// preview).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictWarning {
    pub kind: ConflictKind,
    pub slot: TimeSlot,
    /// Teacher id or room id that is double-booked.
    pub resource_id: String,
    pub conflicting_class_id: ClassId,
    pub message: String,
}

/// Two entries of different classes that share a teacher or a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub kind: ConflictKind,
    pub slot: TimeSlot,
    pub resource_id: String,
    pub first: EntryId,
    pub first_class: ClassId,
    pub second: EntryId,
    pub second_class: ClassId,
}

type SlotKey<'s> = (u32, PeriodId, &'s str);

pub struct ConflictDetector<'a> {
    store: &'a TimetableStore,
    catalog: &'a dyn CatalogReference,
}

impl<'a> ConflictDetector<'a> {
    pub fn new(store: &'a TimetableStore, catalog: &'a dyn CatalogReference) -> Self {
        Self { store, catalog }
    }

    /// Class of the first other entry that has `teacher_id` in the slot.
    pub fn teacher_conflict(
        &self,
        teacher_id: &str,
        day: Weekday,
        period_id: PeriodId,
        exclude: Option<&EntryId>,
    ) -> Option<ClassId> {
        if teacher_id.trim().is_empty() {
            return None;
        }
        let slot = TimeSlot::new(day, period_id);
        self.store
            .get_all()
            .iter()
            .find(|e| Some(&e.id) != exclude && e.teacher_id == teacher_id && e.slot() == slot)
            .map(|e| e.class_id.clone())
    }

    /// Class, other than `owner_class_id`, that uses the owner's room in the
    /// slot. A class without a room never conflicts.
    pub fn room_conflict(
        &self,
        owner_class_id: &str,
        day: Weekday,
        period_id: PeriodId,
        exclude: Option<&EntryId>,
    ) -> Option<ClassId> {
        let room_id = self.catalog.room_for_class(owner_class_id)?;
        if room_id.trim().is_empty() {
            return None;
        }
        let slot = TimeSlot::new(day, period_id);
        self.store
            .get_all()
            .iter()
            .filter(|e| Some(&e.id) != exclude && e.class_id != owner_class_id && e.slot() == slot)
            .find(|e| self.catalog.room_for_class(&e.class_id).as_deref() == Some(room_id.as_str()))
            .map(|e| e.class_id.clone())
    }

    pub fn conflict_info(&self, entry: &TimetableEntry) -> ConflictInfo {
        let teacher =
            self.teacher_conflict(&entry.teacher_id, entry.day, entry.period_id, Some(&entry.id));
        let room = self.room_conflict(&entry.class_id, entry.day, entry.period_id, Some(&entry.id));
        ConflictInfo::from_classes(teacher, room)
    }

    /// Conflict info for many entries with a single pass over the store.
    /// Gives the same answers as [`conflict_info`](Self::conflict_info).
    pub fn conflict_map<'e, I>(&self, entries: I) -> HashMap<EntryId, ConflictInfo>
    where
        I: IntoIterator<Item = &'e TimetableEntry>,
    {
        let rooms = self.room_cache();
        let mut by_teacher: HashMap<SlotKey<'_>, Vec<&TimetableEntry>> = HashMap::new();
        let mut by_room: HashMap<SlotKey<'_>, Vec<&TimetableEntry>> = HashMap::new();
        for e in self.store.get_all() {
            let day = e.day.num_days_from_monday();
            by_teacher
                .entry((day, e.period_id, e.teacher_id.as_str()))
                .or_default()
                .push(e);
            if let Some(Some(room)) = rooms.get(e.class_id.as_str()) {
                by_room
                    .entry((day, e.period_id, room.as_str()))
                    .or_default()
                    .push(e);
            }
        }

        let mut out = HashMap::new();
        for entry in entries {
            let day = entry.day.num_days_from_monday();
            let teacher = if entry.teacher_id.trim().is_empty() {
                None
            } else {
                by_teacher
                    .get(&(day, entry.period_id, entry.teacher_id.as_str()))
                    .and_then(|bucket| bucket.iter().find(|e| e.id != entry.id))
                    .map(|e| e.class_id.clone())
            };
            let room = match self.catalog.room_for_class(&entry.class_id) {
                Some(room) if !room.trim().is_empty() => by_room
                    .get(&(day, entry.period_id, room.as_str()))
                    .and_then(|bucket| {
                        bucket
                            .iter()
                            .find(|e| e.id != entry.id && e.class_id != entry.class_id)
                    })
                    .map(|e| e.class_id.clone()),
                _ => None,
            };
            out.insert(entry.id.clone(), ConflictInfo::from_classes(teacher, room));
        }
        out
    }

    /// Every teacher or room double-booking currently in the store, in store
    /// order.
    pub fn report(&self) -> Vec<Conflict> {
        let rooms = self.room_cache();
        let entries = self.store.get_all();
        let mut conflicts = Vec::new();
        for (i, a) in entries.iter().enumerate() {
            for b in &entries[i + 1..] {
                if a.slot() != b.slot() || a.class_id == b.class_id {
                    continue;
                }
                if !a.teacher_id.trim().is_empty() && a.teacher_id == b.teacher_id {
                    conflicts.push(Conflict {
                        kind: ConflictKind::Teacher,
                        slot: a.slot(),
                        resource_id: a.teacher_id.clone(),
                        first: a.id.clone(),
                        first_class: a.class_id.clone(),
                        second: b.id.clone(),
                        second_class: b.class_id.clone(),
                    });
                }
                let room_a = rooms.get(a.class_id.as_str()).cloned().flatten();
                let room_b = rooms.get(b.class_id.as_str()).cloned().flatten();
                if let (Some(ra), Some(rb)) = (room_a, room_b) {
                    if ra == rb {
                        conflicts.push(Conflict {
                            kind: ConflictKind::Room,
                            slot: a.slot(),
                            resource_id: ra,
                            first: a.id.clone(),
                            first_class: a.class_id.clone(),
                            second: b.id.clone(),
                            second_class: b.class_id.clone(),
                        });
                    }
                }
            }
        }
        trace!(count = conflicts.len(), "built conflict report");
        conflicts
    }

    /// Warnings a lesson for `class_id` taught by `teacher_id` would raise in
    /// `slot`, ignoring the entry `exclude` (the lesson being moved or edited).
    pub fn warnings_for(
        &self,
        class_id: &str,
        slot: TimeSlot,
        teacher_id: &str,
        exclude: Option<&EntryId>,
    ) -> Vec<ConflictWarning> {
        let mut warnings = Vec::new();
        if let Some(other) = self.teacher_conflict(teacher_id, slot.day, slot.period_id, exclude) {
            let teacher = self
                .catalog
                .teacher_name(teacher_id)
                .unwrap_or_else(|| teacher_id.to_string());
            warnings.push(ConflictWarning {
                kind: ConflictKind::Teacher,
                slot,
                resource_id: teacher_id.to_string(),
                message: format!(
                    "teacher {teacher} is already teaching {} on {slot}",
                    self.catalog.class_label(&other)
                ),
                conflicting_class_id: other,
            });
        }
        if let Some(other) = self.room_conflict(class_id, slot.day, slot.period_id, exclude) {
            let room_id = self.catalog.room_for_class(class_id).unwrap_or_default();
            let room = self
                .catalog
                .room_name(&room_id)
                .unwrap_or_else(|| room_id.clone());
            warnings.push(ConflictWarning {
                kind: ConflictKind::Room,
                slot,
                resource_id: room_id,
                message: format!(
                    "room {room} is already used by {} on {slot}",
                    self.catalog.class_label(&other)
                ),
                conflicting_class_id: other,
            });
        }
        warnings
    }

    fn room_cache(&self) -> HashMap<&'a str, Option<String>> {
        let mut rooms = HashMap::new();
        for e in self.store.get_all() {
            rooms.entry(e.class_id.as_str()).or_insert_with(|| {
                self.catalog
                    .room_for_class(&e.class_id)
                    .filter(|r| !r.trim().is_empty())
            });
        }
        rooms
    }
}
