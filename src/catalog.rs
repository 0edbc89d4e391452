use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::entry::{ClassId, RoomId, SubjectId, TeacherId};

/// Read-only view of the school's master data. The timetable only needs raw
/// identifiers to detect conflicts; names are looked up to make warnings
/// readable.
pub trait CatalogReference {
    /// The room a class is taught in, if it has one.
    fn room_for_class(&self, class_id: &str) -> Option<RoomId>;
    fn class_name(&self, class_id: &str) -> Option<String>;
    fn teacher_name(&self, teacher_id: &str) -> Option<String>;
    fn subject_name(&self, subject_id: &str) -> Option<String>;
    fn room_name(&self, room_id: &str) -> Option<String>;

    /// Class display name, falling back to the raw id.
    fn class_label(&self, class_id: &str) -> String {
        self.class_name(class_id)
            .unwrap_or_else(|| class_id.to_string())
    }
}

/// A teaching group as supplied by the class registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassSection {
    pub id: ClassId,
    pub name: String,
    /// Room the class is taught in. An empty string is treated as no room.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<RoomId>,
}

impl ClassSection {
    pub fn new(id: impl Into<ClassId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            room_id: None,
        }
    }

    pub fn with_room(mut self, room_id: impl Into<RoomId>) -> Self {
        self.room_id = Some(room_id.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRecord {
    pub id: String,
    pub name: String,
}

impl NamedRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Catalog held in memory, loadable from a JSON document of the same shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InMemoryCatalog {
    #[serde(default)]
    classes: BTreeMap<ClassId, ClassSection>,
    #[serde(default)]
    teachers: BTreeMap<TeacherId, NamedRecord>,
    #[serde(default)]
    subjects: BTreeMap<SubjectId, NamedRecord>,
    #[serde(default)]
    rooms: BTreeMap<RoomId, NamedRecord>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_class(&mut self, class: ClassSection) -> &mut Self {
        self.classes.insert(class.id.clone(), class);
        self
    }

    pub fn add_teacher(&mut self, id: impl Into<TeacherId>, name: impl Into<String>) -> &mut Self {
        let record = NamedRecord::new(id, name);
        self.teachers.insert(record.id.clone(), record);
        self
    }

    pub fn add_subject(&mut self, id: impl Into<SubjectId>, name: impl Into<String>) -> &mut Self {
        let record = NamedRecord::new(id, name);
        self.subjects.insert(record.id.clone(), record);
        self
    }

    pub fn add_room(&mut self, id: impl Into<RoomId>, name: impl Into<String>) -> &mut Self {
        let record = NamedRecord::new(id, name);
        self.rooms.insert(record.id.clone(), record);
        self
    }
}

impl CatalogReference for InMemoryCatalog {
    fn room_for_class(&self, class_id: &str) -> Option<RoomId> {
        self.classes
            .get(class_id)
            .and_then(|c| c.room_id.as_ref())
            .filter(|room| !room.trim().is_empty())
            .cloned()
    }

    fn class_name(&self, class_id: &str) -> Option<String> {
        self.classes.get(class_id).map(|c| c.name.clone())
    }

    fn teacher_name(&self, teacher_id: &str) -> Option<String> {
        self.teachers.get(teacher_id).map(|t| t.name.clone())
    }

    fn subject_name(&self, subject_id: &str) -> Option<String> {
        self.subjects.get(subject_id).map(|s| s.name.clone())
    }

    fn room_name(&self, room_id: &str) -> Option<String> {
        self.rooms.get(room_id).map(|r| r.name.clone())
    }
}
