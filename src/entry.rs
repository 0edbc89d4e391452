use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::week::PeriodId;

pub type ClassId = String;
pub type TeacherId = String;
pub type SubjectId = String;
pub type RoomId = String;

/// Opaque identity of a scheduled lesson. Never reused, never changed by a
/// move or an edit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntryId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for EntryId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeSlot {
    pub day: Weekday,
    pub period_id: PeriodId,
}

impl TimeSlot {
    pub fn new(day: Weekday, period_id: PeriodId) -> Self {
        Self { day, period_id }
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} period {}", self.day, self.period_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurriculumType {
    #[default]
    National,
    International,
    Elective,
    Other,
}

impl CurriculumType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CurriculumType::National => "national",
            CurriculumType::International => "international",
            CurriculumType::Elective => "elective",
            CurriculumType::Other => "other",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "national" => Some(CurriculumType::National),
            "international" => Some(CurriculumType::International),
            "elective" => Some(CurriculumType::Elective),
            "other" => Some(CurriculumType::Other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimetableEntry {
    pub id: EntryId,
    pub class_id: ClassId,
    pub day: Weekday,
    pub period_id: PeriodId,
    pub subject_id: SubjectId,
    pub teacher_id: TeacherId,
    #[serde(default)]
    pub curriculum_type: CurriculumType,
}

impl TimetableEntry {
    pub fn new(
        id: impl Into<EntryId>,
        class_id: impl Into<ClassId>,
        slot: TimeSlot,
        subject_id: impl Into<SubjectId>,
        teacher_id: impl Into<TeacherId>,
    ) -> Self {
        Self {
            id: id.into(),
            class_id: class_id.into(),
            day: slot.day,
            period_id: slot.period_id,
            subject_id: subject_id.into(),
            teacher_id: teacher_id.into(),
            curriculum_type: CurriculumType::default(),
        }
    }

    pub fn slot(&self) -> TimeSlot {
        TimeSlot::new(self.day, self.period_id)
    }

    pub fn occupies(&self, class_id: &str, slot: TimeSlot) -> bool {
        self.class_id == class_id && self.slot() == slot
    }

    /// The (day, period, subject, teacher) shape of the lesson, ignoring its
    /// identity and owning class.
    pub fn lesson_key(&self) -> (u32, PeriodId, &str, &str) {
        (
            self.day.num_days_from_monday(),
            self.period_id,
            self.subject_id.as_str(),
            self.teacher_id.as_str(),
        )
    }
}

/// Input for a new lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEntry {
    pub class_id: ClassId,
    pub day: Weekday,
    pub period_id: PeriodId,
    #[serde(default)]
    pub subject_id: Option<SubjectId>,
    #[serde(default)]
    pub teacher_id: Option<TeacherId>,
    #[serde(default)]
    pub curriculum_type: CurriculumType,
}

impl NewEntry {
    pub fn new(
        class_id: impl Into<ClassId>,
        slot: TimeSlot,
        subject_id: impl Into<SubjectId>,
        teacher_id: impl Into<TeacherId>,
    ) -> Self {
        Self {
            class_id: class_id.into(),
            day: slot.day,
            period_id: slot.period_id,
            subject_id: Some(subject_id.into()),
            teacher_id: Some(teacher_id.into()),
            curriculum_type: CurriculumType::default(),
        }
    }

    pub fn slot(&self) -> TimeSlot {
        TimeSlot::new(self.day, self.period_id)
    }
}

/// Partial edit of a lesson. Slot and class are changed only by a move.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<SubjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teacher_id: Option<TeacherId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curriculum_type: Option<CurriculumType>,
}

impl EntryPatch {
    pub fn subject(subject_id: impl Into<SubjectId>) -> Self {
        Self {
            subject_id: Some(subject_id.into()),
            ..Self::default()
        }
    }

    pub fn teacher(teacher_id: impl Into<TeacherId>) -> Self {
        Self {
            teacher_id: Some(teacher_id.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.subject_id.is_none() && self.teacher_id.is_none() && self.curriculum_type.is_none()
    }
}
