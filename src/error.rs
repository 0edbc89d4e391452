use chrono::Weekday;
use std::fmt;

use crate::entry::{ClassId, EntryId};
use crate::week::PeriodId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingKind {
    Entry,
    Template,
    SourceClass,
}

impl fmt::Display for MissingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MissingKind::Entry => "entry",
            MissingKind::Template => "template for class",
            MissingKind::SourceClass => "schedule for source class",
        };
        f.write_str(label)
    }
}

/// Caller-facing failures of a timetable operation. Double-bookings are not
/// errors; they come back as warnings on a successful mutation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimetableError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("class {class_id} already has a lesson on {day} period {period_id} (entry {occupied_by})")]
    SlotOccupied {
        class_id: ClassId,
        day: Weekday,
        period_id: PeriodId,
        occupied_by: EntryId,
    },
    #[error("{kind} '{id}' not found")]
    NotFound { kind: MissingKind, id: String },
}

impl TimetableError {
    pub fn invalid(message: impl Into<String>) -> Self {
        TimetableError::InvalidInput(message.into())
    }

    pub fn entry_not_found(id: &EntryId) -> Self {
        TimetableError::NotFound {
            kind: MissingKind::Entry,
            id: id.to_string(),
        }
    }

    pub fn template_not_found(class_id: &str) -> Self {
        TimetableError::NotFound {
            kind: MissingKind::Template,
            id: class_id.to_string(),
        }
    }

    pub fn source_class_empty(class_id: &str) -> Self {
        TimetableError::NotFound {
            kind: MissingKind::SourceClass,
            id: class_id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, TimetableError::NotFound { .. })
    }
}

pub type TimetableResult<T> = Result<T, TimetableError>;
