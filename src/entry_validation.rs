use crate::entry::TimetableEntry;
use crate::week::WeekGrid;
use std::collections::HashSet;

#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct EntryValidationError {
    message: String,
}

impl EntryValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub(crate) fn require(value: Option<&str>, field: &str) -> Result<String, EntryValidationError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(EntryValidationError::new(format!("{field} is required"))),
    }
}

pub fn validate_entry(entry: &TimetableEntry) -> Result<(), EntryValidationError> {
    if entry.id.as_str().trim().is_empty() {
        return Err(EntryValidationError::new("entry id must not be empty"));
    }
    if entry.class_id.trim().is_empty() {
        return Err(EntryValidationError::new(format!(
            "entry {} has no class_id",
            entry.id
        )));
    }
    if entry.subject_id.trim().is_empty() {
        return Err(EntryValidationError::new(format!(
            "entry {} has no subject_id",
            entry.id
        )));
    }
    if entry.teacher_id.trim().is_empty() {
        return Err(EntryValidationError::new(format!(
            "entry {} has no teacher_id",
            entry.id
        )));
    }
    Ok(())
}

/// Checks that the entry sits on a day and period the grid knows about.
pub fn validate_entry_on_grid(
    entry: &TimetableEntry,
    grid: &WeekGrid,
) -> Result<(), EntryValidationError> {
    if !grid.is_school_day(entry.day) {
        return Err(EntryValidationError::new(format!(
            "entry {} is on {}, which is not a school day",
            entry.id, entry.day
        )));
    }
    if !grid.has_period(entry.period_id) {
        return Err(EntryValidationError::new(format!(
            "entry {} uses unknown period {}",
            entry.id, entry.period_id
        )));
    }
    Ok(())
}

/// Field checks plus id uniqueness and one lesson per class slot.
pub fn validate_entry_collection(entries: &[TimetableEntry]) -> Result<(), EntryValidationError> {
    let mut seen_ids = HashSet::with_capacity(entries.len());
    let mut seen_slots = HashSet::with_capacity(entries.len());
    for entry in entries {
        validate_entry(entry)?;
        if !seen_ids.insert(entry.id.clone()) {
            return Err(EntryValidationError::new(format!(
                "duplicate entry id {}",
                entry.id
            )));
        }
        if !seen_slots.insert((entry.class_id.as_str(), entry.day, entry.period_id)) {
            return Err(EntryValidationError::new(format!(
                "class {} has more than one lesson on {} period {}",
                entry.class_id, entry.day, entry.period_id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::TimeSlot;
    use chrono::Weekday;

    fn entry(id: &str, class: &str, day: Weekday, period: u8) -> TimetableEntry {
        TimetableEntry::new(id, class, TimeSlot::new(day, period), "MATH", "T1")
    }

    #[test]
    fn collection_rejects_two_lessons_in_one_class_slot() {
        let entries = vec![
            entry("a", "10-A", Weekday::Mon, 1),
            entry("b", "10-A", Weekday::Mon, 1),
        ];
        let err = validate_entry_collection(&entries).unwrap_err();
        assert!(err.to_string().contains("more than one lesson"));
    }

    #[test]
    fn collection_allows_same_slot_across_classes() {
        let entries = vec![
            entry("a", "10-A", Weekday::Mon, 1),
            entry("b", "10-B", Weekday::Mon, 1),
        ];
        assert!(validate_entry_collection(&entries).is_ok());
    }

    #[test]
    fn blank_teacher_is_rejected() {
        let mut e = entry("a", "10-A", Weekday::Mon, 1);
        e.teacher_id = "  ".into();
        assert!(validate_entry(&e).is_err());
    }

    #[test]
    fn grid_check_rejects_unknown_period() {
        let grid = WeekGrid::standard();
        assert!(validate_entry_on_grid(&entry("a", "10-A", Weekday::Mon, 1), &grid).is_ok());
        assert!(validate_entry_on_grid(&entry("a", "10-A", Weekday::Mon, 77), &grid).is_err());
    }
}
