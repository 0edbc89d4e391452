use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

use crate::catalog::CatalogReference;
use crate::entry::{ClassId, TimetableEntry};
use crate::error::{TimetableError, TimetableResult};
use crate::ids::{Clock, IdGenerator};
use crate::store::TimetableStore;

/// Snapshot of one class's week. Entries carry their own ids, distinct from
/// the live ones they were copied from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleTemplate {
    pub class_id: ClassId,
    pub name: String,
    pub captured_at: DateTime<Utc>,
    pub entries: Vec<TimetableEntry>,
}

/// What a class-level overwrite is about to do. Produced before the
/// overwrite runs so callers can ask for confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplacePlan {
    pub class_id: ClassId,
    pub incoming: usize,
    pub discarded: Vec<TimetableEntry>,
}

impl ReplacePlan {
    pub fn is_destructive(&self) -> bool {
        !self.discarded.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaceOutcome {
    pub class_id: ClassId,
    pub installed: Vec<TimetableEntry>,
    pub discarded: Vec<TimetableEntry>,
}

/// At most one template per class.
#[derive(Debug, Clone, Default)]
pub struct TemplateManager {
    templates: BTreeMap<ClassId, ScheduleTemplate>,
}

impl TemplateManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Later templates for the same class win.
    pub fn from_templates(templates: Vec<ScheduleTemplate>) -> Self {
        let templates = templates
            .into_iter()
            .map(|t| (t.class_id.clone(), t))
            .collect();
        Self { templates }
    }

    pub fn templates(&self) -> impl Iterator<Item = &ScheduleTemplate> {
        self.templates.values()
    }

    pub fn get(&self, class_id: &str) -> Option<&ScheduleTemplate> {
        self.templates.get(class_id)
    }

    pub fn remove(&mut self, class_id: &str) -> Option<ScheduleTemplate> {
        self.templates.remove(class_id)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Captures the class's current week, replacing any earlier template.
    /// A class without lessons yields an empty template.
    pub fn save_template(
        &mut self,
        store: &TimetableStore,
        catalog: &dyn CatalogReference,
        ids: &mut dyn IdGenerator,
        clock: &dyn Clock,
        class_id: &str,
    ) -> TimetableResult<ScheduleTemplate> {
        if class_id.trim().is_empty() {
            return Err(TimetableError::invalid("class_id is required"));
        }
        let entries = regenerate_ids(store.get_by_class(class_id), ids);
        let template = ScheduleTemplate {
            class_id: class_id.to_string(),
            name: format!("{} weekly template", catalog.class_label(class_id)),
            captured_at: clock.now(),
            entries,
        };
        info!(
            class = class_id,
            entries = template.entries.len(),
            "saved schedule template"
        );
        self.templates.insert(class_id.to_string(), template.clone());
        Ok(template)
    }

    pub fn plan_load(&self, store: &TimetableStore, class_id: &str) -> TimetableResult<ReplacePlan> {
        let template = self
            .get(class_id)
            .ok_or_else(|| TimetableError::template_not_found(class_id))?;
        Ok(ReplacePlan {
            class_id: class_id.to_string(),
            incoming: template.entries.len(),
            discarded: store.get_by_class(class_id),
        })
    }

    /// Replaces the class's live week with a fresh copy of its template.
    pub fn load_template(
        &self,
        store: &mut TimetableStore,
        ids: &mut dyn IdGenerator,
        class_id: &str,
    ) -> TimetableResult<ReplaceOutcome> {
        let template = self
            .get(class_id)
            .ok_or_else(|| TimetableError::template_not_found(class_id))?;
        let installed = regenerate_ids(template.entries.clone(), ids);
        let discarded = store.replace_for_class(class_id, installed.clone())?;
        info!(
            class = class_id,
            installed = installed.len(),
            discarded = discarded.len(),
            "loaded schedule template"
        );
        Ok(ReplaceOutcome {
            class_id: class_id.to_string(),
            installed,
            discarded,
        })
    }
}

/// Describes what [`copy_schedule`] would overwrite in the target class.
pub fn plan_copy(
    store: &TimetableStore,
    source_class_id: &str,
    target_class_id: &str,
) -> TimetableResult<ReplacePlan> {
    check_copy_classes(source_class_id, target_class_id)?;
    let incoming = store.get_by_class(source_class_id).len();
    if incoming == 0 {
        return Err(TimetableError::source_class_empty(source_class_id));
    }
    Ok(ReplacePlan {
        class_id: target_class_id.to_string(),
        incoming,
        discarded: store.get_by_class(target_class_id),
    })
}

/// Copies the source class's week onto the target class. Every lesson the
/// target had before is discarded.
pub fn copy_schedule(
    store: &mut TimetableStore,
    ids: &mut dyn IdGenerator,
    source_class_id: &str,
    target_class_id: &str,
) -> TimetableResult<ReplaceOutcome> {
    check_copy_classes(source_class_id, target_class_id)?;
    let source = store.get_by_class(source_class_id);
    if source.is_empty() {
        return Err(TimetableError::source_class_empty(source_class_id));
    }
    let remapped = source
        .into_iter()
        .map(|mut e| {
            e.class_id = target_class_id.to_string();
            e
        })
        .collect();
    let installed = regenerate_ids(remapped, ids);
    let discarded = store.replace_for_class(target_class_id, installed.clone())?;
    info!(
        source = source_class_id,
        target = target_class_id,
        installed = installed.len(),
        discarded = discarded.len(),
        "copied class schedule"
    );
    Ok(ReplaceOutcome {
        class_id: target_class_id.to_string(),
        installed,
        discarded,
    })
}

pub fn regenerate_ids(
    entries: Vec<TimetableEntry>,
    ids: &mut dyn IdGenerator,
) -> Vec<TimetableEntry> {
    entries
        .into_iter()
        .map(|mut e| {
            e.id = ids.next_id();
            e
        })
        .collect()
}

fn check_copy_classes(source: &str, target: &str) -> TimetableResult<()> {
    if source.trim().is_empty() || target.trim().is_empty() {
        return Err(TimetableError::invalid(
            "source and target class ids are required",
        ));
    }
    if source == target {
        return Err(TimetableError::invalid(format!(
            "cannot copy class {source} onto itself"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ClassSection, InMemoryCatalog};
    use crate::entry::TimeSlot;
    use crate::ids::{FixedClock, SequentialIds};
    use chrono::{TimeZone, Weekday};
    use std::collections::BTreeSet;

    fn clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2026, 9, 1, 7, 30, 0).unwrap())
    }

    fn catalog() -> InMemoryCatalog {
        let mut catalog = InMemoryCatalog::new();
        catalog.add_class(ClassSection::new("10-A", "Grade 10 A"));
        catalog
    }

    fn store() -> TimetableStore {
        let mut store = TimetableStore::new();
        for (id, class, day, period, subject, teacher) in [
            ("a1", "10-A", Weekday::Mon, 1, "MATH", "T1"),
            ("a2", "10-A", Weekday::Tue, 3, "PHYS", "T2"),
            ("b1", "10-B", Weekday::Mon, 1, "CHEM", "T3"),
        ] {
            store
                .upsert(TimetableEntry::new(
                    id,
                    class,
                    TimeSlot::new(day, period),
                    subject,
                    teacher,
                ))
                .unwrap();
        }
        store
    }

    fn lessons(entries: &[TimetableEntry]) -> BTreeSet<(u32, u8, String, String)> {
        entries
            .iter()
            .map(|e| {
                let (d, p, s, t) = e.lesson_key();
                (d, p, s.to_string(), t.to_string())
            })
            .collect()
    }

    #[test]
    fn save_then_load_restores_lessons_with_new_ids() {
        let mut store = store();
        let mut ids = SequentialIds::new("n");
        let mut templates = TemplateManager::new();
        let before = store.get_by_class("10-A");

        let template = templates
            .save_template(&store, &catalog(), &mut ids, &clock(), "10-A")
            .unwrap();
        assert_eq!(template.name, "Grade 10 A weekly template");
        assert_eq!(template.captured_at, clock().0);

        let mover = before[0].id.clone();
        store.remove(&mover);
        let outcome = templates.load_template(&mut store, &mut ids, "10-A").unwrap();
        assert_eq!(outcome.discarded.len(), 1);

        let after = store.get_by_class("10-A");
        assert_eq!(lessons(&after), lessons(&before));
        assert!(after.iter().all(|e| before.iter().all(|b| b.id != e.id)));
        assert!(after.iter().all(|e| template.entries.iter().all(|t| t.id != e.id)));
        assert_eq!(store.get_by_class("10-B").len(), 1);
    }

    #[test]
    fn empty_class_still_gets_a_template() {
        let store = store();
        let mut templates = TemplateManager::new();
        let template = templates
            .save_template(&store, &catalog(), &mut SequentialIds::default(), &clock(), "12-Z")
            .unwrap();
        assert!(template.entries.is_empty());
        assert!(templates.get("12-Z").is_some());
        assert!(templates.plan_load(&store, "10-A").unwrap_err().is_not_found());
    }

    #[test]
    fn copy_overwrites_target_week() {
        let mut store = store();
        let plan = plan_copy(&store, "10-A", "10-B").unwrap();
        assert_eq!(plan.incoming, 2);
        assert!(plan.is_destructive());
        assert_eq!(plan.discarded[0].id.as_str(), "b1");

        let outcome = copy_schedule(&mut store, &mut SequentialIds::new("c"), "10-A", "10-B").unwrap();
        assert_eq!(outcome.installed.len(), 2);
        let target = store.get_by_class("10-B");
        assert_eq!(target.len(), 2);
        assert!(target.iter().all(|e| e.id.as_str() != "b1"));
        assert_eq!(lessons(&target), lessons(&store.get_by_class("10-A")));
    }

    #[test]
    fn copy_from_empty_class_is_not_found() {
        let mut store = store();
        let err = copy_schedule(&mut store, &mut SequentialIds::default(), "11-C", "10-B").unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(store.get_by_class("10-B").len(), 1);
        assert!(matches!(
            plan_copy(&store, "10-A", "10-A"),
            Err(TimetableError::InvalidInput(_))
        ));
    }
}
