use std::sync::Arc;

use chrono::{TimeZone, Utc, Weekday};
use timetable_tool::{
    ClassSection, EntryId, EntryPatch, FixedClock, InMemoryCatalog, MemoryKeyValueStore,
    SequentialIds, TimeSlot, Timetable, TimetableError, WeekGrid, WeekGridConfig,
};

fn catalog() -> InMemoryCatalog {
    let mut catalog = InMemoryCatalog::new();
    catalog
        .add_class(ClassSection::new("10-A", "Grade 10 A").with_room("R101"))
        .add_class(ClassSection::new("10-B", "Grade 10 B").with_room("R102"))
        .add_class(ClassSection::new("10-C", "Grade 10 C").with_room("R101"))
        .add_class(ClassSection::new("11-A", "Grade 11 A"))
        .add_teacher("T1", "Ms. Rivera")
        .add_teacher("T2", "Mr. Okafor")
        .add_subject("MATH", "Mathematics")
        .add_subject("PHYS", "Physics");
    catalog
}

fn timetable() -> Timetable {
    Timetable::new(catalog())
        .with_id_generator(SequentialIds::new("e"))
        .with_clock(FixedClock(Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap()))
}

#[test]
fn occupied_slot_rejected_but_shared_teacher_only_warns() {
    let mut tt = timetable();
    tt.assign("10-A", Weekday::Mon, 1, "MATH", "T1").unwrap();

    let err = tt.assign("10-A", Weekday::Mon, 1, "PHYS", "T2").unwrap_err();
    assert!(matches!(err, TimetableError::SlotOccupied { .. }));

    let mutation = tt.assign("10-B", Weekday::Mon, 1, "MATH", "T1").unwrap();
    assert_eq!(mutation.warnings.len(), 1);
    assert_eq!(mutation.warnings[0].conflicting_class_id, "10-A");
    assert!(mutation.warnings[0].message.contains("Ms. Rivera"));

    assert_eq!(
        tt.teacher_conflict("T1", Weekday::Mon, 1, None),
        Some("10-A".to_string())
    );
    assert_eq!(tt.entries().len(), 2);
}

#[test]
fn class_slot_holds_at_most_one_lesson_after_any_sequence() {
    let mut tt = timetable();
    let a = tt.assign("10-A", Weekday::Mon, 1, "MATH", "T1").unwrap().entry;
    let b = tt.assign("10-A", Weekday::Mon, 2, "PHYS", "T2").unwrap().entry;
    assert!(tt.move_entry(&b.id, Weekday::Mon, 1).is_err());
    tt.move_entry(&a.id, Weekday::Tue, 1).unwrap();
    tt.move_entry(&b.id, Weekday::Mon, 1).unwrap();
    tt.copy_schedule("10-A", "10-B").unwrap();

    let mut seen = std::collections::HashSet::new();
    for entry in tt.entries() {
        assert!(
            seen.insert((entry.class_id.clone(), entry.slot())),
            "duplicate lesson for {} at {}",
            entry.class_id,
            entry.slot()
        );
    }
}

#[test]
fn move_keeps_identity_and_lesson_details() {
    let mut tt = timetable();
    let original = tt.assign("10-A", Weekday::Mon, 1, "MATH", "T1").unwrap().entry;
    let moved = tt.move_entry(&original.id, Weekday::Thu, 4).unwrap().entry;
    assert_eq!(moved.id, original.id);
    assert_eq!(moved.subject_id, "MATH");
    assert_eq!(moved.teacher_id, "T1");
    assert_eq!(moved.slot(), TimeSlot::new(Weekday::Thu, 4));
    assert!(tt.entries_in_slot(Weekday::Mon, 1).is_empty());
}

#[test]
fn move_onto_own_slot_is_a_no_op_not_an_error() {
    let mut tt = timetable();
    let entry = tt.assign("10-A", Weekday::Mon, 1, "MATH", "T1").unwrap().entry;
    let moved = tt.move_entry(&entry.id, Weekday::Mon, 1).unwrap();
    assert_eq!(moved.entry, entry);
}

#[test]
fn missing_entries_report_not_found() {
    let mut tt = timetable();
    let ghost = EntryId::from("ghost");
    assert!(tt.move_entry(&ghost, Weekday::Mon, 1).unwrap_err().is_not_found());
    assert!(tt.update(&ghost, EntryPatch::subject("MATH")).unwrap_err().is_not_found());
    assert!(tt.delete(&ghost).unwrap_err().is_not_found());
    assert!(tt.conflict_info(&ghost).unwrap_err().is_not_found());
}

#[test]
fn slots_outside_the_week_grid_are_invalid() {
    let mut tt = timetable();
    assert!(matches!(
        tt.assign("10-A", Weekday::Sat, 1, "MATH", "T1"),
        Err(TimetableError::InvalidInput(_))
    ));
    assert!(matches!(
        tt.assign("10-A", Weekday::Mon, 42, "MATH", "T1"),
        Err(TimetableError::InvalidInput(_))
    ));
}

#[test]
fn teacher_conflict_is_symmetric_and_never_self() {
    let mut tt = timetable();
    let a = tt.assign("10-A", Weekday::Wed, 3, "MATH", "T1").unwrap().entry;
    let b = tt.assign("10-B", Weekday::Wed, 3, "PHYS", "T1").unwrap().entry;

    let info_a = tt.conflict_info(&a.id).unwrap();
    let info_b = tt.conflict_info(&b.id).unwrap();
    assert_eq!(info_a.conflicting_teacher_class.as_deref(), Some("10-B"));
    assert_eq!(info_b.conflicting_teacher_class.as_deref(), Some("10-A"));

    let lone = tt.assign("11-A", Weekday::Fri, 1, "MATH", "T2").unwrap().entry;
    assert!(!tt.conflict_info(&lone.id).unwrap().has_conflict());
}

#[test]
fn shared_room_is_reported_for_both_classes() {
    let mut tt = timetable();
    let a = tt.assign("10-A", Weekday::Tue, 2, "MATH", "T1").unwrap().entry;
    let mutation = tt.assign("10-C", Weekday::Tue, 2, "PHYS", "T2").unwrap();
    assert_eq!(mutation.warnings.len(), 1);
    assert_eq!(mutation.warnings[0].resource_id, "R101");

    let info = tt.conflict_info(&a.id).unwrap();
    assert_eq!(info.conflicting_room_class.as_deref(), Some("10-C"));
    assert!(info.conflicting_teacher_class.is_none());

    let report = tt.conflict_report();
    assert_eq!(report.len(), 1);
    assert_eq!(report[0].first_class, "10-A");
    assert_eq!(report[0].second_class, "10-C");
}

#[test]
fn class_without_room_never_room_conflicts() {
    let mut tt = timetable();
    tt.assign("11-A", Weekday::Mon, 1, "MATH", "T1").unwrap();
    let mutation = tt.assign("10-A", Weekday::Mon, 1, "MATH", "T2").unwrap();
    assert!(!mutation.has_warnings());
    assert_eq!(tt.room_conflict("11-A", Weekday::Mon, 1, None), None);
}

#[test]
fn class_conflicts_match_single_lookups() {
    let mut tt = timetable();
    tt.assign("10-A", Weekday::Mon, 1, "MATH", "T1").unwrap();
    tt.assign("10-A", Weekday::Mon, 2, "PHYS", "T2").unwrap();
    tt.assign("10-B", Weekday::Mon, 1, "PHYS", "T1").unwrap();
    tt.assign("10-C", Weekday::Mon, 2, "MATH", "T1").unwrap();

    let map = tt.class_conflicts("10-A");
    assert_eq!(map.len(), 2);
    for (id, info) in map {
        assert_eq!(info, tt.conflict_info(&id).unwrap());
    }
}

#[test]
fn update_changes_teacher_and_reports_new_conflict() {
    let mut tt = timetable();
    tt.assign("10-A", Weekday::Mon, 1, "MATH", "T1").unwrap();
    let b = tt.assign("10-B", Weekday::Mon, 1, "PHYS", "T2").unwrap().entry;

    let mutation = tt.update(&b.id, EntryPatch::teacher("T1")).unwrap();
    assert_eq!(mutation.entry.teacher_id, "T1");
    assert_eq!(mutation.entry.slot(), b.slot());
    assert_eq!(mutation.warnings.len(), 1);

    assert!(matches!(
        tt.update(&b.id, EntryPatch::subject(" ")),
        Err(TimetableError::InvalidInput(_))
    ));
}

#[test]
fn template_round_trip_restores_lesson_shape() {
    let mut tt = timetable();
    tt.assign("10-A", Weekday::Mon, 1, "MATH", "T1").unwrap();
    tt.assign("10-A", Weekday::Tue, 2, "PHYS", "T2").unwrap();
    let before: Vec<_> = tt
        .entries_for_class("10-A")
        .iter()
        .map(|e| (e.day, e.period_id, e.subject_id.clone(), e.teacher_id.clone()))
        .collect();

    let template = tt.save_template("10-A").unwrap();
    assert_eq!(template.name, "Grade 10 A weekly template");
    assert_eq!(template.entries.len(), 2);

    let scratch = tt.entries_for_class("10-A");
    for entry in &scratch {
        tt.delete(&entry.id).unwrap();
    }
    tt.assign("10-A", Weekday::Fri, 5, "MATH", "T2").unwrap();

    let plan = tt.plan_load_template("10-A").unwrap();
    assert!(plan.is_destructive());
    assert_eq!(plan.incoming, 2);

    let outcome = tt.load_template("10-A").unwrap();
    assert_eq!(outcome.discarded.len(), 1);
    let after: Vec<_> = tt
        .entries_for_class("10-A")
        .iter()
        .map(|e| (e.day, e.period_id, e.subject_id.clone(), e.teacher_id.clone()))
        .collect();
    assert_eq!(after, before);
    for entry in tt.entries_for_class("10-A") {
        assert!(scratch.iter().all(|old| old.id != entry.id));
    }
}

#[test]
fn saving_an_empty_class_gives_an_empty_template() {
    let mut tt = timetable();
    let template = tt.save_template("11-A").unwrap();
    assert!(template.entries.is_empty());
    assert!(tt.template("11-A").is_some());
    assert!(tt.load_template("10-B").unwrap_err().is_not_found());
}

#[test]
fn copy_overwrites_target_and_leaves_source_alone() {
    let mut tt = timetable();
    tt.assign("10-A", Weekday::Mon, 1, "MATH", "T1").unwrap();
    tt.assign("10-A", Weekday::Mon, 2, "PHYS", "T2").unwrap();
    tt.assign("10-B", Weekday::Wed, 6, "PHYS", "T2").unwrap();

    let plan = tt.plan_copy("10-A", "10-B").unwrap();
    assert_eq!(plan.incoming, 2);
    assert_eq!(plan.discarded.len(), 1);

    let outcome = tt.copy_schedule("10-A", "10-B").unwrap();
    assert_eq!(outcome.installed.len(), 2);
    let target = tt.entries_for_class("10-B");
    assert_eq!(target.len(), 2);
    assert!(target.iter().all(|e| e.class_id == "10-B"));
    assert!(tt.entries_in_slot(Weekday::Wed, 6).is_empty());

    let source = tt.entries_for_class("10-A");
    assert_eq!(source.len(), 2);
    assert!(target.iter().all(|t| source.iter().all(|s| s.id != t.id)));
}

#[test]
fn copy_from_empty_or_onto_itself_fails() {
    let mut tt = timetable();
    tt.assign("10-A", Weekday::Mon, 1, "MATH", "T1").unwrap();
    assert!(tt.copy_schedule("11-A", "10-A").unwrap_err().is_not_found());
    assert!(matches!(
        tt.copy_schedule("10-A", "10-A"),
        Err(TimetableError::InvalidInput(_))
    ));
    assert_eq!(tt.entries().len(), 1);
}

#[test]
fn changes_autosave_to_backend_and_reload() {
    let kv = Arc::new(MemoryKeyValueStore::new());
    let mut tt = timetable().with_backend(kv.clone()).unwrap();
    tt.assign("10-A", Weekday::Mon, 1, "MATH", "T1").unwrap();
    tt.assign("10-A", Weekday::Mon, 2, "PHYS", "T2").unwrap();
    tt.save_template("10-A").unwrap();
    let revision = tt.revision();

    let reopened = Timetable::new(catalog()).with_backend(kv.clone()).unwrap();
    assert_eq!(reopened.entries(), tt.entries());
    assert_eq!(reopened.revision(), revision);
    assert_eq!(reopened.template("10-A"), tt.template("10-A"));
}

#[test]
fn grid_change_must_keep_every_lesson_on_the_grid() {
    let mut tt = timetable();
    tt.assign("10-A", Weekday::Fri, 1, "MATH", "T1").unwrap();

    let standard = WeekGrid::standard();
    let short_week = WeekGridConfig::new(
        [Weekday::Mon, Weekday::Tue, Weekday::Wed],
        standard.periods().iter().cloned(),
    );
    let short_week = WeekGrid::from_config(&short_week).unwrap();
    assert!(matches!(
        tt.set_grid(short_week.clone()),
        Err(TimetableError::InvalidInput(_))
    ));
    assert_eq!(tt.grid(), &standard);

    let friday = tt.entries_for_class("10-A")[0].id.clone();
    tt.delete(&friday).unwrap();
    tt.set_grid(short_week).unwrap();
    assert_eq!(tt.grid().teaching_slot_count(), 24);
}

fn mon_tue_grid() -> WeekGrid {
    let config = WeekGridConfig::new(
        [Weekday::Mon, Weekday::Tue],
        WeekGrid::standard().periods().iter().cloned(),
    );
    WeekGrid::from_config(&config).unwrap()
}

#[test]
fn template_from_a_wider_week_does_not_load_after_grid_shrinks() {
    let mut tt = timetable();
    let friday = tt.assign("10-A", Weekday::Fri, 1, "MATH", "T1").unwrap().entry;
    tt.save_template("10-A").unwrap();
    tt.delete(&friday.id).unwrap();
    tt.assign("10-A", Weekday::Mon, 2, "PHYS", "T2").unwrap();
    tt.set_grid(mon_tue_grid()).unwrap();

    assert!(matches!(
        tt.load_template("10-A"),
        Err(TimetableError::InvalidInput(_))
    ));
    let week = tt.entries_for_class("10-A");
    assert_eq!(week.len(), 1);
    assert_eq!(week[0].slot(), TimeSlot::new(Weekday::Mon, 2));
    assert!(tt.entries().iter().all(|e| tt.grid().is_school_day(e.day)));
    tt.set_grid(mon_tue_grid()).unwrap();
}

#[test]
fn snapshot_off_the_current_grid_is_rejected_on_attach() {
    let kv = Arc::new(MemoryKeyValueStore::new());
    let mut full_week = timetable().with_backend(kv.clone()).unwrap();
    full_week.assign("10-A", Weekday::Fri, 1, "MATH", "T1").unwrap();

    let short_week = timetable().with_grid(mon_tue_grid());
    assert!(short_week.with_backend(kv.clone()).is_err());

    let mut target = timetable().with_grid(mon_tue_grid());
    assert!(target.load_from(&*kv).is_err());
    assert!(target.entries().is_empty());
}

#[test]
fn load_from_copies_snapshot_without_writing_back() {
    let kv = Arc::new(MemoryKeyValueStore::new());
    let mut saved = timetable();
    saved.assign("10-A", Weekday::Mon, 1, "KEEPME", "T1").unwrap();
    saved.save_template("10-A").unwrap();
    saved.save_to(&*kv).unwrap();
    let snapshot_revision = saved.revision();

    let mut tt = timetable();
    tt.assign("10-B", Weekday::Tue, 3, "DISCARD", "T2").unwrap();
    tt.load_from(&*kv).unwrap();
    assert_eq!(tt.entries(), saved.entries());
    assert!(tt.template("10-A").is_some());

    tt.assign("10-A", Weekday::Mon, 2, "SCRATCH", "T2").unwrap();
    let reopened = Timetable::new(catalog()).with_backend(kv.clone()).unwrap();
    assert_eq!(reopened.entries(), saved.entries());
    assert_eq!(reopened.revision(), snapshot_revision);
}
