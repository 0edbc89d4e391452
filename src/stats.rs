use polars::prelude::PlSmallStr;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::catalog::CatalogReference;
use crate::entry::{ClassId, TeacherId, TimetableEntry};
use crate::week::WeekGrid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassFillRate {
    pub class_id: ClassId,
    pub class_name: String,
    pub lessons: usize,
    pub teaching_slots: usize,
    /// Share of the class's teaching slots that hold a lesson, 0.0..=1.0.
    pub fill_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeacherLoad {
    pub teacher_id: TeacherId,
    pub teacher_name: String,
    pub lessons: usize,
    pub days_taught: usize,
}

/// One row per entry, with a `teaching` flag derived from the grid.
pub fn entries_dataframe(entries: &[TimetableEntry], grid: &WeekGrid) -> PolarsResult<DataFrame> {
    let ids: Vec<&str> = entries.iter().map(|e| e.id.as_str()).collect();
    let classes: Vec<&str> = entries.iter().map(|e| e.class_id.as_str()).collect();
    let days: Vec<String> = entries.iter().map(|e| e.day.to_string()).collect();
    let periods: Vec<u32> = entries.iter().map(|e| u32::from(e.period_id)).collect();
    let subjects: Vec<&str> = entries.iter().map(|e| e.subject_id.as_str()).collect();
    let teachers: Vec<&str> = entries.iter().map(|e| e.teacher_id.as_str()).collect();
    let curriculum: Vec<&str> = entries.iter().map(|e| e.curriculum_type.as_str()).collect();
    let teaching: Vec<bool> = entries
        .iter()
        .map(|e| grid.is_school_day(e.day) && grid.is_teaching_period(e.period_id))
        .collect();

    let columns = vec![
        Series::new(PlSmallStr::from_static("id"), ids).into_column(),
        Series::new(PlSmallStr::from_static("class_id"), classes).into_column(),
        Series::new(PlSmallStr::from_static("day"), days).into_column(),
        Series::new(PlSmallStr::from_static("period_id"), periods).into_column(),
        Series::new(PlSmallStr::from_static("subject_id"), subjects).into_column(),
        Series::new(PlSmallStr::from_static("teacher_id"), teachers).into_column(),
        Series::new(PlSmallStr::from_static("curriculum_type"), curriculum).into_column(),
        Series::new(PlSmallStr::from_static("teaching"), teaching).into_column(),
    ];
    DataFrame::new(columns)
}

/// Fill rate of every class that has lessons, plus any in `include` (which
/// show up with zero lessons). Break and lunch periods are not counted.
pub fn class_fill_rates(
    entries: &[TimetableEntry],
    grid: &WeekGrid,
    catalog: &dyn CatalogReference,
    include: &[ClassId],
) -> PolarsResult<Vec<ClassFillRate>> {
    let df = entries_dataframe(entries, grid)?;
    let counts = df
        .lazy()
        .filter(col("teaching"))
        .group_by([col("class_id")])
        .agg([col("id").count().cast(DataType::Int64).alias("lessons")])
        .collect()?;

    let mut per_class: BTreeMap<String, usize> =
        include.iter().map(|c| (c.clone(), 0usize)).collect();
    let class_col = counts.column("class_id")?.str()?;
    let lesson_col = counts.column("lessons")?.i64()?;
    for (class_id, lessons) in class_col.into_iter().zip(lesson_col.into_iter()) {
        if let (Some(class_id), Some(lessons)) = (class_id, lessons) {
            per_class.insert(class_id.to_string(), lessons.max(0) as usize);
        }
    }

    let teaching_slots = grid.teaching_slot_count();
    Ok(per_class
        .into_iter()
        .map(|(class_id, lessons)| ClassFillRate {
            class_name: catalog.class_label(&class_id),
            fill_rate: if teaching_slots == 0 {
                0.0
            } else {
                lessons as f64 / teaching_slots as f64
            },
            class_id,
            lessons,
            teaching_slots,
        })
        .collect())
}

/// Teaching-period lessons per teacher, busiest first.
pub fn teacher_loads(
    entries: &[TimetableEntry],
    grid: &WeekGrid,
    catalog: &dyn CatalogReference,
) -> PolarsResult<Vec<TeacherLoad>> {
    let df = entries_dataframe(entries, grid)?;
    let loads = df
        .lazy()
        .filter(col("teaching"))
        .group_by([col("teacher_id")])
        .agg([
            col("id").count().cast(DataType::Int64).alias("lessons"),
            col("day").n_unique().cast(DataType::Int64).alias("days_taught"),
        ])
        .collect()?;

    let teacher_col = loads.column("teacher_id")?.str()?;
    let lesson_col = loads.column("lessons")?.i64()?;
    let day_col = loads.column("days_taught")?.i64()?;
    let mut out = Vec::with_capacity(loads.height());
    for ((teacher_id, lessons), days) in teacher_col
        .into_iter()
        .zip(lesson_col.into_iter())
        .zip(day_col.into_iter())
    {
        let Some(teacher_id) = teacher_id else {
            continue;
        };
        out.push(TeacherLoad {
            teacher_id: teacher_id.to_string(),
            teacher_name: catalog
                .teacher_name(teacher_id)
                .unwrap_or_else(|| teacher_id.to_string()),
            lessons: lessons.unwrap_or(0).max(0) as usize,
            days_taught: days.unwrap_or(0).max(0) as usize,
        });
    }
    out.sort_by(|a, b| {
        b.lessons
            .cmp(&a.lessons)
            .then_with(|| a.teacher_id.cmp(&b.teacher_id))
    });
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use crate::entry::TimeSlot;
    use chrono::Weekday;

    fn entry(id: &str, class: &str, day: Weekday, period: u8, teacher: &str) -> TimetableEntry {
        TimetableEntry::new(id, class, TimeSlot::new(day, period), "MATH", teacher)
    }

    #[test]
    fn fill_rate_ignores_break_and_lunch() {
        let grid = WeekGrid::standard();
        let entries = vec![
            entry("1", "10-A", Weekday::Mon, 1, "T1"),
            entry("2", "10-A", Weekday::Mon, 2, "T1"),
            // Period 9 is the morning break on the standard grid.
            entry("3", "10-A", Weekday::Mon, 9, "T2"),
        ];
        let rates = class_fill_rates(
            &entries,
            &grid,
            &InMemoryCatalog::new(),
            &["10-B".to_string()],
        )
        .unwrap();
        assert_eq!(rates.len(), 2);
        let a = rates.iter().find(|r| r.class_id == "10-A").unwrap();
        assert_eq!(a.lessons, 2);
        assert_eq!(a.teaching_slots, 40);
        assert!((a.fill_rate - 0.05).abs() < 1e-9);
        let b = rates.iter().find(|r| r.class_id == "10-B").unwrap();
        assert_eq!(b.lessons, 0);
        assert_eq!(b.fill_rate, 0.0);
    }

    #[test]
    fn teacher_loads_count_lessons_and_days() {
        let grid = WeekGrid::standard();
        let mut catalog = InMemoryCatalog::new();
        catalog.add_teacher("T1", "Ada Lovelace");
        let entries = vec![
            entry("1", "10-A", Weekday::Mon, 1, "T1"),
            entry("2", "10-B", Weekday::Tue, 1, "T1"),
            entry("3", "10-B", Weekday::Tue, 2, "T1"),
            entry("4", "10-A", Weekday::Wed, 1, "T2"),
        ];
        let loads = teacher_loads(&entries, &grid, &catalog).unwrap();
        assert_eq!(loads[0].teacher_id, "T1");
        assert_eq!(loads[0].teacher_name, "Ada Lovelace");
        assert_eq!(loads[0].lessons, 3);
        assert_eq!(loads[0].days_taught, 2);
        assert_eq!(loads[1].teacher_id, "T2");
        assert_eq!(loads[1].lessons, 1);
    }

    #[test]
    fn empty_timetable_produces_empty_frame() {
        let df = entries_dataframe(&[], &WeekGrid::standard()).unwrap();
        assert_eq!(df.height(), 0);
        assert_eq!(df.width(), 8);
    }
}
