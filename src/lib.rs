pub mod catalog;
pub mod conflict;
pub mod entry;
pub(crate) mod entry_validation;
pub mod error;
#[cfg(feature = "http_api")]
pub mod http_api;
pub mod ids;
pub mod mutator;
pub mod persistence;
pub mod stats;
pub mod store;
pub mod template;
pub mod timetable;
pub mod week;

pub use catalog::{CatalogReference, ClassSection, InMemoryCatalog};
pub use conflict::{Conflict, ConflictDetector, ConflictInfo, ConflictKind, ConflictWarning};
pub use entry::{
    ClassId, CurriculumType, EntryId, EntryPatch, NewEntry, RoomId, SubjectId, TeacherId,
    TimeSlot, TimetableEntry,
};
pub use error::{MissingKind, TimetableError, TimetableResult};
pub use ids::{Clock, FixedClock, IdGenerator, SequentialIds, SystemClock, UuidIds};
pub use mutator::{Mutation, SlotMutator};
#[cfg(feature = "sqlite")]
pub use persistence::sqlite::SqliteKeyValueStore;
pub use persistence::{
    FileKeyValueStore, KeyValueStore, MemoryKeyValueStore, PersistenceError, load_entries_from_csv,
    save_entries_to_csv,
};
pub use stats::{ClassFillRate, TeacherLoad};
pub use store::TimetableStore;
pub use template::{ReplaceOutcome, ReplacePlan, ScheduleTemplate, TemplateManager};
pub use timetable::Timetable;
pub use week::{PeriodDefinition, PeriodId, PeriodKind, WeekGrid, WeekGridConfig, WeekGridError};
