use chrono::Weekday;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::catalog::CatalogReference;
use crate::conflict::{Conflict, ConflictDetector, ConflictInfo, ConflictWarning};
use crate::entry::{ClassId, EntryId, EntryPatch, NewEntry, TimeSlot, TimetableEntry};
use crate::entry_validation;
use crate::error::{TimetableError, TimetableResult};
use crate::ids::{Clock, IdGenerator, SystemClock, UuidIds};
use crate::mutator::{Mutation, SlotMutator};
use crate::persistence::{self, KeyValueStore, PersistenceError, PersistenceResult};
use crate::stats::{self, ClassFillRate, TeacherLoad};
use crate::store::TimetableStore;
use crate::template::{self, ReplaceOutcome, ReplacePlan, ScheduleTemplate, TemplateManager};
use crate::week::{PeriodId, WeekGrid};

type SharedCatalog = Box<dyn CatalogReference + Send + Sync>;
type SharedIds = Box<dyn IdGenerator + Send + Sync>;
type SharedClock = Box<dyn Clock + Send + Sync>;
type SharedBackend = Box<dyn KeyValueStore + Send + Sync>;

/// The school's weekly timetable: live lessons, saved templates and the
/// collaborators they depend on.
///
/// When a persistence backend is attached, every successful change is
/// written through to it. A failed write is logged and does not undo the
/// change; call [`save`](Self::save) to surface the error. Two editors
/// sharing a backend overwrite each other (last write wins); compare
/// [`revision`](Self::revision) values to spot that.
pub struct Timetable {
    store: TimetableStore,
    templates: TemplateManager,
    catalog: SharedCatalog,
    grid: WeekGrid,
    ids: SharedIds,
    clock: SharedClock,
    backend: Option<SharedBackend>,
}

impl Timetable {
    pub fn new(catalog: impl CatalogReference + Send + Sync + 'static) -> Self {
        Self {
            store: TimetableStore::new(),
            templates: TemplateManager::new(),
            catalog: Box::new(catalog),
            grid: WeekGrid::default(),
            ids: Box::new(UuidIds),
            clock: Box::new(SystemClock),
            backend: None,
        }
    }

    pub fn with_grid(mut self, grid: WeekGrid) -> Self {
        self.grid = grid;
        self
    }

    pub fn with_id_generator(mut self, ids: impl IdGenerator + Send + Sync + 'static) -> Self {
        self.ids = Box::new(ids);
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Attaches a backend and loads whatever it already holds. Later
    /// changes are written through to it.
    pub fn with_backend(
        mut self,
        backend: impl KeyValueStore + Send + Sync + 'static,
    ) -> PersistenceResult<Self> {
        let (store, templates) = self.read_snapshot(&backend)?;
        if let Some(store) = store {
            self.store = store;
        }
        self.templates = templates;
        self.backend = Some(Box::new(backend));
        Ok(self)
    }

    /// Replaces lessons and templates with the snapshot held in `kv`
    /// without attaching it. A snapshot without entries leaves the week
    /// empty. On error nothing changes.
    pub fn load_from(&mut self, kv: &dyn KeyValueStore) -> PersistenceResult<()> {
        let (store, templates) = self.read_snapshot(kv)?;
        self.store = store.unwrap_or_default();
        self.templates = templates;
        self.autosave_entries();
        self.autosave_templates();
        Ok(())
    }

    fn read_snapshot(
        &self,
        kv: &dyn KeyValueStore,
    ) -> PersistenceResult<(Option<TimetableStore>, TemplateManager)> {
        let store = match persistence::load_entries(kv)? {
            Some((entries, revision)) => {
                check_fits_grid(&entries, &self.grid)
                    .map_err(|err| PersistenceError::InvalidData(err.to_string()))?;
                debug!(entries = entries.len(), revision, "restored timetable entries");
                Some(
                    TimetableStore::from_entries(entries)
                        .map_err(|err| PersistenceError::InvalidData(err.to_string()))?
                        .at_revision(revision),
                )
            }
            None => None,
        };
        let templates = TemplateManager::from_templates(persistence::load_templates(kv)?);
        Ok((store, templates))
    }

    /// Swaps the id source, e.g. to continue a sequence after loading.
    pub fn set_id_generator(&mut self, ids: impl IdGenerator + Send + Sync + 'static) {
        self.ids = Box::new(ids);
    }

    pub fn grid(&self) -> &WeekGrid {
        &self.grid
    }

    /// Switches to another week grid. Fails, leaving the old grid in place,
    /// if a stored lesson would fall outside the new one.
    pub fn set_grid(&mut self, grid: WeekGrid) -> TimetableResult<()> {
        check_fits_grid(self.store.get_all(), &grid)?;
        self.grid = grid;
        Ok(())
    }

    pub fn catalog(&self) -> &dyn CatalogReference {
        &*self.catalog
    }

    pub fn store(&self) -> &TimetableStore {
        &self.store
    }

    pub fn revision(&self) -> u64 {
        self.store.revision()
    }

    // Queries

    pub fn entries(&self) -> &[TimetableEntry] {
        self.store.get_all()
    }

    pub fn entry(&self, id: &EntryId) -> Option<&TimetableEntry> {
        self.store.get(id)
    }

    pub fn entries_for_class(&self, class_id: &str) -> Vec<TimetableEntry> {
        self.store.get_by_class(class_id)
    }

    pub fn entries_for_teacher(&self, teacher_id: &str) -> Vec<TimetableEntry> {
        self.store.get_by_teacher(teacher_id)
    }

    pub fn entries_in_slot(&self, day: Weekday, period_id: PeriodId) -> Vec<TimetableEntry> {
        self.store.get_by_slot(day, period_id)
    }

    pub fn detector(&self) -> ConflictDetector<'_> {
        ConflictDetector::new(&self.store, &*self.catalog)
    }

    pub fn teacher_conflict(
        &self,
        teacher_id: &str,
        day: Weekday,
        period_id: PeriodId,
        exclude: Option<&EntryId>,
    ) -> Option<ClassId> {
        self.detector()
            .teacher_conflict(teacher_id, day, period_id, exclude)
    }

    pub fn room_conflict(
        &self,
        owner_class_id: &str,
        day: Weekday,
        period_id: PeriodId,
        exclude: Option<&EntryId>,
    ) -> Option<ClassId> {
        self.detector()
            .room_conflict(owner_class_id, day, period_id, exclude)
    }

    pub fn conflict_info(&self, id: &EntryId) -> TimetableResult<ConflictInfo> {
        let entry = self
            .store
            .get(id)
            .ok_or_else(|| TimetableError::entry_not_found(id))?;
        Ok(self.detector().conflict_info(entry))
    }

    /// Conflict info for every lesson of a class, keyed by entry id.
    pub fn class_conflicts(&self, class_id: &str) -> HashMap<EntryId, ConflictInfo> {
        let entries = self.store.get_by_class(class_id);
        self.detector().conflict_map(entries.iter())
    }

    pub fn conflict_report(&self) -> Vec<Conflict> {
        self.detector().report()
    }

    /// Warnings an assignment or move would raise, without applying it.
    pub fn preview(
        &self,
        class_id: &str,
        slot: TimeSlot,
        teacher_id: &str,
        exclude: Option<&EntryId>,
    ) -> Vec<ConflictWarning> {
        self.detector()
            .warnings_for(class_id, slot, teacher_id, exclude)
    }

    // Mutations

    pub fn assign(
        &mut self,
        class_id: &str,
        day: Weekday,
        period_id: PeriodId,
        subject_id: &str,
        teacher_id: &str,
    ) -> TimetableResult<Mutation> {
        let mutation = self
            .mutator()
            .assign(class_id, day, period_id, subject_id, teacher_id)?;
        self.autosave_entries();
        Ok(mutation)
    }

    pub fn assign_with(&mut self, request: NewEntry) -> TimetableResult<Mutation> {
        let mutation = self.mutator().assign_with(request)?;
        self.autosave_entries();
        Ok(mutation)
    }

    pub fn move_entry(
        &mut self,
        entry_id: &EntryId,
        day: Weekday,
        period_id: PeriodId,
    ) -> TimetableResult<Mutation> {
        let mutation = self.mutator().move_entry(entry_id, day, period_id)?;
        self.autosave_entries();
        Ok(mutation)
    }

    pub fn update(&mut self, entry_id: &EntryId, patch: EntryPatch) -> TimetableResult<Mutation> {
        let mutation = self.mutator().update(entry_id, patch)?;
        self.autosave_entries();
        Ok(mutation)
    }

    pub fn delete(&mut self, entry_id: &EntryId) -> TimetableResult<TimetableEntry> {
        let removed = self.mutator().delete(entry_id)?;
        self.autosave_entries();
        Ok(removed)
    }

    /// Replaces the whole timetable, e.g. after a CSV import. Every entry
    /// must sit on the current grid.
    pub fn replace_all(&mut self, entries: Vec<TimetableEntry>) -> TimetableResult<()> {
        check_fits_grid(&entries, &self.grid)?;
        let revision = self.store.revision() + 1;
        self.store = TimetableStore::from_entries(entries)?.at_revision(revision);
        self.autosave_entries();
        Ok(())
    }

    // Templates

    pub fn templates(&self) -> impl Iterator<Item = &ScheduleTemplate> {
        self.templates.templates()
    }

    pub fn template(&self, class_id: &str) -> Option<&ScheduleTemplate> {
        self.templates.get(class_id)
    }

    pub fn save_template(&mut self, class_id: &str) -> TimetableResult<ScheduleTemplate> {
        let template = self.templates.save_template(
            &self.store,
            &*self.catalog,
            &mut *self.ids,
            &*self.clock,
            class_id,
        )?;
        self.autosave_templates();
        Ok(template)
    }

    pub fn remove_template(&mut self, class_id: &str) -> TimetableResult<ScheduleTemplate> {
        let removed = self
            .templates
            .remove(class_id)
            .ok_or_else(|| TimetableError::template_not_found(class_id))?;
        self.autosave_templates();
        Ok(removed)
    }

    pub fn plan_load_template(&self, class_id: &str) -> TimetableResult<ReplacePlan> {
        self.templates.plan_load(&self.store, class_id)
    }

    /// Fails with `InvalidInput` if a templated lesson no longer fits the
    /// current grid; the class keeps its week in that case.
    pub fn load_template(&mut self, class_id: &str) -> TimetableResult<ReplaceOutcome> {
        if let Some(template) = self.templates.get(class_id) {
            check_fits_grid(&template.entries, &self.grid)?;
        }
        let outcome = self
            .templates
            .load_template(&mut self.store, &mut *self.ids, class_id)?;
        self.autosave_entries();
        Ok(outcome)
    }

    pub fn plan_copy(&self, source_class_id: &str, target_class_id: &str) -> TimetableResult<ReplacePlan> {
        template::plan_copy(&self.store, source_class_id, target_class_id)
    }

    /// Overwrites the target class with the source's week. Use
    /// [`plan_copy`](Self::plan_copy) first to see what will be discarded.
    pub fn copy_schedule(
        &mut self,
        source_class_id: &str,
        target_class_id: &str,
    ) -> TimetableResult<ReplaceOutcome> {
        let outcome = template::copy_schedule(
            &mut self.store,
            &mut *self.ids,
            source_class_id,
            target_class_id,
        )?;
        self.autosave_entries();
        Ok(outcome)
    }

    // Statistics

    pub fn class_fill_rates(&self, include: &[ClassId]) -> PersistenceResult<Vec<ClassFillRate>> {
        Ok(stats::class_fill_rates(
            self.store.get_all(),
            &self.grid,
            &*self.catalog,
            include,
        )?)
    }

    pub fn teacher_loads(&self) -> PersistenceResult<Vec<TeacherLoad>> {
        Ok(stats::teacher_loads(
            self.store.get_all(),
            &self.grid,
            &*self.catalog,
        )?)
    }

    // Persistence

    /// Writes entries and templates to the attached backend, if any.
    pub fn save(&self) -> PersistenceResult<()> {
        if let Some(backend) = &self.backend {
            self.save_to(&**backend)?;
        }
        Ok(())
    }

    pub fn save_to(&self, kv: &dyn KeyValueStore) -> PersistenceResult<()> {
        persistence::save_entries(kv, self.store.get_all(), self.store.revision())?;
        persistence::save_templates(kv, self.templates.templates())?;
        Ok(())
    }

    fn mutator(&mut self) -> SlotMutator<'_> {
        SlotMutator::new(&mut self.store, &*self.catalog, &self.grid, &mut *self.ids)
    }

    fn autosave_entries(&self) {
        if let Some(backend) = &self.backend {
            if let Err(err) =
                persistence::save_entries(&**backend, self.store.get_all(), self.store.revision())
            {
                warn!(error = %err, "failed to persist timetable entries");
            }
        }
    }

    fn autosave_templates(&self) {
        if let Some(backend) = &self.backend {
            if let Err(err) = persistence::save_templates(&**backend, self.templates.templates()) {
                warn!(error = %err, "failed to persist schedule templates");
            }
        }
    }
}

fn check_fits_grid(entries: &[TimetableEntry], grid: &WeekGrid) -> TimetableResult<()> {
    for entry in entries {
        entry_validation::validate_entry_on_grid(entry, grid)
            .map_err(|err| TimetableError::invalid(err.to_string()))?;
    }
    Ok(())
}
