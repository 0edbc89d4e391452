use std::{collections::HashMap, net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::week::{PeriodId, WeekGridConfig, parse_day};
use crate::{
    ClassFillRate, Conflict, ConflictInfo, EntryId, EntryPatch, Mutation, NewEntry,
    PersistenceError, ReplaceOutcome, ReplacePlan, ScheduleTemplate, TeacherLoad, Timetable,
    TimetableEntry, TimetableError,
};

#[derive(Clone)]
pub struct AppState {
    timetable: Arc<RwLock<Timetable>>,
}

impl AppState {
    pub fn new(timetable: Timetable) -> Self {
        Self {
            timetable: Arc::new(RwLock::new(timetable)),
        }
    }

    pub fn with_shared(timetable: Arc<RwLock<Timetable>>) -> Self {
        Self { timetable }
    }

    fn timetable(&self) -> Arc<RwLock<Timetable>> {
        self.timetable.clone()
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

#[derive(Debug)]
enum ApiError {
    NotFound(String),
    Conflict(String),
    Invalid(String),
    Internal(String),
}

impl ApiError {
    fn invalid(message: impl Into<String>) -> Self {
        ApiError::Invalid(message.into())
    }

    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            ApiError::Invalid(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl From<TimetableError> for ApiError {
    fn from(value: TimetableError) -> Self {
        match value {
            TimetableError::InvalidInput(_) => ApiError::Invalid(value.to_string()),
            TimetableError::SlotOccupied { .. } => ApiError::Conflict(value.to_string()),
            TimetableError::NotFound { .. } => ApiError::NotFound(value.to_string()),
        }
    }
}

impl From<PersistenceError> for ApiError {
    fn from(value: PersistenceError) -> Self {
        ApiError::Internal(value.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = self.parts();
        let message = match self {
            ApiError::NotFound(m)
            | ApiError::Conflict(m)
            | ApiError::Invalid(m)
            | ApiError::Internal(m) => m,
        };
        (status, Json(ErrorBody { error, message })).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
struct EntryFilter {
    class: Option<String>,
    teacher: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MovePayload {
    day: String,
    period_id: PeriodId,
}

#[derive(Debug, Default, Deserialize)]
struct ConfirmParams {
    #[serde(default)]
    confirm: bool,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/grid", get(get_grid))
        .route("/entries", get(list_entries).post(assign_entry))
        .route(
            "/entries/:id",
            get(get_entry).put(update_entry).delete(delete_entry),
        )
        .route("/entries/:id/move", post(move_entry))
        .route("/entries/:id/conflicts", get(entry_conflicts))
        .route("/slots/:day/:period", get(slot_entries))
        .route("/conflicts", get(conflict_report))
        .route("/classes/:id/conflicts", get(class_conflicts))
        .route(
            "/classes/:id/template",
            get(get_template).post(save_template).delete(remove_template),
        )
        .route("/classes/:id/template/plan", get(plan_load_template))
        .route("/classes/:id/template/load", post(load_template))
        .route(
            "/classes/:source/copy/:target",
            get(plan_copy).post(copy_schedule),
        )
        .route("/stats/fill-rates", get(fill_rates))
        .route("/stats/teachers", get(teacher_loads))
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, timetable: Timetable) -> std::io::Result<()> {
    let state = AppState::new(timetable);
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "timetable HTTP API listening");
    axum::serve(listener, app).await
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn get_grid(State(state): State<AppState>) -> Json<WeekGridConfig> {
    let timetable = state.timetable();
    let config = timetable.read().grid().to_config();
    Json(config)
}

async fn list_entries(
    State(state): State<AppState>,
    Query(filter): Query<EntryFilter>,
) -> Json<Vec<TimetableEntry>> {
    let timetable = state.timetable();
    let guard = timetable.read();
    let entries = match (&filter.class, &filter.teacher) {
        (Some(class_id), Some(teacher_id)) => guard
            .entries_for_class(class_id)
            .into_iter()
            .filter(|e| &e.teacher_id == teacher_id)
            .collect(),
        (Some(class_id), None) => guard.entries_for_class(class_id),
        (None, Some(teacher_id)) => guard.entries_for_teacher(teacher_id),
        (None, None) => guard.entries().to_vec(),
    };
    Json(entries)
}

async fn assign_entry(
    State(state): State<AppState>,
    Json(request): Json<NewEntry>,
) -> Result<(StatusCode, Json<Mutation>), ApiError> {
    let timetable = state.timetable();
    let mutation = timetable.write().assign_with(request)?;
    Ok((StatusCode::CREATED, Json(mutation)))
}

async fn get_entry(
    State(state): State<AppState>,
    Path(entry_id): Path<String>,
) -> Result<Json<TimetableEntry>, ApiError> {
    let timetable = state.timetable();
    let guard = timetable.read();
    let id = EntryId::from(entry_id);
    match guard.entry(&id) {
        Some(entry) => Ok(Json(entry.clone())),
        None => Err(TimetableError::entry_not_found(&id).into()),
    }
}

async fn update_entry(
    State(state): State<AppState>,
    Path(entry_id): Path<String>,
    Json(patch): Json<EntryPatch>,
) -> Result<Json<Mutation>, ApiError> {
    let timetable = state.timetable();
    let mutation = timetable.write().update(&EntryId::from(entry_id), patch)?;
    Ok(Json(mutation))
}

async fn delete_entry(
    State(state): State<AppState>,
    Path(entry_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let timetable = state.timetable();
    timetable.write().delete(&EntryId::from(entry_id))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn move_entry(
    State(state): State<AppState>,
    Path(entry_id): Path<String>,
    Json(payload): Json<MovePayload>,
) -> Result<Json<Mutation>, ApiError> {
    let day = parse_day(&payload.day)
        .ok_or_else(|| ApiError::invalid(format!("unknown day '{}'", payload.day)))?;
    let timetable = state.timetable();
    let mutation = timetable
        .write()
        .move_entry(&EntryId::from(entry_id), day, payload.period_id)?;
    Ok(Json(mutation))
}

async fn entry_conflicts(
    State(state): State<AppState>,
    Path(entry_id): Path<String>,
) -> Result<Json<ConflictInfo>, ApiError> {
    let timetable = state.timetable();
    let info = timetable.read().conflict_info(&EntryId::from(entry_id))?;
    Ok(Json(info))
}

async fn slot_entries(
    State(state): State<AppState>,
    Path((day, period_id)): Path<(String, PeriodId)>,
) -> Result<Json<Vec<TimetableEntry>>, ApiError> {
    let day = parse_day(&day).ok_or_else(|| ApiError::invalid(format!("unknown day '{day}'")))?;
    let timetable = state.timetable();
    let entries = timetable.read().entries_in_slot(day, period_id);
    Ok(Json(entries))
}

async fn conflict_report(State(state): State<AppState>) -> Json<Vec<Conflict>> {
    let timetable = state.timetable();
    let report = timetable.read().conflict_report();
    Json(report)
}

async fn class_conflicts(
    State(state): State<AppState>,
    Path(class_id): Path<String>,
) -> Json<HashMap<EntryId, ConflictInfo>> {
    let timetable = state.timetable();
    let map = timetable.read().class_conflicts(&class_id);
    Json(map)
}

async fn get_template(
    State(state): State<AppState>,
    Path(class_id): Path<String>,
) -> Result<Json<ScheduleTemplate>, ApiError> {
    let timetable = state.timetable();
    let guard = timetable.read();
    guard
        .template(&class_id)
        .cloned()
        .map(Json)
        .ok_or_else(|| TimetableError::template_not_found(&class_id).into())
}

async fn save_template(
    State(state): State<AppState>,
    Path(class_id): Path<String>,
) -> Result<(StatusCode, Json<ScheduleTemplate>), ApiError> {
    let timetable = state.timetable();
    let template = timetable.write().save_template(&class_id)?;
    Ok((StatusCode::CREATED, Json(template)))
}

async fn remove_template(
    State(state): State<AppState>,
    Path(class_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let timetable = state.timetable();
    timetable.write().remove_template(&class_id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn plan_load_template(
    State(state): State<AppState>,
    Path(class_id): Path<String>,
) -> Result<Json<ReplacePlan>, ApiError> {
    let timetable = state.timetable();
    let plan = timetable.read().plan_load_template(&class_id)?;
    Ok(Json(plan))
}

async fn load_template(
    State(state): State<AppState>,
    Path(class_id): Path<String>,
    Query(params): Query<ConfirmParams>,
) -> Result<Json<ReplaceOutcome>, ApiError> {
    let timetable = state.timetable();
    let mut guard = timetable.write();
    let plan = guard.plan_load_template(&class_id)?;
    require_confirmation(&plan, params.confirm)?;
    let outcome = guard.load_template(&class_id)?;
    Ok(Json(outcome))
}

async fn plan_copy(
    State(state): State<AppState>,
    Path((source, target)): Path<(String, String)>,
) -> Result<Json<ReplacePlan>, ApiError> {
    let timetable = state.timetable();
    let plan = timetable.read().plan_copy(&source, &target)?;
    Ok(Json(plan))
}

async fn copy_schedule(
    State(state): State<AppState>,
    Path((source, target)): Path<(String, String)>,
    Query(params): Query<ConfirmParams>,
) -> Result<Json<ReplaceOutcome>, ApiError> {
    let timetable = state.timetable();
    let mut guard = timetable.write();
    let plan = guard.plan_copy(&source, &target)?;
    require_confirmation(&plan, params.confirm)?;
    let outcome = guard.copy_schedule(&source, &target)?;
    Ok(Json(outcome))
}

async fn fill_rates(State(state): State<AppState>) -> Result<Json<Vec<ClassFillRate>>, ApiError> {
    let timetable = state.timetable();
    let rates = timetable.read().class_fill_rates(&[])?;
    Ok(Json(rates))
}

async fn teacher_loads(State(state): State<AppState>) -> Result<Json<Vec<TeacherLoad>>, ApiError> {
    let timetable = state.timetable();
    let loads = timetable.read().teacher_loads()?;
    Ok(Json(loads))
}

// Overwriting a class that already has lessons needs `?confirm=true`.
fn require_confirmation(plan: &ReplacePlan, confirmed: bool) -> Result<(), ApiError> {
    if plan.is_destructive() && !confirmed {
        return Err(ApiError::Conflict(format!(
            "class {} has {} lesson(s) that would be discarded; repeat with ?confirm=true",
            plan.class_id,
            plan.discarded.len()
        )));
    }
    Ok(())
}
