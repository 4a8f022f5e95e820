use axum::{
    extract::{FromRef, Path, Query},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use deadpool_sqlite::Pool;
use shared::{
    api::{error::ServerError, payloads::DeleteSummary, response_errors::StoreError, Object},
    model::{
        Completion, CompletionDetails, CreateTrainingTask, RecordCompletion, TaskFilter,
        TrainingTask, TrainingTaskDetails, TrainingTaskWithCompletions, UpdateTrainingTask,
        ValidateModel,
    },
};
use tracing::instrument;

use crate::db::DatabaseConnection;

pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    Pool: FromRef<S>,
{
    Router::new()
        .route(Object::Task.path(), get(list).post(create))
        .route(Object::Task.id_path(), get(fetch).put(update).delete(remove))
        .route(Object::TaskComplete.path(), post(complete))
}

/// Tasks scheduled for a date and/or weekday, optionally within one cycle
#[instrument]
async fn list(
    DatabaseConnection(conn): DatabaseConnection,
    Query(filter): Query<TaskFilter>,
) -> Result<Json<Vec<TrainingTaskDetails>>, ServerError<StoreError>> {
    let query = filter.validate()?;
    let results = conn.interact(move |conn| TrainingTask::fetch_all(conn, &query)).await??;
    Ok(Json(results))
}

#[instrument]
async fn fetch(
    DatabaseConnection(conn): DatabaseConnection,
    Path(id): Path<i64>,
) -> Result<Json<TrainingTaskWithCompletions>, ServerError<StoreError>> {
    let result = conn.interact(move |conn| TrainingTask::fetch_with_completions(conn, id)).await??;
    Ok(Json(result))
}

#[instrument]
async fn create(
    DatabaseConnection(conn): DatabaseConnection,
    Json(payload): Json<CreateTrainingTask>,
) -> Result<(StatusCode, Json<TrainingTaskDetails>), ServerError<StoreError>> {
    let new_task = payload.validate()?;
    let result = conn.interact(move |conn| TrainingTask::create(conn, new_task)).await??;
    Ok((StatusCode::CREATED, Json(result)))
}

#[instrument]
async fn update(
    DatabaseConnection(conn): DatabaseConnection,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateTrainingTask>,
) -> Result<Json<TrainingTaskDetails>, ServerError<StoreError>> {
    let result = conn.interact(move |conn| TrainingTask::update(conn, id, payload)).await??;
    Ok(Json(result))
}

#[instrument]
async fn remove(
    DatabaseConnection(conn): DatabaseConnection,
    Path(id): Path<i64>,
) -> Result<Json<DeleteSummary>, ServerError<StoreError>> {
    let result = conn.interact(move |conn| TrainingTask::delete(conn, id)).await??;
    Ok(Json(result))
}

/// Marks the task done. The body is optional, an absent or unreadable body
/// records a completion with no sets or notes at the current time
#[instrument]
async fn complete(
    DatabaseConnection(conn): DatabaseConnection,
    Path(id): Path<i64>,
    payload: Option<Json<RecordCompletion>>,
) -> Result<(StatusCode, Json<CompletionDetails>), ServerError<StoreError>> {
    let Json(record) = payload.unwrap_or_default();
    let valid = record.for_task(id).validate()?;
    let result = conn.interact(move |conn| Completion::record(conn, valid)).await??;
    Ok((StatusCode::CREATED, Json(result)))
}
