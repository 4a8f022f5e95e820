use axum::{
    extract::{FromRef, Path},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use deadpool_sqlite::Pool;
use shared::{
    api::{error::ServerError, payloads::DeleteSummary, response_errors::StoreError, Object},
    model::{
        CreateRecoveryCycle, RecoveryCycle, RecoveryCycleWithTasks, UpdateRecoveryCycle,
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
        .route(Object::Cycle.path(), get(list).post(create))
        .route(Object::Cycle.id_path(), get(fetch).put(update).delete(remove))
}

#[instrument]
async fn list(
    DatabaseConnection(conn): DatabaseConnection,
) -> Result<Json<Vec<RecoveryCycle>>, ServerError<StoreError>> {
    let results = conn.interact(|conn| RecoveryCycle::fetch_all(conn)).await??;
    Ok(Json(results))
}

/// The cycle along with its schedule
#[instrument]
async fn fetch(
    DatabaseConnection(conn): DatabaseConnection,
    Path(id): Path<i64>,
) -> Result<Json<RecoveryCycleWithTasks>, ServerError<StoreError>> {
    let result = conn.interact(move |conn| RecoveryCycle::fetch_with_tasks(conn, id)).await??;
    Ok(Json(result))
}

#[instrument]
async fn create(
    DatabaseConnection(conn): DatabaseConnection,
    Json(payload): Json<CreateRecoveryCycle>,
) -> Result<(StatusCode, Json<RecoveryCycle>), ServerError<StoreError>> {
    let new_cycle = payload.validate()?;
    let result = conn.interact(move |conn| RecoveryCycle::create(conn, new_cycle)).await??;
    Ok((StatusCode::CREATED, Json(result)))
}

#[instrument]
async fn update(
    DatabaseConnection(conn): DatabaseConnection,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateRecoveryCycle>,
) -> Result<Json<RecoveryCycle>, ServerError<StoreError>> {
    let result = conn.interact(move |conn| RecoveryCycle::update(conn, id, payload)).await??;
    Ok(Json(result))
}

/// Removes the cycle with its tasks and their completions
#[instrument]
async fn remove(
    DatabaseConnection(conn): DatabaseConnection,
    Path(id): Path<i64>,
) -> Result<Json<DeleteSummary>, ServerError<StoreError>> {
    let result = conn.interact(move |conn| RecoveryCycle::delete(conn, id)).await??;
    Ok(Json(result))
}
