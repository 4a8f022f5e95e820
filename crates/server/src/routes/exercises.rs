use axum::{
    extract::{FromRef, Path},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use deadpool_sqlite::Pool;
use shared::{
    api::{error::ServerError, payloads::DeleteSummary, response_errors::StoreError, Object},
    model::{CreateExercise, Exercise, UpdateExercise, ValidateModel},
};
use tracing::instrument;

use crate::db::DatabaseConnection;

pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    Pool: FromRef<S>,
{
    Router::new()
        .route(Object::Exercise.path(), get(list).post(create))
        .route(Object::Exercise.id_path(), get(fetch).put(update).delete(remove))
}

#[instrument]
async fn list(
    DatabaseConnection(conn): DatabaseConnection,
) -> Result<Json<Vec<Exercise>>, ServerError<StoreError>> {
    let results = conn.interact(|conn| Exercise::fetch_all(conn)).await??;
    Ok(Json(results))
}

#[instrument]
async fn fetch(
    DatabaseConnection(conn): DatabaseConnection,
    Path(id): Path<i64>,
) -> Result<Json<Exercise>, ServerError<StoreError>> {
    let result = conn.interact(move |conn| Exercise::fetch_by_id(conn, id)).await??;
    Ok(Json(result))
}

#[instrument]
async fn create(
    DatabaseConnection(conn): DatabaseConnection,
    Json(payload): Json<CreateExercise>,
) -> Result<(StatusCode, Json<Exercise>), ServerError<StoreError>> {
    let new_exercise = payload.validate()?;
    let result = conn.interact(move |conn| Exercise::create(conn, new_exercise)).await??;
    Ok((StatusCode::CREATED, Json(result)))
}

#[instrument]
async fn update(
    DatabaseConnection(conn): DatabaseConnection,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateExercise>,
) -> Result<Json<Exercise>, ServerError<StoreError>> {
    let result = conn.interact(move |conn| Exercise::update(conn, id, payload)).await??;
    Ok(Json(result))
}

#[instrument]
async fn remove(
    DatabaseConnection(conn): DatabaseConnection,
    Path(id): Path<i64>,
) -> Result<Json<DeleteSummary>, ServerError<StoreError>> {
    let result = conn.interact(move |conn| Exercise::delete(conn, id)).await??;
    Ok(Json(result))
}
