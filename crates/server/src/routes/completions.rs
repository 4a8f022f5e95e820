use axum::{
    extract::{FromRef, Path, Query},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use deadpool_sqlite::Pool;
use shared::{
    api::{error::ServerError, payloads::DeleteSummary, response_errors::StoreError, Object},
    model::{
        Completion, CompletionDetails, CompletionFilter, CompletionStats, CreateCompletion,
        StatsFilter, UpdateCompletion, ValidateModel,
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
        .route(Object::Completion.path(), get(list).post(create))
        .route(Object::CompletionStats.path(), get(stats))
        .route(Object::Completion.id_path(), get(fetch).put(update).delete(remove))
}

#[instrument]
async fn list(
    DatabaseConnection(conn): DatabaseConnection,
    Query(filter): Query<CompletionFilter>,
) -> Result<Json<Vec<CompletionDetails>>, ServerError<StoreError>> {
    let query = filter.validate()?;
    let results = conn.interact(move |conn| Completion::fetch_all(conn, &query)).await??;
    Ok(Json(results))
}

#[instrument]
async fn stats(
    DatabaseConnection(conn): DatabaseConnection,
    Query(filter): Query<StatsFilter>,
) -> Result<Json<CompletionStats>, ServerError<StoreError>> {
    let query = filter.validate()?;
    let result = conn.interact(move |conn| Completion::stats(conn, &query)).await??;
    Ok(Json(result))
}

#[instrument]
async fn fetch(
    DatabaseConnection(conn): DatabaseConnection,
    Path(id): Path<i64>,
) -> Result<Json<CompletionDetails>, ServerError<StoreError>> {
    let result = conn.interact(move |conn| CompletionDetails::fetch_by_id(conn, id)).await??;
    Ok(Json(result))
}

#[instrument]
async fn create(
    DatabaseConnection(conn): DatabaseConnection,
    Json(payload): Json<CreateCompletion>,
) -> Result<(StatusCode, Json<CompletionDetails>), ServerError<StoreError>> {
    let valid = payload.validate()?;
    let result = conn.interact(move |conn| Completion::create(conn, valid)).await??;
    Ok((StatusCode::CREATED, Json(result)))
}

#[instrument]
async fn update(
    DatabaseConnection(conn): DatabaseConnection,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateCompletion>,
) -> Result<Json<CompletionDetails>, ServerError<StoreError>> {
    let result = conn.interact(move |conn| Completion::update(conn, id, payload)).await??;
    Ok(Json(result))
}

#[instrument]
async fn remove(
    DatabaseConnection(conn): DatabaseConnection,
    Path(id): Path<i64>,
) -> Result<Json<DeleteSummary>, ServerError<StoreError>> {
    let result = conn.interact(move |conn| Completion::delete(conn, id)).await??;
    Ok(Json(result))
}
