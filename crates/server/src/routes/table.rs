use axum::{routing::post, Json, Router};
use shared::{
    api::{
        payloads::{ConvertTableRequest, ConvertTableResponse},
        Object,
    },
    table,
};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{debug, instrument};

pub fn router<S>(body_limit_bytes: usize) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route(Object::Table.path(), post(convert))
        .layer(RequestBodyLimitLayer::new(body_limit_bytes))
}

#[instrument(skip_all)]
async fn convert(Json(request): Json<ConvertTableRequest>) -> Json<ConvertTableResponse> {
    let response = table::convert(&request.text);
    debug!(
        input_bytes = request.text.len(),
        converted = response.converted,
        "converted table text"
    );
    Json(response)
}
