use axum::{http::HeaderValue, routing::get, Router};
use shared::api::Object;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{warn, Level};

use crate::AppState;

mod completions;
mod cycles;
mod exercises;
mod ping;
mod table;
mod tasks;

pub use ping::*;

/// Every API route, with request tracing and CORS applied
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.args.cors_origin);
    let table_body_limit = state.args.table_body_limit_bytes;

    Router::new()
        .route(Object::Ping.path(), get(ping))
        .merge(exercises::router())
        .merge(cycles::router())
        .merge(tasks::router())
        .merge(completions::router())
        .merge(table::router(table_body_limit))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origin == "*" {
        return layer.allow_origin(Any);
    }

    match HeaderValue::from_str(origin) {
        Ok(origin) => layer.allow_origin(origin),
        Err(e) => {
            warn!(origin, %e, "invalid CORS origin, allowing any origin");
            layer.allow_origin(Any)
        }
    }
}
