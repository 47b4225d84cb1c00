//! Readiness probe (spec.md §6: "returns 200 when Store and Bus are
//! reachable").

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
struct HealthBody {
    store: bool,
    bus: bool,
    status: &'static str,
}

/// `GET /health`: 200 only when both `Store` and the invalidation bus answer
/// a reachability probe, 503 otherwise.
pub async fn health(State(state): State<Arc<AppState>>) -> Response {
    let store_ok = state.store.ping().await.is_ok();
    let bus_ok = state.bus.ping().await.is_ok();
    let ok = store_ok && bus_ok;

    let status = if ok { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (
        status,
        Json(HealthBody {
            store: store_ok,
            bus: bus_ok,
            status: if ok { "ok" } else { "degraded" },
        }),
    )
        .into_response()
}
