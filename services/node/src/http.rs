//! Status HTTP surface. Grounded on this codebase's `/healthz` +
//! JSON-status endpoint pair, reimplemented over axum (the websocket
//! listener already pulls axum in for link acceptance, so the status
//! surface rides the same router rather than hand-rolling raw TCP).

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use axum::Router;
use serde::Serialize;

use crate::health::{self, ComponentHealth};
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new().route("/healthz", get(healthz)).route("/status", get(status)).with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Serialize)]
struct StatusResponse {
    mesh_id: Option<String>,
    status: mesh_core::model::MeshStatus,
    online: bool,
    node_count: usize,
    online_node_count: usize,
    mcg_term: u64,
    mcg_is_leader: bool,
    health: health::HealthReport,
    metrics: crate::state::MetricsSnapshot,
}

async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mesh_status = state.get_mesh_status().await;
    let health = health::report(&state).await;
    let code = match health.overall {
        ComponentHealth::Healthy | ComponentHealth::Degraded => StatusCode::OK,
        ComponentHealth::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    let body = StatusResponse {
        mesh_id: mesh_status.mesh_id,
        status: mesh_status.status,
        online: mesh_status.online,
        node_count: mesh_status.node_count,
        online_node_count: mesh_status.online_node_count,
        mcg_term: mesh_status.mcg_term,
        mcg_is_leader: mesh_status.mcg_is_leader,
        health,
        metrics: state.metrics.snapshot(),
    };
    (code, Json(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config_from_str;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    #[tokio::test]
    async fn healthz_always_returns_200() {
        let toml = "node_id = \"node-a\"\n[mesh]\nmesh_id = \"m1\"\n";
        let state = AppState::new(load_config_from_str(toml).unwrap());
        let app = router(state);
        let response = app.oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn status_reports_service_unavailable_before_seeding() {
        let toml = "node_id = \"node-a\"\n[mesh]\nmesh_id = \"m1\"\n";
        let state = AppState::new(load_config_from_str(toml).unwrap());
        let app = router(state);
        let response = app.oneshot(Request::builder().uri("/status").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
