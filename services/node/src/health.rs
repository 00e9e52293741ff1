//! Per-component health reporting, aggregated for the status HTTP
//! endpoint. Adapted from this codebase's readiness-vs-liveness split
//! (`/healthz` always 200 while the process runs; readiness reflects
//! local subsystems only) — here readiness is mesh-level rather than
//! single-process, so it asks whether the node has a seeded/joined mesh
//! and a reachable MCG rather than whether a journal file is open.

use std::sync::Arc;

use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentHealth {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub online: ComponentHealth,
    pub mcg: ComponentHealth,
    pub mesh: ComponentHealth,
    pub overall: ComponentHealth,
}

/// Aggregates liveness (is this node online and does it have a mesh
/// identity) with the MCG's ability to reach quorum and the mesh's own
/// reachable-fraction status (§4.5).
pub async fn report(state: &Arc<AppState>) -> HealthReport {
    let online = if state.online.load(std::sync::atomic::Ordering::SeqCst) {
        ComponentHealth::Healthy
    } else {
        ComponentHealth::Unhealthy
    };

    let mcg = {
        let mcg = state.mcg.lock().await;
        if mcg.is_leader() || mcg.role() == mesh_consensus::raft::Role::Follower {
            ComponentHealth::Healthy
        } else {
            ComponentHealth::Degraded
        }
    };

    let mesh = match state.mesh.read().await.as_ref().map(|m| m.status) {
        Some(mesh_core::model::MeshStatus::Active) | None => ComponentHealth::Healthy,
        Some(mesh_core::model::MeshStatus::Degraded) => ComponentHealth::Degraded,
        Some(mesh_core::model::MeshStatus::Critical) => ComponentHealth::Unhealthy,
    };

    let overall = if online == ComponentHealth::Unhealthy || mesh == ComponentHealth::Unhealthy {
        ComponentHealth::Unhealthy
    } else if mcg == ComponentHealth::Degraded || mesh == ComponentHealth::Degraded {
        ComponentHealth::Degraded
    } else {
        ComponentHealth::Healthy
    };

    HealthReport { online, mcg, mesh, overall }
}
