//! Liveness probe with per-target socket counts.

use std::collections::BTreeMap;

use axum::{Json, Router, extract::State, routing::get};
use lumy_types::Target;
use serde::{Deserialize, Serialize};

use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Sockets attached to each target channel.
    pub targets: BTreeMap<String, usize>,
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let targets = Target::ALL
        .into_iter()
        .map(|target| (target.to_string(), state.transport.socket_count(target)))
        .collect();
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        targets,
    })
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use axum::{body::Body, http::Request};
    use lumy_pipeline::{MockBackend, WorkflowCatalog};
    use tower::ServiceExt;

    use crate::ServerConfig;

    #[tokio::test]
    async fn test_health_lists_every_target() {
        let state = AppState::new(
            Arc::new(MockBackend::default()),
            WorkflowCatalog::new(),
            ServerConfig::new(),
        )
        .unwrap();
        let _attached = state.transport.subscribe(Target::Notes);
        let app = health_routes().with_state(state);

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let health: HealthResponse = serde_json::from_slice(&body).unwrap();

        assert_eq!(health.status, "ok");
        assert_eq!(health.targets.len(), Target::ALL.len());
        assert_eq!(health.targets["notes"], 1);
        assert_eq!(health.targets["workflow"], 0);
    }
}
