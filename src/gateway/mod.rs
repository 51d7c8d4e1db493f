//! HTTP gateway for the moderation pipeline and audit ledger
//!
//! Provides REST endpoints for ingress and operations:
//! - POST /api/v1/moderate                          — process user text
//! - GET  /api/v1/audit/events                      — list events (filterable)
//! - GET  /api/v1/audit/events/{id}                 — single event
//! - GET  /api/v1/audit/chain/{traceId}/validate    — walk one stream
//! - GET  /api/v1/sync/failed                       — exhausted sync failures
//! - POST /api/v1/sync/retry                        — resubmit failed syncs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::Error;
use crate::ledger::event::{EventStatus, EventType, SyncStatus};
use crate::ledger::store::EventFilter;
use crate::pipeline::{ModerationPipeline, ModerationRequest};
use crate::sync::SyncRelay;

/// Shared state for gateway handlers
#[derive(Clone)]
pub struct GatewayState {
    pub pipeline: Arc<ModerationPipeline>,
    /// Absent when remote sync is disabled
    pub relay: Option<Arc<SyncRelay>>,
}

/// Create the gateway router
pub fn gateway_router(state: GatewayState) -> Router {
    Router::new()
        .route("/api/v1/moderate", post(moderate))
        .route("/api/v1/audit/events", get(list_events))
        .route("/api/v1/audit/events/:id", get(get_event))
        .route("/api/v1/audit/chain/:trace_id/validate", get(validate_chain))
        .route("/api/v1/sync/failed", get(failed_syncs))
        .route("/api/v1/sync/retry", post(retry_syncs))
        .with_state(state)
}

/// Bind and serve the gateway until the process is stopped
pub async fn serve(state: GatewayState, host: &str, port: u16) -> crate::Result<()> {
    let router = gateway_router(state).layer(tower_http::trace::TraceLayer::new_for_http());
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Veritrail gateway listening on {}", addr);
    axum::serve(listener, router)
        .await
        .map_err(|e| Error::Internal(format!("gateway server error: {}", e)))
}

// =============================================================================
// Request / Response types
// =============================================================================

/// Query params for listing audit events
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsQuery {
    pub user_id: Option<String>,
    pub event_type: Option<EventType>,
    pub status: Option<EventStatus>,
    pub sync_status: Option<SyncStatus>,
    pub take: Option<usize>,
}

/// Result of a retry pass
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryResponse {
    pub resubmitted: usize,
}

/// API error response
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

/// API error detail
#[derive(Debug, Serialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: "NOT_FOUND".to_string(),
                message: message.into(),
            },
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: "BAD_REQUEST".to_string(),
                message: message.into(),
            },
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: "INTERNAL_ERROR".to_string(),
                message: message.into(),
            },
        }
    }

    fn unavailable(message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: "SYNC_DISABLED".to_string(),
                message: message.into(),
            },
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

async fn moderate(
    State(state): State<GatewayState>,
    Json(request): Json<ModerationRequest>,
) -> impl IntoResponse {
    match state.pipeline.submit(request).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(Error::Validation(message)) => (
            StatusCode::BAD_REQUEST,
            Json(ApiError::bad_request(message)),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Moderation request failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::internal(e.to_string())),
            )
                .into_response()
        }
    }
}

async fn list_events(
    State(state): State<GatewayState>,
    Query(query): Query<EventsQuery>,
) -> impl IntoResponse {
    let filter = EventFilter {
        user_id: query.user_id,
        event_type: query.event_type,
        status: query.status,
        sync_status: query.sync_status,
    };
    let events = state.pipeline.ledger().list(&filter, query.take).await;
    Json(events)
}

async fn get_event(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.pipeline.ledger().get(&id).await {
        Some(event) => (StatusCode::OK, Json(event)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ApiError::not_found(format!("Event {} not found", id))),
        )
            .into_response(),
    }
}

async fn validate_chain(
    State(state): State<GatewayState>,
    Path(trace_id): Path<String>,
) -> impl IntoResponse {
    let report = state.pipeline.ledger().validate_stream(&trace_id).await;
    Json(report)
}

async fn failed_syncs(State(state): State<GatewayState>) -> impl IntoResponse {
    match &state.relay {
        Some(relay) => (StatusCode::OK, Json(relay.exhausted().await)).into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiError::unavailable("remote sync is not enabled")),
        )
            .into_response(),
    }
}

async fn retry_syncs(State(state): State<GatewayState>) -> impl IntoResponse {
    match &state.relay {
        Some(relay) => {
            let resubmitted = relay.retry_failed_syncs().await;
            (StatusCode::OK, Json(RetryResponse { resubmitted })).into_response()
        }
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiError::unavailable("remote sync is not enabled")),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VeritrailConfig;
    use crate::ledger::store::LedgerStore;
    use axum::body::Body;
    use axum::http::Request;
    use tempfile::TempDir;
    use tower::ServiceExt;

    async fn gateway() -> (Router, TempDir) {
        let dir = TempDir::new().unwrap();
        let ledger = Arc::new(LedgerStore::new(dir.path().to_path_buf()).await.unwrap());
        let pipeline = ModerationPipeline::new(
            &VeritrailConfig::default(),
            ledger,
            None,
            None,
            None,
        )
        .await
        .unwrap();
        let router = gateway_router(GatewayState {
            pipeline: Arc::new(pipeline),
            relay: None,
        });
        (router, dir)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_moderate_returns_decision() {
        let (router, _dir) = gateway().await;

        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/moderate")
            .header("content-type", "application/json")
            .body(Body::from(
                r#"{"text": "what a lovely day", "userId": "user-1"}"#,
            ))
            .unwrap();

        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["decision"], "allow");
        assert_eq!(json["method"], "pattern_fallback");
        assert!(json["traceId"].as_str().unwrap().starts_with("trace-"));
    }

    #[tokio::test]
    async fn test_moderate_rejects_empty_text() {
        let (router, _dir) = gateway().await;

        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/moderate")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"text": "  ", "userId": "user-1"}"#))
            .unwrap();

        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_list_and_validate_after_moderation() {
        let (router, _dir) = gateway().await;

        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/moderate")
            .header("content-type", "application/json")
            .body(Body::from(
                r#"{"text": "hello there", "userId": "user-7"}"#,
            ))
            .unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        let trace_id = body_json(response).await["traceId"]
            .as_str()
            .unwrap()
            .to_string();

        // Filterable event listing.
        let request = Request::builder()
            .uri("/api/v1/audit/events?userId=user-7&eventType=model_decision")
            .body(Body::empty())
            .unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        let events = body_json(response).await;
        assert_eq!(events.as_array().unwrap().len(), 1);
        assert_eq!(events[0]["userId"], "user-7");

        // Stream validation.
        let request = Request::builder()
            .uri(format!("/api/v1/audit/chain/{}/validate", trace_id))
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        let report = body_json(response).await;
        assert_eq!(report["isValid"], true);
        assert_eq!(report["length"], 1);
    }

    #[tokio::test]
    async fn test_get_event_not_found() {
        let (router, _dir) = gateway().await;

        let request = Request::builder()
            .uri("/api/v1/audit/events/evt-missing")
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_sync_endpoints_without_relay() {
        let (router, _dir) = gateway().await;

        let request = Request::builder()
            .uri("/api/v1/sync/failed")
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
