//! HTTP ingress for webhook mode: Telegram pushes updates to POST
//! /webhook and we acknowledge before processing so the push is never
//! held hostage by a slow handler.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::error::BotError;
use crate::runtime::AppState;
use crate::telegram;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .route("/webhook", post(webhook))
        .with_state(state)
}

pub async fn serve(state: Arc<AppState>) -> Result<(), BotError> {
    let addr = format!("{}:{}", state.config.web_host, state.config.web_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Webhook server listening on {addr}");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn index() -> Json<Value> {
    Json(json!({
        "name": "nicebot",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn healthz(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "uptime_seconds": state.uptime_seconds(),
        "pending_reminders": state.reminders.pending_count(),
    }))
}

/// Only a body that does not deserialize as an Update is a client error;
/// everything recognizable is accepted immediately and handled off the
/// request path.
async fn webhook(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<Value>,
) -> (StatusCode, Json<Value>) {
    match serde_json::from_value::<teloxide::types::Update>(payload) {
        Ok(update) => {
            tokio::spawn(telegram::handle_update(state, update));
            (StatusCode::OK, Json(json!({ "ok": true })))
        }
        Err(e) => {
            warn!("Rejected malformed webhook payload: {e}");
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "ok": false, "error": "malformed update" })),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_healthz_reports_uptime() {
        let (state, dir) = crate::runtime::tests::test_state();
        let app = router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/healthz")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert!(body["uptime_seconds"].is_u64());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_index_identifies_the_service() {
        let (state, dir) = crate::runtime::tests::test_state();
        let app = router(state);

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["name"], "nicebot");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_webhook_accepts_a_minimal_update() {
        let (state, dir) = crate::runtime::tests::test_state();
        let app = router(state);

        // An update kind we do not handle; still a valid push.
        let payload = json!({ "update_id": 1 });
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/webhook")
                    .header("content-type", "application/json")
                    .body(Body::from(payload.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["ok"], true);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_webhook_rejects_garbage() {
        let (state, dir) = crate::runtime::tests::test_state();
        let app = router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/webhook")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"not_an_update": []}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
