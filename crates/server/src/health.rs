use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    events_path: String,
    handler_count: usize,
    started_at: DateTime<Utc>,
}

impl HealthState {
    pub fn new(events_path: impl Into<String>, handler_count: usize) -> Self {
        Self { events_path: events_path.into(), handler_count, started_at: Utc::now() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub events: HealthCheck,
    pub started_at: String,
    pub checked_at: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let events = if state.handler_count == 0 {
        HealthCheck { status: "degraded", detail: "no slack event handlers registered".to_string() }
    } else {
        HealthCheck {
            status: "ready",
            detail: format!(
                "{} slack event handlers listening on {}",
                state.handler_count, state.events_path
            ),
        }
    };
    let ready = events.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "picmix-server runtime initialized".to_string(),
        },
        events,
        started_at: state.started_at.to_rfc3339(),
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

#[cfg(test)]
mod tests {
    use axum::{extract::State, http::StatusCode, Json};

    use crate::health::{health, HealthState};

    #[tokio::test]
    async fn health_returns_ready_with_registered_handlers() {
        let (status, Json(payload)) = health(State(HealthState::new("/slack/events", 2))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.events.status, "ready");
        assert!(payload.events.detail.contains("/slack/events"));
        assert_eq!(payload.service.status, "ready");
    }

    #[tokio::test]
    async fn health_returns_service_unavailable_without_handlers() {
        let (status, Json(payload)) = health(State(HealthState::new("/slack/events", 0))).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.status, "degraded");
        assert_eq!(payload.events.status, "degraded");
        assert_eq!(payload.service.status, "ready");
    }
}
