//! Slack Events API endpoint.
//!
//! Every delivery is verified against the signing secret before anything is
//! parsed. Event callbacks are acknowledged right away and handed to the
//! dispatcher on their own task, so a slow picmix fetch never holds up
//! Slack's three-second delivery window or any other delivery.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use picmix_slack::{
    events::{EventContext, EventDispatcher, SlackEnvelope},
    payload::{parse_payload, InboundPayload},
    signature::{SignatureVerifier, SIGNATURE_HEADER, TIMESTAMP_HEADER},
};
use serde_json::json;
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct EventsState {
    verifier: Arc<SignatureVerifier>,
    dispatcher: Arc<EventDispatcher>,
}

impl EventsState {
    pub fn new(verifier: SignatureVerifier, dispatcher: EventDispatcher) -> Self {
        Self { verifier: Arc::new(verifier), dispatcher: Arc::new(dispatcher) }
    }

    pub fn handler_count(&self) -> usize {
        self.dispatcher.handler_count()
    }
}

pub fn router(events_path: &str, state: EventsState) -> Router {
    Router::new().route(events_path, post(slack_events)).with_state(state)
}

pub async fn slack_events(
    State(state): State<EventsState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let timestamp = header_value(&headers, TIMESTAMP_HEADER);
    let signature = header_value(&headers, SIGNATURE_HEADER);
    if let Err(error) = state.verifier.verify(timestamp, signature, &body) {
        warn!(
            event_name = "ingress.slack.signature_rejected",
            error = %error,
            "rejected slack request with invalid signature"
        );
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let payload = match parse_payload(&body) {
        Ok(payload) => payload,
        Err(error) => {
            warn!(
                event_name = "ingress.slack.payload_rejected",
                error = %error,
                "could not parse slack request body"
            );
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    match payload {
        InboundPayload::UrlVerification { challenge } => {
            info!(event_name = "ingress.slack.url_verification", "answered url verification");
            Json(json!({ "challenge": challenge })).into_response()
        }
        InboundPayload::Event(envelope) => {
            info!(
                event_name = "ingress.slack.envelope_received",
                envelope_id = %envelope.envelope_id,
                event_type = ?envelope.event.event_type(),
                channel = envelope.event.channel().unwrap_or("unknown"),
                "received slack envelope"
            );
            spawn_dispatch(state.dispatcher.clone(), envelope);
            StatusCode::OK.into_response()
        }
        InboundPayload::Unsupported { payload_type } => {
            debug!(
                event_name = "ingress.slack.payload_ignored",
                payload_type = %payload_type,
                "ignoring unsupported slack payload"
            );
            StatusCode::OK.into_response()
        }
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn spawn_dispatch(dispatcher: Arc<EventDispatcher>, envelope: SlackEnvelope) {
    tokio::spawn(async move {
        let context = EventContext { correlation_id: envelope.envelope_id.clone() };
        match dispatcher.dispatch(&envelope, &context).await {
            Ok(result) => debug!(
                event_name = "pipeline.dispatch.completed",
                correlation_id = %context.correlation_id,
                result = ?result,
                "event dispatch completed"
            ),
            Err(error) => warn!(
                event_name = "pipeline.dispatch.failed",
                correlation_id = %context.correlation_id,
                error = %error,
                "event dispatch failed; remaining links in this message were not processed"
            ),
        }
    });
}
