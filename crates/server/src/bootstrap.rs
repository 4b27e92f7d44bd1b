use std::sync::Arc;

use axum::Router;
use picmix_core::config::AppConfig;
use picmix_core::{HttpImageScraper, ScrapeError};
use picmix_slack::{
    client::{SlackApiError, WebApiClient},
    events::default_dispatcher,
    signature::SignatureVerifier,
};
use thiserror::Error;
use tracing::info;

use crate::{events, health};

pub struct Application {
    pub config: AppConfig,
    pub events: events::EventsState,
}

impl Application {
    pub fn router(&self) -> Router {
        let health_state =
            health::HealthState::new(&self.config.server.events_path, self.events.handler_count());
        events::router(&self.config.server.events_path, self.events.clone())
            .merge(health::router(health_state))
    }

    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.config.server.bind_address, self.config.server.port)
    }
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("image scraper setup failed: {0}")]
    Scraper(#[source] ScrapeError),
    #[error("slack client setup failed: {0}")]
    SlackClient(#[source] SlackApiError),
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );
    let scraper = HttpImageScraper::new(&config.scraper).map_err(BootstrapError::Scraper)?;
    let slack =
        WebApiClient::new(config.slack.api_base_url.as_str(), config.slack.bot_token.clone())
            .map_err(BootstrapError::SlackClient)?;
    info!(
        event_name = "system.bootstrap.clients_ready",
        correlation_id = "bootstrap",
        selector = %config.scraper.image_selector,
        slack_api = %config.slack.api_base_url,
        "scraper and slack client constructed"
    );

    let dispatcher = default_dispatcher(Arc::new(scraper), Arc::new(slack));
    let verifier = SignatureVerifier::new(config.slack.signing_secret.clone());

    Ok(Application { events: events::EventsState::new(verifier, dispatcher), config })
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use picmix_core::config::{AppConfig, ConfigOverrides, LoadOptions};
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::bootstrap::{bootstrap_with_config, Application};

    fn bootstrap(options: LoadOptions) -> Result<Application, String> {
        let config = AppConfig::load(options).map_err(|error| error.to_string())?;
        bootstrap_with_config(config).map_err(|error| error.to_string())
    }

    fn valid_options() -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                slack_bot_token: Some("xoxb-test".to_string()),
                slack_signing_secret: Some("test-secret".to_string()),
                server_port: Some(3999),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[test]
    fn bootstrap_fails_fast_with_wrong_kind_of_bot_token() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                slack_bot_token: Some("xapp-not-a-bot-token".to_string()),
                slack_signing_secret: Some("test-secret".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        });

        let message = result.err().expect("bootstrap should reject the token");
        assert!(message.contains("slack.bot_token"));
    }

    #[test]
    fn bootstrap_registers_mention_and_message_handlers() {
        let app = bootstrap(valid_options()).expect("bootstrap should succeed");

        assert_eq!(app.events.handler_count(), 2);
        assert_eq!(app.listen_address(), "0.0.0.0:3999");
        assert_eq!(app.config.server.request_url(), "http://localhost:3999/slack/events");
    }

    #[tokio::test]
    async fn router_serves_health_and_guards_events_endpoint() {
        let app = bootstrap(valid_options()).expect("bootstrap should succeed");

        let health = app
            .router()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(health.status(), StatusCode::OK);
        let bytes = to_bytes(health.into_body(), usize::MAX).await.expect("body");
        let payload: Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(payload["status"], "ready");

        let unsigned = app
            .router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/slack/events")
                    .body(Body::from(r#"{"type":"url_verification","challenge":"x"}"#))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(unsigned.status(), StatusCode::UNAUTHORIZED);
    }
}
