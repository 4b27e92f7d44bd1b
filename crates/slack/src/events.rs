use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use picmix_core::{extract_links, ImageScraper};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    client::{SlackApi, SlackApiError},
    payload::{InboundMessageEvent, SkipReason},
    reply::{compose_reply, mention_reply},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlackEnvelope {
    pub envelope_id: String,
    pub event: SlackEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlackEvent {
    AppMention(InboundMessageEvent),
    Message(InboundMessageEvent),
    Unsupported { event_type: String },
}

impl SlackEvent {
    pub fn event_type(&self) -> SlackEventType {
        match self {
            Self::AppMention(_) => SlackEventType::AppMention,
            Self::Message(_) => SlackEventType::Message,
            Self::Unsupported { .. } => SlackEventType::Unsupported,
        }
    }

    pub fn channel(&self) -> Option<&str> {
        match self {
            Self::AppMention(event) | Self::Message(event) => Some(event.channel.as_str()),
            Self::Unsupported { .. } => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SlackEventType {
    AppMention,
    Message,
    Unsupported,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    Replied { replies: usize },
    Skipped(SkipReason),
    Processed,
    Ignored,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EventHandlerError {
    #[error(transparent)]
    SlackApi(#[from] SlackApiError),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> SlackEventType;
    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<SlackEventType, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.event_type(), Arc::new(handler));
    }

    pub async fn dispatch(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let Some(handler) = self.handlers.get(&envelope.event.event_type()) else {
            return Ok(HandlerResult::Ignored);
        };

        handler.handle(envelope, ctx).await.map_err(DispatchError::from)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

/// Mention and message handlers sharing one scraper and one Slack client.
pub fn default_dispatcher(
    scraper: Arc<dyn ImageScraper>,
    slack: Arc<dyn SlackApi>,
) -> EventDispatcher {
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(MentionHandler::new(slack.clone()));
    dispatcher.register(MessageHandler::new(scraper, slack));
    dispatcher
}

pub struct MentionHandler {
    slack: Arc<dyn SlackApi>,
}

impl MentionHandler {
    pub fn new(slack: Arc<dyn SlackApi>) -> Self {
        Self { slack }
    }
}

#[async_trait]
impl EventHandler for MentionHandler {
    fn event_type(&self) -> SlackEventType {
        SlackEventType::AppMention
    }

    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        _ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SlackEvent::AppMention(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        self.slack.post_message(&mention_reply(event)).await?;
        Ok(HandlerResult::Replied { replies: 1 })
    }
}

/// Scrapes every picmix link in a channel message and answers once per link.
///
/// Links are handled strictly one after another so replies land in the order
/// the links were written. A failed post stops the remaining links.
pub struct MessageHandler {
    scraper: Arc<dyn ImageScraper>,
    slack: Arc<dyn SlackApi>,
}

impl MessageHandler {
    pub fn new(scraper: Arc<dyn ImageScraper>, slack: Arc<dyn SlackApi>) -> Self {
        Self { scraper, slack }
    }
}

#[async_trait]
impl EventHandler for MessageHandler {
    fn event_type(&self) -> SlackEventType {
        SlackEventType::Message
    }

    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SlackEvent::Message(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        if let Some(reason) = event.skip_reason() {
            debug!(
                event_name = "pipeline.message.skipped",
                correlation_id = %ctx.correlation_id,
                channel = %event.channel,
                reason = reason.as_str(),
                "skipping bot message or subtype"
            );
            return Ok(HandlerResult::Skipped(reason));
        }

        let links = extract_links(event.text());
        debug!(
            event_name = "pipeline.message.links_extracted",
            correlation_id = %ctx.correlation_id,
            channel = %event.channel,
            link_count = links.len(),
            "scanned message for picmix links"
        );
        if links.is_empty() {
            return Ok(HandlerResult::Processed);
        }

        for link in &links {
            info!(
                event_name = "pipeline.link.processing",
                correlation_id = %ctx.correlation_id,
                channel = %event.channel,
                url = %link,
                "processing picmix link"
            );
            let outcome = self.scraper.scrape(link).await;
            let reply = compose_reply(event, link, &outcome);
            self.slack.post_message(&reply).await?;
            info!(
                event_name = "pipeline.link.replied",
                correlation_id = %ctx.correlation_id,
                channel = %event.channel,
                url = %link,
                outcome = outcome.label(),
                threaded = reply.is_threaded(),
                "posted reply for picmix link"
            );
        }

        Ok(HandlerResult::Replied { replies: links.len() })
    }
}
