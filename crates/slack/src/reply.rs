//! Reply Composer.
//!
//! Failure notices are threaded under the triggering message; image shares
//! go to the channel as new top-level messages.

use picmix_core::{ExtractedLink, ScrapeOutcome};
use serde::Serialize;

use crate::blocks::{image_share_message, Block, MessageTemplate};
use crate::payload::InboundMessageEvent;

pub const MENTION_ACK_TEXT: &str = "I'm alive! 👋";

/// Body for `chat.postMessage`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OutboundReply {
    pub channel: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_ts: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<Block>,
}

impl OutboundReply {
    pub fn top_level(channel: impl Into<String>, template: MessageTemplate) -> Self {
        Self {
            channel: channel.into(),
            text: template.fallback_text,
            thread_ts: None,
            blocks: template.blocks,
        }
    }

    pub fn plain(channel: impl Into<String>, text: impl Into<String>) -> Self {
        Self { channel: channel.into(), text: text.into(), thread_ts: None, blocks: Vec::new() }
    }

    pub fn in_thread(mut self, thread_ts: impl Into<String>) -> Self {
        self.thread_ts = Some(thread_ts.into());
        self
    }

    pub fn is_threaded(&self) -> bool {
        self.thread_ts.is_some()
    }
}

pub fn extraction_failed_text(link: &ExtractedLink) -> String {
    format!("❌ Couldn't extract an image from: {link}")
}

pub fn compose_reply(
    event: &InboundMessageEvent,
    link: &ExtractedLink,
    outcome: &ScrapeOutcome,
) -> OutboundReply {
    match outcome {
        ScrapeOutcome::Found(image) => {
            OutboundReply::top_level(&event.channel, image_share_message(image, link))
        }
        ScrapeOutcome::NoImage | ScrapeOutcome::Failed(_) => {
            OutboundReply::plain(&event.channel, extraction_failed_text(link))
                .in_thread(&event.ts)
        }
    }
}

pub fn mention_reply(event: &InboundMessageEvent) -> OutboundReply {
    OutboundReply::plain(&event.channel, MENTION_ACK_TEXT)
}
