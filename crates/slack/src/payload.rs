//! Events API request bodies.
//!
//! Slack posts either a one-off `url_verification` handshake or an
//! `event_callback` wrapping the actual event. Only `message` and
//! `app_mention` are decoded; every other event type is carried through as
//! [`SlackEvent::Unsupported`] so the dispatcher can ignore it.

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::events::{SlackEnvelope, SlackEvent};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InboundPayload {
    UrlVerification { challenge: String },
    Event(SlackEnvelope),
    Unsupported { payload_type: String },
}

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("request body is not a valid events api payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// A `message` or `app_mention` event as delivered by Slack.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct InboundMessageEvent {
    pub channel: String,
    pub ts: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub bot_id: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    Subtype,
    BotMessage,
    EmptyText,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Subtype => "subtype",
            Self::BotMessage => "bot_message",
            Self::EmptyText => "empty_text",
        }
    }
}

impl InboundMessageEvent {
    /// Edits, joins, bot posts and text-less messages never reach the pipeline.
    pub fn skip_reason(&self) -> Option<SkipReason> {
        if is_present(self.subtype.as_deref()) {
            return Some(SkipReason::Subtype);
        }
        if is_present(self.bot_id.as_deref()) {
            return Some(SkipReason::BotMessage);
        }
        if !is_present(self.text.as_deref()) {
            return Some(SkipReason::EmptyText);
        }
        None
    }

    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }
}

fn is_present(value: Option<&str>) -> bool {
    value.is_some_and(|value| !value.is_empty())
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RawPayload {
    UrlVerification {
        challenge: String,
    },
    EventCallback {
        #[serde(default)]
        event_id: Option<String>,
        event: serde_json::Value,
    },
    #[serde(other)]
    Other,
}

pub fn parse_payload(body: &[u8]) -> Result<InboundPayload, PayloadError> {
    let raw: RawPayload = serde_json::from_slice(body)?;

    Ok(match raw {
        RawPayload::UrlVerification { challenge } => InboundPayload::UrlVerification { challenge },
        RawPayload::EventCallback { event_id, event } => {
            let envelope_id = event_id.unwrap_or_else(|| "unknown-event-id".to_owned());
            InboundPayload::Event(SlackEnvelope { envelope_id, event: parse_event(event) })
        }
        RawPayload::Other => {
            let payload_type = serde_json::from_slice::<serde_json::Value>(body)
                .ok()
                .and_then(|value| value.get("type").and_then(|t| t.as_str()).map(str::to_owned))
                .unwrap_or_else(|| "unknown".to_owned());
            InboundPayload::Unsupported { payload_type }
        }
    })
}

fn parse_event(event: serde_json::Value) -> SlackEvent {
    let event_type = event.get("type").and_then(|value| value.as_str()).unwrap_or("").to_owned();

    let wrap: fn(InboundMessageEvent) -> SlackEvent = match event_type.as_str() {
        "message" => SlackEvent::Message,
        "app_mention" => SlackEvent::AppMention,
        _ => return SlackEvent::Unsupported { event_type },
    };

    match serde_json::from_value::<InboundMessageEvent>(event) {
        Ok(message) => wrap(message),
        Err(error) => {
            warn!(
                event_name = "ingress.slack.event_decode_failed",
                event_type = %event_type,
                error = %error,
                "could not decode slack event; ignoring it"
            );
            SlackEvent::Unsupported { event_type }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_payload, InboundMessageEvent, InboundPayload, PayloadError, SkipReason};
    use crate::events::SlackEvent;

    fn message(text: Option<&str>) -> InboundMessageEvent {
        InboundMessageEvent {
            channel: "C1".to_owned(),
            ts: "1730000000.0001".to_owned(),
            text: text.map(str::to_owned),
            ..InboundMessageEvent::default()
        }
    }

    #[test]
    fn decodes_url_verification_handshake() {
        let payload = parse_payload(
            br#"{"token":"t","challenge":"3eZbrw1aBm2rZgRNFdxV2595E9CY3gmdALWMmHkvFXO7tYXAYM8P","type":"url_verification"}"#,
        )
        .expect("payload");

        assert_eq!(
            payload,
            InboundPayload::UrlVerification {
                challenge: "3eZbrw1aBm2rZgRNFdxV2595E9CY3gmdALWMmHkvFXO7tYXAYM8P".to_owned()
            }
        );
    }

    #[test]
    fn decodes_message_event_callback() {
        let payload = parse_payload(
            br#"{
                "type": "event_callback",
                "event_id": "Ev123",
                "team_id": "T1",
                "event": {
                    "type": "message",
                    "channel": "C42",
                    "user": "U7",
                    "text": "look https://picmix.com/abc",
                    "ts": "1730000000.1234",
                    "channel_type": "channel"
                }
            }"#,
        )
        .expect("payload");

        let InboundPayload::Event(envelope) = payload else {
            panic!("expected an event envelope");
        };
        assert_eq!(envelope.envelope_id, "Ev123");
        let SlackEvent::Message(event) = envelope.event else {
            panic!("expected a message event");
        };
        assert_eq!(event.channel, "C42");
        assert_eq!(event.ts, "1730000000.1234");
        assert_eq!(event.text(), "look https://picmix.com/abc");
        assert_eq!(event.user.as_deref(), Some("U7"));
        assert_eq!(event.skip_reason(), None);
    }

    #[test]
    fn decodes_app_mention() {
        let payload = parse_payload(
            br#"{"type":"event_callback","event_id":"Ev9","event":{"type":"app_mention","channel":"C1","user":"U1","text":"<@B1> hi","ts":"1.2"}}"#,
        )
        .expect("payload");

        assert!(matches!(
            payload,
            InboundPayload::Event(ref envelope) if matches!(envelope.event, SlackEvent::AppMention(_))
        ));
    }

    #[test]
    fn other_event_types_are_unsupported() {
        let payload = parse_payload(
            br#"{"type":"event_callback","event_id":"Ev2","event":{"type":"reaction_added","reaction":"+1"}}"#,
        )
        .expect("payload");

        let InboundPayload::Event(envelope) = payload else {
            panic!("expected an event envelope");
        };
        assert_eq!(envelope.event, SlackEvent::Unsupported { event_type: "reaction_added".to_owned() });
    }

    #[test]
    fn undecodable_message_is_unsupported_not_an_error() {
        let payload = parse_payload(
            br#"{"type":"event_callback","event_id":"Ev3","event":{"type":"message","text":"no channel"}}"#,
        )
        .expect("payload");

        assert!(matches!(
            payload,
            InboundPayload::Event(ref envelope)
                if envelope.event == SlackEvent::Unsupported { event_type: "message".to_owned() }
        ));
    }

    #[test]
    fn unknown_payload_type_is_reported() {
        let payload = parse_payload(br#"{"type":"app_rate_limited","minute_rate_limited":1}"#)
            .expect("payload");
        assert_eq!(
            payload,
            InboundPayload::Unsupported { payload_type: "app_rate_limited".to_owned() }
        );
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(parse_payload(b"{not json"), Err(PayloadError::Malformed(_))));
    }

    #[test]
    fn skip_policy_covers_subtype_bot_and_empty_text() {
        let mut edited = message(Some("https://picmix.com/a"));
        edited.subtype = Some("message_changed".to_owned());
        assert_eq!(edited.skip_reason(), Some(SkipReason::Subtype));

        let mut bot = message(Some("https://picmix.com/a"));
        bot.bot_id = Some("B1".to_owned());
        assert_eq!(bot.skip_reason(), Some(SkipReason::BotMessage));

        assert_eq!(message(None).skip_reason(), Some(SkipReason::EmptyText));
        assert_eq!(message(Some("")).skip_reason(), Some(SkipReason::EmptyText));
    }

    #[test]
    fn empty_subtype_and_bot_id_do_not_skip() {
        let mut event = message(Some("hello"));
        event.subtype = Some(String::new());
        event.bot_id = Some(String::new());
        assert_eq!(event.skip_reason(), None);
    }
}
