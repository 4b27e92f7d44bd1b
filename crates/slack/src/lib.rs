//! Slack integration - Events API webhook interface
//!
//! This crate provides the Slack side of the picmix relay:
//! - **Payloads** (`payload`) - Events API request bodies (`url_verification`, `event_callback`)
//! - **Signatures** (`signature`) - `v0` request signing checks
//! - **Events** (`events`) - dispatcher plus the mention and message handlers
//! - **Replies** (`reply`) - what gets posted back for each picmix link
//! - **Block Kit** (`blocks`) - message builders (section, image, context)
//! - **Web API** (`client`) - `chat.postMessage`
//!
//! # Getting Started
//!
//! 1. Create a Slack app at https://api.slack.com/apps
//! 2. Subscribe to `message.channels` and `app_mention` bot events
//! 3. Point the Event Subscriptions Request URL at `<public url>/slack/events`
//! 4. Set env vars: `SLACK_BOT_TOKEN`, `SLACK_SIGNING_SECRET`
//!
//! # Architecture
//!
//! ```text
//! Webhook → SignatureVerifier → parse_payload → EventDispatcher → MessageHandler
//!                                                                   ↓
//!                        chat.postMessage ← compose_reply ← ImageScraper (per link)
//! ```

pub mod blocks;
pub mod client;
pub mod events;
pub mod payload;
pub mod reply;
pub mod signature;
