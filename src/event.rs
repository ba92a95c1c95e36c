//! Inbound webhook payload types.
//!
//! One webhook delivery from the LINE platform carries a batch of events.
//! Only `message` events with `text` or `image` messages are acted on;
//! everything else deserializes into catch-all variants so an unknown event
//! kind never fails the whole batch.

use serde::Deserialize;

/// One webhook delivery: `{ "events": [...] }`.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookDelivery {
    #[serde(default)]
    pub events: Vec<InboundEvent>,
}

/// A single platform event within a delivery.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    #[serde(default)]
    pub message: Option<InboundMessage>,
    /// One-shot token for replying to this event.
    #[serde(default)]
    pub reply_token: Option<String>,
    #[serde(default)]
    pub source: Option<EventSource>,
    #[serde(default)]
    pub delivery_context: Option<DeliveryContext>,
}

impl InboundEvent {
    /// Whether the platform flagged this event as a redelivery.
    pub fn is_redelivery(&self) -> bool {
        self.delivery_context
            .as_ref()
            .is_some_and(|ctx| ctx.is_redelivery)
    }

    pub fn sender_id(&self) -> Option<&str> {
        self.source.as_ref().and_then(|s| s.user_id.as_deref())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Message,
    #[serde(other)]
    Other,
}

/// The message attached to a `message` event.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessage {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    #[serde(default)]
    pub text: Option<String>,
    /// Set when this message quotes an earlier one.
    #[serde(default)]
    pub quoted_message_id: Option<String>,
    /// Text of the quoted message, when the platform surfaces it.
    #[serde(default)]
    pub quoted_message_text: Option<String>,
}

impl InboundMessage {
    /// Whether this message quotes a prior message in any form.
    pub fn has_quote(&self) -> bool {
        self.quoted_message_id.is_some() || self.quoted_message_text.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Image,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSource {
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryContext {
    #[serde(default)]
    pub is_redelivery: bool,
}
