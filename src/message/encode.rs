//! Gateway wire format for group (webhook) messages.

use serde::{Deserialize, Serialize};

use super::{AtTarget, LinkMessage, MessageVariant};
use crate::error::SendError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "msgtype", rename_all = "lowercase")]
pub enum WirePayload {
    Text { text: WireText, at: WireAt },
    Link { link: WireLink },
    Markdown { markdown: WireMarkdown, at: WireAt },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireText {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireLink {
    pub title: String,
    pub text: String,
    pub message_url: String,
    pub pic_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMarkdown {
    pub title: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireAt {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at_mobiles: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at_user_ids: Option<Vec<String>>,
    pub is_at_all: bool,
}

impl WireAt {
    fn from_target(at: &AtTarget, with_user_ids: bool) -> Self {
        if at.is_at_all {
            return Self {
                at_mobiles: None,
                at_user_ids: None,
                is_at_all: true,
            };
        }
        Self {
            at_mobiles: Some(at.mobiles.clone()),
            at_user_ids: with_user_ids.then(|| at.user_ids.clone()),
            is_at_all: false,
        }
    }
}

impl From<&LinkMessage> for WireLink {
    fn from(link: &LinkMessage) -> Self {
        Self {
            title: link.title.clone(),
            text: link.text.clone(),
            message_url: link.message_url.clone(),
            pic_url: link.picture_url.clone(),
        }
    }
}

impl From<WireLink> for LinkMessage {
    fn from(link: WireLink) -> Self {
        Self {
            title: link.title,
            text: link.text,
            message_url: link.message_url,
            picture_url: link.pic_url,
        }
    }
}

/// Map a message onto the wire shape. Pure, no I/O.
pub fn encode_payload(message: &MessageVariant) -> WirePayload {
    match message {
        MessageVariant::Text(text) => WirePayload::Text {
            text: WireText {
                content: text.content.clone(),
            },
            at: WireAt::from_target(&text.at, true),
        },
        MessageVariant::Link(link) => WirePayload::Link { link: link.into() },
        MessageVariant::Markdown(markdown) => WirePayload::Markdown {
            markdown: WireMarkdown {
                title: markdown.title.clone(),
                text: markdown.text.clone(),
            },
            at: WireAt::from_target(&markdown.at, false),
        },
    }
}

/// Serialized request body for the webhook endpoint.
pub fn encode_body(message: &MessageVariant) -> Result<Vec<u8>, SendError> {
    serde_json::to_vec(&encode_payload(message)).map_err(SendError::Encoding)
}
