pub mod encode;

use serde::{Deserialize, Serialize};

use crate::error::SendError;

/// Who gets "@"-mentioned. `is_at_all` wins over the explicit lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtTarget {
    #[serde(default)]
    pub mobiles: Vec<String>,
    #[serde(default)]
    pub user_ids: Vec<String>,
    #[serde(default)]
    pub is_at_all: bool,
}

impl AtTarget {
    pub fn everyone() -> Self {
        Self {
            is_at_all: true,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextMessage {
    pub content: String,
    #[serde(default)]
    pub at: AtTarget,
}

/// Link cards cannot mention anyone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkMessage {
    pub title: String,
    pub text: String,
    pub message_url: String,
    #[serde(default)]
    pub picture_url: String,
}

/// Markdown cards can only mention by mobile number; `at.user_ids` is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkdownMessage {
    pub title: String,
    pub text: String,
    #[serde(default)]
    pub at: AtTarget,
}

/// One logical message, exactly one kind per send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageVariant {
    Text(TextMessage),
    Link(LinkMessage),
    Markdown(MarkdownMessage),
}

impl MessageVariant {
    pub fn text(content: impl Into<String>, at: AtTarget) -> Self {
        MessageVariant::Text(TextMessage {
            content: content.into(),
            at,
        })
    }

    pub fn msgtype(&self) -> &'static str {
        match self {
            MessageVariant::Text(_) => "text",
            MessageVariant::Link(_) => "link",
            MessageVariant::Markdown(_) => "markdown",
        }
    }
}

/// What to do with a [`RawMessage`] that has no section set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnmatchedPolicy {
    #[default]
    Reject,
    /// Send an empty text message instead. Legacy task records relied on this.
    #[serde(rename = "text")]
    FallbackToText,
}

/// Message as stored in a task definition: three optional sections of which
/// exactly one is expected to be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMessage {
    #[serde(default)]
    pub msg_text: Option<TextMessage>,
    #[serde(default)]
    pub msg_link: Option<LinkMessage>,
    #[serde(default, alias = "msg_mark_down")]
    pub msg_markdown: Option<MarkdownMessage>,
}

impl RawMessage {
    pub fn resolve(&self, policy: UnmatchedPolicy) -> Result<MessageVariant, SendError> {
        let set = [
            self.msg_text.is_some(),
            self.msg_link.is_some(),
            self.msg_markdown.is_some(),
        ]
        .iter()
        .filter(|present| **present)
        .count();
        if set > 1 {
            return Err(SendError::InvalidMessage(format!(
                "expected one of msg_text, msg_link, msg_markdown; found {set}"
            )));
        }

        if let Some(text) = &self.msg_text {
            return Ok(MessageVariant::Text(text.clone()));
        }
        if let Some(link) = &self.msg_link {
            return Ok(MessageVariant::Link(link.clone()));
        }
        if let Some(markdown) = &self.msg_markdown {
            return Ok(MessageVariant::Markdown(markdown.clone()));
        }

        match policy {
            UnmatchedPolicy::Reject => Err(SendError::InvalidMessage(
                "message has no msg_text, msg_link or msg_markdown section".to_string(),
            )),
            UnmatchedPolicy::FallbackToText => Ok(MessageVariant::Text(TextMessage::default())),
        }
    }
}
