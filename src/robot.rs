use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which kind of robot is posting. The gateway's own records use the
/// string codes "1" and "2", so those are the canonical serialized forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RobotKind {
    #[serde(rename = "1", alias = "enterprise_internal")]
    EnterpriseInternal,
    #[serde(rename = "2", alias = "custom_webhook")]
    CustomWebhook,
}

impl fmt::Display for RobotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RobotKind::EnterpriseInternal => write!(f, "enterprise_internal"),
            RobotKind::CustomWebhook => write!(f, "custom_webhook"),
        }
    }
}

impl FromStr for RobotKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1" | "enterprise_internal" => Ok(RobotKind::EnterpriseInternal),
            "2" | "custom_webhook" => Ok(RobotKind::CustomWebhook),
            other => Err(format!("unknown robot type: {other:?}")),
        }
    }
}

/// How a group message is authenticated on the webhook endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStrategy {
    /// `?access_token=<id>` only.
    Token,
    /// `?access_token=<id>&timestamp=<ms>&sign=<hmac>`.
    Signed,
}

impl DeliveryStrategy {
    pub fn select(kind: RobotKind, secret: Option<&str>) -> Self {
        let has_secret = secret.is_some_and(|s| !s.is_empty());
        match kind {
            RobotKind::EnterpriseInternal => DeliveryStrategy::Token,
            RobotKind::CustomWebhook if has_secret => DeliveryStrategy::Signed,
            RobotKind::CustomWebhook => DeliveryStrategy::Token,
        }
    }
}

/// The robot a message goes out as. Read-only input to the dispatcher.
#[derive(Clone, Deserialize, Serialize)]
pub struct RobotIdentity {
    /// Access token of the robot's webhook.
    pub id: String,
    #[serde(rename = "type")]
    pub kind: RobotKind,
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default)]
    pub name: String,
}

impl RobotIdentity {
    pub fn new(id: impl Into<String>, kind: RobotKind) -> Self {
        Self {
            id: id.into(),
            kind,
            secret: None,
            name: String::new(),
        }
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// The secret, treating an empty string as absent.
    pub fn secret(&self) -> Option<&str> {
        self.secret.as_deref().filter(|s| !s.is_empty())
    }

    pub fn strategy(&self) -> DeliveryStrategy {
        DeliveryStrategy::select(self.kind, self.secret())
    }
}

// Keeps the secret out of logs.
impl fmt::Debug for RobotIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RobotIdentity")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("secret", &self.secret().map(|_| "<redacted>"))
            .field("name", &self.name)
            .finish()
    }
}
