//! Send group and direct messages through a chat-robot gateway.
//!
//! A [`message::MessageVariant`] is encoded into the gateway's wire JSON,
//! delivered by [`dispatch::DingClient`] using the robot's authentication
//! strategy, and the gateway's answer is turned into a
//! [`response::DeliveryResult`] or a typed [`error::SendError`].

pub mod config;
pub mod dispatch;
pub mod error;
pub mod message;
pub mod response;
pub mod robot;
pub mod scheduler;
pub mod sign;

pub use dispatch::{DingClient, DirectMessage};
pub use error::SendError;
pub use message::{AtTarget, LinkMessage, MarkdownMessage, MessageVariant, TextMessage};
pub use response::DeliveryResult;
pub use robot::{DeliveryStrategy, RobotIdentity, RobotKind};
