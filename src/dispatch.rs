//! Delivery of robot messages to the chat gateway.
//!
//! Group messages go to the webhook endpoint, authenticated either by the
//! bare access token or by token plus HMAC signature depending on the robot.
//! Direct messages go to the batch-send API with the access token in a header.

use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::GatewayConfig;
use crate::error::SendError;
use crate::message::encode::encode_body;
use crate::message::MessageVariant;
use crate::response::{interpret_batch_send, interpret_webhook, DeliveryResult};
use crate::robot::{DeliveryStrategy, RobotIdentity};
use crate::sign::SignedQuery;

const ACCESS_TOKEN_HEADER: &str = "x-acs-dingtalk-access-token";

/// A one-to-one / one-to-many message for the batch-send API.
#[derive(Clone)]
pub struct DirectMessage {
    pub access_token: String,
    pub robot_code: String,
    pub msg_key: String,
    /// Raw content; wrapped as `{"content": ...}` on the wire.
    pub content: String,
    pub user_ids: Vec<String>,
}

impl std::fmt::Debug for DirectMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectMessage")
            .field("robot_code", &self.robot_code)
            .field("msg_key", &self.msg_key)
            .field("content", &self.content)
            .field("user_ids", &self.user_ids)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchSendRequest<'a> {
    msg_param: String,
    msg_key: &'a str,
    robot_code: &'a str,
    user_ids: &'a [String],
}

/// Query pairs for the webhook URL. `signed` is only honored for robots
/// whose strategy is [`DeliveryStrategy::Signed`].
pub fn webhook_query(
    robot: &RobotIdentity,
    signed: Option<SignedQuery>,
) -> Vec<(&'static str, String)> {
    let mut query = vec![("access_token", robot.id.clone())];
    if robot.strategy() == DeliveryStrategy::Signed {
        if let Some(signed) = signed {
            query.push(("timestamp", signed.timestamp_ms.to_string()));
            query.push(("sign", signed.sign));
        }
    }
    query
}

pub struct DingClient {
    webhook_http: reqwest::Client,
    batch_http: reqwest::Client,
    webhook_url: String,
    batch_send_url: String,
}

impl DingClient {
    pub fn new(config: &GatewayConfig) -> Result<Self, SendError> {
        let webhook_http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        if config.batch_send_insecure_skip_verify {
            warn!("TLS certificate verification is disabled for the batch-send endpoint");
        }
        let batch_http = reqwest::Client::builder()
            .timeout(config.timeout())
            .danger_accept_invalid_certs(config.batch_send_insecure_skip_verify)
            .build()?;

        Ok(Self {
            webhook_http,
            batch_http,
            webhook_url: config.webhook_url.clone(),
            batch_send_url: config.batch_send_url.clone(),
        })
    }

    /// Post a message into the robot's group.
    pub async fn send_group_message(
        &self,
        robot: &RobotIdentity,
        message: &MessageVariant,
    ) -> Result<DeliveryResult, SendError> {
        let strategy = robot.strategy();
        let signed = match strategy {
            DeliveryStrategy::Signed => robot.secret().map(SignedQuery::now),
            DeliveryStrategy::Token => None,
        };
        let request = self.webhook_request(robot, message, signed)?;

        debug!(
            "Sending {} message via robot '{}' ({:?} strategy)",
            message.msgtype(),
            robot.name,
            strategy
        );

        let response = self.webhook_http.execute(request).await?;

        let status = response.status().as_u16();
        let text = response.text().await?;
        let result = interpret_webhook(status, &text)?;

        if result.succeeded {
            info!("Delivered {} message via robot '{}'", message.msgtype(), robot.name);
        } else {
            warn!(
                "Robot '{}' rejected message: {} {}",
                robot.name,
                result.error_code.as_deref().unwrap_or_default(),
                result.error_message.as_deref().unwrap_or_default()
            );
        }
        result.into_result()
    }

    fn webhook_request(
        &self,
        robot: &RobotIdentity,
        message: &MessageVariant,
        signed: Option<SignedQuery>,
    ) -> Result<reqwest::Request, SendError> {
        let body = encode_body(message)?;
        let request = self
            .webhook_http
            .post(&self.webhook_url)
            .query(&webhook_query(robot, signed))
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .build()?;
        Ok(request)
    }

    /// Send a direct message to the given users through the batch-send API.
    pub async fn send_direct_message(
        &self,
        message: &DirectMessage,
    ) -> Result<DeliveryResult, SendError> {
        if message.access_token.trim().is_empty() {
            return Err(SendError::InvalidMessage("access token is empty".to_string()));
        }
        if message.user_ids.is_empty() {
            return Err(SendError::InvalidMessage("no target user ids".to_string()));
        }

        let request = BatchSendRequest {
            msg_param: serde_json::json!({ "content": message.content }).to_string(),
            msg_key: &message.msg_key,
            robot_code: &message.robot_code,
            user_ids: &message.user_ids,
        };
        let body = serde_json::to_vec(&request).map_err(SendError::Encoding)?;

        debug!(
            "Batch-sending {} to {} user(s) via robot code '{}'",
            message.msg_key,
            message.user_ids.len(),
            message.robot_code
        );

        let response = self
            .batch_http
            .post(&self.batch_send_url)
            .header(ACCESS_TOKEN_HEADER, &message.access_token)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let text = response.text().await?;
        let result = interpret_batch_send(status, &text)?;

        if result.succeeded {
            info!(
                "Batch send accepted (invalid: {}, flow-controlled: {})",
                result.invalid_user_ids.len(),
                result.flow_controlled_user_ids.len()
            );
        } else {
            warn!(
                "Batch send rejected: {} {}",
                result.error_code.as_deref().unwrap_or_default(),
                result.error_message.as_deref().unwrap_or_default()
            );
        }
        result.into_result()
    }
}
