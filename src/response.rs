use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{truncate_body, SendError};

/// Answer from the group webhook endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookResponse {
    pub errcode: i64,
    #[serde(default)]
    pub errmsg: String,
}

/// Answer from the batch-send endpoint. `code` is only present on failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSendResponse {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub process_query_key: Option<String>,
    #[serde(default)]
    pub invalid_staff_id_list: Vec<String>,
    #[serde(default)]
    pub flow_controlled_staff_id_list: Vec<String>,
}

/// Outcome of one send as reported by the gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryResult {
    pub succeeded: bool,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    /// Batch-send only: key for querying per-recipient read status.
    pub process_query_key: Option<String>,
    pub invalid_user_ids: Vec<String>,
    pub flow_controlled_user_ids: Vec<String>,
}

impl DeliveryResult {
    pub fn success() -> Self {
        Self {
            succeeded: true,
            ..Self::default()
        }
    }

    pub fn failure(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            error_code: Some(code.into()),
            error_message: Some(message.into()),
            ..Self::default()
        }
    }

    /// Turn a gateway-reported failure into [`SendError::Gateway`].
    pub fn into_result(self) -> Result<Self, SendError> {
        if self.succeeded {
            return Ok(self);
        }
        Err(SendError::Gateway {
            code: self.error_code.unwrap_or_default(),
            message: self.error_message.unwrap_or_default(),
        })
    }
}

impl From<WebhookResponse> for DeliveryResult {
    fn from(response: WebhookResponse) -> Self {
        if response.errcode == 0 {
            DeliveryResult::success()
        } else {
            DeliveryResult::failure(response.errcode.to_string(), response.errmsg)
        }
    }
}

impl From<BatchSendResponse> for DeliveryResult {
    fn from(response: BatchSendResponse) -> Self {
        let mut result = match response.code.filter(|code| !code.is_empty()) {
            Some(code) => DeliveryResult::failure(code, response.message.unwrap_or_default()),
            None => DeliveryResult::success(),
        };
        result.process_query_key = response.process_query_key;
        result.invalid_user_ids = response.invalid_staff_id_list;
        result.flow_controlled_user_ids = response.flow_controlled_staff_id_list;
        result
    }
}

pub fn interpret_webhook(status: u16, body: &str) -> Result<DeliveryResult, SendError> {
    let result = parse_body::<WebhookResponse>(status, body).map(DeliveryResult::from)?;
    check_status(status, body, result)
}

pub fn interpret_batch_send(status: u16, body: &str) -> Result<DeliveryResult, SendError> {
    let result = parse_body::<BatchSendResponse>(status, body).map(DeliveryResult::from)?;
    check_status(status, body, result)
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

// A gateway error code wins over the HTTP status; without one, a non-2xx
// status is a failure even when the body parsed.
fn check_status(
    status: u16,
    body: &str,
    result: DeliveryResult,
) -> Result<DeliveryResult, SendError> {
    if result.succeeded && !is_success(status) {
        return Err(SendError::HttpStatus {
            status,
            body: truncate_body(body),
        });
    }
    Ok(result)
}

// Only a JSON object is accepted. An unreadable body on an error status is
// reported as that status; on a success status it is a parse failure.
fn parse_body<T: DeserializeOwned>(status: u16, body: &str) -> Result<T, SendError> {
    serde_json::from_str::<Value>(body)
        .and_then(|value| {
            if value.is_object() {
                serde_json::from_value(value)
            } else {
                Err(<serde_json::Error as serde::de::Error>::custom(
                    "expected a JSON object",
                ))
            }
        })
        .map_err(|source| {
            if is_success(status) {
                SendError::ResponseParse {
                    source,
                    body: truncate_body(body),
                }
            } else {
                SendError::HttpStatus {
                    status,
                    body: truncate_body(body),
                }
            }
        })
}
